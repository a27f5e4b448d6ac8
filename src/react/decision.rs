//! Decision：推理服务的结构化输出
//!
//! 线上格式为单个 JSON 对象，`action` 为判别字段：
//! `{"action":"reply","content":"...","copy_text":"..."}` 或
//! `{"action":"tool","tool_name":"run_terminal","args":"ls"}`。
//! 未知字段忽略；当前变体缺少必填字段即为 Parse 错误。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::AgentError;

/// 推理服务的决定：直接回复，或请求调用一个工具
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Reply {
        content: String,
        copy_text: Option<String>,
    },
    Tool(ToolCall),
}

/// 工具调用：tool_name 永不为空，其余字段原样保留供工具读取
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub tool_name: String,
    pub args: Map<String, Value>,
}

#[derive(Deserialize)]
struct ReplyFields {
    content: String,
    #[serde(default)]
    copy_text: Option<String>,
}

#[derive(Serialize)]
struct ReplyWire<'a> {
    action: &'static str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    copy_text: Option<&'a str>,
}

impl Decision {
    /// 合成的错误回复：传输或解析失败都落到这里，保证本轮总有可渲染的结果
    pub fn error_reply(message: impl Into<String>) -> Self {
        Decision::Reply {
            content: message.into(),
            copy_text: None,
        }
    }

    /// 序列化回线上格式（写入 assistant 历史）
    pub fn to_json(&self) -> String {
        match self {
            Decision::Reply { content, copy_text } => serde_json::to_string(&ReplyWire {
                action: "reply",
                content,
                copy_text: copy_text.as_deref(),
            }),
            Decision::Tool(call) => {
                let mut obj = Map::new();
                obj.insert("action".into(), Value::String("tool".into()));
                obj.insert("tool_name".into(), Value::String(call.tool_name.clone()));
                for (k, v) in &call.args {
                    obj.insert(k.clone(), v.clone());
                }
                serde_json::to_string(&Value::Object(obj))
            }
        }
        .unwrap_or_else(|_| "{}".to_string())
    }
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>, args: Value) -> Self {
        let args = match args {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("args".into(), other);
                map
            }
        };
        Self {
            tool_name: tool_name.into(),
            args,
        }
    }

    /// 工具收到的参数对象
    pub fn arguments(&self) -> Value {
        Value::Object(self.args.clone())
    }
}

/// 去掉 ```json / ``` 代码块包裹
pub fn clean_json(text: &str) -> &str {
    let mut t = text.trim();
    if let Some(rest) = t.strip_prefix("```") {
        t = rest.strip_prefix("json").unwrap_or(rest).trim();
        if let Some(inner) = t.strip_suffix("```") {
            t = inner.trim();
        }
    }
    t
}

/// 解析推理服务的原始输出为 Decision
pub fn parse_decision(raw: &str) -> Result<Decision, AgentError> {
    let json_str = clean_json(raw);
    let value: Value = serde_json::from_str(json_str)
        .map_err(|e| AgentError::Parse(format!("{}: {}", e, json_str)))?;
    let Value::Object(mut obj) = value else {
        return Err(AgentError::Parse(format!("expected a JSON object: {}", json_str)));
    };

    let action = obj
        .remove("action")
        .and_then(|v| v.as_str().map(str::to_string))
        .ok_or_else(|| AgentError::Parse("missing field `action`".to_string()))?;

    match action.as_str() {
        "reply" => {
            let fields: ReplyFields = serde_json::from_value(Value::Object(obj))
                .map_err(|e| AgentError::Parse(e.to_string()))?;
            Ok(Decision::Reply {
                content: fields.content,
                copy_text: fields.copy_text,
            })
        }
        "tool" => {
            let tool_name = obj
                .remove("tool_name")
                .and_then(|v| v.as_str().map(|s| s.trim().to_string()))
                .filter(|s| !s.is_empty())
                .ok_or_else(|| AgentError::Parse("missing or empty `tool_name`".to_string()))?;
            // 兼容 {"args": {"filename": ...}} 写法：展开到顶层，顶层已有字段优先
            if let Some(Value::Object(nested)) = obj.get("args").cloned() {
                obj.remove("args");
                for (k, v) in nested {
                    obj.entry(k).or_insert(v);
                }
            }
            Ok(Decision::Tool(ToolCall {
                tool_name,
                args: obj,
            }))
        }
        other => Err(AgentError::Parse(format!("unknown action `{}`", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply_with_copy_text() {
        let d = parse_decision(
            r#"{"action": "reply", "content": "Run it yourself", "copy_text": "python app.py", "mood": "ok"}"#,
        )
        .unwrap();
        assert_eq!(
            d,
            Decision::Reply {
                content: "Run it yourself".into(),
                copy_text: Some("python app.py".into()),
            }
        );
    }

    #[test]
    fn test_parse_tool_keeps_fields() {
        let d = parse_decision(
            "```json\n{\"action\":\"tool\",\"tool_name\":\"create_file\",\"filename\":\"a.txt\",\"content\":\"hi\"}\n```",
        )
        .unwrap();
        let Decision::Tool(call) = d else {
            panic!("expected tool");
        };
        assert_eq!(call.tool_name, "create_file");
        assert_eq!(call.args.get("filename").and_then(|v| v.as_str()), Some("a.txt"));
        assert!(!call.args.contains_key("action"));
    }

    #[test]
    fn test_parse_tool_flattens_object_args() {
        let d = parse_decision(
            r#"{"action":"tool","tool_name":"ask_choice","args":{"question":"Pick","choices":["a","b"]}}"#,
        )
        .unwrap();
        let Decision::Tool(call) = d else {
            panic!("expected tool");
        };
        assert_eq!(call.args.get("question").and_then(|v| v.as_str()), Some("Pick"));
        assert!(!call.args.contains_key("args"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_decision("not json"), Err(AgentError::Parse(_))));
        assert!(matches!(parse_decision("[1,2]"), Err(AgentError::Parse(_))));
        assert!(matches!(
            parse_decision(r#"{"content":"no action"}"#),
            Err(AgentError::Parse(_))
        ));
        assert!(matches!(
            parse_decision(r#"{"action":"reply"}"#),
            Err(AgentError::Parse(_))
        ));
        assert!(matches!(
            parse_decision(r#"{"action":"tool","tool_name":"  "}"#),
            Err(AgentError::Parse(_))
        ));
        assert!(matches!(
            parse_decision(r#"{"action":"dance"}"#),
            Err(AgentError::Parse(_))
        ));
    }

    #[test]
    fn test_clean_json_plain_fence() {
        assert_eq!(clean_json("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(clean_json("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_to_json_reparses() {
        let call = ToolCall::new("run_terminal", Value::String("ls".into()));
        let d = Decision::Tool(call);
        assert_eq!(parse_decision(&d.to_json()).unwrap(), d);
    }
}
