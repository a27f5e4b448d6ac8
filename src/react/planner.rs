//! Planner：向推理服务请求 Decision
//!
//! 请求 = system 策略提示 + 最近 K 条历史 + 最新一轮；调用带固定超时。
//! 传输失败与解析失败都在这里被转换为合成的 Reply，绝不向上传播。

use std::sync::Arc;
use std::time::Duration;

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::Message;
use crate::react::decision::{parse_decision, Decision};

/// 默认策略提示：工具清单、安全规则与 JSON 响应格式
pub fn default_system_prompt(name: &str) -> String {
    format!(
        r#"You are {name}, a terminal assistant running on the user's device.

TOOLS & RULES:
1. Time/Date: when the user asks about the current time or date, use `get_time_info`.
2. Internet Search: for news or facts, use `google_search` with the query in `args`.
3. Terminal: use `run_terminal` with the shell command in `args`.
4. Files: use `create_file` with `filename` and `content`.
5. Choices: use `ask_choice` with `question` and `choices` (array of strings) when the user must pick an option.
6. Security: you are NOT allowed to run scripts (Python, Bash, JS, ...) directly.
   If a command is blocked by `run_terminal`, tell the user to run it MANUALLY in a new terminal session
   and put the exact command in `copy_text`.
7. Response format: JSON only, matching the schema below.

RESPONSE FORMAT (JSON ONLY):
{{ "action": "reply", "content": "Your explanation here.", "copy_text": "Command to run manually, if any" }}
Or for a tool:
{{ "action": "tool", "tool_name": "...", "args": "..." }}
"#
    )
}

/// Decision Client：持有 LLM、策略提示与请求超时
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
    timeout: Duration,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    /// 请求一个 Decision；任何失败都转为携带错误描述的 Reply
    pub async fn decide(&self, history: &[Message], latest: &str) -> Decision {
        match self.try_decide(history, latest).await {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(error = %e, "decision request failed, synthesizing reply");
                Decision::error_reply(format!("Error: {}", e))
            }
        }
    }

    /// 第二轮：附上第一轮的原始 Decision 与工具输出
    pub async fn decide_followup(
        &self,
        history: &[Message],
        first: &Decision,
        tool_output: &str,
    ) -> Decision {
        let mut context = history.to_vec();
        context.push(Message::assistant(first.to_json()));
        let latest = format!("Tool Output:\n{}\n\nProceed.", tool_output);
        self.decide(&context, &latest).await
    }

    async fn try_decide(&self, history: &[Message], latest: &str) -> Result<Decision, AgentError> {
        let raw = self.complete(history, latest).await?;
        parse_decision(&raw)
    }

    async fn complete(&self, history: &[Message], latest: &str) -> Result<String, AgentError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.system_prompt.clone()));
        messages.extend(history.iter().cloned());
        messages.push(Message::user(latest.to_string()));

        tokio::time::timeout(self.timeout, self.llm.complete(&messages))
            .await
            .map_err(|_| {
                AgentError::Transport(format!("request timed out after {}s", self.timeout.as_secs()))
            })?
            .map_err(AgentError::Transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::memory::Role;

    #[tokio::test]
    async fn test_request_layout() {
        let mock = Arc::new(MockLlmClient::with_responses([r#"{"action":"reply","content":"hi"}"#]));
        let planner = Planner::new(mock.clone(), "POLICY", 30);
        let history = vec![Message::user("earlier"), Message::assistant("{}")];

        let d = planner.decide(&history, "hello").await;
        assert_eq!(
            d,
            Decision::Reply {
                content: "hi".into(),
                copy_text: None
            }
        );

        let sent = mock.call(0).unwrap();
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[0], Message::system("POLICY"));
        assert_eq!(sent[3], Message::user("hello"));
    }

    #[tokio::test]
    async fn test_transport_error_becomes_reply() {
        let mock = Arc::new(MockLlmClient::new());
        mock.push_error("connection refused");
        let planner = Planner::new(mock, "POLICY", 30);

        match planner.decide(&[], "hello").await {
            Decision::Reply { content, copy_text } => {
                assert!(content.contains("connection refused"));
                assert!(copy_text.is_none());
            }
            other => panic!("expected reply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_json_becomes_reply() {
        let mock = Arc::new(MockLlmClient::with_responses(["{\"action\": \"tool\","]));
        let planner = Planner::new(mock, "POLICY", 30);
        let d = planner.decide(&[], "hello").await;
        assert!(matches!(d, Decision::Reply { ref content, .. } if content.starts_with("Error:")));
    }

    #[tokio::test]
    async fn test_followup_carries_tool_output() {
        let mock = Arc::new(MockLlmClient::with_responses([r#"{"action":"reply","content":"done"}"#]));
        let planner = Planner::new(mock.clone(), "POLICY", 30);
        let first = Decision::Tool(crate::react::ToolCall::new(
            "run_terminal",
            serde_json::Value::String("ls".into()),
        ));

        planner.decide_followup(&[Message::user("list")], &first, "file.txt").await;

        let sent = mock.call(0).unwrap();
        assert_eq!(sent[2].role, Role::Assistant);
        assert!(sent[2].content.contains("run_terminal"));
        assert!(sent[3].content.starts_with("Tool Output:\nfile.txt"));
    }
}
