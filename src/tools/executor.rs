//! 工具分发器
//!
//! 按 tool_name 找到处理器并执行；工具错误转为 "Error: ..." 文本，未知工具转为描述性失败文本，
//! 保证本轮仍能走完。每次调用输出结构化审计日志（JSON）。

use std::time::Instant;

use crate::core::AgentError;
use crate::react::ToolCall;
use crate::tools::ToolRegistry;

/// 工具执行器：结果永远是文本
pub struct ToolExecutor {
    registry: ToolRegistry,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// 分发一次工具调用
    pub async fn dispatch(&self, call: &ToolCall) -> String {
        let start = Instant::now();
        let args = call.arguments();
        let args_preview = args_preview(&args);

        let result = match self.registry.get(&call.tool_name) {
            Some(tool) => tool.execute(args).await.map_err(AgentError::Execution),
            None => Err(AgentError::UnknownTool(call.tool_name.clone())),
        };

        let outcome = match &result {
            Ok(_) => "ok",
            Err(AgentError::UnknownTool(_)) => "unknown_tool",
            Err(_) => "error",
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": call.tool_name,
            "ok": result.is_ok(),
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        match result {
            Ok(content) => content,
            Err(AgentError::UnknownTool(name)) => format!(
                "Error: unknown tool '{}'. Available tools: {}.",
                name,
                self.registry.tool_names().join(", ")
            ),
            Err(AgentError::Execution(msg)) => format!("Error: {}", msg),
            Err(e) => format!("Error: {}", e),
        }
    }

    pub fn tool_descriptions(&self) -> Vec<(String, String)> {
        self.registry.tool_descriptions()
    }
}

fn args_preview(args: &serde_json::Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{TimeInfoTool, Tool};
    use async_trait::async_trait;
    use serde_json::Value;

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "explode"
        }

        fn description(&self) -> &str {
            "always fails"
        }

        async fn execute(&self, _args: Value) -> Result<String, String> {
            Err("boom".to_string())
        }
    }

    fn executor() -> ToolExecutor {
        let mut registry = ToolRegistry::new();
        registry.register(TimeInfoTool);
        registry.register(FailingTool);
        ToolExecutor::new(registry)
    }

    #[tokio::test]
    async fn test_unknown_tool_is_text() {
        let out = executor()
            .dispatch(&ToolCall::new("teleport", Value::Null))
            .await;
        assert_eq!(
            out,
            "Error: unknown tool 'teleport'. Available tools: explode, get_time_info."
        );
    }

    #[tokio::test]
    async fn test_tool_error_is_text() {
        let out = executor().dispatch(&ToolCall::new("explode", Value::Null)).await;
        assert_eq!(out, "Error: boom");
    }

    #[tokio::test]
    async fn test_routes_by_name() {
        let out = executor()
            .dispatch(&ToolCall::new("get_time_info", Value::Null))
            .await;
        assert!(out.starts_with("Current system time:"));
    }
}
