//! ask_choice：阻塞等待用户按编号选择
//!
//! 编号从 1 开始；非法输入无限重问，空输入选默认项 1；输入关闭（EOF）时返回错误而不是空转。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::react::{AgentEvent, EventSink};
use crate::tools::Tool;
use crate::ui::InputSource;

pub struct AskChoiceTool {
    input: Arc<dyn InputSource>,
    sink: Arc<dyn EventSink>,
}

impl AskChoiceTool {
    pub fn new(input: Arc<dyn InputSource>, sink: Arc<dyn EventSink>) -> Self {
        Self { input, sink }
    }

    /// 解析一次输入；None 表示非法
    fn parse_selection(raw: &str, count: usize) -> Option<usize> {
        let raw = raw.trim();
        let n: usize = if raw.is_empty() { 1 } else { raw.parse().ok()? };
        (1..=count).contains(&n).then(|| n - 1)
    }

    pub async fn ask(&self, question: &str, choices: &[String]) -> Result<String, String> {
        if choices.is_empty() {
            return Err("No choices provided".to_string());
        }
        self.sink.emit(AgentEvent::ChoicePrompt {
            question: question.to_string(),
            choices: choices.to_vec(),
        });
        let prompt = format!("Select Option (1-{})", choices.len());
        loop {
            let raw = self
                .input
                .read_line(&prompt)
                .await
                .ok_or("Input closed before a choice was made")?;
            match Self::parse_selection(&raw, choices.len()) {
                Some(idx) => return Ok(format!("User selected: '{}'.", choices[idx])),
                None => self.sink.emit(AgentEvent::InvalidSelection),
            }
        }
    }
}

#[async_trait]
impl Tool for AskChoiceTool {
    fn name(&self) -> &str {
        "ask_choice"
    }

    fn description(&self) -> &str {
        "Ask the user to pick one option. Args: {\"question\": \"...\", \"choices\": [\"a\", \"b\"]}"
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let question = args
            .get("question")
            .and_then(|v| v.as_str())
            .unwrap_or("Please choose:");
        let choices: Vec<String> = args
            .get("choices")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .map(|c| match c {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        self.ask(question, &choices).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::react::CollectingSink;
    use crate::ui::ScriptedInput;

    fn choices() -> Vec<String> {
        vec!["Red".into(), "Green".into(), "Blue".into()]
    }

    #[tokio::test]
    async fn test_reprompts_until_valid() {
        let input = Arc::new(ScriptedInput::new(["zero", "0", "4", "-1", "2"]));
        let sink = Arc::new(CollectingSink::new());
        let tool = AskChoiceTool::new(input.clone(), sink.clone());

        let out = tool.ask("Favourite colour?", &choices()).await.unwrap();
        assert_eq!(out, "User selected: 'Green'.");
        assert_eq!(input.prompts().len(), 5);
        let invalid = sink
            .events()
            .iter()
            .filter(|e| matches!(e, AgentEvent::InvalidSelection))
            .count();
        assert_eq!(invalid, 4);
    }

    #[tokio::test]
    async fn test_blank_selects_default() {
        let tool = AskChoiceTool::new(
            Arc::new(ScriptedInput::new([""])),
            Arc::new(CollectingSink::new()),
        );
        assert_eq!(
            tool.ask("?", &choices()).await.unwrap(),
            "User selected: 'Red'."
        );
    }

    #[tokio::test]
    async fn test_eof_and_empty_choices() {
        let tool = AskChoiceTool::new(
            Arc::new(ScriptedInput::new(Vec::<String>::new())),
            Arc::new(CollectingSink::new()),
        );
        assert!(tool.ask("?", &choices()).await.is_err());
        assert!(tool.ask("?", &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_execute_reads_json_choices() {
        let tool = AskChoiceTool::new(
            Arc::new(ScriptedInput::new(["3"])),
            Arc::new(CollectingSink::new()),
        );
        let out = tool
            .execute(serde_json::json!({"question": "Pick", "choices": ["a", "b", "c d"]}))
            .await
            .unwrap();
        assert_eq!(out, "User selected: 'c d'.");
    }
}
