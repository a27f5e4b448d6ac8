//! 短期记忆：对话历史
//!
//! 只追加、有序；存储不设上限，发送给推理服务时只取最近 K 条（窗口），旧条目只从发送中丢弃。

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 会话历史：唯一所有者为编排循环
#[derive(Clone, Debug, Default)]
pub struct ConversationMemory {
    messages: Vec<Message>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// 最近 k 条（不足 k 条时返回全部）
    pub fn window(&self, k: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(k);
        &self.messages[start..]
    }

    pub fn count_role(&self, role: &Role) -> usize {
        self.messages.iter().filter(|m| &m.role == role).count()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_keeps_storage() {
        let mut mem = ConversationMemory::new();
        for i in 0..10 {
            mem.push(Message::user(format!("u{i}")));
            mem.push(Message::assistant(format!("a{i}")));
        }
        let window = mem.window(6);
        assert_eq!(window.len(), 6);
        assert_eq!(window[0].content, "u7");
        assert_eq!(window[5].content, "a9");
        assert_eq!(mem.len(), 20);
    }

    #[test]
    fn test_window_larger_than_history() {
        let mut mem = ConversationMemory::new();
        mem.push(Message::user("hi"));
        assert_eq!(mem.window(8).len(), 1);
        assert!(ConversationMemory::new().window(8).is_empty());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::assistant("x")).unwrap();
        assert!(json.contains("\"assistant\""));
    }
}
