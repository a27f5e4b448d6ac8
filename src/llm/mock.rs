//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 按顺序返回预先排好的输出，并记录每次调用收到的消息；队列耗尽时返回错误（模拟传输失败）。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::LlmClient;
use crate::memory::Message;

/// Mock 客户端：脚本化输出 + 调用记录
#[derive(Debug, Default)]
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 依次返回给定的原始输出
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::new();
        for r in responses {
            client.push_response(r);
        }
        client
    }

    pub fn push_response(&self, raw: impl Into<String>) {
        if let Ok(mut q) = self.responses.lock() {
            q.push_back(Ok(raw.into()));
        }
    }

    /// 下一次调用返回传输错误
    pub fn push_error(&self, err: impl Into<String>) {
        if let Ok(mut q) = self.responses.lock() {
            q.push_back(Err(err.into()));
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// 第 n 次调用收到的完整消息列表
    pub fn call(&self, n: usize) -> Option<Vec<Message>> {
        self.calls.lock().ok().and_then(|c| c.get(n).cloned())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }
        self.responses
            .lock()
            .map_err(|e| e.to_string())?
            .pop_front()
            .unwrap_or_else(|| Err("mock: no scripted response".to_string()))
    }
}
