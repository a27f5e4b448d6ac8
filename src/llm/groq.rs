//! Groq 客户端（OpenAI 兼容格式）
//!
//! Base URL 与模型来自 [llm] 配置，默认 https://api.groq.com/openai/v1 + llama-3.3-70b-versatile。

use crate::config::LlmSection;
use crate::llm::OpenAiClient;

/// 用 [llm] 配置与已解析的 API Key 创建客户端
pub fn create_groq_client(cfg: &LlmSection, api_key: &str) -> OpenAiClient {
    OpenAiClient::new(Some(cfg.base_url.as_str()), &cfg.model, Some(api_key))
        .with_temperature(cfg.temperature)
        .with_json_mode(cfg.json_mode)
}
