//! Agent 错误类型
//!
//! 每一类错误都在产生处被转换成文本（工具结果或合成的 Reply），不会终止主循环。

use thiserror::Error;

/// Agent 运行过程中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// 调用推理服务失败：网络、超时、非成功状态
    #[error("API Error: {0}")]
    Transport(String),

    /// 推理服务返回的 Decision 无法解析或不符合 schema
    #[error("Invalid decision payload: {0}")]
    Parse(String),

    /// 安全策略拦截：手动执行、交互式脚本、用户拒绝；内容即返回给推理服务的说明文本
    #[error("{0}")]
    SafetyBlock(String),

    /// 子进程启动失败
    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Config error: {0}")]
    Config(String),
}
