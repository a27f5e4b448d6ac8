//! Nexus - 终端对话式智能体
//!
//! 模块划分：
//! - **agent**: 按配置组装工具、Planner 与编排循环
//! - **config**: 应用配置加载（TOML + 环境变量）与凭据文件
//! - **core**: 错误类型与单轮状态机
//! - **llm**: 推理服务客户端抽象与实现（OpenAI 兼容 / Groq / Mock）
//! - **memory**: 会话历史
//! - **react**: Decision 解析、Planner、编排主循环、过程事件
//! - **tools**: 安全分类、Shell 执行、文件写入、选择、搜索、时间
//! - **ui**: crossterm 终端渲染与输入

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod tools;
pub mod ui;

pub use agent::create_agent;
