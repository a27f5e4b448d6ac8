//! 记忆层：进程生命周期内的对话历史（不做跨进程持久化）

pub mod conversation;

pub use conversation::{ConversationMemory, Message, Role};
