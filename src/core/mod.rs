//! 核心层：错误分类与单轮状态机

pub mod error;
pub mod state;

pub use error::AgentError;
pub use state::{TurnOutcome, TurnPhase};
