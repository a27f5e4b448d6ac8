//! 认知层：Decision 解析、Planner、编排主循环与过程事件

pub mod decision;
pub mod events;
pub mod loop_;
pub mod planner;

pub use decision::{clean_json, parse_decision, Decision, ToolCall};
pub use events::{AgentEvent, CollectingSink, EventSink, NullSink};
pub use loop_::{AgentLoop, USER_PROMPT};
pub use planner::{default_system_prompt, Planner};
