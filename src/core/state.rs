//! 单轮对话的状态机阶段
//!
//! Idle -> AwaitingDecision -> {Reply | Dispatching} -> AwaitingFollowup -> {Reply | DispatchingNested} -> Idle

use serde::Serialize;

/// 编排循环当前所处阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    Idle,
    AwaitingDecision,
    Dispatching,
    AwaitingFollowup,
    DispatchingNested,
    Reply,
}

impl TurnPhase {
    /// 该阶段之后允许进入的阶段
    pub fn can_advance_to(self, next: TurnPhase) -> bool {
        use TurnPhase::*;
        matches!(
            (self, next),
            (Idle, AwaitingDecision)
                | (AwaitingDecision, Reply)
                | (AwaitingDecision, Dispatching)
                | (Dispatching, AwaitingFollowup)
                | (AwaitingFollowup, Reply)
                | (AwaitingFollowup, DispatchingNested)
                | (DispatchingNested, Idle)
                | (Reply, Idle)
        )
    }
}

/// 单轮结束时的结果
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    /// 以回复结束（原始或追问 Decision）
    Replied { content: String },
    /// 追问 Decision 又请求了工具；结果只通过工具自身的副作用呈现
    NestedTool { tool_name: String, result: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nesting_has_no_third_round() {
        assert!(TurnPhase::AwaitingFollowup.can_advance_to(TurnPhase::DispatchingNested));
        assert!(!TurnPhase::DispatchingNested.can_advance_to(TurnPhase::AwaitingFollowup));
        assert!(!TurnPhase::DispatchingNested.can_advance_to(TurnPhase::AwaitingDecision));
    }

    #[test]
    fn test_idle_only_enters_decision() {
        assert!(TurnPhase::Idle.can_advance_to(TurnPhase::AwaitingDecision));
        assert!(!TurnPhase::Idle.can_advance_to(TurnPhase::Dispatching));
    }
}
