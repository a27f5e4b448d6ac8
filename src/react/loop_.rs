//! 编排主循环
//!
//! 一轮：用户输入 -> Decision -> (Tool: 分发 -> 追问 Decision -> (Tool: 再分发一次)) -> 渲染 -> 写历史。
//! 工具嵌套固定为一层：追问 Decision 若仍是 Tool，只分发不再请求第三次。
//! 每轮恰好写入一条 user 与一条 assistant 历史，保证严格交替。

use std::sync::Arc;

use crate::core::{TurnOutcome, TurnPhase};
use crate::memory::{ConversationMemory, Message};
use crate::react::{AgentEvent, Decision, EventSink, Planner, ToolCall};
use crate::tools::ToolExecutor;
use crate::ui::InputSource;

pub const USER_PROMPT: &str = "USER ❯";

/// 会话上下文：Planner、工具分发器、历史（唯一所有者）与事件出口
pub struct AgentLoop {
    planner: Planner,
    executor: ToolExecutor,
    memory: ConversationMemory,
    history_window: usize,
    sink: Arc<dyn EventSink>,
    phase: TurnPhase,
}

impl AgentLoop {
    pub fn new(
        planner: Planner,
        executor: ToolExecutor,
        history_window: usize,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            planner,
            executor,
            memory: ConversationMemory::new(),
            history_window,
            sink,
            phase: TurnPhase::Idle,
        }
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    fn advance(&mut self, next: TurnPhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal transition {:?} -> {:?}",
            self.phase,
            next
        );
        tracing::debug!(from = ?self.phase, to = ?next, "turn phase");
        self.phase = next;
    }

    /// 读取输入直到退出关键字或 EOF；空行忽略
    pub async fn run(&mut self, input: &dyn InputSource, exit_keywords: &[String]) {
        loop {
            let Some(line) = input.read_line(USER_PROMPT).await else {
                tracing::info!("input closed, leaving session");
                break;
            };
            let line = line.trim();
            if exit_keywords.iter().any(|k| k.eq_ignore_ascii_case(line)) {
                break;
            }
            if line.is_empty() {
                continue;
            }
            self.run_turn(line).await;
        }
        let (prompt, completion, total) = self.planner.token_usage();
        tracing::info!(prompt, completion, total, "session token usage");
    }

    /// 处理一轮用户输入；任何失败都已在下层转为文本，这里总能得到可渲染结果
    pub async fn run_turn(&mut self, user_input: &str) -> TurnOutcome {
        self.advance(TurnPhase::AwaitingDecision);
        let window = self.memory.window(self.history_window).to_vec();
        self.memory.push(Message::user(user_input));

        self.sink.emit(AgentEvent::Thinking { followup: false });
        let decision = self.planner.decide(&window, user_input).await;

        let call = match decision {
            Decision::Tool(call) => call,
            reply => return self.finish_reply(reply),
        };

        self.advance(TurnPhase::Dispatching);
        let output = self.dispatch(&call).await;

        self.advance(TurnPhase::AwaitingFollowup);
        let window = self.memory.window(self.history_window).to_vec();
        self.sink.emit(AgentEvent::Thinking { followup: true });
        let followup = self
            .planner
            .decide_followup(&window, &Decision::Tool(call), &output)
            .await;

        let nested = match followup {
            Decision::Tool(nested) => nested,
            reply => return self.finish_reply(reply),
        };

        self.advance(TurnPhase::DispatchingNested);
        let result = self.dispatch(&nested).await;
        self.memory
            .push(Message::assistant(Decision::Tool(nested.clone()).to_json()));
        self.advance(TurnPhase::Idle);

        TurnOutcome::NestedTool {
            tool_name: nested.tool_name,
            result,
        }
    }

    async fn dispatch(&self, call: &ToolCall) -> String {
        self.sink.emit(AgentEvent::ToolDispatched {
            tool: call.tool_name.clone(),
        });
        self.executor.dispatch(call).await
    }

    fn finish_reply(&mut self, decision: Decision) -> TurnOutcome {
        self.advance(TurnPhase::Reply);
        let record = decision.to_json();
        let content = match decision {
            Decision::Reply { content, copy_text } => {
                self.sink.emit(AgentEvent::Reply {
                    content: content.clone(),
                });
                if let Some(copy) = copy_text.filter(|c| !c.trim().is_empty()) {
                    self.sink.emit(AgentEvent::ManualRun { command: copy });
                }
                content
            }
            Decision::Tool(call) => format!("Unexpected tool call: {}", call.tool_name),
        };
        self.memory.push(Message::assistant(record));
        self.advance(TurnPhase::Idle);
        TurnOutcome::Replied { content }
    }
}
