//! 过程事件：编排循环与工具向前端推送的展示事件
//!
//! 渲染是外部关注点；核心只通过 EventSink 发出事件，终端前端（ui::Console）或测试收集器消费。

use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;

/// 单个展示事件（可序列化为 JSON）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// 正在等待推理服务（followup 表示第二轮）
    Thinking { followup: bool },
    /// 最终回复
    Reply { content: String },
    /// 需要用户手动执行的命令（copy_text 或被拦截的脚本）
    ManualRun { command: String },
    /// 开始分发工具
    ToolDispatched { tool: String },
    /// 开始执行 Shell 命令
    ExecStart { command: String, cwd: String },
    /// 实时输出窗口（只含最近 N 行）
    ConsoleWindow { lines: Vec<String> },
    /// 子进程结束
    ExecFinished { exit_code: Option<i32> },
    /// 脚本含交互输入，拒绝执行
    InteractiveStop { file: PathBuf, marker: String },
    /// 文件已写入
    FileCreated {
        name: String,
        size_bytes: usize,
        path: PathBuf,
    },
    /// 选择题
    ChoicePrompt {
        question: String,
        choices: Vec<String>,
    },
    InvalidSelection,
    /// 开始搜索
    Searching { query: String },
}

/// 事件接收端
pub trait EventSink: Send + Sync {
    fn emit(&self, event: AgentEvent);
}

/// 丢弃所有事件
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: AgentEvent) {}
}

/// 收集所有事件（无界面运行与测试用）
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<AgentEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AgentEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: AgentEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
