//! Agent 组装
//!
//! create_agent 按配置注册五个工具（run_terminal / create_file / ask_choice / google_search / get_time_info），
//! 构建 Planner 与 ToolExecutor，返回可直接 run 的 AgentLoop。
//! 推理客户端、搜索协作者、输入源与事件出口都由调用方注入，测试可替换为 Mock。

use std::sync::Arc;

use crate::config::AppConfig;
use crate::llm::LlmClient;
use crate::react::{default_system_prompt, AgentLoop, EventSink, Planner};
use crate::tools::{
    AskChoiceTool, CreateFileTool, GoogleSearchTool, RunTerminalTool, SafetyClassifier,
    SearchProvider, ShellRunner, TimeInfoTool, ToolExecutor, ToolRegistry,
};
use crate::ui::InputSource;

/// 注册全部工具
pub fn build_registry(
    cfg: &AppConfig,
    search: Arc<dyn SearchProvider>,
    input: Arc<dyn InputSource>,
    sink: Arc<dyn EventSink>,
) -> ToolRegistry {
    let workspace = cfg.app.workspace();
    let shell = &cfg.tools.shell;

    let classifier = SafetyClassifier::new(shell.clone(), &workspace);
    let runner = ShellRunner::new(
        shell.shell_program.clone(),
        &workspace,
        shell.live_window_lines,
        sink.clone(),
    );

    let mut registry = ToolRegistry::new();
    registry.register(RunTerminalTool::new(
        classifier,
        runner,
        input.clone(),
        sink.clone(),
    ));
    registry.register(CreateFileTool::new(&workspace, sink.clone()));
    registry.register(AskChoiceTool::new(input, sink.clone()));
    registry.register(GoogleSearchTool::new(
        search,
        cfg.tools.search.max_results,
        sink,
    ));
    registry.register(TimeInfoTool);
    registry
}

/// 创建编排循环
pub fn create_agent(
    cfg: &AppConfig,
    llm: Arc<dyn LlmClient>,
    search: Arc<dyn SearchProvider>,
    input: Arc<dyn InputSource>,
    sink: Arc<dyn EventSink>,
) -> AgentLoop {
    let registry = build_registry(cfg, search, input, sink.clone());
    tracing::info!(tools = ?registry.tool_names(), "tools registered");
    let executor = ToolExecutor::new(registry);

    let planner = Planner::new(
        llm,
        system_prompt(&cfg.app.name, &executor),
        cfg.llm.request_timeout_secs,
    );
    AgentLoop::new(planner, executor, cfg.app.history_window, sink)
}

/// 策略提示 + 已注册工具的参数说明
fn system_prompt(name: &str, executor: &ToolExecutor) -> String {
    let mut prompt = default_system_prompt(name);
    prompt.push_str("\nAVAILABLE TOOLS:\n");
    for (tool, description) in executor.tool_descriptions() {
        prompt.push_str(&format!("- {}: {}\n", tool, description));
    }
    prompt
}
