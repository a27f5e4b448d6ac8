//! Nexus 入口：初始化日志、加载配置与凭据、组装 Agent 并进入对话循环。

use std::sync::Arc;

use anyhow::Context;
use nexus::config::{load_config, resolve_api_key, save_api_key};
use nexus::llm::create_groq_client;
use nexus::tools::GoogleScraper;
use nexus::ui::{Console, InputSource, TerminalInput};
use nexus::create_agent;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nexus::observability::init();

    let cfg = load_config(None).context("Failed to load config")?;
    let input = Arc::new(TerminalInput::new());

    // 首次运行：交互式录入 API Key 并写入凭据文件
    let api_key = match resolve_api_key(&cfg) {
        Some(key) => key,
        None => {
            let key = input
                .read_line("Paste API Key")
                .await
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .context("No API key provided")?;
            save_api_key(&cfg.app.credentials_file, &key)
                .context("Failed to save credentials")?;
            key
        }
    };

    let llm = Arc::new(create_groq_client(&cfg.llm, &api_key));
    let search = Arc::new(GoogleScraper::new(
        cfg.tools.search.endpoint.clone(),
        cfg.tools.search.timeout_secs,
    ));
    let console = Arc::new(Console::new());
    let workspace = cfg.app.workspace();
    let workspace = workspace.canonicalize().unwrap_or(workspace);
    console.banner(&cfg.app.name, &cfg.llm.model, &workspace.display().to_string());

    let mut agent = create_agent(&cfg, llm, search, input.clone(), console);
    agent.run(input.as_ref(), &cfg.app.exit_keywords).await;
    Ok(())
}
