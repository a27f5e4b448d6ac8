//! 用户输入源：主循环读行、执行确认、选择题都从这里阻塞读取
//!
//! 同一个 InputSource 贯穿整个会话，避免多个读取者争抢 stdin 的缓冲。

use std::collections::VecDeque;
use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;
use crossterm::style::Stylize;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// 行输入源；None 表示输入已关闭（EOF）
#[async_trait]
pub trait InputSource: Send + Sync {
    async fn read_line(&self, prompt: &str) -> Option<String>;
}

/// 终端输入：打印提示后从 stdin 读取一行
pub struct TerminalInput {
    lines: tokio::sync::Mutex<Lines<BufReader<Stdin>>>,
}

impl TerminalInput {
    pub fn new() -> Self {
        Self {
            lines: tokio::sync::Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }
}

impl Default for TerminalInput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InputSource for TerminalInput {
    async fn read_line(&self, prompt: &str) -> Option<String> {
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "{} ", prompt.bold());
        let _ = stdout.flush();
        let mut lines = self.lines.lock().await;
        match lines.next_line().await {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed");
                None
            }
        }
    }
}

/// 脚本化输入（测试与无界面运行）；记录每次收到的提示
#[derive(Debug, Default)]
pub struct ScriptedInput {
    lines: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedInput {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: Mutex::new(lines.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl InputSource for ScriptedInput {
    async fn read_line(&self, prompt: &str) -> Option<String> {
        if let Ok(mut p) = self.prompts.lock() {
            p.push(prompt.to_string());
        }
        self.lines.lock().ok()?.pop_front()
    }
}

/// 是/否确认；只有 y / yes 视为同意，EOF 视为拒绝
pub async fn confirm(input: &dyn InputSource, question: &str) -> bool {
    match input.read_line(&format!("{} [y/N]", question)).await {
        Some(answer) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
        None => false,
    }
}
