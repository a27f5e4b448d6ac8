//! 终端前端：把 AgentEvent 渲染为带样式的文本面板
//!
//! 实时输出窗口原地重绘：记住上次画了几行，下次先上移光标并清屏到底部。

use std::io::{self, Write};
use std::sync::Mutex;

use crossterm::cursor::MoveUp;
use crossterm::queue;
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};

use crate::react::{AgentEvent, EventSink};
use crate::tools::format_size;

const RULE: &str = "────────────────────────────────────────────────────────";

/// crossterm 终端渲染器
#[derive(Debug, Default)]
pub struct Console {
    /// 当前实时窗口已占用的行数
    live_lines: Mutex<usize>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    /// 启动横幅
    pub fn banner(&self, name: &str, model: &str, workspace: &str) {
        let mut out = io::stdout();
        let _ = writeln!(out, "{}", RULE.dark_grey());
        let _ = writeln!(out, " {}  {}", name.bold().cyan(), model.dark_grey());
        let _ = writeln!(out, " {} {}", "cwd".dark_grey(), workspace);
        let _ = writeln!(out, " {}", "Type 'exit' or 'quit' to leave.".dark_grey());
        let _ = writeln!(out, "{}", RULE.dark_grey());
        let _ = out.flush();
    }

    fn redraw_window(&self, out: &mut impl Write, lines: &[String]) -> io::Result<()> {
        let mut drawn = self.live_lines.lock().map_err(|_| io::Error::other("poisoned"))?;
        if *drawn > 0 {
            queue!(out, MoveUp(*drawn as u16), Clear(ClearType::FromCursorDown))?;
        }
        for line in lines {
            writeln!(out, "  {}", line.as_str().dark_grey())?;
        }
        *drawn = lines.len();
        Ok(())
    }

    fn reset_window(&self) {
        if let Ok(mut drawn) = self.live_lines.lock() {
            *drawn = 0;
        }
    }

    fn render(&self, event: AgentEvent) -> io::Result<()> {
        let mut out = io::stdout();
        match event {
            AgentEvent::Thinking { followup } => {
                let label = if followup { "analyzing output..." } else { "thinking..." };
                writeln!(out, "{}", label.dark_grey().italic())?;
            }
            AgentEvent::Reply { content } => {
                writeln!(out, "{}", "NEXUS".bold().cyan())?;
                writeln!(out, "{}", content)?;
                writeln!(out, "{}", RULE.dark_grey())?;
            }
            AgentEvent::ManualRun { command } => {
                writeln!(out, "{}", "RUN MANUALLY".bold().yellow())?;
                writeln!(out, "  {}", command.as_str().yellow())?;
            }
            AgentEvent::ToolDispatched { tool } => {
                tracing::debug!(tool = %tool, "tool dispatched");
            }
            AgentEvent::ExecStart { command, cwd } => {
                writeln!(out, "{} {} {}", cwd.as_str().dark_grey(), "$".green(), command.bold())?;
                self.reset_window();
            }
            AgentEvent::ConsoleWindow { lines } => self.redraw_window(&mut out, &lines)?,
            AgentEvent::ExecFinished { exit_code } => {
                self.reset_window();
                match exit_code {
                    Some(0) => writeln!(out, "{}", "done".green())?,
                    Some(code) => writeln!(out, "{}", format!("exit {}", code).red())?,
                    None => writeln!(out, "{}", "terminated by signal".red())?,
                }
            }
            AgentEvent::InteractiveStop { file, marker } => {
                writeln!(out, "{}", "INTERACTIVE SCRIPT".bold().yellow())?;
                writeln!(
                    out,
                    "  {} waits for input ({}); run it yourself.",
                    file.display(),
                    marker
                )?;
            }
            AgentEvent::FileCreated {
                name,
                size_bytes,
                path,
            } => {
                writeln!(out, "{} {}", "FILE CREATED".bold().green(), name.bold())?;
                writeln!(out, "  size: {}", format_size(size_bytes))?;
                writeln!(out, "  path: {}", path.display())?;
            }
            AgentEvent::ChoicePrompt { question, choices } => {
                writeln!(out, "{}", question.bold().magenta())?;
                for (i, choice) in choices.iter().enumerate() {
                    writeln!(out, "  {} {}", format!("[{}]", i + 1).cyan(), choice)?;
                }
            }
            AgentEvent::InvalidSelection => {
                writeln!(out, "{}", "Invalid selection, try again.".red())?;
            }
            AgentEvent::Searching { query } => {
                writeln!(out, "{} {}", "searching".dark_grey().italic(), query)?;
            }
        }
        out.flush()
    }
}

impl EventSink for Console {
    fn emit(&self, event: AgentEvent) {
        if let Err(e) = self.render(event) {
            tracing::warn!(error = %e, "console render failed");
        }
    }
}
