//! run_terminal：安全分类 + 实时流式执行
//!
//! ShellRunner 通过 shell 中间层启动一个子进程（stdin 置空），按行读取 stdout，
//! 完整保存全部输出，同时维护只含最近 N 行的实时窗口；stderr 并发读取，子进程退出后作为带标签的段追加。
//! 必须等到子进程退出（拿到退出码）才返回；没有超时，防止挂起是安全分类器的职责。

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::core::AgentError;
use crate::react::{AgentEvent, EventSink};
use crate::tools::safety::{ManualReason, SafetyClassifier, SafetyVerdict};
use crate::tools::Tool;
use crate::ui::{confirm, InputSource};

/// 没有任何输出且退出码为 0 时的返回值
pub const SUCCESS_SENTINEL: &str = "[Success]";
pub const MANUAL_RUN_SENTINEL: &str = "###MANUAL_RUN_REQUIRED###";
pub const INTERACTIVE_STOP_SENTINEL: &str = "###INTERACTIVE_STOP###";
pub const USER_DENIED: &str = "User denied permission.";

/// 输出捕获：full 保存全部行，window 只保留最近 capacity 行
#[derive(Debug)]
pub struct OutputCapture {
    full: Vec<String>,
    window: VecDeque<String>,
    capacity: usize,
}

impl OutputCapture {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            full: Vec::new(),
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, line: String) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(line.clone());
        self.full.push(line);
    }

    pub fn window(&self) -> Vec<String> {
        self.window.iter().cloned().collect()
    }

    pub fn lines(&self) -> &[String] {
        &self.full
    }

    pub fn into_lines(self) -> Vec<String> {
        self.full
    }
}

/// Shell 执行器：每条已放行的命令启动且只启动一个子进程
pub struct ShellRunner {
    shell_program: Option<PathBuf>,
    workspace: PathBuf,
    window_lines: usize,
    sink: Arc<dyn EventSink>,
}

impl ShellRunner {
    pub fn new(
        shell_program: Option<PathBuf>,
        workspace: impl AsRef<Path>,
        window_lines: usize,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            shell_program,
            workspace: workspace.as_ref().to_path_buf(),
            window_lines,
            sink,
        }
    }

    /// 执行命令并返回全部输出；启动失败转为 "Error: ..." 文本
    pub async fn run(&self, command: &str) -> String {
        match self.try_run(command).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(command = %command, error = %e, "shell execution failed");
                format!("Error: {}", e)
            }
        }
    }

    fn shell_command(&self, command: &str) -> Command {
        match &self.shell_program {
            Some(program) if program.exists() => {
                let mut c = Command::new(program);
                c.args(["-c", command]);
                c
            }
            _ if cfg!(target_os = "windows") => {
                let mut c = Command::new("cmd");
                c.args(["/C", command]);
                c
            }
            _ => {
                let mut c = Command::new("sh");
                c.args(["-c", command]);
                c
            }
        }
    }

    async fn try_run(&self, command: &str) -> Result<String, AgentError> {
        let mut cmd = self.shell_command(command);
        cmd.current_dir(&self.workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| AgentError::Execution(e.to_string()))?;
        tracing::info!(command = %command, pid = ?child.id(), "shell spawned");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::Execution("stdout not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| AgentError::Execution("stderr not captured".to_string()))?;

        self.sink.emit(AgentEvent::ExecStart {
            command: command.to_string(),
            cwd: display_cwd(&self.workspace),
        });

        let mut capture = OutputCapture::new(self.window_lines);
        let mut stderr_bytes = Vec::new();
        let (stdout_res, stderr_res) = tokio::join!(
            pump_lines(stdout, &mut capture, self.sink.as_ref()),
            stderr.read_to_end(&mut stderr_bytes),
        );
        let status = child.wait().await?;
        stdout_res?;
        stderr_res?;

        self.sink.emit(AgentEvent::ExecFinished {
            exit_code: status.code(),
        });
        tracing::info!(command = %command, status = %status, lines = capture.lines().len(), "shell finished");

        let mut segments = capture.into_lines();
        let stderr_text = String::from_utf8_lossy(&stderr_bytes);
        if !stderr_text.trim().is_empty() {
            segments.push(format!("STDERR: {}", stderr_text.trim_end()));
        }
        if !status.success() {
            let code = status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| status.to_string());
            segments.push(format!("Exit code: {}", code));
        }

        Ok(if segments.is_empty() {
            SUCCESS_SENTINEL.to_string()
        } else {
            segments.join("\n")
        })
    }
}

/// 逐行读取（非 UTF-8 字节按 lossy 转换，不丢行），每行刷新一次实时窗口
async fn pump_lines<R: AsyncRead + Unpin>(
    reader: R,
    capture: &mut OutputCapture,
    sink: &dyn EventSink,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf).trim_end().to_string();
        capture.push(line);
        sink.emit(AgentEvent::ConsoleWindow {
            lines: capture.window(),
        });
    }
}

fn display_cwd(workspace: &Path) -> String {
    let cwd = workspace
        .canonicalize()
        .unwrap_or_else(|_| workspace.to_path_buf());
    match std::env::var("HOME") {
        Ok(home) if !home.is_empty() && cwd.starts_with(&home) => {
            format!("~{}", cwd.display().to_string().trim_start_matches(home.as_str()))
        }
        _ => cwd.display().to_string(),
    }
}

/// run_terminal 工具：先分类，必要时确认，再交给 ShellRunner
pub struct RunTerminalTool {
    classifier: SafetyClassifier,
    runner: ShellRunner,
    input: Arc<dyn InputSource>,
    sink: Arc<dyn EventSink>,
}

impl RunTerminalTool {
    pub fn new(
        classifier: SafetyClassifier,
        runner: ShellRunner,
        input: Arc<dyn InputSource>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            classifier,
            runner,
            input,
            sink,
        }
    }

    /// 分类并在需要时征求确认；被拦截时返回 SafetyBlock，携带给推理服务的说明
    pub async fn authorize(&self, command: &str) -> Result<(), AgentError> {
        let verdict = self.classifier.classify(command);
        tracing::info!(command = %command, verdict = ?verdict, "run_terminal classified");

        match verdict {
            SafetyVerdict::Allowed => Ok(()),
            SafetyVerdict::BlockedManual(ManualReason::Script) => {
                self.sink.emit(AgentEvent::ManualRun {
                    command: command.to_string(),
                });
                Err(AgentError::SafetyBlock(Self::manual_run_message(command)))
            }
            SafetyVerdict::BlockedManual(ManualReason::EnvMutation) => {
                Err(AgentError::SafetyBlock(format!(
                    "[SYSTEM]: Command '{}' must be run manually in the terminal.",
                    command
                )))
            }
            SafetyVerdict::BlockedInteractive { file, marker } => {
                self.sink.emit(AgentEvent::InteractiveStop {
                    file: file.clone(),
                    marker: marker.clone(),
                });
                Err(AgentError::SafetyBlock(format!(
                    "{} File '{}' requires user input ('{}'). Run it manually in a new session.",
                    INTERACTIVE_STOP_SENTINEL,
                    file.display(),
                    marker
                )))
            }
            SafetyVerdict::RequiresConfirmation => {
                if confirm(self.input.as_ref(), &format!("Allow execution of `{}`?", command)).await {
                    Ok(())
                } else {
                    tracing::info!(command = %command, "execution declined by user");
                    Err(AgentError::SafetyBlock(USER_DENIED.to_string()))
                }
            }
        }
    }

    fn manual_run_message(command: &str) -> String {
        format!(
            "{}\nSECURITY POLICY: scripts are never run automatically.\n\n\
             How to run it manually:\n\
             1. Open a new terminal session.\n\
             2. Type the following command:\n   {}\n",
            MANUAL_RUN_SENTINEL, command
        )
    }
}

#[async_trait]
impl Tool for RunTerminalTool {
    fn name(&self) -> &str {
        "run_terminal"
    }

    fn description(&self) -> &str {
        "Run a shell command. Args: {\"args\": \"command\"}. Scripts and interactive programs must be run manually by the user."
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let command = args
            .get("args")
            .and_then(|v| v.as_str())
            .or_else(|| args.get("command").and_then(|v| v.as_str()))
            .unwrap_or("")
            .trim()
            .to_string();
        if command.is_empty() {
            return Err("Missing command in `args`".to_string());
        }

        match self.authorize(&command).await {
            Ok(()) => Ok(self.runner.run(&command).await),
            Err(AgentError::SafetyBlock(reason)) => Ok(reason),
            Err(e) => Err(e.to_string()),
        }
    }
}
