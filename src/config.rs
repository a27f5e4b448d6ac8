//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `NEXUS__*` 覆盖（双下划线表示嵌套，如 `NEXUS__LLM__MODEL=...`）。
//! Shell 安全策略（解释器、脚本后缀、交互标记、白名单）全部以可审计的表形式放在 `[tools.shell]`。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::AgentError;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub tools: ToolsSection,
}

/// [app] 段：名称、工作目录、历史窗口、退出关键字
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    /// 工具的工作目录（相对文件名、子进程 cwd），未设置时为当前目录
    pub workspace_root: Option<PathBuf>,
    /// 发送给推理服务的最近历史条数
    pub history_window: usize,
    pub exit_keywords: Vec<String>,
    /// 凭据文件（{"api_key": "..."}）
    pub credentials_file: PathBuf,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "NEXUS".to_string(),
            workspace_root: None,
            history_window: 8,
            exit_keywords: vec!["exit".into(), "quit".into()],
            credentials_file: PathBuf::from("nexus_config.json"),
        }
    }
}

impl AppSection {
    pub fn workspace(&self) -> PathBuf {
        self.workspace_root
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// [llm] 段：OpenAI 兼容端点、模型、温度、超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
    /// 请求 JSON 模式（response_format = json_object），保证 Decision 可解析
    pub json_mode: bool,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.3,
            api_key: None,
            request_timeout_secs: 30,
            json_mode: true,
        }
    }
}

/// [tools] 段
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ToolsSection {
    pub shell: ShellSection,
    pub search: SearchSection,
}

/// [tools.shell] 段：安全策略表 + 执行参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShellSection {
    /// 首词为这些解释器且带参数时，一律要求手动执行
    pub interpreters: Vec<String>,
    /// 命令以这些后缀结尾时，一律要求手动执行
    pub script_extensions: Vec<String>,
    /// 修改当前 shell 环境的原语（在子进程中执行无效）
    pub env_primitives: Vec<String>,
    /// 扫描目标文件交互标记时识别的解释器
    pub scan_interpreters: Vec<String>,
    /// 阻塞读取 / 提示类标记
    pub interactive_markers: Vec<String>,
    /// 无需确认即可执行的命令前缀（按词匹配）
    pub allowed_prefixes: Vec<String>,
    /// 出现任一操作符时白名单不生效
    pub control_operators: Vec<String>,
    /// 可选 shell 路径（如 Termux 的 bash），不存在时回退到 sh
    pub shell_program: Option<PathBuf>,
    /// 实时输出窗口保留的行数
    pub live_window_lines: usize,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ShellSection {
    fn default() -> Self {
        Self {
            interpreters: strings(&[
                "python", "python3", "node", "bash", "sh", "zsh", "php", "perl", "ruby",
            ]),
            script_extensions: strings(&[".sh", ".py", ".js"]),
            env_primitives: strings(&["cd", "source", "."]),
            scan_interpreters: strings(&["python", "python3", "bash", "sh", "node"]),
            interactive_markers: strings(&[
                "input(",
                "raw_input(",
                "read ",
                "read -p",
                "Prompt.ask",
                "Confirm.ask",
            ]),
            allowed_prefixes: strings(&[
                "ls", "echo", "whoami", "pwd", "date", "neofetch", "clear", "cat", "grep",
                "head", "tail", "wc", "uname", "mkdir", "touch", "git status", "git log",
                "git diff", "git branch",
            ]),
            control_operators: strings(&[
                ";", "&&", "||", "|", "&", "`", "$(", ">", "<", "\n", "\r",
            ]),
            shell_program: Some(PathBuf::from("/data/data/com.termux/files/usr/bin/bash")),
            live_window_lines: 20,
        }
    }
}

/// [tools.search] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub endpoint: String,
    pub timeout_secs: u64,
    pub max_results: usize,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            endpoint: "https://www.google.com/search".to_string(),
            timeout_secs: 15,
            max_results: 3,
        }
    }
}

/// 从 config 目录加载配置，环境变量 NEXUS__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 NEXUS__*
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("NEXUS")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

/// 凭据文件内容
#[derive(Debug, Default, Serialize, Deserialize)]
struct Credentials {
    #[serde(default)]
    api_key: String,
}

/// 解析 API Key：配置 > GROQ_API_KEY > 凭据文件；都没有时返回 None，由调用方走交互式设置
pub fn resolve_api_key(cfg: &AppConfig) -> Option<String> {
    cfg.llm
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .or_else(|| std::env::var("GROQ_API_KEY").ok().filter(|k| !k.trim().is_empty()))
        .or_else(|| load_api_key(&cfg.app.credentials_file))
}

/// 读取凭据文件中的 api_key；文件缺失或损坏视为未配置
pub fn load_api_key(path: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(path).ok()?;
    let creds: Credentials = serde_json::from_str(&raw).ok()?;
    Some(creds.api_key).filter(|k| !k.trim().is_empty())
}

pub fn save_api_key(path: &Path, api_key: &str) -> Result<(), AgentError> {
    let creds = Credentials {
        api_key: api_key.trim().to_string(),
    };
    let body = serde_json::to_string(&creds).map_err(|e| AgentError::Config(e.to_string()))?;
    std::fs::write(path, body)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_policy_table() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.app.history_window, 8);
        assert_eq!(cfg.tools.shell.live_window_lines, 20);
        assert!(cfg.tools.shell.interpreters.iter().any(|i| i == "python"));
        assert!(cfg.tools.shell.interactive_markers.iter().any(|m| m == "input("));
        assert_eq!(cfg.tools.search.max_results, 3);
        assert!(cfg.llm.json_mode);
        for op in ["&", "\n", "\r"] {
            assert!(cfg.tools.shell.control_operators.iter().any(|o| o == op), "{op:?}");
        }
    }

    #[test]
    fn test_api_key_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nexus_config.json");
        assert!(load_api_key(&path).is_none());

        save_api_key(&path, "  gsk_test  ").unwrap();
        assert_eq!(load_api_key(&path).as_deref(), Some("gsk_test"));
    }

    #[test]
    fn test_corrupt_credentials_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nexus_config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_api_key(&path).is_none());
    }
}
