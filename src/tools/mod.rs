//! 工具箱：安全分类、Shell 执行、文件写入、选择、搜索、时间，以及注册表与分发器

pub mod choice;
pub mod executor;
pub mod filesystem;
pub mod registry;
pub mod safety;
pub mod search;
pub mod shell;
pub mod time;

pub use choice::AskChoiceTool;
pub use executor::ToolExecutor;
pub use filesystem::{format_size, CreateFileTool, FileWriter, WrittenFile};
pub use registry::{Tool, ToolRegistry};
pub use safety::{ManualReason, SafetyClassifier, SafetyVerdict};
pub use search::{GoogleScraper, GoogleSearchTool, SearchProvider, SearchRecord};
pub use shell::{OutputCapture, RunTerminalTool, ShellRunner};
pub use time::TimeInfoTool;
