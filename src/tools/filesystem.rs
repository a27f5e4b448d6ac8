//! create_file：以 UTF-8 覆盖写入文件
//!
//! 相对文件名基于工作目录解析；返回字节数与绝对路径。I/O 失败（权限、非法路径）转为错误文本。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::AgentError;
use crate::react::{AgentEvent, EventSink};
use crate::tools::Tool;

/// 写入结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub size_bytes: usize,
}

/// 人类可读大小：超过 1024 字节用 KB
pub fn format_size(size_bytes: usize) -> String {
    if size_bytes > 1024 {
        format!("{:.2} KB", size_bytes as f64 / 1024.0)
    } else {
        format!("{} Bytes", size_bytes)
    }
}

/// 文件写入器：绑定工作目录
#[derive(Debug, Clone)]
pub struct FileWriter {
    root_dir: PathBuf,
}

impl FileWriter {
    pub fn new(root_dir: impl AsRef<Path>) -> Self {
        Self {
            root_dir: root_dir.as_ref().to_path_buf(),
        }
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<WrittenFile, AgentError> {
        let target = self.root_dir.join(filename);
        std::fs::write(&target, content.as_bytes())?;
        let path = target.canonicalize()?;
        Ok(WrittenFile {
            path,
            size_bytes: content.len(),
        })
    }
}

/// create_file 工具
pub struct CreateFileTool {
    writer: FileWriter,
    sink: Arc<dyn EventSink>,
}

impl CreateFileTool {
    pub fn new(root_dir: impl AsRef<Path>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            writer: FileWriter::new(root_dir),
            sink,
        }
    }
}

#[async_trait]
impl Tool for CreateFileTool {
    fn name(&self) -> &str {
        "create_file"
    }

    fn description(&self) -> &str {
        "Create or overwrite a file. Args: {\"filename\": \"path\", \"content\": \"text\"}"
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let filename = args
            .get("filename")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .ok_or("Missing required parameter: filename")?;
        let content = args
            .get("content")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        tracing::info!(filename = %filename, bytes = content.len(), "create_file execute");
        let written = self
            .writer
            .write(filename, content)
            .map_err(|e| format!("Failed to write '{}': {}", filename, e))?;

        self.sink.emit(AgentEvent::FileCreated {
            name: filename.to_string(),
            size_bytes: written.size_bytes,
            path: written.path.clone(),
        });

        Ok(format!(
            "File '{}' created at {} ({} bytes).",
            filename,
            written.path.display(),
            written.size_bytes
        ))
    }
}
