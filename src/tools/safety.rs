//! Shell 安全分类器
//!
//! 按固定顺序评估一条命令（顺序不可调换，后面的检查先跑并不安全）：
//! 1. 解释器 + 参数，或以脚本后缀结尾 -> BlockedManual（脚本）
//! 2. 以环境修改原语开头（cd / source / .）-> BlockedManual（环境）
//! 3. 目标是本地存在的文本文件（跳过二进制，只读开头一段）且含交互标记 -> BlockedInteractive
//! 4. 命中白名单前缀且不含控制操作符 -> Allowed
//! 5. 其它 -> RequiresConfirmation
//!
//! 所有表来自 [tools.shell] 配置。

use std::io::Read;
use std::path::{Path, PathBuf};

use crate::config::ShellSection;

/// 交互扫描最多读取的字节数
const MAX_SCAN_BYTES: u64 = 256 * 1024;

/// 在 sh -c 中总会串起另一条命令的字符，不受配置表影响
const COMMAND_SEPARATORS: [char; 5] = [';', '&', '|', '\n', '\r'];

/// 可执行文件头：ELF、Mach-O（32/64 位及字节序反转）、通用二进制
const BINARY_MAGICS: [&[u8]; 6] = [
    b"\x7fELF",
    &[0xfe, 0xed, 0xfa, 0xce],
    &[0xfe, 0xed, 0xfa, 0xcf],
    &[0xce, 0xfa, 0xed, 0xfe],
    &[0xcf, 0xfa, 0xed, 0xfe],
    &[0xca, 0xfe, 0xba, 0xbe],
];

/// 二进制文件不是脚本：有可执行文件头，或开头出现 NUL 字节
fn looks_binary(head: &[u8]) -> bool {
    BINARY_MAGICS.iter().any(|magic| head.starts_with(magic))
        || head.iter().take(8 * 1024).any(|b| *b == 0)
}

/// 手动执行的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualReason {
    /// 脚本绝不自动执行
    Script,
    /// 在子进程里改环境没有效果
    EnvMutation,
}

/// 分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafetyVerdict {
    Allowed,
    RequiresConfirmation,
    BlockedManual(ManualReason),
    BlockedInteractive { file: PathBuf, marker: String },
}

/// 安全策略：持有配置表与解析相对路径用的工作目录
#[derive(Debug, Clone)]
pub struct SafetyClassifier {
    policy: ShellSection,
    workspace: PathBuf,
}

/// 按 shell 引号规则分词，引号不配对时退回空白分词
fn tokenize(command: &str) -> Vec<String> {
    shell_words::split(command)
        .unwrap_or_else(|_| command.split_whitespace().map(str::to_string).collect())
}

impl SafetyClassifier {
    pub fn new(policy: ShellSection, workspace: impl AsRef<Path>) -> Self {
        Self {
            policy,
            workspace: workspace.as_ref().to_path_buf(),
        }
    }

    pub fn classify(&self, command: &str) -> SafetyVerdict {
        let command = command.trim();
        let tokens = tokenize(command);

        if self.is_script(command, &tokens) {
            return SafetyVerdict::BlockedManual(ManualReason::Script);
        }
        if self.mutates_environment(&tokens) {
            return SafetyVerdict::BlockedManual(ManualReason::EnvMutation);
        }
        if let Some((file, marker)) = self.scan_for_interactivity(&tokens) {
            return SafetyVerdict::BlockedInteractive { file, marker };
        }
        if self.is_allowed(command, &tokens) {
            return SafetyVerdict::Allowed;
        }
        SafetyVerdict::RequiresConfirmation
    }

    fn is_script(&self, command: &str, tokens: &[String]) -> bool {
        let interpreter_call = tokens.len() >= 2
            && self.policy.interpreters.iter().any(|i| i == &tokens[0]);
        interpreter_call
            || self
                .policy
                .script_extensions
                .iter()
                .any(|ext| command.ends_with(ext.as_str()))
    }

    fn mutates_environment(&self, tokens: &[String]) -> bool {
        tokens
            .first()
            .is_some_and(|first| self.policy.env_primitives.iter().any(|p| p == first))
    }

    /// 找出命令要运行的本地文件：扫描解释器后的第一个参数，或本身就是路径的首词（./tool）
    fn target_file(&self, tokens: &[String]) -> Option<PathBuf> {
        let first = tokens.first()?;
        let candidate = if self.policy.scan_interpreters.iter().any(|i| i == first) {
            tokens.get(1)?
        } else if first.contains('/') {
            first
        } else {
            return None;
        };
        let path = self.workspace.join(candidate);
        path.is_file().then_some(path)
    }

    fn scan_for_interactivity(&self, tokens: &[String]) -> Option<(PathBuf, String)> {
        let file = self.target_file(tokens)?;
        let mut bytes = Vec::new();
        let read = std::fs::File::open(&file)
            .and_then(|f| f.take(MAX_SCAN_BYTES).read_to_end(&mut bytes));
        if let Err(e) = read {
            tracing::debug!(file = %file.display(), error = %e, "interactivity scan skipped");
            return None;
        }
        if looks_binary(&bytes) {
            tracing::debug!(file = %file.display(), "binary target, interactivity scan skipped");
            return None;
        }
        let content = String::from_utf8_lossy(&bytes);
        self.policy
            .interactive_markers
            .iter()
            .find(|marker| content.contains(marker.as_str()))
            .map(|marker| (file, marker.clone()))
    }

    fn is_allowed(&self, command: &str, tokens: &[String]) -> bool {
        if command.contains(&COMMAND_SEPARATORS[..]) {
            return false;
        }
        if self
            .policy
            .control_operators
            .iter()
            .any(|op| command.contains(op.as_str()))
        {
            return false;
        }
        self.policy.allowed_prefixes.iter().any(|prefix| {
            let prefix_tokens: Vec<&str> = prefix.split_whitespace().collect();
            !prefix_tokens.is_empty()
                && tokens.len() >= prefix_tokens.len()
                && prefix_tokens.iter().zip(tokens).all(|(p, t)| *p == t.as_str())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier(dir: &Path) -> SafetyClassifier {
        SafetyClassifier::new(ShellSection::default(), dir)
    }

    #[test]
    fn test_interpreter_and_extension_are_manual() {
        let c = classifier(Path::new("."));
        for cmd in ["python app.py", "node server.js", "./deploy.sh", "ls run.py"] {
            assert_eq!(
                c.classify(cmd),
                SafetyVerdict::BlockedManual(ManualReason::Script),
                "{cmd}"
            );
        }
    }

    #[test]
    fn test_env_primitives_are_manual() {
        let c = classifier(Path::new("."));
        for cmd in ["cd /tmp", "source venv/bin/activate", ". ./env"] {
            assert_eq!(
                c.classify(cmd),
                SafetyVerdict::BlockedManual(ManualReason::EnvMutation),
                "{cmd}"
            );
        }
    }

    #[test]
    fn test_interactive_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("ask");
        std::fs::write(&script, "#!/bin/sh\nread -p 'name? ' NAME\necho $NAME\n").unwrap();
        let c = classifier(dir.path());

        match c.classify("./ask") {
            SafetyVerdict::BlockedInteractive { file, marker } => {
                assert_eq!(file, dir.path().join("./ask"));
                assert_eq!(marker, "read ");
            }
            other => panic!("expected interactive block, got {:?}", other),
        }
    }

    #[test]
    fn test_scan_interpreter_reaches_scan_when_not_manual() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("quiz.rb"), "x = input(\"?\")").unwrap();
        let policy = ShellSection {
            interpreters: vec![],
            scan_interpreters: vec!["ruby".into()],
            ..ShellSection::default()
        };
        let c = SafetyClassifier::new(policy, dir.path());
        assert!(matches!(
            c.classify("ruby quiz.rb"),
            SafetyVerdict::BlockedInteractive { ref marker, .. } if marker == "input("
        ));
    }

    #[test]
    fn test_script_check_precedes_scan() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("game.py"), "name = input('?')").unwrap();
        let c = classifier(dir.path());
        assert_eq!(
            c.classify("python game.py"),
            SafetyVerdict::BlockedManual(ManualReason::Script)
        );
    }

    #[test]
    fn test_allow_list_by_token_prefix() {
        let c = classifier(Path::new("."));
        assert_eq!(c.classify("ls -la"), SafetyVerdict::Allowed);
        assert_eq!(c.classify("git status -s"), SafetyVerdict::Allowed);
        assert_eq!(c.classify("echo \"hello world\""), SafetyVerdict::Allowed);
        assert_eq!(c.classify("lsblk"), SafetyVerdict::RequiresConfirmation);
        assert_eq!(c.classify("git push"), SafetyVerdict::RequiresConfirmation);
    }

    #[test]
    fn test_control_operators_need_confirmation() {
        let c = classifier(Path::new("."));
        assert_eq!(c.classify("ls; rm -rf ~"), SafetyVerdict::RequiresConfirmation);
        assert_eq!(c.classify("cat a | sh"), SafetyVerdict::RequiresConfirmation);
        assert_eq!(c.classify("echo $(whoami)"), SafetyVerdict::RequiresConfirmation);
        assert_eq!(c.classify("echo x > f"), SafetyVerdict::RequiresConfirmation);
    }

    #[test]
    fn test_background_and_newline_chaining_need_confirmation() {
        let c = classifier(Path::new("."));
        assert_eq!(c.classify("ls & rm victim.txt"), SafetyVerdict::RequiresConfirmation);
        assert_eq!(c.classify("ls\nrm victim.txt"), SafetyVerdict::RequiresConfirmation);
        assert_eq!(c.classify("ls\r\nrm victim.txt"), SafetyVerdict::RequiresConfirmation);
    }

    #[test]
    fn test_separators_checked_even_without_policy_operators() {
        let policy = ShellSection {
            control_operators: vec![],
            ..ShellSection::default()
        };
        let c = SafetyClassifier::new(policy, Path::new("."));
        assert_eq!(c.classify("ls & rm victim.txt"), SafetyVerdict::RequiresConfirmation);
        assert_eq!(c.classify("echo a; rm b"), SafetyVerdict::RequiresConfirmation);
    }

    #[test]
    fn test_binary_targets_are_not_scanned() {
        let dir = tempfile::tempdir().unwrap();
        let mut elf = b"\x7fELF\x02\x01\x01".to_vec();
        elf.extend_from_slice(b"read input( ");
        std::fs::write(dir.path().join("tool"), &elf).unwrap();
        let mut nul = b"header\0".to_vec();
        nul.extend_from_slice(b"read -p ");
        std::fs::write(dir.path().join("blob"), &nul).unwrap();

        let policy = ShellSection {
            allowed_prefixes: vec!["./tool".into(), "./blob".into()],
            ..ShellSection::default()
        };
        let c = SafetyClassifier::new(policy, dir.path());
        assert_eq!(c.classify("./tool --help"), SafetyVerdict::Allowed);
        assert_eq!(c.classify("./blob"), SafetyVerdict::Allowed);
    }

    #[cfg(unix)]
    #[test]
    fn test_system_binary_by_absolute_path() {
        let c = classifier(Path::new("."));
        if Path::new("/bin/ls").is_file() {
            assert_eq!(c.classify("/bin/ls -la"), SafetyVerdict::RequiresConfirmation);
        }
    }

    #[test]
    fn test_scan_reads_bounded_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let mut body = "#!/bin/sh\n".to_string();
        body.push_str(&"echo filler\n".repeat((MAX_SCAN_BYTES as usize / 12) + 10));
        body.push_str("read -p 'late? ' X\n");
        std::fs::write(dir.path().join("long"), body).unwrap();
        let c = classifier(dir.path());
        assert_eq!(c.classify("./long"), SafetyVerdict::RequiresConfirmation);
    }

    #[test]
    fn test_interpreter_with_flag_is_manual() {
        let c = classifier(Path::new("."));
        for cmd in ["python --version", "node -v", "bash -c 'ls'"] {
            assert_eq!(
                c.classify(cmd),
                SafetyVerdict::BlockedManual(ManualReason::Script),
                "{cmd}"
            );
        }
        // 单独的解释器名不算脚本调用
        assert_eq!(c.classify("python"), SafetyVerdict::RequiresConfirmation);
    }

    #[test]
    fn test_unknown_commands_need_confirmation() {
        let c = classifier(Path::new("."));
        assert_eq!(c.classify("rm -rf build"), SafetyVerdict::RequiresConfirmation);
        assert_eq!(c.classify("apt install htop"), SafetyVerdict::RequiresConfirmation);
    }

    #[test]
    fn test_unbalanced_quotes_fall_back() {
        let c = classifier(Path::new("."));
        assert_eq!(c.classify("echo 'oops"), SafetyVerdict::Allowed);
    }
}
