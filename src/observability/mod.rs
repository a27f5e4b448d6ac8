//! 可观测性：tracing 订阅器
//!
//! 日志写 stderr，避免与终端面板混排；默认只输出 warn，可用 RUST_LOG 覆盖（如 RUST_LOG=nexus=debug）。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
