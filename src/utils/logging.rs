//! # 日志初始化
//!
//! `tracing` 诊断日志输出到 stderr，与彩色控制台输出分开。
//! `RUST_LOG` 优先，其次 `--verbose`（debug），默认 warn。
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 使用 `tracing-subscriber` crate

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 初始化全局 tracing subscriber（重复调用时忽略）
pub fn init(verbose: bool) {
    let default_level = if verbose { "meshrepair=debug" } else { "warn" };

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
