//! # 外部能力适配器模块
//!
//! 包装两个黑盒协作者：格式转换工具和网格修复/校验引擎。
//! 所有底层错误在适配器边界转换为带类型的 `Result`。
//!
//! ## 依赖关系
//! - 被 `pipeline/` 和 `commands/` 使用
//! - 使用 `error.rs`
//! - 子模块: converter, repair

pub mod converter;
pub mod repair;

pub use converter::{MeshConverter, SlicerConverter};
pub use repair::{verify_all, ExternalRepairTool, MeshRepairer, RepairStatus};

use std::path::PathBuf;

/// 子进程输出流
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// 外部工具诊断输出的逐行接收端
pub trait DiagnosticSink: Send + Sync {
    fn line(&self, stream: StreamKind, line: &str);
}

impl<F> DiagnosticSink for F
where
    F: Fn(StreamKind, &str) + Send + Sync,
{
    fn line(&self, stream: StreamKind, line: &str) {
        self(stream, line)
    }
}

/// 程序所在目录（无法确定时为当前目录）
pub fn install_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// 安装目录下 `<dir>/<name>[.exe]` 形式的工具路径
pub fn default_tool_path(dir: &str, name: &str) -> PathBuf {
    install_dir()
        .join(dir)
        .join(format!("{}{}", name, std::env::consts::EXE_SUFFIX))
}
