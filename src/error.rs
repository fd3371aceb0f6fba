//! # 统一错误处理模块
//!
//! 定义 MeshRepair 的所有错误类型，使用 `thiserror` 派生。
//!
//! - `MeshRepairError`: 运行级错误（发现阶段失败会终止整个批处理）
//! - `ConversionError`: 格式转换适配器边界
//! - `RepairError`: 网格修复/校验适配器边界
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use std::path::PathBuf;
use thiserror::Error;

/// MeshRepair 统一错误类型
#[derive(Error, Debug)]
pub enum MeshRepairError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────
    // 文件发现错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to discover input files under {path}\nReason: {reason}")]
    DiscoveryError { path: String, reason: String },

    #[error("Input file format not supported for conversion to 3mf: {0}")]
    UnsupportedFormat(String),

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // CSV 错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// 转换适配器错误
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Converter not found at {}", .path.display())]
    ConverterNotFound { path: PathBuf },

    #[error("Failed to start converter {}: {source}", .path.display())]
    SpawnFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Converter exited with code {}", describe_exit_code(.code))]
    ExitStatus { code: Option<i32> },

    #[error("Converter I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// 修复/校验适配器错误
#[derive(Error, Debug)]
pub enum RepairError {
    #[error("Repair tool not found at {}", .path.display())]
    ToolNotFound { path: PathBuf },

    #[error("Failed to load model {}: {reason}", .path.display())]
    LoadFailed { path: PathBuf, reason: String },

    #[error("Verification failed: {0}")]
    VerifyFailed(String),

    #[error("Repair failed: {0}")]
    RepairFailed(String),

    #[error("Repair tool I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, MeshRepairError>;
