//! # 修复参数定义
//!
//! 批量转换并修复网格文件
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/repair.rs`

use crate::models::job::DEFAULT_TIMEOUT_SECS;

use clap::{ArgAction, Args};
use std::path::PathBuf;

/// 修复参数
#[derive(Args, Debug)]
pub struct RepairArgs {
    /// Path to an individual model or a folder of models to repair
    #[arg(long = "inputFilePath", value_name = "PATH")]
    pub input_file_path: PathBuf,

    /// Folder for the repaired files (or the exact .3mf target for a single input)
    #[arg(long = "outputFilePath", value_name = "PATH")]
    pub output_file_path: Option<PathBuf>,

    /// When processing a folder, clone its hierarchy under the output folder
    #[arg(
        long = "cloneFolderHierarchy",
        value_name = "BOOL",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub clone_folder_hierarchy: bool,

    /// How long to repair a model before giving up, in seconds
    #[arg(
        long = "timeoutSeconds",
        value_name = "SECONDS",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_seconds: u64,

    /// Write a per-file CSV report (source, target, outcome, reason)
    #[arg(long = "report", value_name = "CSV")]
    pub report: Option<PathBuf>,

    // ─────────────────────────────────────────────────────────────
    // External tools
    // ─────────────────────────────────────────────────────────────
    /// Converter executable [default: <install dir>/PrusaSlicer/prusa-slicer]
    #[arg(long = "converterPath", value_name = "PATH", env = "MESHREPAIR_CONVERTER")]
    pub converter_path: Option<PathBuf>,

    /// Repair engine executable [default: <install dir>/MeshRepairEngine/mesh-repair-engine]
    #[arg(long = "repairToolPath", value_name = "PATH", env = "MESHREPAIR_REPAIR_TOOL")]
    pub repair_tool_path: Option<PathBuf>,
}
