//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数。
//!
//! 参数沿用 `--name=value` 形式的驼峰命名：
//! `--inputFilePath`, `--outputFilePath`, `--cloneFolderHierarchy`, `--timeoutSeconds`
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: repair

pub mod repair;

use clap::Parser;

/// MeshRepair - 3D 打印网格批量转换与修复工具
#[derive(Parser, Debug)]
#[command(name = "meshrepair")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(
    about = "Batch-convert mesh files (STL/STEP/OBJ/AMF/3MF) to 3MF and repair mesh defects",
    long_about = None
)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(flatten)]
    pub repair: repair::RepairArgs,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}
