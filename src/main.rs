//! # MeshRepair - 3D 打印网格批量转换与修复工具
//!
//! 发现网格文件（STL/STEP/OBJ/AMF/3MF），通过外部切片工具转换为 3MF，
//! 再调用外部修复引擎校验并修复拓扑缺陷，原子写回结果。
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     └── batch/      (文件发现与批处理驱动)
//!   │           └── pipeline/  (路径解析、单文件状态机、原子写入)
//!   │                 └── engines/  (转换/修复适配器)
//!   ├── models/     (数据模型)
//!   ├── utils/      (输出、进度、日志)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod engines;
mod error;
mod models;
mod pipeline;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();
    utils::logging::init(cli.verbose);

    if let Err(e) = commands::run(cli) {
        utils::output::print_error(&format!("{}", e));
        utils::output::print_error("Fatal error, exiting.");
        std::process::exit(1);
    }
}
