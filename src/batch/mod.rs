//! # 批量处理模块
//!
//! 发现待处理文件并逐个执行单文件流水线。
//!
//! ## 功能
//! - 自动检测输入类型（文件/目录）
//! - 收集支持格式的文件列表
//! - 顺序处理，单个失败不中断
//! - 结果统计与报告导出
//!
//! ## 依赖关系
//! - 被 `commands/repair.rs` 使用
//! - 使用 `walkdir` 遍历目录
//! - 使用 `pipeline/` 处理单个文件

pub mod collector;
pub mod runner;

pub use runner::{BatchReport, BatchRunner};
