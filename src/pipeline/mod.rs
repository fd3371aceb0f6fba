//! # 单文件处理流水线模块
//!
//! 路径解析、转换/校验/修复状态机和原子写入。
//!
//! ## 依赖关系
//! - 被 `batch/runner.rs` 使用
//! - 使用 `engines/`, `models/`
//! - 子模块: resolver, file, writer

pub mod file;
pub mod resolver;
pub mod writer;

#[cfg(test)]
pub(crate) mod testing;

pub use file::FilePipeline;
pub use resolver::PathResolver;
