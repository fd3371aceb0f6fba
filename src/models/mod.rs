//! # 数据模型模块
//!
//! 定义批处理作业配置、单文件任务和处理结果的数据模型。
//!
//! ## 依赖关系
//! - 被 `batch/`, `pipeline/` 和 `commands/` 使用
//! - 子模块: job, task

pub mod job;
pub mod task;

pub use job::{JobSpec, LayoutPolicy, MeshFormat, RootKind};
pub use task::{Failure, FailureKind, FileTask, PipelineOutcome, Stage};
