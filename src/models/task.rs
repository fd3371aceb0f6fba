//! # 单文件任务与处理结果模型
//!
//! `FileTask` 记录一个待处理文件的源/目标路径和当前流水线阶段，
//! `PipelineOutcome` 是流水线对该文件给出的唯一结果。
//!
//! ## 依赖关系
//! - 被 `batch/runner.rs`, `pipeline/file.rs` 使用
//! - 使用 `models/job.rs`

use super::job::MeshFormat;

use std::path::{Path, PathBuf};

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Discovered,
    Converting,
    VerifyingPre,
    Repairing,
    VerifyingPost,
    Committing,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Discovered => write!(f, "discovered"),
            Stage::Converting => write!(f, "converting"),
            Stage::VerifyingPre => write!(f, "verifying (pre-repair)"),
            Stage::Repairing => write!(f, "repairing"),
            Stage::VerifyingPost => write!(f, "verifying (post-repair)"),
            Stage::Committing => write!(f, "committing"),
            Stage::Done => write!(f, "done"),
        }
    }
}

/// 单个输入文件的处理任务
///
/// 由批处理驱动在发现阶段创建，处理期间归流水线独占。
#[derive(Debug)]
pub struct FileTask {
    source: PathBuf,
    target: PathBuf,
    format: MeshFormat,
    stage: Stage,
}

impl FileTask {
    pub fn new(source: PathBuf, target: PathBuf, format: MeshFormat) -> Self {
        Self {
            source,
            target,
            format,
            stage: Stage::Discovered,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn format(&self) -> MeshFormat {
        self.format
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub(crate) fn advance(&mut self, stage: Stage) {
        tracing::debug!(
            source = %self.source.display(),
            from = %self.stage,
            to = %stage,
            "stage transition"
        );
        self.stage = stage;
    }
}

/// 失败原因分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 转换工具缺失、启动失败或非零退出
    ConversionFailed,
    /// 转换后目标文件不存在
    MissingOutput,
    /// 修复引擎无法加载 3MF
    LoadFailed,
    /// 修复前校验时引擎出错
    VerifyFailed,
    /// 修复操作报告非完成状态
    RepairFailed,
    /// 修复超时并已取消
    Timeout,
    /// 修复后仍未通过校验
    VerifyAfterRepairFailed,
    /// 原子写入失败
    WriteFailed,
    /// 与本次运行中更早的文件映射到同一目标路径
    TargetCollision,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureKind::ConversionFailed => "ConversionFailed",
            FailureKind::MissingOutput => "MissingOutput",
            FailureKind::LoadFailed => "LoadFailed",
            FailureKind::VerifyFailed => "VerifyFailed",
            FailureKind::RepairFailed => "RepairFailed",
            FailureKind::Timeout => "Timeout",
            FailureKind::VerifyAfterRepairFailed => "VerifyAfterRepairFailed",
            FailureKind::WriteFailed => "WriteFailed",
            FailureKind::TargetCollision => "TargetCollision",
        };
        write!(f, "{}", name)
    }
}

/// 失败详情
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub reason: String,
}

impl Failure {
    pub fn new(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.reason)
    }
}

/// 单文件流水线结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// 首次校验即通过，未修复
    Skipped,
    /// 经过完整修复并写回
    Repaired,
    /// 处理失败
    Failed(Failure),
}

impl PipelineOutcome {
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            PipelineOutcome::Failed(failure) => Some(failure.kind),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PipelineOutcome::Skipped => "skipped",
            PipelineOutcome::Repaired => "repaired",
            PipelineOutcome::Failed(_) => "failed",
        }
    }
}
