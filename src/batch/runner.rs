//! # 批处理驱动
//!
//! 按发现顺序逐个执行单文件流水线，汇总结果。
//!
//! ## 功能
//! - 发现失败（根路径无效、格式不支持）立即终止整个运行
//! - 单个文件失败不影响后续文件
//! - 每个发现的文件恰好记录一个结果
//! - 可选导出 CSV 报告
//!
//! ## 依赖关系
//! - 被 `commands/repair.rs` 调用
//! - 使用 `batch/collector.rs`, `pipeline/`
//! - 使用 `csv`, `serde` 导出报告

use super::collector::FileCollector;
use crate::engines::{DiagnosticSink, MeshConverter, MeshRepairer};
use crate::error::{MeshRepairError, Result};
use crate::models::{Failure, FailureKind, FileTask, JobSpec, PipelineOutcome, RootKind};
use crate::pipeline::{FilePipeline, PathResolver};
use crate::utils::output;

use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// 单个文件的处理记录
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub source: PathBuf,
    pub target: PathBuf,
    pub outcome: PipelineOutcome,
}

/// CSV 报告行
#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    source: String,
    target: String,
    outcome: &'a str,
    reason: String,
}

/// 批处理结果统计
#[derive(Debug, Default)]
pub struct BatchReport {
    /// 按发现顺序排列的处理记录
    pub records: Vec<FileRecord>,
    /// 跳过数量（首次校验即有效）
    pub skipped: usize,
    /// 修复数量
    pub repaired: usize,
    /// 失败数量
    pub failed: usize,
    /// 总耗时
    pub elapsed: Duration,
}

impl BatchReport {
    /// 合并处理结果
    pub fn merge(&mut self, source: PathBuf, target: PathBuf, outcome: PipelineOutcome) {
        match &outcome {
            PipelineOutcome::Skipped => self.skipped += 1,
            PipelineOutcome::Repaired => self.repaired += 1,
            PipelineOutcome::Failed(_) => self.failed += 1,
        }
        self.records.push(FileRecord {
            source,
            target,
            outcome,
        });
    }

    /// 总处理数量
    pub fn processed(&self) -> usize {
        self.skipped + self.repaired + self.failed
    }

    /// 成功数量（跳过和修复都算成功）
    pub fn succeeded(&self) -> usize {
        self.skipped + self.repaired
    }

    /// 失败的目标路径及原因，按发现顺序
    pub fn failures(&self) -> Vec<(&Path, &Failure)> {
        self.records
            .iter()
            .filter_map(|r| match &r.outcome {
                PipelineOutcome::Failed(failure) => Some((r.target.as_path(), failure)),
                _ => None,
            })
            .collect()
    }

    /// 写出逐文件 CSV 报告
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for record in &self.records {
            let reason = match &record.outcome {
                PipelineOutcome::Failed(failure) => failure.to_string(),
                _ => String::new(),
            };
            writer.serialize(ReportRow {
                source: record.source.display().to_string(),
                target: record.target.display().to_string(),
                outcome: record.outcome.label(),
                reason,
            })?;
        }
        writer.flush().map_err(|e| MeshRepairError::FileWriteError {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(())
    }
}

/// 批处理驱动
pub struct BatchRunner<'a, C: ?Sized, R> {
    job: &'a JobSpec,
    converter: &'a C,
    repairer: &'a R,
    sink: &'a dyn DiagnosticSink,
}

impl<'a, C, R> BatchRunner<'a, C, R>
where
    C: MeshConverter + ?Sized,
    R: MeshRepairer,
{
    pub fn new(
        job: &'a JobSpec,
        converter: &'a C,
        repairer: &'a R,
        sink: &'a dyn DiagnosticSink,
    ) -> Self {
        Self {
            job,
            converter,
            repairer,
            sink,
        }
    }

    /// 执行整个批处理
    ///
    /// 只有发现阶段的错误会返回 `Err`，单文件失败记录在报告中。
    pub async fn run(&self) -> Result<BatchReport> {
        let started = Instant::now();

        let discovery = FileCollector::new(self.job).collect()?;
        tracing::debug!(files = ?discovery.paths(), "discovery complete");
        if discovery.root_kind == RootKind::Directory {
            output::print_info(&format!(
                "Found {} files for conversion/repair.",
                discovery.files.len()
            ));
        }

        let resolver = PathResolver::new(self.job, discovery.root_kind);
        let pipeline = FilePipeline::new(self.job, self.converter, self.repairer, self.sink);

        let mut report = BatchReport::default();
        let mut claimed_targets: HashSet<PathBuf> = HashSet::new();

        for file in &discovery.files {
            output::print_file_banner(&file.path.display().to_string());

            let target = resolver.resolve(&file.path);
            let outcome = if claimed_targets.insert(target.clone()) {
                let mut task = FileTask::new(file.path.clone(), target.clone(), file.format);
                pipeline.run(&mut task).await
            } else {
                let failure = Failure::new(
                    FailureKind::TargetCollision,
                    format!(
                        "{} was already produced from another input in this run",
                        target.display()
                    ),
                );
                output::print_error(&format!("\t{}", failure));
                PipelineOutcome::Failed(failure)
            };

            tracing::info!(
                source = %file.path.display(),
                format = %file.format,
                target = %target.display(),
                outcome = outcome.label(),
                kind = ?outcome.failure_kind(),
                "file processed"
            );
            report.merge(file.path.clone(), target, outcome);
        }

        report.elapsed = started.elapsed();
        Ok(report)
    }
}
