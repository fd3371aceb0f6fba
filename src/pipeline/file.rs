//! # 单文件流水线
//!
//! 对一个文件依次执行 转换 → 修复前校验 → 修复（限时）→ 修复后校验 → 原子提交。
//!
//! ```text
//! Discovered → Converting → VerifyingPre → {Skipped | Repairing}
//!            → VerifyingPost → {Committing | Failed} → Done
//! ```
//!
//! 所有错误都在这里转换为 `PipelineOutcome::Failed`，不会传播到批处理驱动。
//!
//! ## 依赖关系
//! - 被 `batch/runner.rs` 使用
//! - 使用 `engines/`, `pipeline/resolver.rs`, `pipeline/writer.rs`
//! - 使用 `utils/output.rs`, `utils/progress.rs`

use super::resolver::ensure_target_dir;
use super::writer;
use crate::engines::{verify_all, DiagnosticSink, MeshConverter, MeshRepairer, RepairStatus};
use crate::models::{Failure, FailureKind, FileTask, JobSpec, PipelineOutcome, Stage};
use crate::utils::{output, progress};

use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// 单文件流水线
pub struct FilePipeline<'a, C: ?Sized, R> {
    job: &'a JobSpec,
    converter: &'a C,
    repairer: &'a R,
    sink: &'a dyn DiagnosticSink,
}

impl<'a, C, R> FilePipeline<'a, C, R>
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

    /// 处理一个文件，恰好产生一个结果
    pub async fn run(&self, task: &mut FileTask) -> PipelineOutcome {
        let outcome = match self.execute(task).await {
            Ok(outcome) => outcome,
            Err(failure) => {
                tracing::warn!(
                    source = %task.source().display(),
                    stage = %task.stage(),
                    kind = %failure.kind,
                    "{}",
                    failure.reason
                );
                output::print_error(&format!("\t{}", failure));
                PipelineOutcome::Failed(failure)
            }
        };
        task.advance(Stage::Done);
        outcome
    }

    async fn execute(&self, task: &mut FileTask) -> Result<PipelineOutcome, Failure> {
        ensure_target_dir(task.target()).map_err(|e| {
            Failure::new(
                FailureKind::WriteFailed,
                format!("cannot create output directory: {}", e),
            )
        })?;

        let working = self.convert_if_needed(task).await?;

        if !working.is_file() {
            return Err(Failure::new(
                FailureKind::MissingOutput,
                format!("can't find file {}", working.display()),
            ));
        }

        let mut model = self
            .repairer
            .load(&working)
            .await
            .map_err(|e| Failure::new(FailureKind::LoadFailed, e.to_string()))?;

        // 修复前校验
        task.advance(Stage::VerifyingPre);
        let valid = verify_all(self.repairer, &model)
            .await
            .map_err(|e| Failure::new(FailureKind::VerifyFailed, e.to_string()))?;
        if valid {
            output::print_skip("\tMesh verified with no errors, skipping repair");
            return Ok(PipelineOutcome::Skipped);
        }
        output::print_warning("\tFound errors - proceeding with repair");

        task.advance(Stage::Repairing);
        self.repair_with_timeout(&mut model).await?;

        // 修复后校验；失败时不写回，保留修复前的文件
        task.advance(Stage::VerifyingPost);
        let repaired = verify_all(self.repairer, &model).await.map_err(|e| {
            Failure::new(FailureKind::VerifyAfterRepairFailed, e.to_string())
        })?;
        if !repaired {
            return Err(Failure::new(
                FailureKind::VerifyAfterRepairFailed,
                "failed to verify mesh after repair, not saving",
            ));
        }
        output::print_success("\tVerification successful");

        task.advance(Stage::Committing);
        self.commit(&model, task.target()).await?;
        output::print_success(&format!("\tSaved {}", task.target().display()));

        Ok(PipelineOutcome::Repaired)
    }

    /// 需要时调用转换器，返回后续步骤使用的 3MF 路径
    async fn convert_if_needed(&self, task: &mut FileTask) -> Result<PathBuf, Failure> {
        if !needs_conversion(task) {
            output::print_info("\tInput file is already a 3mf file, proceeding to repair step.");
            return Ok(task.source().to_path_buf());
        }

        if task.format().is_native() {
            output::print_info("\tInput file is already a 3mf file, copying to specified output path");
        }

        task.advance(Stage::Converting);
        self.converter
            .convert(task.source(), task.target(), self.sink)
            .await
            .map_err(|e| Failure::new(FailureKind::ConversionFailed, e.to_string()))?;

        output::print_conversion(
            &task.source().display().to_string(),
            &task.target().display().to_string(),
        );
        Ok(task.target().to_path_buf())
    }

    /// 修复与超时计时器竞争，先结束的一方胜出
    ///
    /// 无论哪一方胜出，取消信号都会发出一次。
    async fn repair_with_timeout(&self, model: &mut R::Model) -> Result<(), Failure> {
        let timeout = self.job.repair_timeout();
        let cancel = CancellationToken::new();
        let spinner = progress::create_spinner("Repairing mesh...");

        let finished = tokio::select! {
            result = self.repairer.repair(model, cancel.clone()) => Some(result),
            _ = tokio::time::sleep(timeout) => None,
        };
        cancel.cancel();
        spinner.finish_and_clear();

        match finished {
            Some(Ok(RepairStatus::Completed)) => {
                output::print_success("\tFinished repair.");
                Ok(())
            }
            Some(Ok(RepairStatus::Cancelled)) => Err(Failure::new(
                FailureKind::RepairFailed,
                "repair operation reported cancellation",
            )),
            Some(Err(e)) => Err(Failure::new(FailureKind::RepairFailed, e.to_string())),
            None => Err(Failure::new(
                FailureKind::Timeout,
                format!(
                    "repair exceeded timeout of {}s, cancelled",
                    timeout.as_secs_f64()
                ),
            )),
        }
    }

    async fn commit(&self, model: &R::Model, target: &Path) -> Result<(), Failure> {
        let bytes = self
            .repairer
            .export(model)
            .await
            .map_err(|e| Failure::new(FailureKind::WriteFailed, e.to_string()))?;

        let target = target.to_path_buf();
        tokio::task::spawn_blocking(move || writer::commit_atomically(&bytes, &target))
            .await
            .map_err(|e| Failure::new(FailureKind::WriteFailed, e.to_string()))?
            .map_err(|e| Failure::new(FailureKind::WriteFailed, e.to_string()))
    }
}

/// 源文件是否需要经过转换器
pub fn needs_conversion(task: &FileTask) -> bool {
    !task.format().is_native() || task.source() != task.target()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LayoutPolicy, MeshFormat};
    use crate::pipeline::testing::{
        ConvertBehavior, FakeConverter, FakeRepairer, NullSink, RepairBehavior,
    };
    use crate::pipeline::writer::temp_path_for;
    use std::fs;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn job(root: &Path, timeout: Duration) -> JobSpec {
        JobSpec::new(
            root.to_path_buf(),
            None,
            LayoutPolicy::MirrorHierarchy,
            timeout,
        )
        .unwrap()
    }

    async fn run_one(
        job: &JobSpec,
        converter: &FakeConverter,
        repairer: &FakeRepairer,
        task: &mut FileTask,
    ) -> PipelineOutcome {
        FilePipeline::new(job, converter, repairer, &NullSink)
            .run(task)
            .await
    }

    #[tokio::test]
    async fn test_convertible_defective_file_is_repaired() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.stl");
        fs::write(&source, b"defective").unwrap();
        let target = temp.path().join("out/a.3mf");

        let job = job(temp.path(), Duration::from_secs(5));
        let converter = FakeConverter::new(ConvertBehavior::Copy);
        let repairer = FakeRepairer::new(RepairBehavior::Fix);
        let mut task = FileTask::new(source.clone(), target.clone(), MeshFormat::Stl);

        let outcome = run_one(&job, &converter, &repairer, &mut task).await;

        assert_eq!(outcome, PipelineOutcome::Repaired);
        assert_eq!(task.stage(), Stage::Done);
        assert_eq!(converter.calls(), 1);
        assert_eq!(fs::read(&target).unwrap(), b"repaired");
        assert_eq!(fs::read(&source).unwrap(), b"defective");
        assert!(!temp_path_for(&target).exists());
    }

    #[tokio::test]
    async fn test_valid_native_file_in_place_is_skipped_without_conversion() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("b.3mf");
        fs::write(&source, b"valid package").unwrap();

        let job = job(temp.path(), Duration::from_secs(5));
        let converter = FakeConverter::new(ConvertBehavior::Copy);
        let repairer = FakeRepairer::new(RepairBehavior::Fix);
        let mut task = FileTask::new(source.clone(), source.clone(), MeshFormat::ThreeMf);
        assert!(!needs_conversion(&task));

        let outcome = run_one(&job, &converter, &repairer, &mut task).await;

        assert_eq!(outcome, PipelineOutcome::Skipped);
        assert_eq!(converter.calls(), 0);
        assert_eq!(repairer.repairs(), 0);
        assert_eq!(fs::read(&source).unwrap(), b"valid package");
    }

    #[tokio::test]
    async fn test_native_file_with_distinct_target_is_copied_through() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("b.3mf");
        fs::write(&source, b"valid package").unwrap();
        let target = temp.path().join("out/b.3mf");

        let job = job(temp.path(), Duration::from_secs(5));
        let converter = FakeConverter::new(ConvertBehavior::Copy);
        let repairer = FakeRepairer::new(RepairBehavior::Fix);
        let mut task = FileTask::new(source, target.clone(), MeshFormat::ThreeMf);
        assert!(needs_conversion(&task));

        let outcome = run_one(&job, &converter, &repairer, &mut task).await;

        assert_eq!(outcome, PipelineOutcome::Skipped);
        assert_eq!(converter.calls(), 1);
        assert_eq!(fs::read(&target).unwrap(), b"valid package");
    }

    #[tokio::test]
    async fn test_conversion_failure_never_attempts_repair() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.obj");
        fs::write(&source, b"defective").unwrap();

        let job = job(temp.path(), Duration::from_secs(5));
        let converter = FakeConverter::new(ConvertBehavior::Fail);
        let repairer = FakeRepairer::new(RepairBehavior::Fix);
        let mut task = FileTask::new(source, temp.path().join("a.3mf"), MeshFormat::Obj);

        let outcome = run_one(&job, &converter, &repairer, &mut task).await;

        assert_eq!(outcome.failure_kind(), Some(FailureKind::ConversionFailed));
        assert_eq!(repairer.loads(), 0);
        assert_eq!(repairer.repairs(), 0);
        assert_eq!(task.stage(), Stage::Done);
    }

    #[tokio::test]
    async fn test_silent_converter_no_op_is_missing_output() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.amf");
        fs::write(&source, b"defective").unwrap();

        let job = job(temp.path(), Duration::from_secs(5));
        let converter = FakeConverter::new(ConvertBehavior::NoOp);
        let repairer = FakeRepairer::new(RepairBehavior::Fix);
        let mut task = FileTask::new(source, temp.path().join("a.3mf"), MeshFormat::Amf);

        let outcome = run_one(&job, &converter, &repairer, &mut task).await;

        assert_eq!(outcome.failure_kind(), Some(FailureKind::MissingOutput));
        assert_eq!(repairer.loads(), 0);
    }

    #[tokio::test]
    async fn test_hanging_repair_times_out_and_is_cancelled_once() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("c.3mf");
        fs::write(&source, b"defective").unwrap();

        let timeout = Duration::from_millis(200);
        let job = job(temp.path(), timeout);
        let converter = FakeConverter::new(ConvertBehavior::Copy);
        let repairer = FakeRepairer::new(RepairBehavior::Hang);
        let mut task = FileTask::new(source.clone(), source.clone(), MeshFormat::ThreeMf);

        let started = Instant::now();
        let outcome = run_one(&job, &converter, &repairer, &mut task).await;
        let elapsed = started.elapsed();

        assert_eq!(outcome.failure_kind(), Some(FailureKind::Timeout));
        assert!(elapsed >= timeout);
        assert!(elapsed < timeout + Duration::from_secs(5));

        // 让取消观察任务有机会运行
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(repairer.cancellations(), 1);
        assert_eq!(fs::read(&source).unwrap(), b"defective");
    }

    #[tokio::test]
    async fn test_winning_repair_still_receives_cancellation() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("c.3mf");
        fs::write(&source, b"defective").unwrap();

        let job = job(temp.path(), Duration::from_secs(5));
        let converter = FakeConverter::new(ConvertBehavior::Copy);
        let repairer = FakeRepairer::new(RepairBehavior::Fix);
        let mut task = FileTask::new(source.clone(), source.clone(), MeshFormat::ThreeMf);

        let outcome = run_one(&job, &converter, &repairer, &mut task).await;
        assert_eq!(outcome, PipelineOutcome::Repaired);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(repairer.cancellations(), 1);
        assert_eq!(fs::read(&source).unwrap(), b"repaired");
    }

    #[tokio::test]
    async fn test_failed_post_verification_never_writes() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("d.stl");
        fs::write(&source, b"defective").unwrap();
        let target = temp.path().join("d.3mf");

        let job = job(temp.path(), Duration::from_secs(5));
        let converter = FakeConverter::new(ConvertBehavior::Copy);
        let repairer = FakeRepairer::new(RepairBehavior::NoFix);
        let mut task = FileTask::new(source, target.clone(), MeshFormat::Stl);

        let outcome = run_one(&job, &converter, &repairer, &mut task).await;

        assert_eq!(
            outcome.failure_kind(),
            Some(FailureKind::VerifyAfterRepairFailed)
        );
        // 目标仍是修复前（转换后）的内容
        assert_eq!(fs::read(&target).unwrap(), b"defective");
        assert!(!temp_path_for(&target).exists());
    }

    #[tokio::test]
    async fn test_repair_status_and_errors_map_to_repair_failed() {
        for behavior in [RepairBehavior::ReportCancelled, RepairBehavior::Error] {
            let temp = TempDir::new().unwrap();
            let source = temp.path().join("e.3mf");
            fs::write(&source, b"defective").unwrap();

            let job = job(temp.path(), Duration::from_secs(5));
            let converter = FakeConverter::new(ConvertBehavior::Copy);
            let repairer = FakeRepairer::new(behavior);
            let mut task = FileTask::new(source.clone(), source.clone(), MeshFormat::ThreeMf);

            let outcome = run_one(&job, &converter, &repairer, &mut task).await;
            assert_eq!(outcome.failure_kind(), Some(FailureKind::RepairFailed));
            assert_eq!(fs::read(&source).unwrap(), b"defective");
        }
    }

    #[tokio::test]
    async fn test_commit_failure_is_write_failed_and_keeps_original() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("f.3mf");
        fs::write(&source, b"defective").unwrap();
        fs::create_dir(temp_path_for(&source)).unwrap();

        let job = job(temp.path(), Duration::from_secs(5));
        let converter = FakeConverter::new(ConvertBehavior::Copy);
        let repairer = FakeRepairer::new(RepairBehavior::Fix);
        let mut task = FileTask::new(source.clone(), source.clone(), MeshFormat::ThreeMf);

        let outcome = run_one(&job, &converter, &repairer, &mut task).await;

        assert_eq!(outcome.failure_kind(), Some(FailureKind::WriteFailed));
        assert_eq!(fs::read(&source).unwrap(), b"defective");
    }
}
