//! # repair 命令实现
//!
//! 批量转换并修复网格文件。
//!
//! ## 功能
//! - 由命令行参数构造不可变的 `JobSpec`
//! - 定位外部转换工具和修复引擎
//! - 运行批处理并打印汇总（失败列表以表格显示）
//! - 可选导出 CSV 报告
//!
//! ## 依赖关系
//! - 使用 `cli/repair.rs` 定义的参数
//! - 使用 `batch/`, `engines/`, `models/`
//! - 使用 `utils/output.rs`

use crate::batch::{BatchReport, BatchRunner};
use crate::cli::repair::RepairArgs;
use crate::engines::{ExternalRepairTool, SlicerConverter, StreamKind};
use crate::error::{MeshRepairError, Result};
use crate::models::{JobSpec, LayoutPolicy};
use crate::utils::output;

use std::path::{Path, PathBuf};
use std::time::Duration;
use tabled::{Table, Tabled};

/// 失败文件表格行
#[derive(Debug, Clone, Tabled)]
struct FailureRow {
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Reason")]
    kind: String,
    #[tabled(rename = "Details")]
    details: String,
}

/// 执行 repair 命令
pub fn execute(args: RepairArgs) -> Result<()> {
    output::print_header(&format!("MeshRepair v{}", env!("CARGO_PKG_VERSION")));

    let job = build_job_spec(&args)?;

    let converter = args
        .converter_path
        .clone()
        .map(SlicerConverter::new)
        .unwrap_or_else(SlicerConverter::from_install_dir);
    let repairer = args
        .repair_tool_path
        .clone()
        .map(ExternalRepairTool::new)
        .unwrap_or_else(ExternalRepairTool::from_install_dir);

    tracing::debug!(
        job = ?job,
        converter = %converter.executable().display(),
        repair_tool = %repairer.executable().display(),
        "starting batch"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| MeshRepairError::Other(format!("Failed to start async runtime: {}", e)))?;

    let report =
        runtime.block_on(BatchRunner::new(&job, &converter, &repairer, &console_sink).run())?;

    print_summary(&report);

    if let Some(ref path) = args.report {
        report.write_csv(path)?;
        output::print_success(&format!("Report saved to '{}'", path.display()));
    }

    Ok(())
}

/// 由命令行参数构造作业配置（路径转为绝对路径）
fn build_job_spec(args: &RepairArgs) -> Result<JobSpec> {
    let input = absolute(&args.input_file_path)?;
    let output = args
        .output_file_path
        .as_deref()
        .filter(|p| !p.as_os_str().is_empty())
        .map(absolute)
        .transpose()?;

    JobSpec::new(
        input,
        output,
        LayoutPolicy::from_clone_hierarchy(args.clone_folder_hierarchy),
        Duration::from_secs(args.timeout_seconds),
    )
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| {
        MeshRepairError::InvalidArgument(format!("Invalid path '{}': {}", path.display(), e))
    })
}

/// 转换工具诊断输出：打印到控制台并写入 debug 日志
fn console_sink(stream: StreamKind, line: &str) {
    output::print_tool_line(stream, line);
    tracing::debug!(?stream, "{}", line);
}

/// 打印运行汇总
fn print_summary(report: &BatchReport) {
    output::print_separator();
    output::print_done(&format!(
        "{:.1} seconds elapsed",
        report.elapsed.as_secs_f64()
    ));

    let summary = format!(
        "{}/{} files verified/repaired ({} repaired, {} already valid)",
        report.succeeded(),
        report.processed(),
        report.repaired,
        report.skipped
    );
    if report.failed == 0 {
        output::print_success(&summary);
        return;
    }
    output::print_warning(&summary);

    let rows: Vec<FailureRow> = report
        .failures()
        .into_iter()
        .map(|(target, failure)| FailureRow {
            target: target.display().to_string(),
            kind: failure.kind.to_string(),
            details: failure.reason.clone(),
        })
        .collect();

    output::print_header(&format!("{} Failed File(s)", rows.len()));
    println!("{}", Table::new(&rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn parse(args: &[&str]) -> RepairArgs {
        Cli::try_parse_from(args).unwrap().repair
    }

    #[test]
    fn test_build_job_spec_makes_paths_absolute() {
        let args = parse(&["meshrepair", "--inputFilePath=models", "--outputFilePath=out"]);
        let job = build_job_spec(&args).unwrap();

        assert!(job.input_root().is_absolute());
        assert!(job.input_root().ends_with("models"));
        assert!(job.output_root().unwrap().is_absolute());
        assert_eq!(job.layout(), LayoutPolicy::MirrorHierarchy);
        assert_eq!(job.repair_timeout(), Duration::from_secs(600));
    }

    #[test]
    fn test_build_job_spec_flatten_and_timeout() {
        let args = parse(&[
            "meshrepair",
            "--inputFilePath=/models",
            "--cloneFolderHierarchy=false",
            "--timeoutSeconds=45",
        ]);
        let job = build_job_spec(&args).unwrap();

        assert!(job.output_root().is_none());
        assert_eq!(job.layout(), LayoutPolicy::Flatten);
        assert_eq!(job.repair_timeout(), Duration::from_secs(45));
    }
}
