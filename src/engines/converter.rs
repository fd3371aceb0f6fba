//! # 格式转换适配器
//!
//! 调用外部切片工具把非 3MF 网格导出为 3MF（居中几何体）。
//! 子进程的 stdout/stderr 按行实时转发给调用方提供的诊断输出。
//! 适配器本身不设超时，依赖外部进程自身结束。
//!
//! ## 依赖关系
//! - 被 `pipeline/file.rs`, `commands/repair.rs` 使用
//! - 使用 `error.rs`, `engines/mod.rs`

use super::{default_tool_path, DiagnosticSink, StreamKind};
use crate::error::ConversionError;

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// 默认转换工具相对安装目录的位置
const DEFAULT_CONVERTER_DIR: &str = "PrusaSlicer";
const DEFAULT_CONVERTER_NAME: &str = "prusa-slicer";

/// 网格格式转换能力
#[async_trait]
pub trait MeshConverter: Send + Sync {
    /// 将 `source` 转换为 3MF 并写到 `target`
    async fn convert(
        &self,
        source: &Path,
        target: &Path,
        sink: &dyn DiagnosticSink,
    ) -> Result<(), ConversionError>;
}

/// 基于 PrusaSlicer 命令行的转换器
#[derive(Debug, Clone)]
pub struct SlicerConverter {
    executable: PathBuf,
}

impl SlicerConverter {
    pub fn new(executable: PathBuf) -> Self {
        Self { executable }
    }

    /// 使用安装目录下的 `PrusaSlicer/prusa-slicer`
    pub fn from_install_dir() -> Self {
        Self::new(default_tool_path(DEFAULT_CONVERTER_DIR, DEFAULT_CONVERTER_NAME))
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// 固定的转换参数：导出 3MF，居中到 (0,0)
    pub fn build_args(source: &Path, target: &Path) -> Vec<OsString> {
        vec![
            OsString::from("--export-3mf"),
            OsString::from("--center"),
            OsString::from("0,0"),
            OsString::from("-o"),
            target.as_os_str().to_os_string(),
            source.as_os_str().to_os_string(),
        ]
    }
}

#[async_trait]
impl MeshConverter for SlicerConverter {
    async fn convert(
        &self,
        source: &Path,
        target: &Path,
        sink: &dyn DiagnosticSink,
    ) -> Result<(), ConversionError> {
        if !self.executable.is_file() {
            return Err(ConversionError::ConverterNotFound {
                path: self.executable.clone(),
            });
        }

        let mut command = Command::new(&self.executable);
        command.args(Self::build_args(source, target));

        tracing::debug!(
            converter = %self.executable.display(),
            source = %source.display(),
            target = %target.display(),
            "running converter"
        );

        run_streaming(command, sink).await
    }
}

/// 启动子进程并逐行转发输出，退出码为 0 时成功
pub(crate) async fn run_streaming(
    mut command: Command,
    sink: &dyn DiagnosticSink,
) -> Result<(), ConversionError> {
    let program = PathBuf::from(command.as_std().get_program());

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConversionError::ConverterNotFound {
                    path: program.clone(),
                }
            } else {
                ConversionError::SpawnFailed {
                    path: program.clone(),
                    source: e,
                }
            }
        })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (out_result, err_result, status) = tokio::join!(
        pump_lines(stdout, StreamKind::Stdout, sink),
        pump_lines(stderr, StreamKind::Stderr, sink),
        child.wait(),
    );
    out_result?;
    err_result?;
    let status = status?;

    if status.success() {
        Ok(())
    } else {
        Err(ConversionError::ExitStatus {
            code: status.code(),
        })
    }
}

/// 逐行读取输出流（非 UTF-8 内容做有损转换，空行忽略）
async fn pump_lines<R>(
    reader: Option<R>,
    stream: StreamKind,
    sink: &dyn DiagnosticSink,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return Ok(());
    };

    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\r', '\n']);
        if !line.is_empty() {
            sink.line(stream, line);
        }
    }
}
