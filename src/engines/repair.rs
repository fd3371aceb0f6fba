//! # 网格修复/校验适配器
//!
//! `MeshRepairer` 是平台修复能力的策略接口：加载、逐组件校验、
//! 可取消的修复和导出。`verify_all` 在其上实现“所有组件均有效”判定。
//!
//! `ExternalRepairTool` 通过标准输入输出与外部修复引擎进程通信：
//! - `verify`: stdin 输入 3MF 包，stdout 每个组件一行
//!   `component <index> ok` 或 `component <index> error <message>`
//! - `repair`: stdin 输入 3MF 包，stdout 输出修复后的 3MF 包
//!
//! ## 依赖关系
//! - 被 `pipeline/file.rs`, `commands/repair.rs` 使用
//! - 使用 `error.rs`, `engines/mod.rs`

use super::default_tool_path;
use crate::error::RepairError;

use async_trait::async_trait;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

const DEFAULT_TOOL_DIR: &str = "MeshRepairEngine";
const DEFAULT_TOOL_NAME: &str = "mesh-repair-engine";

/// 单个网格组件的校验结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentReport {
    pub index: usize,
    pub errors: Vec<String>,
}

impl ComponentReport {
    pub fn valid(index: usize) -> Self {
        Self {
            index,
            errors: Vec::new(),
        }
    }

    pub fn invalid(index: usize, error: impl Into<String>) -> Self {
        Self {
            index,
            errors: vec![error.into()],
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// 修复操作的结束状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairStatus {
    Completed,
    Cancelled,
}

/// 网格修复/校验能力
#[async_trait]
pub trait MeshRepairer: Send + Sync {
    /// 引擎内部的模型句柄
    type Model: Send + Sync;

    async fn load(&self, path: &Path) -> Result<Self::Model, RepairError>;

    /// 校验模型中的每一个组件
    async fn verify(&self, model: &Self::Model) -> Result<Vec<ComponentReport>, RepairError>;

    /// 修复模型；`cancel` 被触发后应尽快返回 `RepairStatus::Cancelled` 并释放资源
    async fn repair(
        &self,
        model: &mut Self::Model,
        cancel: CancellationToken,
    ) -> Result<RepairStatus, RepairError>;

    /// 把模型序列化为 3MF 包
    async fn export(&self, model: &Self::Model) -> Result<Vec<u8>, RepairError>;
}

/// 所有组件均无结构错误时为 true（无组件时视为有效）
pub async fn verify_all<R>(repairer: &R, model: &R::Model) -> Result<bool, RepairError>
where
    R: MeshRepairer + ?Sized,
{
    let reports = repairer.verify(model).await?;

    let mut valid = true;
    for report in &reports {
        if !report.is_valid() {
            tracing::debug!(
                component = report.index,
                errors = ?report.errors,
                "component failed verification"
            );
            valid = false;
        }
    }

    Ok(valid)
}

/// 内存中的 3MF 包
#[derive(Debug, Clone)]
pub struct PackageModel {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// 外部修复引擎进程
#[derive(Debug, Clone)]
pub struct ExternalRepairTool {
    executable: PathBuf,
}

impl ExternalRepairTool {
    pub fn new(executable: PathBuf) -> Self {
        Self { executable }
    }

    /// 使用安装目录下的 `MeshRepairEngine/mesh-repair-engine`
    pub fn from_install_dir() -> Self {
        Self::new(default_tool_path(DEFAULT_TOOL_DIR, DEFAULT_TOOL_NAME))
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// 启动引擎子进程并在后台写入 3MF 包
    fn spawn(&self, verb: &str, bytes: &[u8]) -> Result<Child, RepairError> {
        if !self.executable.is_file() {
            return Err(RepairError::ToolNotFound {
                path: self.executable.clone(),
            });
        }

        let mut child = Command::new(&self.executable)
            .arg(verb)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            let payload = bytes.to_vec();
            tokio::spawn(async move {
                // 进程提前退出时写入失败，由退出码反映
                let _ = stdin.write_all(&payload).await;
            });
        }

        Ok(child)
    }
}

#[async_trait]
impl MeshRepairer for ExternalRepairTool {
    type Model = PackageModel;

    async fn load(&self, path: &Path) -> Result<PackageModel, RepairError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| RepairError::LoadFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if bytes.is_empty() {
            return Err(RepairError::LoadFailed {
                path: path.to_path_buf(),
                reason: "package is empty".to_string(),
            });
        }

        Ok(PackageModel {
            path: path.to_path_buf(),
            bytes,
        })
    }

    async fn verify(&self, model: &PackageModel) -> Result<Vec<ComponentReport>, RepairError> {
        let child = self.spawn("verify", &model.bytes)?;
        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(RepairError::VerifyFailed(format!(
                "engine exited with {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(parse_component_reports(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }

    async fn repair(
        &self,
        model: &mut PackageModel,
        cancel: CancellationToken,
    ) -> Result<RepairStatus, RepairError> {
        let child = self.spawn("repair", &model.bytes)?;

        // 取消时丢弃等待中的 future，kill_on_drop 会结束子进程
        let output = tokio::select! {
            output = child.wait_with_output() => output?,
            _ = cancel.cancelled() => {
                tracing::debug!(path = %model.path.display(), "repair cancelled, engine killed");
                return Ok(RepairStatus::Cancelled);
            }
        };

        if !output.status.success() {
            return Err(RepairError::RepairFailed(format!(
                "engine exited with {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        if output.stdout.is_empty() {
            return Err(RepairError::RepairFailed(
                "engine produced no package".to_string(),
            ));
        }

        model.bytes = output.stdout;
        Ok(RepairStatus::Completed)
    }

    async fn export(&self, model: &PackageModel) -> Result<Vec<u8>, RepairError> {
        Ok(model.bytes.clone())
    }
}

fn component_line_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*component\s+(\d+)\s+(ok|error)\b\s*(.*)$")
            .expect("component report pattern is valid")
    })
}

/// 解析引擎的逐组件校验输出，同一组件的多条错误合并
pub fn parse_component_reports(stdout: &str) -> Vec<ComponentReport> {
    let pattern = component_line_regex();
    let mut reports: BTreeMap<usize, ComponentReport> = BTreeMap::new();

    for line in stdout.lines() {
        let Some(caps) = pattern.captures(line) else {
            continue;
        };
        let Ok(index) = caps[1].parse::<usize>() else {
            continue;
        };

        if &caps[2] != "error" {
            reports
                .entry(index)
                .or_insert_with(|| ComponentReport::valid(index));
            continue;
        }

        let message = match caps[3].trim() {
            "" => "unspecified error",
            message => message,
        };
        reports
            .entry(index)
            .and_modify(|report| report.errors.push(message.to_string()))
            .or_insert_with(|| ComponentReport::invalid(index, message));
    }

    reports.into_values().collect()
}
