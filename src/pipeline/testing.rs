//! 流水线和批处理测试共用的确定性协作者替身

use crate::engines::repair::ComponentReport;
use crate::engines::{DiagnosticSink, MeshConverter, MeshRepairer, RepairStatus, StreamKind};
use crate::error::{ConversionError, RepairError};

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// 丢弃所有诊断行
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn line(&self, _stream: StreamKind, _line: &str) {}
}

/// 转换器行为
#[derive(Debug, Clone, Copy)]
pub enum ConvertBehavior {
    /// 按字节复制源文件到目标
    Copy,
    /// 以非零退出码失败
    Fail,
    /// 声称成功但不产生输出
    NoOp,
}

pub struct FakeConverter {
    behavior: ConvertBehavior,
    pub calls: AtomicUsize,
}

impl FakeConverter {
    pub fn new(behavior: ConvertBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MeshConverter for FakeConverter {
    async fn convert(
        &self,
        source: &Path,
        target: &Path,
        sink: &dyn DiagnosticSink,
    ) -> Result<(), ConversionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        sink.line(StreamKind::Stdout, "fake conversion");
        match self.behavior {
            ConvertBehavior::Copy => {
                tokio::fs::copy(source, target).await?;
                Ok(())
            }
            ConvertBehavior::Fail => Err(ConversionError::ExitStatus { code: Some(1) }),
            ConvertBehavior::NoOp => Ok(()),
        }
    }
}

/// 修复器行为
#[derive(Debug, Clone, Copy)]
pub enum RepairBehavior {
    /// 修复成功，模型变为有效
    Fix,
    /// 修复完成但模型仍无效
    NoFix,
    /// 永不完成，直到被取消
    Hang,
    /// 报告已取消
    ReportCancelled,
    /// 报告错误
    Error,
}

#[derive(Debug, Clone)]
pub struct FakeModel {
    pub bytes: Vec<u8>,
    pub fixed: bool,
}

/// 可脚本化的修复器
///
/// 文件内容以 `valid` 开头的模型在首次校验时有效。
pub struct FakeRepairer {
    behavior: RepairBehavior,
    pub loads: AtomicUsize,
    pub repairs: AtomicUsize,
    pub cancellations: Arc<AtomicUsize>,
}

impl FakeRepairer {
    pub fn new(behavior: RepairBehavior) -> Self {
        Self {
            behavior,
            loads: AtomicUsize::new(0),
            repairs: AtomicUsize::new(0),
            cancellations: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn repairs(&self) -> usize {
        self.repairs.load(Ordering::SeqCst)
    }

    pub fn cancellations(&self) -> usize {
        self.cancellations.load(Ordering::SeqCst)
    }

    /// 记录取消信号被触发的次数
    fn watch(&self, cancel: CancellationToken) {
        let counter = Arc::clone(&self.cancellations);
        tokio::spawn(async move {
            cancel.cancelled().await;
            counter.fetch_add(1, Ordering::SeqCst);
        });
    }
}

#[async_trait]
impl MeshRepairer for FakeRepairer {
    type Model = FakeModel;

    async fn load(&self, path: &Path) -> Result<FakeModel, RepairError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| RepairError::LoadFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(FakeModel {
            fixed: bytes.starts_with(b"valid"),
            bytes,
        })
    }

    async fn verify(&self, model: &FakeModel) -> Result<Vec<ComponentReport>, RepairError> {
        if model.fixed {
            Ok(vec![ComponentReport::valid(0), ComponentReport::valid(1)])
        } else {
            Ok(vec![
                ComponentReport::valid(0),
                ComponentReport::invalid(1, "non-manifold edge"),
            ])
        }
    }

    async fn repair(
        &self,
        model: &mut FakeModel,
        cancel: CancellationToken,
    ) -> Result<RepairStatus, RepairError> {
        self.repairs.fetch_add(1, Ordering::SeqCst);
        self.watch(cancel);
        match self.behavior {
            RepairBehavior::Fix => {
                model.fixed = true;
                model.bytes = b"repaired".to_vec();
                Ok(RepairStatus::Completed)
            }
            RepairBehavior::NoFix => {
                model.bytes = b"half repaired".to_vec();
                Ok(RepairStatus::Completed)
            }
            RepairBehavior::Hang => std::future::pending().await,
            RepairBehavior::ReportCancelled => Ok(RepairStatus::Cancelled),
            RepairBehavior::Error => Err(RepairError::RepairFailed("engine crashed".to_string())),
        }
    }

    async fn export(&self, model: &FakeModel) -> Result<Vec<u8>, RepairError> {
        Ok(model.bytes.clone())
    }
}
