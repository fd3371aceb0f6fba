//! # 文件收集器
//!
//! 根据作业配置发现待处理的网格文件。
//!
//! ## 功能
//! - 支持单文件和目录输入
//! - 按扩展名过滤支持的格式（大小写不敏感）
//! - 递归目录搜索，结果按路径排序
//! - 跳过位于输入目录内的输出目录，避免重复处理上一次的输出
//!
//! ## 依赖关系
//! - 被 `batch/runner.rs` 调用
//! - 使用 `walkdir` 遍历目录

use crate::error::{MeshRepairError, Result};
use crate::models::{JobSpec, LayoutPolicy, MeshFormat, RootKind};

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 发现的单个文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub format: MeshFormat,
}

/// 发现结果，计算后在整个运行期间不再变化
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub root_kind: RootKind,
    pub files: Vec<DiscoveredFile>,
}

impl Discovery {
    pub fn paths(&self) -> Vec<&Path> {
        self.files.iter().map(|f| f.path.as_path()).collect()
    }
}

/// 文件收集器
pub struct FileCollector<'a> {
    job: &'a JobSpec,
}

impl<'a> FileCollector<'a> {
    pub fn new(job: &'a JobSpec) -> Self {
        Self { job }
    }

    /// 收集所有待处理文件
    ///
    /// 根路径不存在、无法遍历或单文件格式不受支持时返回错误。
    pub fn collect(&self) -> Result<Discovery> {
        let root = self.job.input_root();

        let metadata = std::fs::metadata(root).map_err(|e| {
            let reason = if e.kind() == std::io::ErrorKind::NotFound {
                "the specified path does not exist".to_string()
            } else {
                e.to_string()
            };
            MeshRepairError::DiscoveryError {
                path: root.display().to_string(),
                reason,
            }
        })?;

        if !metadata.is_dir() {
            let format = MeshFormat::from_path(root).ok_or_else(|| {
                MeshRepairError::UnsupportedFormat(root.display().to_string())
            })?;
            return Ok(Discovery {
                root_kind: RootKind::File,
                files: vec![DiscoveredFile {
                    path: root.to_path_buf(),
                    format,
                }],
            });
        }

        let excluded = self.excluded_dirs();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !excluded.iter().any(|dir| e.path() == dir.as_path()));

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| MeshRepairError::DiscoveryError {
                path: root.display().to_string(),
                reason: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(format) = MeshFormat::from_path(entry.path()) {
                files.push(DiscoveredFile {
                    path: entry.into_path(),
                    format,
                });
            }
        }

        Ok(Discovery {
            root_kind: RootKind::Directory,
            files,
        })
    }

    /// 输入目录内不应再被扫描的输出目录
    fn excluded_dirs(&self) -> Vec<PathBuf> {
        let root = self.job.input_root();
        let mut dirs = Vec::new();

        match self.job.output_root() {
            Some(output) if output != root && output.starts_with(root) => {
                dirs.push(output.to_path_buf());
            }
            None if self.job.layout() == LayoutPolicy::MirrorHierarchy => {
                dirs.push(self.job.default_output_root());
            }
            _ => {}
        }

        dirs
    }
}
