//! # 批处理作业配置模型
//!
//! 一次运行的不可变配置 (`JobSpec`)、输出布局策略和支持的网格格式。
//!
//! ## 依赖关系
//! - 被 `batch/`, `pipeline/`, `commands/repair.rs` 使用
//! - 使用 `error.rs`

use crate::error::{MeshRepairError, Result};

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// 未指定输出目录时，目录模式下的默认输出子目录名
pub const DEFAULT_OUTPUT_DIR: &str = "MeshRepair";

/// 默认修复超时（秒）
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// 支持的网格文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshFormat {
    Stl,
    Step,
    ThreeMf,
    Obj,
    Amf,
}

impl MeshFormat {
    /// 修复引擎直接处理的原生容器格式
    pub const NATIVE: MeshFormat = MeshFormat::ThreeMf;

    /// 按扩展名识别格式（大小写不敏感）
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "stl" => Some(MeshFormat::Stl),
            "step" | "stp" => Some(MeshFormat::Step),
            "3mf" => Some(MeshFormat::ThreeMf),
            "obj" => Some(MeshFormat::Obj),
            "amf" => Some(MeshFormat::Amf),
            _ => None,
        }
    }

    /// 从文件路径推断格式
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn is_native(self) -> bool {
        self == Self::NATIVE
    }

    /// 该格式的规范扩展名
    pub fn extension(self) -> &'static str {
        match self {
            MeshFormat::Stl => "stl",
            MeshFormat::Step => "step",
            MeshFormat::ThreeMf => "3mf",
            MeshFormat::Obj => "obj",
            MeshFormat::Amf => "amf",
        }
    }
}

impl std::fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeshFormat::Stl => write!(f, "STL"),
            MeshFormat::Step => write!(f, "STEP"),
            MeshFormat::ThreeMf => write!(f, "3MF"),
            MeshFormat::Obj => write!(f, "OBJ"),
            MeshFormat::Amf => write!(f, "AMF"),
        }
    }
}

/// 目录输入时的输出布局策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutPolicy {
    /// 在输出根目录下复刻输入目录层级
    MirrorHierarchy,
    /// 所有输出直接放在输出根目录下（无输出根目录时原地放在源文件旁）
    Flatten,
}

impl LayoutPolicy {
    pub fn from_clone_hierarchy(clone: bool) -> Self {
        if clone {
            LayoutPolicy::MirrorHierarchy
        } else {
            LayoutPolicy::Flatten
        }
    }
}

/// 输入根路径的类型（发现阶段确定）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    File,
    Directory,
}

/// 一次批处理运行的不可变配置
///
/// 启动时由已校验的命令行参数构造一次，显式传入各组件，之后不再修改。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    input_root: PathBuf,
    output_root: Option<PathBuf>,
    layout: LayoutPolicy,
    repair_timeout: Duration,
}

impl JobSpec {
    pub fn new(
        input_root: PathBuf,
        output_root: Option<PathBuf>,
        layout: LayoutPolicy,
        repair_timeout: Duration,
    ) -> Result<Self> {
        if input_root.as_os_str().is_empty() {
            return Err(MeshRepairError::InvalidArgument(
                "input path must not be empty".to_string(),
            ));
        }
        if repair_timeout.is_zero() {
            return Err(MeshRepairError::InvalidArgument(
                "repair timeout must be greater than zero".to_string(),
            ));
        }

        // 空输出路径视为未指定
        let output_root = output_root
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| normalize_lexically(&p));

        Ok(Self {
            input_root: normalize_lexically(&input_root),
            output_root,
            layout,
            repair_timeout,
        })
    }

    pub fn input_root(&self) -> &Path {
        &self.input_root
    }

    pub fn output_root(&self) -> Option<&Path> {
        self.output_root.as_deref()
    }

    pub fn layout(&self) -> LayoutPolicy {
        self.layout
    }

    pub fn repair_timeout(&self) -> Duration {
        self.repair_timeout
    }

    /// 目录模式下未指定输出目录时使用的 `<input>/MeshRepair`
    pub fn default_output_root(&self) -> PathBuf {
        self.input_root.join(DEFAULT_OUTPUT_DIR)
    }
}

/// 去掉 `.` 并折叠 `..`，不访问文件系统
///
/// 根目录之上的 `..` 被丢弃；相对路径开头无法折叠的 `..` 保留。
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    if normalized.as_os_str().is_empty() {
        normalized.push(".");
    }
    normalized
}
