//! # 输出路径解析
//!
//! 根据布局策略计算每个输入文件的目标 3MF 路径。
//!
//! ## 规则
//! - 目录 + 复刻层级: `<输出根>/<相对路径>.3mf`，无输出根时为 `<输入根>/MeshRepair/...`
//! - 目录 + 扁平: `<输出根>/<文件名>.3mf`，无输出根时放在源文件旁
//! - 单文件: 无输出根时原地处理（原生文件即为目标，其余改扩展名）；输出路径以 `.3mf` 结尾时即为目标文件，
//!   否则视为输出目录
//!
//! 解析是纯函数，相同输入总是得到相同目标路径。目录创建由
//! `ensure_target_dir` 单独完成。
//!
//! ## 依赖关系
//! - 被 `batch/runner.rs` 使用
//! - 使用 `models/job.rs`

use crate::models::{JobSpec, LayoutPolicy, MeshFormat, RootKind};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// 输出路径解析器
#[derive(Debug, Clone)]
pub struct PathResolver<'a> {
    job: &'a JobSpec,
    root_kind: RootKind,
}

impl<'a> PathResolver<'a> {
    pub fn new(job: &'a JobSpec, root_kind: RootKind) -> Self {
        Self { job, root_kind }
    }

    /// 计算 `file` 的目标路径
    pub fn resolve(&self, file: &Path) -> PathBuf {
        let native_ext = MeshFormat::NATIVE.extension();

        match self.root_kind {
            RootKind::File => match self.job.output_root() {
                Some(output) if is_native_file_path(output) => output.to_path_buf(),
                Some(output) => output.join(file_name_of(file)).with_extension(native_ext),
                None => in_place_target(file),
            },
            RootKind::Directory => match self.job.layout() {
                LayoutPolicy::MirrorHierarchy => {
                    let base = self
                        .job
                        .output_root()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.job.default_output_root());
                    let relative = file
                        .strip_prefix(self.job.input_root())
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|_| PathBuf::from(file_name_of(file)));
                    base.join(relative).with_extension(native_ext)
                }
                LayoutPolicy::Flatten => match self.job.output_root() {
                    Some(output) => output.join(file_name_of(file)).with_extension(native_ext),
                    None => in_place_target(file),
                },
            },
        }
    }
}

/// 创建目标路径缺失的上级目录
pub fn ensure_target_dir(target: &Path) -> io::Result<()> {
    match target.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

/// 原地布局：原生文件保持原路径（扩展名大小写不变），其余文件在旁边生成 `.3mf`
fn in_place_target(file: &Path) -> PathBuf {
    if is_native_file_path(file) {
        file.to_path_buf()
    } else {
        file.with_extension(MeshFormat::NATIVE.extension())
    }
}

fn file_name_of(path: &Path) -> &std::ffi::OsStr {
    path.file_name().unwrap_or(path.as_os_str())
}

fn is_native_file_path(path: &Path) -> bool {
    MeshFormat::from_path(path).is_some_and(MeshFormat::is_native)
}
