//! # 原子写入
//!
//! 先写入同目录下的临时文件，完整写入后删除旧文件并重命名到最终路径。
//! 临时写入失败时最终路径保持不变。
//!
//! 删除与重命名两步之间若进程崩溃或重命名失败，最终路径上的文件会丢失，
//! 临时文件仍保留，错误信息中给出其路径。
//!
//! ## 依赖关系
//! - 被 `pipeline/file.rs` 使用
//! - 无外部模块依赖

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// 临时文件名前缀
pub const TEMP_PREFIX: &str = "temp-";

/// 最终路径对应的临时文件路径（同一目录，保证重命名只改元数据）
pub fn temp_path_for(final_path: &Path) -> PathBuf {
    let name = final_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_name = format!("{}{}", TEMP_PREFIX, name);
    match final_path.parent() {
        Some(dir) => dir.join(temp_name),
        None => PathBuf::from(temp_name),
    }
}

/// 已写入临时文件、尚未提交的产物
///
/// 未提交即被丢弃时会删除临时文件。
#[derive(Debug)]
pub struct StagedArtifact {
    temp_path: PathBuf,
    final_path: PathBuf,
    committed: bool,
}

impl StagedArtifact {
    /// 将产物完整写入临时文件
    pub fn stage(bytes: &[u8], final_path: &Path) -> io::Result<Self> {
        let temp_path = temp_path_for(final_path);

        let written = File::create(&temp_path).and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        });

        if let Err(e) = written {
            // 清理可能残留的半截临时文件
            if temp_path.is_file() {
                let _ = fs::remove_file(&temp_path);
            }
            return Err(e);
        }

        Ok(Self {
            temp_path,
            final_path: final_path.to_path_buf(),
            committed: false,
        })
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// 删除旧文件并把临时文件重命名为最终路径
    pub fn commit(self) -> io::Result<()> {
        self.commit_with(|from, to| fs::rename(from, to))
    }

    /// 旧文件一旦删除，临时文件就是唯一副本：此后即使重命名失败也保留它
    fn commit_with<F>(mut self, rename: F) -> io::Result<()>
    where
        F: FnOnce(&Path, &Path) -> io::Result<()>,
    {
        match fs::remove_file(&self.final_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        self.committed = true;

        rename(&self.temp_path, &self.final_path).map_err(|e| {
            io::Error::new(
                e.kind(),
                format!(
                    "failed to move {} into place ({}); staged artifact kept at {}",
                    self.final_path.display(),
                    e,
                    self.temp_path.display()
                ),
            )
        })
    }
}

impl Drop for StagedArtifact {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

/// 原子提交产物到最终路径
pub fn commit_atomically(bytes: &[u8], final_path: &Path) -> io::Result<()> {
    let staged = StagedArtifact::stage(bytes, final_path)?;
    tracing::debug!(
        temp = %staged.temp_path().display(),
        target = %staged.final_path().display(),
        "staged artifact, committing"
    );
    staged.commit()
}
