//! 输出写入
//!
//! [`PageWriter`] 把最终文档持久化到以文件名标识的位置。
//! 文件系统实现只在内容变化时写入，重复运行不会触碰未变化的文件。

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::core::MirrorError;

/// 输出目标
#[async_trait]
pub trait PageWriter: Send + Sync {
    /// 写入文档，返回是否真正写入（内容相同则为 `false`）
    async fn write(&self, name: &str, content: &str) -> Result<bool, MirrorError>;
}

/// 写入输出目录的实现
#[derive(Debug, Clone)]
pub struct FsPageWriter {
    root: PathBuf,
}

impl FsPageWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 输出文件的完整路径；拒绝绝对路径与 `..`
    pub fn resolve(&self, name: &str) -> Result<PathBuf, MirrorError> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if name.is_empty() || escapes {
            return Err(MirrorError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("非法的输出文件名: {}", name),
            )));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl PageWriter for FsPageWriter {
    async fn write(&self, name: &str, content: &str) -> Result<bool, MirrorError> {
        let path = self.resolve(name)?;

        if let Ok(existing) = tokio::fs::read(&path).await {
            if existing == content.as_bytes() {
                tracing::debug!("{} 内容未变化，跳过写入", path.display());
                return Ok(false);
            }
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        tracing::debug!("已写入 {}", path.display());
        Ok(true)
    }
}
