use super::{ensure_dir, TransferMode, Transport};
use crate::core::conflict::CollisionResolver;
use crate::core::scanner::FileCandidate;
use crate::error::{Result, TransferError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// 本地文件系统传输（复制或移动到目标根目录）
pub struct LocalTransport {
    root: PathBuf,
    mode: TransferMode,
    /// 是否按分类建立子目录
    by_category: bool,
    name: String,
}

impl LocalTransport {
    pub fn new(root: impl Into<PathBuf>, mode: TransferMode) -> Self {
        let root = root.into();
        let name = format!("local:{}", root.display());
        Self {
            root,
            mode,
            by_category: false,
            name,
        }
    }

    pub fn with_categories(mut self, enabled: bool) -> Self {
        self.by_category = enabled;
        self
    }

    pub fn mode(&self) -> TransferMode {
        self.mode
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn prepare(&self) -> Result<()> {
        ensure_dir(&self.root).await
    }

    fn destination_for(&self, candidate: &FileCandidate) -> PathBuf {
        match (&candidate.category, self.by_category) {
            (Some(category), true) => self.root.join(category).join(&candidate.name),
            _ => self.root.join(&candidate.name),
        }
    }

    async fn deliver(
        &self,
        candidate: &FileCandidate,
        desired: &Path,
    ) -> std::result::Result<PathBuf, TransferError> {
        if let Some(parent) = desired.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| TransferError::write(parent, e))?;
        }

        let target = CollisionResolver::resolve(desired);
        if target != desired {
            debug!("文件名冲突: {} -> {}", desired.display(), target.display());
        }

        match self.mode {
            TransferMode::Copy => {
                copy_file(&candidate.source_path, &target).await?;
            }
            TransferMode::Move => {
                move_file(&candidate.source_path, &target).await?;
            }
        }

        Ok(target)
    }

    fn output_root(&self) -> &Path {
        &self.root
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// 复制文件到一个新路径，保留修改时间；目标已存在时失败，不会覆盖
///
/// 复制失败时删除不完整的目标文件。
pub async fn copy_file(from: &Path, to: &Path) -> std::result::Result<u64, TransferError> {
    let mut reader = fs::File::open(from)
        .await
        .map_err(|e| TransferError::read(from, e))?;
    let modified = reader
        .metadata()
        .await
        .and_then(|m| m.modified())
        .map_err(|e| TransferError::read(from, e))?;

    let mut writer = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(to)
        .await
        .map_err(|e| TransferError::write(to, e))?;

    let result = async {
        let bytes = tokio::io::copy(&mut reader, &mut writer).await?;
        writer.flush().await?;
        Ok::<_, std::io::Error>(bytes)
    }
    .await;

    let bytes = match result {
        Ok(bytes) => bytes,
        Err(e) => {
            drop(writer);
            let _ = fs::remove_file(to).await;
            return Err(TransferError::write(to, e));
        }
    };

    // 修改时间保留失败不影响结果
    let std_file = writer.into_std().await;
    if let Err(e) = std_file.set_modified(modified) {
        debug!("无法保留修改时间: {} - {}", to.display(), e);
    }

    Ok(bytes)
}

/// 移动文件；跨设备时退化为复制后删除源文件
pub async fn move_file(from: &Path, to: &Path) -> std::result::Result<(), TransferError> {
    match fs::rename(from, to).await {
        Ok(()) => return Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(TransferError::read(from, e));
        }
        Err(e) => {
            debug!("重命名失败，改为复制后删除: {} - {}", from.display(), e);
        }
    }

    copy_file(from, to).await?;

    if let Err(e) = fs::remove_file(from).await {
        // 源文件删不掉时撤销复制，保持源文件为唯一副本
        warn!("删除源文件失败，撤销复制: {} - {}", from.display(), e);
        let _ = fs::remove_file(to).await;
        return Err(TransferError::read(from, e));
    }

    Ok(())
}
