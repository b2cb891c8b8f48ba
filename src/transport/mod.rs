pub mod http;
pub mod local;

use crate::core::scanner::FileCandidate;
use crate::error::{Result, TransferError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use http::HttpTransport;
pub use local::LocalTransport;

// ============ 公共常量 ============

/// 上传请求超时（秒）
pub const UPLOAD_TIMEOUT_SECS: u64 = 30;

/// 本地传输方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    #[default]
    Copy,
    Move,
}

impl std::fmt::Display for TransferMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferMode::Copy => write!(f, "copy"),
            TransferMode::Move => write!(f, "move"),
        }
    }
}

/// 传输策略接口
#[async_trait]
pub trait Transport: Send + Sync {
    /// 运行开始前准备输出目录，失败则整次运行中止
    async fn prepare(&self) -> Result<()>;

    /// 候选文件的期望位置（尚未解决冲突）
    fn destination_for(&self, candidate: &FileCandidate) -> PathBuf;

    /// 执行传输，返回最终路径；写入时才解决文件名冲突
    async fn deliver(
        &self,
        candidate: &FileCandidate,
        desired: &Path,
    ) -> std::result::Result<PathBuf, TransferError>;

    /// 文件最终落地的根目录（目标目录或已发送目录）
    fn output_root(&self) -> &Path;

    /// 是否在输出根目录写入清单文件
    fn writes_manifest(&self) -> bool {
        true
    }

    /// 获取传输名称（用于日志）
    fn name(&self) -> &str;
}

/// 递归创建目录并确认可写，失败时转换为运行级错误
pub(crate) async fn ensure_dir(path: &Path) -> Result<()> {
    let unwritable = |source| crate::error::Error::DestinationUnwritable {
        path: path.to_path_buf(),
        source,
    };

    tokio::fs::create_dir_all(path).await.map_err(unwritable)?;

    let marker = path.join(".stickbeam-write-test");
    tokio::fs::write(&marker, b"").await.map_err(unwritable)?;
    let _ = tokio::fs::remove_file(&marker).await;

    Ok(())
}
