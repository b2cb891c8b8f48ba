//! 错误类型
//!
//! `Error` 只用于整次运行级别的失败（源目录缺失、目标目录不可写、配置错误），
//! 单个文件的失败用 `TransferError` 表示，并由传输引擎转换成清单记录。

use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// 运行级错误，出现时整次运行在任何传输开始前中止
#[derive(Error, Debug)]
pub enum Error {
    #[error("源目录不存在: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("目标目录不可写: {}: {source}", path.display())]
    DestinationUnwritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("配置错误: {0}")]
    Config(String),

    #[error("HTTP 客户端初始化失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] io::Error),

    #[error("JSON 解析失败: {0}")]
    Json(#[from] serde_json::Error),
}

/// 失败类别（写入清单）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Read,
    Write,
    Network,
    Timeout,
    HttpStatus,
    Archive,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Read => write!(f, "read_error"),
            FailureKind::Write => write!(f, "write_error"),
            FailureKind::Network => write!(f, "network_error"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::HttpStatus => write!(f, "http_status_error"),
            FailureKind::Archive => write!(f, "archive_error"),
        }
    }
}

/// 单个文件传输失败
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("读取失败 {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("写入失败 {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("网络错误: {0}")]
    Network(String),

    #[error("请求超时 ({0}s)")]
    Timeout(u64),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// 已上传成功，但移入已发送目录失败
    #[error("已上传但归档失败 {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TransferError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TransferError::Read { .. } => FailureKind::Read,
            TransferError::Write { .. } => FailureKind::Write,
            TransferError::Network(_) => FailureKind::Network,
            TransferError::Timeout(_) => FailureKind::Timeout,
            TransferError::HttpStatus { .. } => FailureKind::HttpStatus,
            TransferError::Archive { .. } => FailureKind::Archive,
        }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        TransferError::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        TransferError::Write {
            path: path.into(),
            source,
        }
    }
}
