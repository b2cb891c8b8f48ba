pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod transport;

pub use crate::core::{
    transfer, upload, DedupPolicy, FileCandidate, FileScanner, Manifest, Pipeline, ScanConfig,
    SourceSpec, StickLayout, TransferEngine,
};
pub use config::BeamConfig;
pub use error::{Error, Result, TransferError};
pub use transport::{HttpTransport, LocalTransport, TransferMode, Transport};

/// 运行环境相关目录
pub mod dirs {
    use std::path::PathBuf;

    /// 指定 U 盘根目录的环境变量
    pub const ROOT_ENV: &str = "STICKBEAM_ROOT";

    pub fn home_dir() -> Option<PathBuf> {
        if cfg!(target_os = "windows") {
            std::env::var("USERPROFILE").ok().map(PathBuf::from)
        } else {
            std::env::var("HOME").ok().map(PathBuf::from)
        }
    }

    /// U 盘根目录：环境变量优先，否则为可执行文件所在目录
    pub fn stick_root() -> Option<PathBuf> {
        if let Some(root) = std::env::var_os(ROOT_ENV) {
            return Some(PathBuf::from(root));
        }

        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
    }
}
