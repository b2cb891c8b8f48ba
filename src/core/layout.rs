//! U 盘目录布局

use chrono::Local;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::core::pipeline::SourceSpec;

/// 运行目录名的时间格式
const RUN_DIR_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// 配置文件名
pub const CONFIG_FILE_NAME: &str = "beam_config.json";

/// U 盘根目录下的固定目录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StickLayout {
    root: PathBuf,
}

impl StickLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 待上传目录
    pub fn transfer_zone(&self) -> PathBuf {
        self.root.join("_transfer_zone")
    }

    /// 已发送归档目录
    pub fn sent_dir(&self) -> PathBuf {
        self.transfer_zone().join("sent")
    }

    /// 媒体备份目录
    pub fn backups_dir(&self) -> PathBuf {
        self.root.join("media").join("backups")
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
}

/// 以当前时间命名的运行目录（不创建）
pub fn new_run_dir(base: &Path, label: &str) -> PathBuf {
    let stamp = Local::now().format(RUN_DIR_FORMAT);
    if label.is_empty() {
        base.join(stamp.to_string())
    } else {
        base.join(format!("{}_{}", stamp, label))
    }
}

/// 名称排序最靠后的运行目录；目录名以时间戳开头，所以也是最新的
pub fn latest_run_dir(base: &Path) -> io::Result<Option<PathBuf>> {
    if !base.is_dir() {
        return Ok(None);
    }

    let mut latest: Option<PathBuf> = None;
    for entry in fs::read_dir(base)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let path = entry.path();
        if latest.as_ref().map_or(true, |l| path.file_name() > l.file_name()) {
            latest = Some(path);
        }
    }

    Ok(latest)
}

/// 人类可读的文件大小
pub fn human_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{:.1}{}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1}TB", size)
}

/// 预计写入量最多占可用空间的比例
const FREE_SPACE_RATIO: f64 = 0.9;

/// 目标所在磁盘的可用空间；目标尚未创建时取最近的已存在上级目录
pub fn available_space(path: &Path) -> io::Result<u64> {
    let existing = path
        .ancestors()
        .find(|p| p.exists())
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))?;
    fs2::available_space(existing)
}

/// 预计写入量是否在可用空间的 90% 以内
pub fn fits_free_space(total_bytes: u64, available: u64) -> bool {
    total_bytes as f64 <= available as f64 * FREE_SPACE_RATIO
}

/// 主目录下默认备份的媒体来源
pub fn default_media_sources(home: &Path) -> Vec<SourceSpec> {
    [
        ("pictures", "Pictures"),
        ("movies", "Movies"),
        ("music", "Music"),
        ("desktop", "Desktop"),
        ("downloads", "Downloads"),
        (
            "voice_memos",
            "Library/Group Containers/group.com.apple.VoiceMemos.shared/Recordings",
        ),
    ]
    .iter()
    .map(|(category, dir)| SourceSpec::categorized(category, home.join(dir)))
    .collect()
}
