//! 扩展名过滤

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// 文档类（桌面 / 下载目录整理）
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "csv", "xlsx", "jpg", "png", "heic", "docx", "txt"];

/// 媒体类（照片、视频、音频）
const MEDIA_EXTENSIONS: &[&str] = &[
    // 图片
    "jpg", "jpeg", "png", "gif", "heic", "heif", "raw", "cr2", "nef", "tiff", "bmp", "webp",
    // 视频
    "mp4", "mov", "avi", "mkv", "m4v", "wmv", "flv", "webm", "3gp",
    // 音频
    "mp3", "m4a", "wav", "aac", "flac", "ogg", "wma", "aiff",
];

/// 扩展名集合，大小写不敏感；空集合表示不限制
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ExtensionSet {
    extensions: BTreeSet<String>,
}

impl ExtensionSet {
    /// 不限制扩展名
    pub fn any() -> Self {
        Self::default()
    }

    pub fn documents() -> Self {
        Self::from_iter(DOCUMENT_EXTENSIONS.iter().copied())
    }

    pub fn media() -> Self {
        Self::from_iter(MEDIA_EXTENSIONS.iter().copied())
    }

    /// 统一为不带点的小写形式
    fn normalize(ext: &str) -> String {
        ext.trim().trim_start_matches('.').to_lowercase()
    }

    pub fn insert(&mut self, ext: &str) {
        let ext = Self::normalize(ext);
        if !ext.is_empty() {
            self.extensions.insert(ext);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// 判断文件是否应被纳入
    pub fn matches(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }

        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.contains(&e.to_lowercase()))
            .unwrap_or(false)
    }
}

impl<S: AsRef<str>> FromIterator<S> for ExtensionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::default();
        for ext in iter {
            set.insert(ext.as_ref());
        }
        set
    }
}

impl From<Vec<String>> for ExtensionSet {
    fn from(exts: Vec<String>) -> Self {
        exts.into_iter().collect()
    }
}

impl From<ExtensionSet> for Vec<String> {
    fn from(set: ExtensionSet) -> Self {
        set.extensions.into_iter().map(|e| format!(".{}", e)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_match() {
        let set: ExtensionSet = [".pdf"].into_iter().collect();
        assert!(set.matches(Path::new("report.PDF")));
        assert!(set.matches(Path::new("/a/b/report.pdf")));
        assert!(!set.matches(Path::new("report.pdf.tmp")));
        assert!(!set.matches(Path::new("README")));
    }

    #[test]
    fn test_empty_set_matches_everything() {
        let set = ExtensionSet::any();
        assert!(set.matches(Path::new("anything.bin")));
        assert!(set.matches(Path::new("no_extension")));
    }

    #[test]
    fn test_normalizes_entries() {
        let set: ExtensionSet = ["JPG", ".Png", " .txt ", ""].into_iter().collect();
        assert_eq!(set.len(), 3);
        assert!(set.matches(Path::new("a.jpg")));
        assert!(set.matches(Path::new("a.PNG")));
    }

    #[test]
    fn test_serde_roundtrip_uses_dotted_form() {
        let set: ExtensionSet = ["pdf", "csv"].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"[".csv",".pdf"]"#);
        let back: ExtensionSet = serde_json::from_str(r#"["PDF"]"#).unwrap();
        assert!(back.matches(Path::new("x.pdf")));
    }

    #[test]
    fn test_presets() {
        assert!(ExtensionSet::media().matches(Path::new("clip.MOV")));
        assert!(!ExtensionSet::media().matches(Path::new("sheet.xlsx")));
        assert!(ExtensionSet::documents().matches(Path::new("sheet.xlsx")));
    }
}
