//! 重复检测 - 基于大小和前缀哈希
//!
//! 前缀哈希只覆盖文件开头的固定长度，指纹相同不代表内容一定相同。
//! 这是为扫描速度做的取舍：指纹不同的文件一定不会被判为重复。

use crate::core::manifest::MANIFEST_FILE_NAME;
use crate::core::scanner::FileCandidate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// 前缀哈希读取的字节数
pub const PREFIX_HASH_BYTES: usize = 8 * 1024;

/// 内容指纹（不持久化）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ContentFingerprint {
    /// 仅文件大小
    Size(u64),
    /// 前缀哈希
    Prefix(String),
}

/// 重复判定策略，两者可同时开启
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupPolicy {
    /// 目标位置已有同名且大小相同的文件时跳过
    pub destination_exists: bool,
    /// 本次运行中已处理过相同前缀哈希的文件时跳过
    pub content: bool,
}

impl DedupPolicy {
    pub const NONE: DedupPolicy = DedupPolicy {
        destination_exists: false,
        content: false,
    };

    pub const ALL: DedupPolicy = DedupPolicy {
        destination_exists: true,
        content: true,
    };
}

impl Default for DedupPolicy {
    fn default() -> Self {
        Self::ALL
    }
}

/// 计算文件前 `PREFIX_HASH_BYTES` 字节的哈希（BLAKE3，取前 32 个十六进制字符）
pub fn prefix_hash(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    let mut buffer = Vec::with_capacity(PREFIX_HASH_BYTES);
    file.take(PREFIX_HASH_BYTES as u64).read_to_end(&mut buffer)?;

    let hash = blake3::hash(&buffer);
    Ok(hash.to_hex()[..32].to_string())
}

/// 候选文件的内容指纹；读取失败时返回 None（视为不重复）
pub fn fingerprint(candidate: &FileCandidate) -> Option<ContentFingerprint> {
    match prefix_hash(&candidate.source_path) {
        Ok(hash) => Some(ContentFingerprint::Prefix(hash)),
        Err(e) => {
            debug!(
                "无法计算指纹，按不重复处理: {} - {}",
                candidate.source_path.display(),
                e
            );
            None
        }
    }
}

/// 重复检测器，生命周期为一次运行
///
/// 每个指纹对应第一个拥有它的文件在输出目录中的路径。
#[derive(Debug, Default)]
pub struct DuplicateDetector {
    policy: DedupPolicy,
    seen: HashMap<ContentFingerprint, PathBuf>,
}

impl DuplicateDetector {
    pub fn new(policy: DedupPolicy) -> Self {
        Self {
            policy,
            seen: HashMap::new(),
        }
    }

    pub fn policy(&self) -> DedupPolicy {
        self.policy
    }

    /// 目标位置是否已有同名同大小的文件，有则返回该路径
    pub fn existing_match(&self, candidate: &FileCandidate, desired: &Path) -> Option<PathBuf> {
        if !self.policy.destination_exists {
            return None;
        }

        let metadata = std::fs::metadata(desired).ok()?;
        if !metadata.is_file() {
            return None;
        }

        (ContentFingerprint::Size(metadata.len()) == ContentFingerprint::Size(candidate.size_bytes))
            .then(|| desired.to_path_buf())
    }

    /// 内容策略下计算候选文件的指纹
    pub fn fingerprint(&self, candidate: &FileCandidate) -> Option<ContentFingerprint> {
        if self.policy.content {
            fingerprint(candidate)
        } else {
            None
        }
    }

    /// 相同指纹的已有文件路径
    pub fn duplicate_of(&self, fingerprint: Option<&ContentFingerprint>) -> Option<&Path> {
        if !self.policy.content {
            return None;
        }
        fingerprint
            .and_then(|fp| self.seen.get(fp))
            .map(PathBuf::as_path)
    }

    /// 指纹是否已在本次运行中出现过
    pub fn is_duplicate(&self, fingerprint: Option<&ContentFingerprint>) -> bool {
        self.duplicate_of(fingerprint).is_some()
    }

    /// 记录已处理的唯一文件及其落地路径；同一指纹只保留第一个
    pub fn remember(&mut self, fingerprint: Option<ContentFingerprint>, destination: &Path) {
        if let Some(fp) = fingerprint {
            self.seen
                .entry(fp)
                .or_insert_with(|| destination.to_path_buf());
        }
    }

    /// 将目标目录中已有文件的指纹加入集合（跳过清单文件）
    pub fn seed_from_dir(&mut self, dir: &Path) -> usize {
        if !self.policy.content || !dir.is_dir() {
            return 0;
        }

        let before = self.seen.len();
        for entry in WalkDir::new(dir)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            if entry.depth() == 1 && entry.file_name() == MANIFEST_FILE_NAME {
                continue;
            }
            if let Ok(hash) = prefix_hash(entry.path()) {
                self.seen
                    .entry(ContentFingerprint::Prefix(hash))
                    .or_insert_with(|| entry.path().to_path_buf());
            }
        }

        let added = self.seen.len() - before;
        if added > 0 {
            info!("目标目录已有 {} 个不同指纹: {}", added, dir.display());
        }
        added
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn candidate(path: &Path) -> FileCandidate {
        FileCandidate {
            source_path: path.to_path_buf(),
            name: path.file_name().unwrap().to_string_lossy().into_owned(),
            size_bytes: fs::metadata(path).map(|m| m.len()).unwrap_or(0),
            modified_time: 0,
            category: None,
        }
    }

    #[test]
    fn test_prefix_hash_only_reads_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = vec![1u8; PREFIX_HASH_BYTES];
        let mut b = a.clone();
        a.extend_from_slice(b"tail-a");
        b.extend_from_slice(b"different tail");
        fs::write(dir.path().join("a"), &a).unwrap();
        fs::write(dir.path().join("b"), &b).unwrap();

        // 前缀相同即指纹相同（已知的误判）
        assert_eq!(
            prefix_hash(&dir.path().join("a")).unwrap(),
            prefix_hash(&dir.path().join("b")).unwrap()
        );
        assert_eq!(prefix_hash(&dir.path().join("a")).unwrap().len(), 32);
    }

    #[test]
    fn test_unreadable_file_is_not_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let mut detector = DuplicateDetector::new(DedupPolicy::ALL);
        let missing = FileCandidate {
            source_path: dir.path().join("gone.jpg"),
            name: "gone.jpg".to_string(),
            size_bytes: 10,
            modified_time: 0,
            category: None,
        };

        let fp = detector.fingerprint(&missing);
        assert!(fp.is_none());
        assert!(!detector.is_duplicate(fp.as_ref()));
        detector.remember(fp, &dir.path().join("out/gone.jpg"));
        assert!(detector.is_empty());
    }

    #[test]
    fn test_content_duplicates_regardless_of_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("one.jpg"), "same bytes").unwrap();
        fs::write(dir.path().join("two.jpg"), "same bytes").unwrap();
        fs::write(dir.path().join("three.jpg"), "other bytes").unwrap();

        let mut detector = DuplicateDetector::new(DedupPolicy::ALL);
        let first = detector.fingerprint(&candidate(&dir.path().join("one.jpg")));
        assert!(!detector.is_duplicate(first.as_ref()));
        detector.remember(first, &dir.path().join("out/one.jpg"));

        let second = detector.fingerprint(&candidate(&dir.path().join("two.jpg")));
        assert_eq!(
            detector.duplicate_of(second.as_ref()),
            Some(dir.path().join("out/one.jpg").as_path())
        );

        let third = detector.fingerprint(&candidate(&dir.path().join("three.jpg")));
        assert!(!detector.is_duplicate(third.as_ref()));
    }

    #[test]
    fn test_content_policy_disabled() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("one.jpg"), "same").unwrap();
        let detector = DuplicateDetector::new(DedupPolicy::NONE);
        assert!(detector.fingerprint(&candidate(&dir.path().join("one.jpg"))).is_none());
    }

    #[test]
    fn test_existing_match_requires_same_size() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(src.join("a.txt"), "12345").unwrap();
        fs::write(src.join("b.txt"), "12345").unwrap();
        fs::write(dst.join("a.txt"), "abcde").unwrap();
        fs::write(dst.join("b.txt"), "abc").unwrap();

        let detector = DuplicateDetector::new(DedupPolicy {
            destination_exists: true,
            content: false,
        });
        assert_eq!(
            detector.existing_match(&candidate(&src.join("a.txt")), &dst.join("a.txt")),
            Some(dst.join("a.txt"))
        );
        assert_eq!(
            detector.existing_match(&candidate(&src.join("b.txt")), &dst.join("b.txt")),
            None
        );
        assert_eq!(
            detector.existing_match(&candidate(&src.join("a.txt")), &dst.join("missing.txt")),
            None
        );
    }

    #[test]
    fn test_seed_from_dir_skips_manifest() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("pictures")).unwrap();
        fs::write(dir.path().join("pictures/a.jpg"), "aaa").unwrap();
        fs::write(dir.path().join("b.pdf"), "bbb").unwrap();
        fs::write(dir.path().join(MANIFEST_FILE_NAME), "Scan Date").unwrap();

        let mut detector = DuplicateDetector::new(DedupPolicy::ALL);
        assert_eq!(detector.seed_from_dir(dir.path()), 2);

        fs::write(dir.path().join("copy.jpg"), "aaa").unwrap();
        let fp = detector.fingerprint(&candidate(&dir.path().join("copy.jpg")));
        assert_eq!(
            detector.duplicate_of(fp.as_ref()),
            Some(dir.path().join("pictures/a.jpg").as_path())
        );

        let mut off = DuplicateDetector::new(DedupPolicy::NONE);
        assert_eq!(off.seed_from_dir(dir.path()), 0);
    }
}
