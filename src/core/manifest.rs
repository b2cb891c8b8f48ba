//! 传输清单
//!
//! 每次运行的决策按顺序追加，记录一旦写入不会撤回。

use crate::core::scanner::FileCandidate;
use crate::error::{FailureKind, TransferError};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};

/// 清单文件名（位于目标根目录）
pub const MANIFEST_FILE_NAME: &str = "manifest.txt";

/// 判定为重复的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateReason {
    /// 目标位置已有同名同大小文件
    SameNameAndSize,
    /// 本次运行中已有相同指纹
    ContentMatch,
}

/// 传输结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransferOutcome {
    Succeeded,
    SkippedDuplicate { reason: DuplicateReason },
    Failed { kind: FailureKind, detail: String },
}

impl DuplicateReason {
    pub fn label(&self) -> &'static str {
        match self {
            DuplicateReason::SameNameAndSize => "same_name_and_size",
            DuplicateReason::ContentMatch => "content_match",
        }
    }
}

impl TransferOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            TransferOutcome::Succeeded => "succeeded",
            TransferOutcome::SkippedDuplicate { .. } => "skipped_duplicate",
            TransferOutcome::Failed { .. } => "failed",
        }
    }
}

/// 单个文件的传输记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferRecord {
    pub source_path: PathBuf,
    /// 成功时为最终路径；跳过时为与之重复的已有文件；失败时为空
    pub destination_path: Option<PathBuf>,
    pub size_bytes: u64,
    #[serde(flatten)]
    pub outcome: TransferOutcome,
}

impl TransferRecord {
    pub fn succeeded(candidate: &FileCandidate, destination: PathBuf) -> Self {
        Self {
            source_path: candidate.source_path.clone(),
            destination_path: Some(destination),
            size_bytes: candidate.size_bytes,
            outcome: TransferOutcome::Succeeded,
        }
    }

    pub fn skipped(
        candidate: &FileCandidate,
        destination: Option<PathBuf>,
        reason: DuplicateReason,
    ) -> Self {
        Self {
            source_path: candidate.source_path.clone(),
            destination_path: destination,
            size_bytes: candidate.size_bytes,
            outcome: TransferOutcome::SkippedDuplicate { reason },
        }
    }

    pub fn failed(candidate: &FileCandidate, error: &TransferError) -> Self {
        Self {
            source_path: candidate.source_path.clone(),
            destination_path: None,
            size_bytes: candidate.size_bytes,
            outcome: TransferOutcome::Failed {
                kind: error.kind(),
                detail: error.to_string(),
            },
        }
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self.outcome, TransferOutcome::Succeeded)
    }
}

/// 运行统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferSummary {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub bytes_transferred: u64,
}

/// 一次运行的清单
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub run_id: String,
    pub transport: String,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
    pub dry_run: bool,
    records: Vec<TransferRecord>,
}

impl Manifest {
    pub fn new(transport: &str, dry_run: bool) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            transport: transport.to_string(),
            started_at: Local::now(),
            finished_at: None,
            dry_run,
            records: Vec::new(),
        }
    }

    /// 追加一条记录
    pub fn push(&mut self, record: TransferRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[TransferRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Local::now());
    }

    pub fn summary(&self) -> TransferSummary {
        let mut summary = TransferSummary {
            total: self.records.len(),
            ..Default::default()
        };
        for record in &self.records {
            match record.outcome {
                TransferOutcome::Succeeded => {
                    summary.succeeded += 1;
                    summary.bytes_transferred += record.size_bytes;
                }
                TransferOutcome::SkippedDuplicate { .. } => summary.skipped += 1,
                TransferOutcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }

    /// 成功写入的目标路径
    pub fn succeeded_destinations(&self) -> Vec<&Path> {
        self.records
            .iter()
            .filter(|r| r.is_succeeded())
            .filter_map(|r| r.destination_path.as_deref())
            .collect()
    }

    /// 生成可读文本
    pub fn render(&self) -> String {
        let summary = self.summary();
        let mut out = String::new();

        let _ = writeln!(out, "Scan Date: {}", self.started_at.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out, "Run: {}  Transport: {}", self.run_id, self.transport);
        let _ = writeln!(
            out,
            "Total: {}  Succeeded: {}  Skipped: {}  Failed: {}",
            summary.total, summary.succeeded, summary.skipped, summary.failed
        );
        let _ = writeln!(out, "{}", "-".repeat(40));

        for record in &self.records {
            let _ = writeln!(
                out,
                "[{}] Source: {}",
                record.outcome.label(),
                record.source_path.display()
            );
            if let Some(dest) = &record.destination_path {
                let _ = writeln!(out, "    Dest:   {}", dest.display());
            }
            match &record.outcome {
                TransferOutcome::SkippedDuplicate { reason } => {
                    let _ = writeln!(out, "    Reason: {}", reason.label());
                }
                TransferOutcome::Failed { kind, detail } => {
                    let _ = writeln!(out, "    Error:  [{}] {}", kind, detail);
                }
                TransferOutcome::Succeeded => {}
            }
            out.push('\n');
        }

        out
    }

    /// 写入 `dir/manifest.txt`，同一次运行只写一次
    pub fn persist(&self, dir: &Path) -> io::Result<PathBuf> {
        let path = dir.join(MANIFEST_FILE_NAME);
        std::fs::write(&path, self.render())?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, size: u64) -> FileCandidate {
        FileCandidate {
            source_path: PathBuf::from("/src").join(name),
            name: name.to_string(),
            size_bytes: size,
            modified_time: 0,
            category: None,
        }
    }

    #[test]
    fn test_summary_counts_add_up() {
        let mut manifest = Manifest::new("local", false);
        manifest.push(TransferRecord::succeeded(
            &candidate("a.jpg", 10),
            PathBuf::from("/dst/a.jpg"),
        ));
        manifest.push(TransferRecord::skipped(
            &candidate("b.jpg", 20),
            None,
            DuplicateReason::ContentMatch,
        ));
        manifest.push(TransferRecord::failed(&candidate("c.jpg", 30), &TransferError::Timeout(30)));

        let summary = manifest.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded + summary.skipped + summary.failed, summary.total);
        assert_eq!(summary.bytes_transferred, 10);
        assert_eq!(manifest.succeeded_destinations(), vec![Path::new("/dst/a.jpg")]);
    }

    #[test]
    fn test_render_and_persist() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = Manifest::new("local", false);
        manifest.push(TransferRecord::succeeded(&candidate("a.jpg", 10), dir.path().join("a.jpg")));
        manifest.push(TransferRecord::skipped(
            &candidate("c.jpg", 10),
            Some(dir.path().join("a.jpg")),
            DuplicateReason::ContentMatch,
        ));
        manifest.push(TransferRecord::failed(
            &candidate("b.jpg", 1),
            &TransferError::HttpStatus {
                status: 500,
                body: "oops".to_string(),
            },
        ));

        let path = manifest.persist(dir.path()).unwrap();
        assert_eq!(path, dir.path().join(MANIFEST_FILE_NAME));

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Scan Date: "));
        assert!(text.contains("Total: 3  Succeeded: 1  Skipped: 1  Failed: 1"));
        assert!(text.contains("[succeeded] Source: /src/a.jpg"));
        assert!(text.contains("Reason: content_match"));
        assert!(text.contains("[http_status_error] HTTP 500: oops"));
        // 失败记录没有目标路径
        let failed_block = text.split("[failed] Source: /src/b.jpg").nth(1).unwrap();
        assert!(!failed_block.contains("Dest:"));

        // 再次写入会覆盖而不是追加
        manifest.persist(dir.path()).unwrap();
        let again = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, again);
    }

    #[test]
    fn test_record_serializes_outcome_inline() {
        let record = TransferRecord::skipped(
            &candidate("a.jpg", 1),
            Some(PathBuf::from("/dst/a.jpg")),
            DuplicateReason::SameNameAndSize,
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["outcome"], "skipped_duplicate");
        assert_eq!(json["reason"], "same_name_and_size");
    }
}
