//! 扫描 → 去重 → 传输 的组合入口

use crate::core::engine::{EngineConfig, TransferEngine};
use crate::core::fingerprint::DedupPolicy;
use crate::core::manifest::Manifest;
use crate::core::scanner::{FileCandidate, FileScanner, ScanIter};
use crate::error::{Error, Result};
use crate::transport::{HttpTransport, LocalTransport, TransferMode, Transport};
use std::path::{Path, PathBuf};
use tracing::warn;

/// 一个带分类的扫描源
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub category: Option<String>,
    pub path: PathBuf,
}

impl SourceSpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            category: None,
            path: path.into(),
        }
    }

    pub fn categorized(category: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            category: Some(category.to_string()),
            path: path.into(),
        }
    }
}

/// 传输前对候选文件的预估
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanEstimate {
    pub files: usize,
    pub bytes: u64,
}

pub struct Pipeline {
    scanner: FileScanner,
    engine: TransferEngine,
}

impl Pipeline {
    pub fn new(scanner: FileScanner, engine: TransferEngine) -> Self {
        Self { scanner, engine }
    }

    pub fn scanner(&self) -> &FileScanner {
        &self.scanner
    }

    pub fn engine(&self) -> &TransferEngine {
        &self.engine
    }

    /// 预先扫描一遍，统计候选文件数量与总大小；缺失的源不计入
    pub fn estimate(&self, sources: &[SourceSpec]) -> ScanEstimate {
        let mut estimate = ScanEstimate::default();
        for source in sources {
            let Ok(scan) = self.scanner.scan(&source.path, source.category.as_deref()) else {
                continue;
            };
            for candidate in scan {
                estimate.files += 1;
                estimate.bytes += candidate.size_bytes;
            }
        }
        estimate
    }

    /// 扫描单个源目录并传输；源目录缺失时直接返回错误，不创建目标目录
    pub async fn run(&self, source: &SourceSpec, transport: &dyn Transport) -> Result<Manifest> {
        let scan = self.scanner.scan(&source.path, source.category.as_deref())?;
        self.engine.run(scan, transport).await
    }

    /// 依次扫描多个源目录，缺失的源只记录警告
    ///
    /// 所有源都缺失时返回第一个缺失源的 `SourceNotFound`。
    pub async fn run_sources(
        &self,
        sources: &[SourceSpec],
        transport: &dyn Transport,
    ) -> Result<Manifest> {
        let mut scans: Vec<ScanIter> = Vec::with_capacity(sources.len());
        let mut first_missing = None;

        for source in sources {
            match self.scanner.scan(&source.path, source.category.as_deref()) {
                Ok(scan) => scans.push(scan),
                Err(Error::SourceNotFound(path)) => {
                    warn!("源目录不存在，跳过: {}", path.display());
                    first_missing.get_or_insert(path);
                }
                Err(e) => return Err(e),
            }
        }

        if scans.is_empty() {
            if let Some(path) = first_missing {
                return Err(Error::SourceNotFound(path));
            }
        }

        self.engine.run(scans.into_iter().flatten(), transport).await
    }
}

/// 把候选文件复制或移动到目标根目录
pub async fn transfer<I>(
    candidates: I,
    destination_root: &Path,
    mode: TransferMode,
    policy: DedupPolicy,
) -> Result<Manifest>
where
    I: IntoIterator<Item = FileCandidate>,
{
    let transport = LocalTransport::new(destination_root, mode);
    let engine = TransferEngine::with_config(EngineConfig {
        dedup: policy,
        ..EngineConfig::default()
    });
    engine.run(candidates, &transport).await
}

/// 把候选文件上传到远端，成功的移入已发送目录
pub async fn upload<I>(
    candidates: I,
    endpoint: &str,
    access_key: &str,
    sent_dir: &Path,
) -> Result<Manifest>
where
    I: IntoIterator<Item = FileCandidate>,
{
    let transport = HttpTransport::new(endpoint, access_key, sent_dir)?;
    // 上传只按本次运行内的内容去重
    let engine = TransferEngine::with_config(EngineConfig {
        dedup: DedupPolicy {
            destination_exists: false,
            content: true,
        },
        seed_from_destination: false,
        ..EngineConfig::default()
    });
    engine.run(candidates, &transport).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::ScanConfig;
    use std::fs;

    #[test]
    fn test_estimate_counts_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let pictures = dir.path().join("Pictures");
        fs::create_dir_all(pictures.join("2024")).unwrap();
        fs::write(pictures.join("cat.jpg"), "meow").unwrap();
        fs::write(pictures.join("2024/dog.jpg"), "woof!").unwrap();

        let pipeline = Pipeline::new(FileScanner::new(), TransferEngine::new());
        let estimate = pipeline.estimate(&[
            SourceSpec::categorized("pictures", &pictures),
            SourceSpec::categorized("movies", dir.path().join("Movies")),
        ]);
        assert_eq!(estimate, ScanEstimate { files: 2, bytes: 9 });
    }

    #[tokio::test]
    async fn test_run_sources_skips_missing() {
        let dir = tempfile::tempdir().unwrap();
        let pictures = dir.path().join("Pictures");
        fs::create_dir_all(&pictures).unwrap();
        fs::write(pictures.join("cat.jpg"), "meow").unwrap();

        let dst = dir.path().join("backup");
        let pipeline = Pipeline::new(FileScanner::new(), TransferEngine::new());
        let transport = LocalTransport::new(&dst, TransferMode::Copy).with_categories(true);

        let manifest = pipeline
            .run_sources(
                &[
                    SourceSpec::categorized("pictures", &pictures),
                    SourceSpec::categorized("movies", dir.path().join("Movies")),
                ],
                &transport,
            )
            .await
            .unwrap();

        assert_eq!(manifest.summary().succeeded, 1);
        assert!(dst.join("pictures/cat.jpg").exists());
    }

    #[tokio::test]
    async fn test_all_sources_missing() {
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("backup");
        let pipeline =
            Pipeline::new(FileScanner::with_config(ScanConfig::default()), TransferEngine::new());
        let transport = LocalTransport::new(&dst, TransferMode::Copy);

        let err = pipeline
            .run_sources(&[SourceSpec::new(dir.path().join("nope"))], &transport)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::SourceNotFound(_)));
        assert!(!dst.exists());
    }
}
