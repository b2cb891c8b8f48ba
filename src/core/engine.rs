use crate::core::conflict::CollisionResolver;
use crate::core::fingerprint::{DedupPolicy, DuplicateDetector};
use crate::core::manifest::{DuplicateReason, Manifest, TransferRecord, TransferSummary};
use crate::core::scanner::FileCandidate;
use crate::error::Result;
use crate::transport::Transport;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// 传输引擎配置
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// 重复判定策略
    pub dedup: DedupPolicy,
    /// 只规划不写入
    pub dry_run: bool,
    /// 运行开始时把输出目录已有文件的指纹加入集合
    pub seed_from_destination: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dedup: DedupPolicy::ALL,
            dry_run: false,
            seed_from_destination: true,
        }
    }
}

/// 传输进度
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferProgress {
    pub current_file: String,
    pub processed: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub bytes_transferred: u64,
}

/// 传输引擎，严格按扫描顺序逐个处理候选文件
pub struct TransferEngine {
    config: EngineConfig,
    progress_tx: Option<mpsc::Sender<TransferProgress>>,
}

impl TransferEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            progress_tx: None,
        }
    }

    pub fn with_progress(mut self, tx: mpsc::Sender<TransferProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 执行一次传输运行
    ///
    /// 单个文件的失败只会记入清单；只有输出目录无法准备时返回错误。
    pub async fn run<I>(&self, candidates: I, transport: &dyn Transport) -> Result<Manifest>
    where
        I: IntoIterator<Item = FileCandidate>,
    {
        info!(
            "开始传输: {} (dry_run={}, 策略={:?})",
            transport.name(),
            self.config.dry_run,
            self.config.dedup
        );

        if !self.config.dry_run {
            transport.prepare().await?;
        }

        let mut detector = DuplicateDetector::new(self.config.dedup);
        if self.config.seed_from_destination {
            detector.seed_from_dir(transport.output_root());
        }

        let mut manifest = Manifest::new(transport.name(), self.config.dry_run);
        // dry run 时记录已规划的路径，避免规划出同名目标
        let mut reserved: HashSet<PathBuf> = HashSet::new();

        for candidate in candidates {
            let record = self
                .process(&candidate, transport, &mut detector, &mut reserved)
                .await;
            manifest.push(record);
            self.send_progress(&manifest, &candidate).await;
        }

        manifest.finish();
        let summary = manifest.summary();

        if transport.writes_manifest() && !self.config.dry_run {
            match manifest.persist(transport.output_root()) {
                Ok(path) => debug!("清单已写入: {}", path.display()),
                Err(e) => warn!("无法写入清单文件: {}", e),
            }
        }

        info!(
            "传输完成: {} - 成功 {}, 跳过 {}, 失败 {}, 共 {}",
            transport.name(),
            summary.succeeded,
            summary.skipped,
            summary.failed,
            summary.total
        );

        Ok(manifest)
    }

    /// 处理单个候选文件，结果总是一条记录
    async fn process(
        &self,
        candidate: &FileCandidate,
        transport: &dyn Transport,
        detector: &mut DuplicateDetector,
        reserved: &mut HashSet<PathBuf>,
    ) -> TransferRecord {
        let desired = transport.destination_for(candidate);

        if let Some(existing) = detector.existing_match(candidate, &desired) {
            debug!("目标已存在同名同大小文件，跳过: {}", candidate.source_path.display());
            return TransferRecord::skipped(
                candidate,
                Some(existing),
                DuplicateReason::SameNameAndSize,
            );
        }

        let fingerprint = detector.fingerprint(candidate);
        if let Some(original) = detector.duplicate_of(fingerprint.as_ref()) {
            debug!(
                "内容重复，跳过: {} (与 {} 相同)",
                candidate.source_path.display(),
                original.display()
            );
            let original = original.to_path_buf();
            return TransferRecord::skipped(
                candidate,
                Some(original),
                DuplicateReason::ContentMatch,
            );
        }

        if self.config.dry_run {
            let planned =
                CollisionResolver::resolve_with(&desired, |p| p.exists() || reserved.contains(p));
            reserved.insert(planned.clone());
            detector.remember(fingerprint, &planned);
            return TransferRecord::succeeded(candidate, planned);
        }

        match transport.deliver(candidate, &desired).await {
            Ok(final_path) => {
                debug!("{} -> {}", candidate.source_path.display(), final_path.display());
                detector.remember(fingerprint, &final_path);
                TransferRecord::succeeded(candidate, final_path)
            }
            Err(e) => {
                warn!("传输失败: {} - {}", candidate.source_path.display(), e);
                TransferRecord::failed(candidate, &e)
            }
        }
    }

    /// 发送进度更新
    async fn send_progress(&self, manifest: &Manifest, candidate: &FileCandidate) {
        if let Some(tx) = &self.progress_tx {
            let TransferSummary {
                total,
                succeeded,
                skipped,
                failed,
                bytes_transferred,
            } = manifest.summary();
            let _ = tx
                .send(TransferProgress {
                    current_file: candidate.name.clone(),
                    processed: total,
                    succeeded,
                    skipped,
                    failed,
                    bytes_transferred,
                })
                .await;
        }
    }
}

impl Default for TransferEngine {
    fn default() -> Self {
        Self::new()
    }
}
