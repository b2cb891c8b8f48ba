use super::progress::{self, ProgressReporter};
use super::AppContext;
use crate::cli::BeamArgs;
use crate::core::engine::{EngineConfig, TransferEngine};
use crate::core::fingerprint::DedupPolicy;
use crate::core::manifest::Manifest;
use crate::core::pipeline::{Pipeline, SourceSpec};
use crate::core::scanner::{FileScanner, ScanConfig};
use crate::transport::HttpTransport;
use tracing::info;

/// 上传待上传目录中尚未发送的文件
pub async fn run(ctx: &AppContext, args: BeamArgs) -> anyhow::Result<Manifest> {
    let mut config = ctx.config.clone();
    if let Some(endpoint) = args.endpoint {
        config.endpoint = Some(endpoint);
    }
    config.validate()?;

    let endpoint = config.endpoint();
    let sent_dir = ctx.layout.sent_dir();
    info!("上传目标: {}", endpoint);

    let scan_config = ScanConfig::default().exclude_subtree("sent");
    let engine = TransferEngine::with_config(EngineConfig {
        dedup: DedupPolicy {
            destination_exists: false,
            content: true,
        },
        seed_from_destination: false,
        ..EngineConfig::default()
    });

    let transport =
        HttpTransport::with_timeout(&endpoint, &config.access_key, &sent_dir, config.timeout_secs)?;
    let (progress_tx, reporter) = ProgressReporter::spawn(progress::spinner());
    let pipeline = Pipeline::new(
        FileScanner::with_config(scan_config),
        engine.with_progress(progress_tx),
    );
    let result = pipeline
        .run(&SourceSpec::new(ctx.layout.transfer_zone()), &transport)
        .await;
    drop(pipeline);
    reporter.finish().await;

    Ok(result?)
}
