use super::progress::{self, ProgressReporter};
use super::AppContext;
use crate::cli::BackupArgs;
use crate::core::engine::{EngineConfig, TransferEngine};
use crate::core::filter::ExtensionSet;
use crate::core::layout::{
    available_space, default_media_sources, fits_free_space, human_size, latest_run_dir,
    new_run_dir,
};
use crate::core::manifest::Manifest;
use crate::core::pipeline::{Pipeline, ScanEstimate};
use crate::core::scanner::{FileScanner, ScanConfig};
use crate::dirs;
use crate::transport::{LocalTransport, TransferMode};
use anyhow::Context;
use std::path::Path;
use tracing::{info, warn};

const BACKUP_LABEL: &str = "Backup";

/// 把主目录下各媒体目录按分类复制到 U 盘的备份目录
pub async fn run(ctx: &AppContext, args: BackupArgs) -> anyhow::Result<Manifest> {
    let home = match args.home {
        Some(home) => home,
        None => dirs::home_dir().context("无法确定主目录")?,
    };

    let backups = ctx.layout.backups_dir();
    let destination = if args.new_only {
        match latest_run_dir(&backups)? {
            Some(existing) => {
                info!("追加到已有备份: {}", existing.display());
                existing
            }
            None => new_run_dir(&backups, BACKUP_LABEL),
        }
    } else {
        new_run_dir(&backups, BACKUP_LABEL)
    };

    let mut scan_config = ScanConfig::default()
        .with_extensions(ExtensionSet::media())
        .exclude_path(ctx.layout.root());
    for name in &ctx.config.exclude {
        scan_config = scan_config.exclude_subtree(name);
    }

    let bar = progress::bar(0);
    let (progress_tx, reporter) = ProgressReporter::spawn(bar.clone());
    let engine = TransferEngine::with_config(EngineConfig {
        dry_run: args.dry_run,
        ..EngineConfig::default()
    })
    .with_progress(progress_tx);
    let pipeline = Pipeline::new(FileScanner::with_config(scan_config), engine);
    let transport = LocalTransport::new(&destination, TransferMode::Copy).with_categories(true);

    let sources = default_media_sources(&home);
    let estimate = pipeline.estimate(&sources);
    bar.set_length(estimate.files as u64);
    check_free_space(&destination, &estimate);

    let result = pipeline.run_sources(&sources, &transport).await;
    drop(pipeline);
    reporter.finish().await;
    let manifest = result?;

    if !manifest.dry_run {
        println!("位置: {}", destination.display());
    }
    Ok(manifest)
}

/// 预计写入量超过可用空间的 90% 时给出警告，不中断备份
fn check_free_space(destination: &Path, estimate: &ScanEstimate) {
    let free = match available_space(destination) {
        Ok(free) => free,
        Err(e) => {
            warn!("无法获取可用空间: {} - {}", destination.display(), e);
            return;
        }
    };

    info!(
        "预计备份 {} 个文件 ({})，U 盘可用空间 {}",
        estimate.files,
        human_size(estimate.bytes),
        human_size(free)
    );
    if !fits_free_space(estimate.bytes, free) {
        warn!(
            "空间可能不足: 预计需要 {}，可用 {}",
            human_size(estimate.bytes),
            human_size(free)
        );
        println!(
            "警告: 空间可能不足，预计需要 {}，可用 {}",
            human_size(estimate.bytes),
            human_size(free)
        );
    }
}
