use super::progress::{self, ProgressReporter};
use super::AppContext;
use crate::cli::ImportArgs;
use crate::core::engine::{EngineConfig, TransferEngine};
use crate::core::filter::ExtensionSet;
use crate::core::fingerprint::DedupPolicy;
use crate::core::layout::new_run_dir;
use crate::core::manifest::Manifest;
use crate::core::pipeline::{Pipeline, SourceSpec};
use crate::core::scanner::{FileScanner, ScanConfig};
use crate::transport::{LocalTransport, TransferMode};
use tracing::info;

/// 导入目录时使用的分类标签
const IMPORT_LABEL: &str = "Import";

/// 扫描源目录，把匹配的文件放进待上传目录下新的导入目录
pub async fn run(ctx: &AppContext, args: ImportArgs) -> anyhow::Result<Manifest> {
    let extensions = if ctx.config.extensions.is_empty() {
        ExtensionSet::documents()
    } else {
        ctx.config.extensions.iter().collect()
    };

    let mut scan_config = ScanConfig::default()
        .with_extensions(extensions)
        .exclude_path(ctx.layout.root());
    for name in &ctx.config.exclude {
        scan_config = scan_config.exclude_subtree(name);
    }

    let (progress_tx, reporter) = ProgressReporter::spawn(progress::spinner());
    let engine = TransferEngine::with_config(EngineConfig {
        dedup: DedupPolicy {
            destination_exists: true,
            content: !args.no_content_dedup,
        },
        dry_run: args.dry_run,
        ..EngineConfig::default()
    })
    .with_progress(progress_tx);

    let mode = if args.move_files {
        TransferMode::Move
    } else {
        TransferMode::Copy
    };
    let destination = new_run_dir(&ctx.layout.transfer_zone(), IMPORT_LABEL);
    info!("导入 {} -> {} ({})", args.source.display(), destination.display(), mode);

    let pipeline = Pipeline::new(FileScanner::with_config(scan_config), engine);
    let transport = LocalTransport::new(&destination, mode);
    let result = pipeline.run(&SourceSpec::new(&args.source), &transport).await;
    drop(pipeline);
    reporter.finish().await;
    let manifest = result?;

    if !manifest.dry_run {
        println!("位置: {}", destination.display());
    }
    Ok(manifest)
}
