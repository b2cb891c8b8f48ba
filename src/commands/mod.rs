//! 命令行子命令

pub mod backup;
pub mod beam;
pub mod config;
pub mod import;
pub mod progress;

use crate::cli::Commands;
use crate::config::BeamConfig;
use crate::core::layout::{human_size, StickLayout};
use crate::core::manifest::{Manifest, TransferOutcome};

/// 命令共享的运行环境
#[derive(Debug, Clone)]
pub struct AppContext {
    pub layout: StickLayout,
    pub config: BeamConfig,
}

impl AppContext {
    pub fn new(layout: StickLayout) -> Self {
        let config = BeamConfig::load(&layout.config_file());
        Self::with_config(layout, config)
    }

    pub fn with_config(layout: StickLayout, config: BeamConfig) -> Self {
        Self { layout, config }
    }
}

pub async fn execute(command: Commands, ctx: &mut AppContext) -> anyhow::Result<()> {
    match command {
        Commands::Import(args) => import::run(ctx, args).await.map(|m| print_report(&m)),
        Commands::Backup(args) => backup::run(ctx, args).await.map(|m| print_report(&m)),
        Commands::Beam(args) => beam::run(ctx, args).await.map(|m| print_report(&m)),
        Commands::Config(cmd) => config::run(ctx, cmd),
    }
}

/// 打印运行结果
pub fn print_report(manifest: &Manifest) {
    for record in manifest.records() {
        if let TransferOutcome::Failed { detail, .. } = &record.outcome {
            println!("  失败: {} - {}", record.source_path.display(), detail);
        }
    }

    let summary = manifest.summary();
    let verb = if manifest.dry_run { "计划传输" } else { "已传输" };
    println!(
        "{}: {} 个文件 ({}), 跳过重复 {} 个, 失败 {} 个",
        verb,
        summary.succeeded,
        human_size(summary.bytes_transferred),
        summary.skipped,
        summary.failed
    );
}
