use anyhow::Context;
use clap::Parser;
use stickbeam_lib::cli::Cli;
use stickbeam_lib::commands::{self, AppContext};
use stickbeam_lib::config::BeamConfig;
use stickbeam_lib::core::layout::StickLayout;
use stickbeam_lib::dirs;
use stickbeam_lib::logging::init_logging;
use tracing::{error, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let root = match cli.root {
        Some(root) => root,
        None => dirs::stick_root().context("无法确定 U 盘根目录，请使用 --root 指定")?,
    };
    let layout = StickLayout::new(root);

    // 日志配置来自配置文件，解析失败要等日志就绪后再报告
    let loaded = BeamConfig::try_load(&layout.config_file());
    let log_config = loaded.as_ref().map(|c| c.log.clone()).unwrap_or_default();
    let _guard = init_logging(&layout.log_dir(), &log_config, cli.verbose);

    let config = loaded.unwrap_or_else(|e| {
        warn!("{}，使用默认配置", e);
        BeamConfig::default()
    });
    let mut ctx = AppContext::with_config(layout, config);

    if let Err(e) = commands::execute(cli.command, &mut ctx).await {
        error!("{:#}", e);
        return Err(e);
    }

    Ok(())
}
