//! 终端进度条，消费引擎发出的进度事件

use crate::core::engine::TransferProgress;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// 进度通道容量
const PROGRESS_CHANNEL_SIZE: usize = 64;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// 后台刷新进度条的任务
pub struct ProgressReporter {
    bar: ProgressBar,
    handle: JoinHandle<()>,
}

impl ProgressReporter {
    /// 启动进度任务，返回交给引擎的发送端
    ///
    /// 所有发送端释放后任务结束并清除进度条。
    pub fn spawn(bar: ProgressBar) -> (mpsc::Sender<TransferProgress>, Self) {
        let (tx, mut rx) = mpsc::channel::<TransferProgress>(PROGRESS_CHANNEL_SIZE);

        let task_bar = bar.clone();
        let handle = tokio::spawn(async move {
            while let Some(progress) = rx.recv().await {
                task_bar.set_position(progress.processed as u64);
                task_bar.set_message(format!(
                    "{} | 成功 {} 跳过 {} 失败 {}",
                    progress.current_file, progress.succeeded, progress.skipped, progress.failed
                ));
            }
            task_bar.finish_and_clear();
        });

        (tx, Self { bar, handle })
    }

    /// 等待进度任务收尾；调用前必须先释放引擎
    pub async fn finish(self) {
        if self.handle.await.is_err() {
            self.bar.finish_and_clear();
        }
    }
}

/// 总数未知时的旋转指示器
pub fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} [{pos}] {msg}") {
        pb.set_style(style.tick_chars(TICK_CHARS));
    }
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// 总数已知时的进度条
pub fn bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::with_template(
        "  {spinner:.cyan} [{bar:30.cyan/dim}] {pos}/{len} {msg}",
    ) {
        pb.set_style(style.progress_chars("━╸─").tick_chars(TICK_CHARS));
    }
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}
