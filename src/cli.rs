use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "stickbeam", version)]
#[command(about = "U 盘文件导入、媒体备份与上传工具", long_about = None)]
pub struct Cli {
    /// U 盘根目录（默认为可执行文件所在目录）
    #[arg(long, global = true, env = "STICKBEAM_ROOT")]
    pub root: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// 把源目录中的文档导入到待上传目录
    Import(ImportArgs),
    /// 备份主目录下的媒体文件
    Backup(BackupArgs),
    /// 上传待上传目录中的文件到基地
    Beam(BeamArgs),
    /// 查看或修改配置
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// 要扫描的目录
    pub source: PathBuf,

    /// 移动而不是复制
    #[arg(long = "move")]
    pub move_files: bool,

    /// 不按内容去重
    #[arg(long)]
    pub no_content_dedup: bool,

    /// 只列出计划，不写入
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct BackupArgs {
    /// 追加到最近一次的备份目录，跳过已备份的文件
    #[arg(long)]
    pub new_only: bool,

    /// 只列出计划，不写入
    #[arg(long)]
    pub dry_run: bool,

    /// 主目录（默认读取 HOME）
    #[arg(long)]
    pub home: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct BeamArgs {
    /// 覆盖配置中的上传地址
    #[arg(long)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// 打印当前配置
    Show,
    /// 修改配置并保存
    Set {
        #[arg(long)]
        base_ip: Option<String>,
        #[arg(long)]
        access_key: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        endpoint: Option<String>,
    },
}
