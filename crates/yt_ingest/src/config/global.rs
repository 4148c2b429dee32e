use std::path::PathBuf;
use std::sync::LazyLock;

use clap::Parser;

use crate::config::args::Args;

/// 全局的 ARGS，用来解析命令行参数
pub static ARGS: LazyLock<Args> = LazyLock::new(Args::parse);

/// 全局的 CONFIG_DIR，表示配置文件夹的路径
pub static CONFIG_DIR: LazyLock<PathBuf> = LazyLock::new(|| {
    ARGS.config_dir
        .clone()
        .unwrap_or_else(|| dirs::config_dir().expect("No config path found").join("yt-ingest"))
});
