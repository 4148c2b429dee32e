use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "yt-ingest", version, about, long_about = None)]
pub struct Args {
    #[arg(short, long, default_value = "None,yt_ingest=info", env = "RUST_LOG")]
    pub log_level: String,

    #[arg(short, long, env = "YT_INGEST_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// 覆盖配置文件中的 bind_address
    #[arg(short, long, env = "YT_INGEST_BIND_ADDRESS")]
    pub bind_address: Option<String>,
}
