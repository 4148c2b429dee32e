#[macro_use]
extern crate tracing;

mod adapter;
mod api;
mod cache;
mod config;
mod fallback;
mod service;
mod task;
mod utils;
mod workflow;
mod youtube;

use std::sync::{Arc, LazyLock};

use anyhow::Result;

use crate::config::{ARGS, CONFIG_DIR, Config};
use crate::service::VideoService;
use crate::task::http_server;
use crate::utils::init_logger;

#[tokio::main]
async fn main() {
    LazyLock::force(&ARGS);
    init_logger(&ARGS.log_level);
    info!("欢迎使用 yt-ingest-rs v{}", env!("CARGO_PKG_VERSION"));
    if let Err(e) = run().await {
        error!("服务异常退出：{e:#}");
        std::process::exit(1);
    }
    info!("服务已停止");
}

async fn run() -> Result<()> {
    let mut config = Config::load(&CONFIG_DIR)?;
    if let Some(bind_address) = &ARGS.bind_address {
        config.bind_address = bind_address.clone();
    }
    config.check()?;
    info!("配置文件位于 {}", CONFIG_DIR.join("config.toml").display());
    let service = Arc::new(VideoService::from_config(&config)?);
    http_server(service, &config.bind_address, &config.auth_token).await
}
