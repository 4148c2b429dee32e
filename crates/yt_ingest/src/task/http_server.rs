use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Extension;

use crate::api::{AuthToken, router};
use crate::service::VideoService;
use crate::utils::signal::terminate;

pub async fn http_server(service: Arc<VideoService>, bind_address: &str, auth_token: &str) -> Result<()> {
    let app = router()
        .layer(Extension(service))
        .layer(Extension(AuthToken(Arc::from(auth_token))));
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("bind address {bind_address} failed"))?;
    info!("HTTP 服务已启动：http://{bind_address}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            match terminate().await {
                Ok(signal) => info!("接收到 {signal}，正在停止服务.."),
                Err(e) => {
                    error!("监听退出信号失败：{e:#}");
                    std::future::pending::<()>().await;
                }
            }
        })
        .await
        .context("http server exited unexpectedly")
}
