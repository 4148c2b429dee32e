use std::io;

use tokio::signal;

/// 等待退出信号，返回信号名称用于日志
#[cfg(target_family = "windows")]
pub async fn terminate() -> io::Result<&'static str> {
    signal::ctrl_c().await.map(|_| "ctrl-c")
}

/// 终端中的 ctrl + c 是 SIGINT，容器停止时收到的是 SIGTERM
#[cfg(target_family = "unix")]
pub async fn terminate() -> io::Result<&'static str> {
    use signal::unix::{SignalKind, signal as listen};

    let mut sigterm = listen(SignalKind::terminate())?;
    let mut sigint = listen(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => Ok("SIGTERM"),
        _ = sigint.recv() => Ok("SIGINT"),
    }
}
