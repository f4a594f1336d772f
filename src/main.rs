use anyhow::Context;
use std::sync::Arc;

mod api;
mod state;

use fulltext_index::{config, dataset, index, telemetry};
use state::AppState;

/// Resolves on Ctrl-C / 等待退出信号
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing("fulltext_index=debug,fts_server=debug,tower_http=debug");

    // Load configuration / 加载配置
    let app_config = config::load_config().map_err(anyhow::Error::msg)?;
    tracing::info!("Server will listen on {}:{}", app_config.server.host, app_config.server.port);

    // Create data directory if not exists / 创建数据目录
    if let Some(data_dir) = app_config.get_data_dir() {
        if !data_dir.exists() {
            std::fs::create_dir_all(&data_dir)?;
            tracing::info!("Created data directory: {:?}", data_dir);
        }
    }

    // Initial dataset / 初始数据
    let attrs = match &app_config.index.dataset {
        Some(path) => dataset::load::<i64, String>(path)
            .await
            .with_context(|| format!("Failed to load dataset {}", path))?,
        None => Vec::new(),
    };

    let index_config = app_config.index_config()?;
    let index = index::new(&attrs, index_config)
        .await
        .map_err(|e| e.into_inner())
        .context("Failed to open index")?;
    tracing::info!("Index ready: {:?}", index::layers(index.as_ref()));

    let state = Arc::new(AppState::new(index, app_config.clone()));
    let app = api::router(state.clone());

    let bind_addr = app_config.get_bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server running at http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Release the index and the metrics endpoint / 释放索引与指标端点
    state.index.shutdown().await?;
    tracing::info!("Index shut down");

    Ok(())
}
