//! HTTP scrape endpoint / 指标 HTTP 端点

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use prometheus_client::registry::Registry;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::index::{IndexError, Result};

/// Scrapes taking longer than this are answered with 408
const SCRAPE_TIMEOUT: Duration = Duration::from_secs(15);

const OPENMETRICS_CONTENT_TYPE: &str =
    "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Running endpoint: address, stop signal and serving task / 运行中的端点
pub(crate) struct ServerHandle {
    pub addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

impl ServerHandle {
    /// Signal graceful shutdown and wait for in-flight scrapes / 优雅关闭
    pub async fn stop(self) -> Result<()> {
        // Receiver gone means the server already exited; the join below reports why
        let _ = self.stop.send(());

        match self.task.await {
            Ok(Ok(())) => {
                tracing::info!("Metrics endpoint on {} stopped", self.addr);
                Ok(())
            }
            Ok(Err(e)) => Err(e.into()),
            Err(e) => Err(IndexError::server(format!("metrics server task failed: {}", e))),
        }
    }
}

fn router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/metrics", get(scrape))
        .layer(TimeoutLayer::new(SCRAPE_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}

/// GET /metrics
async fn scrape(State(registry): State<Arc<Registry>>) -> Response {
    match super::encode(&registry) {
        Ok(body) => ([(header::CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Bind `0.0.0.0:port` and serve the registry on a runtime task / 绑定端口并启动
///
/// Binding happens synchronously so that a taken port is reported to the caller.
pub(crate) fn start(registry: Arc<Registry>, port: u16) -> Result<ServerHandle> {
    let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
        IndexError::server(format!("metrics endpoint needs a tokio runtime: {}", e))
    })?;

    let std_listener = std::net::TcpListener::bind(("0.0.0.0", port))?;
    std_listener.set_nonblocking(true)?;
    let addr = std_listener.local_addr()?;

    let listener = {
        let _guard = runtime.enter();
        tokio::net::TcpListener::from_std(std_listener)?
    };

    let (stop, stopped) = oneshot::channel::<()>();
    let app = router(registry);

    let task = runtime.spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = stopped.await;
            })
            .await
    });

    Ok(ServerHandle { addr, stop, task })
}
