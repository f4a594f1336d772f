//! Prometheus metrics sink / Prometheus 指标
//!
//! `PromMetrics` implements the indexer's `Metrics` trait on its own registry and
//! can expose it on `GET /metrics` in the OpenMetrics text format. Latency
//! observations made inside a traced call carry the span id as an exemplar.
//! The endpoint is owned by the sink and stopped by `Metrics::shutdown`.

#[cfg(target_os = "linux")]
mod process;
mod server;

use async_trait::async_trait;
use parking_lot::Mutex;
use prometheus_client::encoding::{text, EncodeLabelSet};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::exemplar::HistogramWithExemplars;
use prometheus_client::registry::Registry;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::index::{Metrics, Result};
use crate::telemetry;
use server::ServerHandle;

/// Port of the default metrics endpoint / 默认指标端口
pub const DEFAULT_PORT: u16 = 8080;

/// Latency buckets in seconds, 10µs to 10s / 延迟分桶（秒）
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5,
    1.0, 2.5, 5.0, 10.0,
];

/// Exemplar labels: the span the observation was made in / 样本关联的链路
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct TraceLabel {
    pub trace_id: String,
}

impl TraceLabel {
    fn from_span_id(id: u64) -> Self {
        Self {
            trace_id: format!("{:016x}", id),
        }
    }
}

/// Counters and histogram of one operation
struct Series {
    total: Counter,
    failed: Counter,
    latency: HistogramWithExemplars<TraceLabel>,
}

impl Series {
    /// `what` names the operation, `prefix` its series ("search", "searches")
    fn register(registry: &mut Registry, what: &str, prefix: &str) -> Self {
        let series = Self {
            total: Counter::default(),
            failed: Counter::default(),
            latency: HistogramWithExemplars::new(LATENCY_BUCKETS.iter().copied()),
        };

        registry.register(
            format!("{prefix}_received"),
            format!("Count of the {what} requests received by the index"),
            series.total.clone(),
        );
        registry.register(
            format!("{prefix}_failed"),
            format!("Count of the failed {what} requests"),
            series.failed.clone(),
        );
        registry.register(
            format!("{what}_handling_latency_seconds"),
            format!("Histogram of {what} request handling latencies"),
            series.latency.clone(),
        );

        series
    }

    fn observe(&self, dur: Duration) {
        let exemplar = telemetry::current_span_id().map(TraceLabel::from_span_id);
        self.latency.observe(dur.as_secs_f64(), exemplar);
    }
}

/// Prometheus-backed metrics sink / Prometheus 指标记录器
pub struct PromMetrics {
    registry: Arc<Registry>,
    search: Series,
    insert: Series,
    delete: Series,
    server: Mutex<Option<ServerHandle>>,
}

impl PromMetrics {
    /// Sink with its own registry and no HTTP endpoint / 创建（不启动 HTTP 端点）
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let search = Series::register(&mut registry, "search", "searches");
        let insert = Series::register(&mut registry, "insert", "inserts");
        let delete = Series::register(&mut registry, "delete", "deletes");

        #[cfg(target_os = "linux")]
        registry.register_collector(Box::new(process::ProcessStats::for_self()));

        Self {
            registry: Arc::new(registry),
            search,
            insert,
            delete,
            server: Mutex::new(None),
        }
    }

    /// Sink serving `GET /metrics` on `0.0.0.0:port` / 创建并启动 HTTP 端点
    ///
    /// Port 0 picks a free port, see [`PromMetrics::local_addr`]. Must be called
    /// from within a tokio runtime.
    pub fn serve(port: u16) -> Result<Self> {
        let metrics = Self::new();
        let handle = server::start(metrics.registry.clone(), port)?;

        tracing::info!("Metrics endpoint listening on http://{}/metrics", handle.addr);
        *metrics.server.lock() = Some(handle);

        Ok(metrics)
    }

    /// Address of the running endpoint, if any
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.lock().as_ref().map(|h| h.addr)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Current state in the OpenMetrics text format / 文本格式导出
    pub fn render(&self) -> Result<String> {
        encode(&self.registry)
    }
}

impl Default for PromMetrics {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn encode(registry: &Registry) -> Result<String> {
    let mut buf = String::new();
    text::encode(&mut buf, registry)?;
    Ok(buf)
}

#[async_trait]
impl Metrics for PromMetrics {
    fn inc_searches_total(&self) {
        self.search.total.inc();
    }

    fn inc_searches_failed(&self) {
        self.search.failed.inc();
    }

    fn observe_search_latency(&self, dur: Duration) {
        self.search.observe(dur);
    }

    fn inc_inserts_total(&self) {
        self.insert.total.inc();
    }

    fn inc_inserts_failed(&self) {
        self.insert.failed.inc();
    }

    fn observe_insert_latency(&self, dur: Duration) {
        self.insert.observe(dur);
    }

    fn inc_deletes_total(&self) {
        self.delete.total.inc();
    }

    fn inc_deletes_failed(&self) {
        self.delete.failed.inc();
    }

    fn observe_delete_latency(&self, dur: Duration) {
        self.delete.observe(dur);
    }

    /// Stops the endpoint and waits for it; without one there is nothing to do.
    async fn shutdown(&self) -> Result<()> {
        let handle = self.server.lock().take();

        match handle {
            Some(handle) => handle.stop().await,
            None => Ok(()),
        }
    }
}
