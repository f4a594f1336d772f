//! Logging and tracing setup / 日志与链路追踪初始化
//!
//! Decorators write to a `tracing::Dispatch` they own. The helpers here build
//! those dispatches, and `init_tracing` installs the process-wide subscriber used
//! by the binary.

use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::Dispatch;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Service name reported in logs and spans / 服务名
pub const SERVICE_NAME: &str = "full-text-search";

tokio::task_local! {
    /// Span id of the innermost traced indexer call
    static TRACE_SPAN_ID: Option<u64>;
}

/// Run `fut` with `span_id` reported by [`current_span_id`] / 在指定 span 下执行
///
/// The trace decorator's spans live in its own dispatch, which the caller's
/// subscriber can't see. Inner layers learn the span id from here instead.
pub async fn scope_span_id<F: Future>(span_id: Option<u64>, fut: F) -> F::Output {
    TRACE_SPAN_ID.scope(span_id, fut).await
}

/// Id of the enclosing traced call, else of the caller's current span / 当前 span id
pub fn current_span_id() -> Option<u64> {
    TRACE_SPAN_ID
        .try_with(|id| *id)
        .ok()
        .flatten()
        .or_else(|| tracing::Span::current().id().map(|id| id.into_u64()))
}

/// Log output format / 日志格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Plain-text logs on stderr at INFO / 默认日志输出
pub fn default_log_dispatch() -> Dispatch {
    log_dispatch(LogFormat::Text, tracing::Level::INFO)
}

/// Logs on stderr in the given format, up to `level` / 按格式与级别输出日志
pub fn log_dispatch(format: LogFormat, level: tracing::Level) -> Dispatch {
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => Dispatch::new(builder.finish()),
        LogFormat::Json => Dispatch::new(builder.json().finish()),
    }
}

/// Spans written to stderr when they close, with their timings / 链路输出
pub fn trace_dispatch() -> Dispatch {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .finish();

    Dispatch::new(subscriber)
}

/// Install the global subscriber; `RUST_LOG` overrides `default_filter` / 初始化全局日志
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Parse a level name, falling back to INFO / 解析日志级别
pub fn parse_level(level: &str) -> tracing::Level {
    level.parse().unwrap_or(tracing::Level::INFO)
}
