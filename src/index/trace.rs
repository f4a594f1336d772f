//! Tracing decorator / 链路追踪装饰器
//!
//! One span per operation, created in the decorator's own `Dispatch`. The wrapped
//! call runs inside that span, but events below it still go to the caller's
//! subscriber. Inner layers read the span id through `telemetry::current_span_id`.

use async_trait::async_trait;
use std::future::Future;
use tracing::field::Empty;
use tracing::{dispatcher, Dispatch, Instrument, Span};

use crate::telemetry;

use super::error::{IndexError, Result};
use super::types::{Attribute, SqlType};
use super::{noop, BoxedIndexer, Indexer, Layer, Sink};

/// Indexer decorated with spans / 带链路追踪的索引
pub struct TracedIndexer<K: SqlType, V: SqlType> {
    inner: BoxedIndexer<K, V>,
    dispatch: Dispatch,
}

impl<K: SqlType, V: SqlType> TracedIndexer<K, V> {
    fn span(&self, f: impl FnOnce() -> Span) -> Span {
        dispatcher::with_default(&self.dispatch, f)
    }

    /// Mark the span as failed and attach the error as an event
    fn record_error(&self, span: &Span, err: &IndexError) {
        let message = err.to_string();
        span.record("otel.status_code", "ERROR");
        span.record("otel.status_message", message.as_str());

        dispatcher::with_default(&self.dispatch, || {
            tracing::error!(parent: span, error = %message, "operation failed");
        });
    }
}

/// Run `fut` inside `span` and publish the span id to inner layers
async fn traced<F: Future>(span: &Span, fut: F) -> F::Output {
    let span_id = span.id().map(|id| id.into_u64());
    telemetry::scope_span_id(span_id, fut.instrument(span.clone())).await
}

#[async_trait]
impl<K: SqlType, V: SqlType> Indexer<K, V> for TracedIndexer<K, V> {
    async fn search(&self, term: &V) -> Result<Vec<Attribute<K, V>>> {
        let search_term = term.render();
        let span = self.span(|| {
            tracing::info_span!(
                "search",
                %search_term,
                num_results = Empty,
                otel.status_code = Empty,
                otel.status_message = Empty,
            )
        });

        let res = traced(&span, self.inner.search(term)).await;

        match &res {
            Ok(matches) => {
                span.record("num_results", matches.len());
            }
            Err(e) => self.record_error(&span, e),
        }

        res
    }

    async fn insert(&self, attrs: &[Attribute<K, V>]) -> Result<()> {
        let span = self.span(|| {
            tracing::info_span!(
                "insert",
                num_attributes = attrs.len(),
                otel.status_code = Empty,
                otel.status_message = Empty,
            )
        });

        let res = traced(&span, self.inner.insert(attrs)).await;

        if let Err(e) = &res {
            self.record_error(&span, e);
        }

        res
    }

    async fn delete(&self, keys: &[K]) -> Result<()> {
        let span = self.span(|| {
            tracing::info_span!(
                "delete",
                num_keys = keys.len(),
                otel.status_code = Empty,
                otel.status_message = Empty,
            )
        });

        let res = traced(&span, self.inner.delete(keys)).await;

        if let Err(e) = &res {
            self.record_error(&span, e);
        }

        res
    }

    /// No span here: at teardown the tracing pipeline may already be gone.
    async fn shutdown(&self) -> Result<()> {
        self.inner.shutdown().await
    }

    fn layer(&self) -> Layer {
        Layer::Trace
    }

    fn sink(&mut self) -> Option<Sink<'_>> {
        Some(Sink::Trace(&mut self.dispatch))
    }

    fn inner(&self) -> Option<&dyn Indexer<K, V>> {
        Some(self.inner.as_ref())
    }
}

/// Decorate an indexer with spans / 为索引添加链路追踪
///
/// - `None` indexer: a no-op indexer is returned
/// - no-op indexer: returned unchanged
/// - `None` dispatch: `Dispatch::none()`, nothing is recorded
/// - already traced: its dispatch is replaced and the same indexer returned
pub fn with_trace<K: SqlType, V: SqlType>(
    indexer: Option<BoxedIndexer<K, V>>,
    dispatch: Option<Dispatch>,
) -> BoxedIndexer<K, V> {
    let Some(mut indexer) = indexer else {
        return noop();
    };

    if indexer.layer() == Layer::NoOp {
        return indexer;
    }

    let dispatch = dispatch.unwrap_or_else(Dispatch::none);

    if let Some(Sink::Trace(current)) = indexer.sink() {
        *current = dispatch;
        return indexer;
    }

    Box::new(TracedIndexer {
        inner: indexer,
        dispatch,
    })
}
