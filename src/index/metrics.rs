//! Metrics decorator / 指标装饰器

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error::{IndexError, Result};
use super::types::{Attribute, SqlType};
use super::{noop, BoxedIndexer, Indexer, Layer, Sink};
use crate::metrics::{PromMetrics, DEFAULT_PORT};

/// Metrics sink for indexer calls / 指标记录接口
///
/// Three series per operation: calls received, calls failed, and call latency.
#[async_trait]
pub trait Metrics: Send + Sync {
    fn inc_searches_total(&self);
    fn inc_searches_failed(&self);
    fn observe_search_latency(&self, dur: Duration);

    fn inc_inserts_total(&self);
    fn inc_inserts_failed(&self);
    fn observe_insert_latency(&self, dur: Duration);

    fn inc_deletes_total(&self);
    fn inc_deletes_failed(&self);
    fn observe_delete_latency(&self, dur: Duration);

    /// Release whatever the sink owns (e.g. an HTTP endpoint) / 释放资源
    ///
    /// Sinks that own nothing keep the default, which does nothing and succeeds.
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

/// Indexer decorated with call counters and latency histograms / 带指标的索引
pub struct MetricsIndexer<K: SqlType, V: SqlType> {
    inner: BoxedIndexer<K, V>,
    metrics: Arc<dyn Metrics>,
}

#[async_trait]
impl<K: SqlType, V: SqlType> Indexer<K, V> for MetricsIndexer<K, V> {
    async fn search(&self, term: &V) -> Result<Vec<Attribute<K, V>>> {
        let start = Instant::now();
        self.metrics.inc_searches_total();

        let res = self.inner.search(term).await;
        if res.is_err() {
            self.metrics.inc_searches_failed();
        }

        self.metrics.observe_search_latency(start.elapsed());
        res
    }

    async fn insert(&self, attrs: &[Attribute<K, V>]) -> Result<()> {
        let start = Instant::now();
        self.metrics.inc_inserts_total();

        let res = self.inner.insert(attrs).await;
        if res.is_err() {
            self.metrics.inc_inserts_failed();
        }

        self.metrics.observe_insert_latency(start.elapsed());
        res
    }

    async fn delete(&self, keys: &[K]) -> Result<()> {
        let start = Instant::now();
        self.metrics.inc_deletes_total();

        let res = self.inner.delete(keys).await;
        if res.is_err() {
            self.metrics.inc_deletes_failed();
        }

        self.metrics.observe_delete_latency(start.elapsed());
        res
    }

    /// Stops the sink first, then the wrapped indexer; both failures are kept.
    async fn shutdown(&self) -> Result<()> {
        let sink = self.metrics.shutdown().await;
        let inner = self.inner.shutdown().await;

        IndexError::join([inner, sink])
    }

    fn layer(&self) -> Layer {
        Layer::Metrics
    }

    fn sink(&mut self) -> Option<Sink<'_>> {
        Some(Sink::Metrics(&mut self.metrics))
    }

    fn inner(&self) -> Option<&dyn Indexer<K, V>> {
        Some(self.inner.as_ref())
    }
}

/// Decorate an indexer with metrics / 为索引添加指标
///
/// - `None` indexer: a no-op indexer is returned
/// - no-op indexer: returned unchanged
/// - `None` metrics: a [`PromMetrics`] endpoint on port 8080; if it can't be
///   started the indexer is returned undecorated
/// - already decorated with metrics: its sink is replaced and the same indexer returned
pub fn with_metrics<K: SqlType, V: SqlType>(
    indexer: Option<BoxedIndexer<K, V>>,
    metrics: Option<Arc<dyn Metrics>>,
) -> BoxedIndexer<K, V> {
    let Some(mut indexer) = indexer else {
        return noop();
    };

    if indexer.layer() == Layer::NoOp {
        return indexer;
    }

    let metrics = match metrics {
        Some(m) => m,
        None => match PromMetrics::serve(DEFAULT_PORT) {
            Ok(m) => Arc::new(m),
            Err(e) => {
                tracing::warn!(
                    "Default metrics endpoint unavailable, indexer left without metrics: {}",
                    e
                );
                return indexer;
            }
        },
    };

    if let Some(Sink::Metrics(current)) = indexer.sink() {
        *current = metrics;
        return indexer;
    }

    Box::new(MetricsIndexer {
        inner: indexer,
        metrics,
    })
}
