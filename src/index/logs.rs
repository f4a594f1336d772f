//! Logging decorator / 日志装饰器
//!
//! Events are emitted to the decorator's own `Dispatch`, not the global one, so
//! the same indexer can log somewhere else than the rest of the process.

use async_trait::async_trait;
use tracing::dispatcher;
use tracing::Dispatch;

use super::error::Result;
use super::types::{Attribute, SqlType};
use super::{noop, BoxedIndexer, Indexer, Layer, Sink};
use crate::telemetry;

/// Indexer decorated with log events / 带日志的索引
pub struct LoggedIndexer<K: SqlType, V: SqlType> {
    inner: BoxedIndexer<K, V>,
    dispatch: Dispatch,
}

impl<K: SqlType, V: SqlType> LoggedIndexer<K, V> {
    fn log<T>(&self, f: impl FnOnce() -> T) -> T {
        dispatcher::with_default(&self.dispatch, f)
    }
}

#[async_trait]
impl<K: SqlType, V: SqlType> Indexer<K, V> for LoggedIndexer<K, V> {
    async fn search(&self, term: &V) -> Result<Vec<Attribute<K, V>>> {
        let span_id = telemetry::current_span_id();
        let search_term = term.render();
        self.log(|| {
            tracing::info!(%search_term, ?span_id, "finding matches for search term")
        });

        let res = self.inner.search(term).await;

        match &res {
            Ok(matches) => self.log(|| {
                tracing::debug!(num_results = matches.len(), ?span_id, "found matches")
            }),
            Err(e) => self.log(|| {
                tracing::warn!(error = %e, ?span_id, "error when finding matches")
            }),
        }

        res
    }

    async fn insert(&self, attrs: &[Attribute<K, V>]) -> Result<()> {
        let span_id = telemetry::current_span_id();
        self.log(|| tracing::info!(num_attributes = attrs.len(), ?span_id, "inserting attributes"));

        let res = self.inner.insert(attrs).await;
        if let Err(e) = &res {
            self.log(|| tracing::warn!(error = %e, ?span_id, "failed to insert attributes"));
        }

        res
    }

    async fn delete(&self, keys: &[K]) -> Result<()> {
        let span_id = telemetry::current_span_id();
        self.log(|| tracing::info!(num_keys = keys.len(), ?span_id, "deleting keys"));

        let res = self.inner.delete(keys).await;
        if let Err(e) = &res {
            self.log(|| tracing::warn!(error = %e, ?span_id, "failed to delete indexed items"));
        }

        res
    }

    async fn shutdown(&self) -> Result<()> {
        self.log(|| tracing::info!("shutting down indexer"));

        let res = self.inner.shutdown().await;
        if let Err(e) = &res {
            self.log(|| tracing::warn!(error = %e, "failed to gracefully shut down"));
        }

        res
    }

    fn layer(&self) -> Layer {
        Layer::Logs
    }

    fn sink(&mut self) -> Option<Sink<'_>> {
        Some(Sink::Logs(&mut self.dispatch))
    }

    fn inner(&self) -> Option<&dyn Indexer<K, V>> {
        Some(self.inner.as_ref())
    }
}

/// Decorate an indexer with log events / 为索引添加日志
///
/// - `None` indexer: a no-op indexer is returned
/// - no-op indexer: returned unchanged
/// - `None` dispatch: plain-text logs on stderr
/// - already logged: its dispatch is replaced and the same indexer returned
pub fn with_logs<K: SqlType, V: SqlType>(
    indexer: Option<BoxedIndexer<K, V>>,
    dispatch: Option<Dispatch>,
) -> BoxedIndexer<K, V> {
    let Some(mut indexer) = indexer else {
        return noop();
    };

    if indexer.layer() == Layer::NoOp {
        return indexer;
    }

    let dispatch = dispatch.unwrap_or_else(telemetry::default_log_dispatch);

    if let Some(Sink::Logs(current)) = indexer.sink() {
        *current = dispatch;
        return indexer;
    }

    Box::new(LoggedIndexer {
        inner: indexer,
        dispatch,
    })
}

#[cfg(test)]
mod tests {
    use super::super::fake::{capture, MemoryIndex};
    use super::super::{layers, IndexError};
    use super::*;
    use std::sync::Arc;

    fn memory() -> BoxedIndexer<i64, String> {
        Box::new(MemoryIndex::new())
    }

    #[tokio::test]
    async fn test_logs_operations() {
        let (dispatch, out) = capture();
        let index = with_logs(Some(memory()), Some(dispatch));

        index
            .insert(&[Attribute::new(2, "struck gold".to_string())])
            .await
            .unwrap();
        let res = index.search(&"gold".to_string()).await.unwrap();
        assert_eq!(res.len(), 1);
        index.delete(&[2]).await.unwrap();
        index.shutdown().await.unwrap();

        let out = out.contents();
        assert!(out.contains("inserting attributes"));
        assert!(out.contains("num_attributes=1"));
        assert!(out.contains("finding matches for search term"));
        assert!(out.contains("search_term=gold"));
        assert!(out.contains("num_results=1"));
        assert!(out.contains("deleting keys"));
        assert!(out.contains("num_keys=1"));
        assert!(out.contains("shutting down indexer"));
        assert!(!out.contains("WARN"));
    }

    #[tokio::test]
    async fn test_logs_failures_and_returns_error_unchanged() {
        let (dispatch, out) = capture();
        let index = with_logs(Some(memory()), Some(dispatch));

        let err = index.search(&"gold".to_string()).await.unwrap_err();
        assert!(err.is_not_found());

        let failing: BoxedIndexer<i64, String> = Box::new(MemoryIndex::failing());
        let (dispatch, failing_out) = capture();
        let failing = with_logs(Some(failing), Some(dispatch));
        let err = failing.insert(&[]).await.unwrap_err();
        assert!(matches!(err, IndexError::Io(_)));

        assert!(out.contents().contains("WARN"));
        assert!(out.contents().contains("error when finding matches"));
        assert!(failing_out.contents().contains("failed to insert attributes"));
        assert!(failing_out.contents().contains("injected failure"));
    }

    #[tokio::test]
    async fn test_relogging_replaces_dispatch() {
        let (first, first_out) = capture();
        let (second, second_out) = capture();

        let index = with_logs(Some(memory()), Some(first));
        let index = with_logs(Some(index), Some(second));
        let index = with_logs(Some(index), None);
        let (third, third_out) = capture();
        let index = with_logs(Some(index), Some(third));

        assert_eq!(layers(index.as_ref()), vec![Layer::Logs, Layer::Custom]);

        index.delete(&[1]).await.unwrap();
        assert!(first_out.contents().is_empty());
        assert!(second_out.contents().is_empty());
        assert!(third_out.contents().contains("deleting keys"));
    }

    #[tokio::test]
    async fn test_decorating_nothing_stays_nothing() {
        let index = with_logs::<i64, String>(None, None);
        assert_eq!(index.layer(), Layer::NoOp);

        let index = with_logs(Some(index), Some(Dispatch::none()));
        assert_eq!(layers(index.as_ref()), vec![Layer::NoOp]);
        assert!(index.search(&"gold".to_string()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shared_across_tasks() {
        let index: Arc<BoxedIndexer<i64, String>> =
            Arc::new(with_logs(Some(memory()), Some(Dispatch::none())));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let index = index.clone();
                tokio::spawn(async move {
                    index
                        .insert(&[Attribute::new(i, format!("nugget {i}"))])
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(index.search(&"nugget".to_string()).await.unwrap().len(), 4);
    }
}
