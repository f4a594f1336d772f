//! Indexer construction / 索引构建
//!
//! `Config` collects optional sinks, `new` opens the SQLite core and layers the
//! configured decorators around it: logs, then metrics, then trace (outermost).

use std::fmt;
use std::sync::Arc;
use tracing::Dispatch;

use super::db::IN_MEMORY;
use super::error::{IndexError, Result};
use super::sqlite::SqliteIndex;
use super::types::{Attribute, SqlType};
use super::{noop, with_logs, with_metrics, with_trace, BoxedIndexer, Metrics};

/// Build options / 构建选项
///
/// Each `with_*` method consumes and returns the config; calling one twice keeps
/// the last value.
#[derive(Clone, Default)]
pub struct Config {
    /// Database location, empty or `:memory:` for a private in-memory index / 数据库位置
    pub uri: String,
    pub logs: Option<Dispatch>,
    pub metrics: Option<Arc<dyn Metrics>>,
    pub trace: Option<Dispatch>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("uri", &self.uri)
            .field("logs", &self.logs.is_some())
            .field("metrics", &self.metrics.is_some())
            .field("trace", &self.trace.is_some())
            .finish()
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self
    }

    pub fn with_logs(mut self, dispatch: impl Into<Dispatch>) -> Self {
        self.logs = Some(dispatch.into());
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_trace(mut self, dispatch: impl Into<Dispatch>) -> Self {
        self.trace = Some(dispatch.into());
        self
    }

    fn location(&self) -> &str {
        if self.uri.is_empty() {
            IN_MEMORY
        } else {
            &self.uri
        }
    }

    /// Open the core index and apply the configured decorators / 打开索引并添加装饰器
    pub async fn build<K: SqlType, V: SqlType>(
        self,
        attrs: &[Attribute<K, V>],
    ) -> Result<BoxedIndexer<K, V>> {
        let core = SqliteIndex::open(self.location(), attrs).await?;
        let mut index: BoxedIndexer<K, V> = Box::new(core);

        if let Some(dispatch) = self.logs {
            index = with_logs(Some(index), Some(dispatch));
        }

        if let Some(metrics) = self.metrics {
            index = with_metrics(Some(index), Some(metrics));
        }

        if let Some(dispatch) = self.trace {
            index = with_trace(Some(index), Some(dispatch));
        }

        Ok(index)
    }
}

/// Construction failure with a usable fallback / 构建失败（附带空实现）
pub struct BuildError<K: SqlType, V: SqlType> {
    /// A no-op indexer the caller may keep using
    pub fallback: BoxedIndexer<K, V>,
    pub error: IndexError,
}

impl<K: SqlType, V: SqlType> fmt::Debug for BuildError<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<K: SqlType, V: SqlType> fmt::Display for BuildError<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to build indexer: {}", self.error)
    }
}

impl<K: SqlType, V: SqlType> std::error::Error for BuildError<K, V> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl<K: SqlType, V: SqlType> BuildError<K, V> {
    pub fn into_inner(self) -> IndexError {
        self.error
    }
}

/// Create an indexer seeded with `attrs` / 创建索引
///
/// On failure the error carries a no-op indexer, so callers that only log the
/// problem still have something safe to call.
pub async fn new<K: SqlType, V: SqlType>(
    attrs: &[Attribute<K, V>],
    config: Config,
) -> std::result::Result<BoxedIndexer<K, V>, BuildError<K, V>> {
    config.build(attrs).await.map_err(|error| BuildError {
        fallback: noop(),
        error,
    })
}

#[cfg(test)]
mod tests {
    use super::super::fake::{capture, count, CountingMetrics};
    use super::super::{layers, Layer};
    use super::*;

    fn gold() -> Vec<Attribute<i64, String>> {
        vec![
            Attribute::new(1, "the quick brown fox".to_string()),
            Attribute::new(2, "struck gold in the hills".to_string()),
            Attribute::new(3, "some kind of copper".to_string()),
        ]
    }

    #[tokio::test]
    async fn test_bare_index() {
        let index = new(&gold(), Config::new()).await.unwrap();
        assert_eq!(layers(index.as_ref()), vec![Layer::Index]);

        let res = index.search(&"gold".to_string()).await.unwrap();
        assert_eq!(res, vec![Attribute::new(2, "struck gold in the hills".to_string())]);

        index.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_layers_follow_fixed_order() {
        let (logs, logs_out) = capture();
        let (trace, trace_out) = capture();
        let metrics = CountingMetrics::new();

        // Option order does not matter
        let config = Config::new()
            .with_trace(trace)
            .with_metrics(metrics.clone())
            .with_logs(logs);
        let index = new(&gold(), config).await.unwrap();

        assert_eq!(
            layers(index.as_ref()),
            vec![Layer::Trace, Layer::Metrics, Layer::Logs, Layer::Index]
        );

        let res = index.search(&"gold*".to_string()).await.unwrap();
        assert_eq!(res.len(), 1);
        index.shutdown().await.unwrap();

        assert_eq!(count(&metrics.searches_total), 1);
        assert_eq!(count(&metrics.shutdowns), 1);
        assert!(logs_out.contents().contains("finding matches for search term"));
        assert!(trace_out.contents().contains("search{search_term=gold*"));
    }

    #[tokio::test]
    async fn test_later_option_wins() {
        let (first, first_out) = capture();
        let (second, second_out) = capture();

        let config = Config::new().with_logs(first).with_logs(second);
        let index = new(&gold(), config).await.unwrap();
        assert_eq!(layers(index.as_ref()), vec![Layer::Logs, Layer::Index]);

        index.delete(&[1]).await.unwrap();
        assert!(first_out.contents().is_empty());
        assert!(second_out.contents().contains("deleting keys"));
    }

    #[tokio::test]
    async fn test_failure_returns_noop_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new().with_uri(dir.path().to_string_lossy());

        let Err(err) = new(&gold(), config).await else {
            panic!("opening a directory must fail");
        };
        assert!(matches!(err.error, IndexError::IsDirectory(_)));
        assert_eq!(err.fallback.layer(), Layer::NoOp);
        assert!(err.fallback.search(&"gold".to_string()).await.unwrap().is_empty());
    }

    #[test]
    fn test_debug_hides_sinks() {
        let config = Config::new()
            .with_uri(":memory:")
            .with_metrics(CountingMetrics::shared());
        let out = format!("{config:?}");
        assert!(out.contains("metrics: true"));
        assert!(out.contains("logs: false"));
    }
}
