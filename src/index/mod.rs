//! Full-text indexer - capability interface and decorators / 全文索引
//!
//! Architecture principles / 架构原则：
//! - `Indexer` only exposes primitive operations: search, insert, delete, shutdown
//! - The SQLite FTS5 backend does the indexing and matching
//! - Logs, metrics and tracing are decorators around any `Indexer`
//! - Decorators are applied in a fixed order: logs → metrics → trace (outermost)
//! - Re-applying a decorator kind swaps its sink in place, it never stacks

use async_trait::async_trait;
use std::sync::Arc;
use tracing::Dispatch;

pub mod db;
pub mod error;
pub mod logs;
pub mod metrics;
pub mod noop;
pub mod options;
pub mod sqlite;
pub mod trace;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use error::{IndexError, Result};
pub use logs::{with_logs, LoggedIndexer};
pub use metrics::{with_metrics, Metrics, MetricsIndexer};
pub use noop::{noop, NoOpIndexer};
pub use options::{new, BuildError, Config};
pub use sqlite::SqliteIndex;
pub use trace::{with_trace, TracedIndexer};
pub use types::{Attribute, SqlType};

/// Boxed indexer as handed out to callers / 对外返回的索引对象
pub type BoxedIndexer<K, V> = Box<dyn Indexer<K, V>>;

/// Variant tag of an indexer / 索引变体标记
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    NoOp,
    Index,
    Logs,
    Metrics,
    Trace,
    /// Implementations outside this crate
    Custom,
}

/// Mutable access to a decorator's sink, tagged by decorator kind / 装饰器的输出端
pub enum Sink<'a> {
    Logs(&'a mut Dispatch),
    Metrics(&'a mut Arc<dyn Metrics>),
    Trace(&'a mut Dispatch),
}

/// Full-text search index interface (provides only primitive operations) / 全文索引接口
///
/// Entries are key-value pairs; the value is tokenized by the backend and can be
/// matched with keywords or backend query expressions (e.g. `gold*`).
///
/// Dropping a returned future cancels the call. The ambient `tracing` span is the
/// call's context and is carried into the backend unchanged.
#[async_trait]
pub trait Indexer<K: SqlType, V: SqlType>: Send + Sync {
    /// Find entries whose value matches the search term / 搜索
    ///
    /// Returns [`IndexError::NotFoundKeyword`] when the query ran and matched nothing.
    async fn search(&self, term: &V) -> Result<Vec<Attribute<K, V>>>;

    /// Index new entries in a single transaction / 批量插入
    ///
    /// Either every entry is written or none is. Empty input is a no-op.
    async fn insert(&self, attrs: &[Attribute<K, V>]) -> Result<()>;

    /// Remove entries by key in a single transaction / 批量删除
    ///
    /// Missing keys are not an error. Empty input is a no-op.
    async fn delete(&self, keys: &[K]) -> Result<()>;

    /// Release the backend and any resource owned by a decorator / 关闭
    async fn shutdown(&self) -> Result<()>;

    /// Variant tag / 变体标记
    fn layer(&self) -> Layer {
        Layer::Custom
    }

    /// Sink of this decorator, if it is one / 装饰器输出端
    fn sink(&mut self) -> Option<Sink<'_>> {
        None
    }

    /// Wrapped indexer, if this is a decorator / 被包装的索引
    fn inner(&self) -> Option<&dyn Indexer<K, V>> {
        None
    }
}

/// List the layers of an indexer, outermost first / 列出装饰层
pub fn layers<K: SqlType, V: SqlType>(indexer: &dyn Indexer<K, V>) -> Vec<Layer> {
    let mut out = vec![indexer.layer()];
    let mut current = indexer.inner();

    while let Some(next) = current {
        out.push(next.layer());
        current = next.inner();
    }

    out
}
