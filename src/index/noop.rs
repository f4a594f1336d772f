//! No-op indexer / 空实现

use async_trait::async_trait;
use std::marker::PhantomData;

use super::error::Result;
use super::types::{Attribute, SqlType};
use super::{BoxedIndexer, Indexer, Layer};

/// Indexer whose operations all succeed without doing anything / 空操作索引
///
/// Handed out when construction fails or when decorating nothing, so callers
/// always hold a working object.
pub struct NoOpIndexer<K, V> {
    _types: PhantomData<fn() -> (K, V)>,
}

impl<K, V> Default for NoOpIndexer<K, V> {
    fn default() -> Self {
        Self {
            _types: PhantomData,
        }
    }
}

/// Create a boxed no-op indexer / 创建空操作索引
pub fn noop<K: SqlType, V: SqlType>() -> BoxedIndexer<K, V> {
    Box::new(NoOpIndexer::default())
}

#[async_trait]
impl<K: SqlType, V: SqlType> Indexer<K, V> for NoOpIndexer<K, V> {
    /// Always an empty result and no error.
    async fn search(&self, _term: &V) -> Result<Vec<Attribute<K, V>>> {
        Ok(Vec::new())
    }

    async fn insert(&self, _attrs: &[Attribute<K, V>]) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _keys: &[K]) -> Result<()> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    fn layer(&self) -> Layer {
        Layer::NoOp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_is_inert() {
        let index = noop::<i64, String>();

        index.insert(&[Attribute::new(1, "struck gold".to_string())]).await.unwrap();
        assert!(index.search(&"gold".to_string()).await.unwrap().is_empty());
        index.delete(&[1]).await.unwrap();
        index.shutdown().await.unwrap();

        assert_eq!(index.layer(), Layer::NoOp);
        assert!(index.inner().is_none());
    }
}
