//! SQLite FTS5 index / SQLite FTS5 全文索引
//!
//! Entries live in a single `fulltext_search(id, val)` FTS5 table. Search terms
//! are passed to FTS5 as-is, so its query syntax (prefix `*`, `AND`/`OR`/`NOT`,
//! phrases) is available to callers.
//!
//! ref: https://www.sqlite.org/fts5.html

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::{Pool, Sqlite};
use std::marker::PhantomData;

use super::db;
use super::error::{IndexError, Result};
use super::types::{Attribute, SqlType, SqliteQuery};
use super::{Indexer, Layer};

/// Initial capacity of the search result buffer
const MIN_ALLOC: usize = 64;

const INSERT_QUERY: &str = "INSERT INTO fulltext_search (id, val) VALUES (?, ?)";
const SEARCH_QUERY: &str = "SELECT id, val FROM fulltext_search(?)";
const DELETE_QUERY: &str = "DELETE FROM fulltext_search WHERE id = ?";

/// SQLite-backed index / 基于 SQLite 的索引
pub struct SqliteIndex<K: SqlType, V: SqlType> {
    db: Pool<Sqlite>,
    _types: PhantomData<fn() -> (K, V)>,
}

impl<K: SqlType, V: SqlType> SqliteIndex<K, V> {
    /// Open the index at `uri` and load the initial attributes / 打开索引并导入初始数据
    ///
    /// An empty `uri` or `":memory:"` keeps the index in memory; any other value
    /// is a database file path, created if missing.
    pub async fn open(uri: &str, attrs: &[Attribute<K, V>]) -> Result<Self> {
        let db = db::open(uri).await?;

        if let Err(e) = db::ensure_schema(&db).await {
            db.close().await;
            return Err(e);
        }

        let index = Self {
            db,
            _types: PhantomData,
        };

        if !attrs.is_empty() {
            if let Err(e) = index.insert(attrs).await {
                index.db.close().await;
                return Err(e);
            }
        }

        tracing::info!("Full-text index ready ({} initial attributes)", attrs.len());

        Ok(index)
    }

    /// Execute `queries` in one transaction, all or nothing / 事务内批量执行
    ///
    /// Dropping the transaction, on error or cancellation, rolls it back.
    async fn run_in_tx(&self, queries: Vec<SqliteQuery<'_>>) -> Result<()> {
        let mut tx = self.db.begin().await?;

        for query in queries {
            query.execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl<K: SqlType, V: SqlType> Indexer<K, V> for SqliteIndex<K, V> {
    async fn search(&self, term: &V) -> Result<Vec<Attribute<K, V>>> {
        let mut rows = term.bind(sqlx::query(SEARCH_QUERY)).fetch(&self.db);
        let mut res = Vec::with_capacity(MIN_ALLOC);

        while let Some(row) = rows.try_next().await? {
            res.push(Attribute::from_row(&row)?);
        }

        if res.is_empty() {
            return Err(IndexError::not_found(term.render()));
        }

        Ok(res)
    }

    async fn insert(&self, attrs: &[Attribute<K, V>]) -> Result<()> {
        if attrs.is_empty() {
            return Ok(());
        }

        let queries = attrs
            .iter()
            .map(|attr| attr.value.bind(attr.key.bind(sqlx::query(INSERT_QUERY))))
            .collect();

        self.run_in_tx(queries).await
    }

    async fn delete(&self, keys: &[K]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let queries = keys.iter().map(|key| key.bind(sqlx::query(DELETE_QUERY))).collect();

        self.run_in_tx(queries).await
    }

    async fn shutdown(&self) -> Result<()> {
        self.db.close().await;
        Ok(())
    }

    fn layer(&self) -> Layer {
        Layer::Index
    }
}
