//! SQLite connection and schema setup / SQLite 连接与表结构
//!
//! - `""` or `":memory:"`: private in-memory database on one pinned connection
//! - anything else: a database file, created if missing, WAL mode

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use super::error::{IndexError, Result};

/// In-memory location sentinel / 内存数据库标记
pub const IN_MEMORY: &str = ":memory:";

/// FTS5 table name / 全文检索表名
pub const TABLE_NAME: &str = "fulltext_search";

const CHECK_TABLE_EXISTS: &str = r#"
SELECT EXISTS(SELECT 1 FROM sqlite_master
    WHERE type = 'table'
    AND name = 'fulltext_search')
"#;

const CREATE_TABLE: &str = r#"
CREATE VIRTUAL TABLE fulltext_search
    USING fts5(id, val)
"#;

const FILE_MAX_CONNECTIONS: u32 = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a connection pool for the given location / 打开连接池
pub async fn open(uri: &str) -> Result<Pool<Sqlite>> {
    match uri {
        "" | IN_MEMORY => open_in_memory().await,
        path => {
            validate_path(Path::new(path)).await?;
            open_file(Path::new(path)).await
        }
    }
}

async fn open_in_memory() -> Result<Pool<Sqlite>> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

    // Every connection to :memory: is its own database, so the pool keeps a
    // single connection alive for the lifetime of the index.
    let db = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    Ok(db)
}

async fn open_file(path: &Path) -> Result<Pool<Sqlite>> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let db = SqlitePoolOptions::new()
        .max_connections(FILE_MAX_CONNECTIONS)
        .connect_with(options)
        .await?;

    tracing::debug!("Index database opened: {:?} (WAL mode)", path);

    Ok(db)
}

/// Create the file if it doesn't exist; reject directories / 校验路径
async fn validate_path(path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => Err(IndexError::IsDirectory(path.to_path_buf())),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tokio::fs::File::create(path).await?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Create the FTS5 table only when it is absent / 仅在表不存在时创建
pub async fn ensure_schema(db: &Pool<Sqlite>) -> Result<()> {
    let exists: bool = sqlx::query_scalar(CHECK_TABLE_EXISTS)
        .fetch_one(db)
        .await?;

    if exists {
        return Ok(());
    }

    sqlx::query(CREATE_TABLE).execute(db).await?;
    tracing::debug!("Created FTS5 table {}", TABLE_NAME);

    Ok(())
}
