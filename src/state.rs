use std::time::Instant;

use fulltext_index::config::AppConfig;
use fulltext_index::index::BoxedIndexer;

/// Indexer served over HTTP: integer keys, text values / 服务使用的索引类型
pub type ServedIndexer = BoxedIndexer<i64, String>;

/// Shared application state / 应用共享状态
pub struct AppState {
    pub index: ServedIndexer,
    pub config: AppConfig,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(index: ServedIndexer, config: AppConfig) -> Self {
        Self {
            index,
            config,
            started_at: Instant::now(),
        }
    }
}
