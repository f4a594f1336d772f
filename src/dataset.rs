//! Initial dataset loader / 初始数据加载
//!
//! A dataset is a JSON array of `{"key": …, "value": …}` objects.

use serde::de::DeserializeOwned;
use std::path::Path;

use crate::index::{Attribute, IndexError, Result, SqlType};

/// Parse attributes from JSON text / 解析 JSON 数据
pub fn parse<K, V>(content: &str) -> Result<Vec<Attribute<K, V>>>
where
    K: SqlType + DeserializeOwned,
    V: SqlType + DeserializeOwned,
{
    let attrs: Vec<Attribute<K, V>> = serde_json::from_str(content)
        .map_err(|e| IndexError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

    if attrs.is_empty() {
        return Err(IndexError::ZeroAttributes);
    }

    Ok(attrs)
}

/// Read attributes from a JSON file / 从文件加载数据
pub async fn load<K, V>(path: impl AsRef<Path>) -> Result<Vec<Attribute<K, V>>>
where
    K: SqlType + DeserializeOwned,
    V: SqlType + DeserializeOwned,
{
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await?;
    let attrs = parse(&content)?;

    tracing::info!("Loaded {} attributes from {:?}", attrs.len(), path);
    Ok(attrs)
}
