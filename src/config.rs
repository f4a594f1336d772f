//! Application configuration module / 应用配置模块
//!
//! Manages application configuration loaded from config.json
//! Creates default config file on first run / 首次运行时创建默认配置文件

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::index::{self, db::IN_MEMORY};
use crate::metrics::{PromMetrics, DEFAULT_PORT};
use crate::telemetry::{self, LogFormat};

/// Application configuration / 应用配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration / 服务器配置
    pub server: ServerConfig,
    /// Index configuration / 索引配置
    pub index: IndexConfig,
    /// Logging configuration / 日志配置
    pub logging: LoggingConfig,
    /// Metrics configuration / 指标配置
    pub metrics: MetricsConfig,
    /// Tracing configuration / 链路追踪配置
    pub tracing: TracingConfig,
}

/// Server configuration / 服务器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address / 服务器监听地址
    pub host: String,
    /// Server port / 服务器端口
    pub port: u16,
}

/// Index configuration / 索引配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Database file, `:memory:` or empty for an in-memory index / 索引数据库文件
    pub uri: String,
    /// JSON file with the initial attributes / 初始数据文件
    pub dataset: Option<String>,
}

/// Logging configuration / 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    /// trace, debug, info, warn or error / 日志级别
    pub level: String,
    pub format: LogFormat,
}

/// Metrics configuration / 指标配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Port of the `/metrics` endpoint / 指标端口
    pub port: u16,
}

/// Tracing configuration / 链路追踪配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8180,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            uri: "data/index.db".to_string(),
            dataset: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: DEFAULT_PORT,
        }
    }
}

impl AppConfig {
    /// Get the server bind address / 获取服务器绑定地址
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Directory holding the index file, if the index is persisted / 获取索引数据目录
    pub fn get_data_dir(&self) -> Option<PathBuf> {
        if self.index.uri.is_empty() || self.index.uri == IN_MEMORY {
            return None;
        }

        Path::new(&self.index.uri)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
    }

    /// Translate into indexer build options / 转换为索引构建选项
    ///
    /// Starts the metrics endpoint when metrics are enabled.
    pub fn index_config(&self) -> index::Result<index::Config> {
        let mut config = index::Config::new().with_uri(self.index.uri.clone());

        if self.logging.enabled {
            config = config.with_logs(telemetry::log_dispatch(
                self.logging.format,
                telemetry::parse_level(&self.logging.level),
            ));
        }

        if self.metrics.enabled {
            config = config.with_metrics(Arc::new(PromMetrics::serve(self.metrics.port)?));
        }

        if self.tracing.enabled {
            config = config.with_trace(telemetry::trace_dispatch());
        }

        Ok(config)
    }
}

/// Get the config file path / 获取配置文件路径
fn get_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load configuration from file, or create default if not exists
/// 加载配置文件，不存在则创建默认配置
pub fn load_config() -> Result<AppConfig, String> {
    load_config_from(&get_config_path())
}

/// Load configuration from a given path / 从指定路径加载配置
pub fn load_config_from(config_path: &Path) -> Result<AppConfig, String> {
    if config_path.exists() {
        // Load existing config / 加载现有配置
        let content = std::fs::read_to_string(config_path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        tracing::info!("Loaded configuration from {:?}", config_path);
        Ok(config)
    } else {
        // Create default config / 创建默认配置
        let config = AppConfig::default();
        save_config_to(&config, config_path)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        Ok(config)
    }
}

/// Save configuration to file / 保存配置到文件
pub fn save_config(config: &AppConfig) -> Result<(), String> {
    save_config_to(config, &get_config_path())
}

fn save_config_to(config: &AppConfig, config_path: &Path) -> Result<(), String> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    std::fs::write(config_path, content)
        .map_err(|e| format!("Failed to write config file: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_written_on_first_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = load_config_from(&path).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(path.exists());

        let reloaded = load_config_from(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"index": {"uri": ":memory:"}, "logging": {"format": "json"}}"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.index.uri, ":memory:");
        assert_eq!(config.index.dataset, None);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.logging.enabled);
        assert_eq!(config.metrics.port, DEFAULT_PORT);
        assert_eq!(config.get_bind_address(), "0.0.0.0:8180");
        assert_eq!(config.get_data_dir(), None);
    }

    #[test]
    fn test_bad_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(err.starts_with("Failed to parse config file"));
    }

    #[test]
    fn test_data_dir() {
        let config = AppConfig::default();
        assert_eq!(config.get_data_dir(), Some(PathBuf::from("data")));

        let mut config = AppConfig::default();
        config.index.uri = "index.db".to_string();
        assert_eq!(config.get_data_dir(), None);
    }

    #[tokio::test]
    async fn test_index_config_layers() {
        let mut config = AppConfig::default();
        config.index.uri = IN_MEMORY.to_string();
        config.metrics.port = 0;
        config.tracing.enabled = true;

        let built = config.index_config().unwrap();
        assert!(built.logs.is_some());
        assert!(built.metrics.is_some());
        assert!(built.trace.is_some());

        let index = index::new::<i64, String>(&[], built).await.unwrap();
        assert_eq!(
            index::layers(index.as_ref()),
            vec![
                index::Layer::Trace,
                index::Layer::Metrics,
                index::Layer::Logs,
                index::Layer::Index
            ]
        );
        index.shutdown().await.unwrap();
    }
}
