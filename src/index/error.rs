//! Indexer errors / 索引错误

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by an indexer or one of its decorators.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The query ran but matched nothing
    #[error("not found: keyword: {keyword}")]
    NotFoundKeyword {
        /// Rendered search term
        keyword: String,
    },

    /// Empty attribute input where at least one entry is required
    #[error("zero attributes")]
    ZeroAttributes,

    /// The index location names a directory
    #[error("{} is a directory", .0.display())]
    IsDirectory(PathBuf),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Rendering the OpenMetrics text failed
    #[error("metrics encoding error: {0}")]
    Metrics(#[from] std::fmt::Error),

    #[error("metrics server error: {0}")]
    Server(String),

    /// Several failures reported together, e.g. on shutdown
    #[error("{}", join_messages(.0))]
    Joined(Vec<IndexError>),
}

fn join_messages(errors: &[IndexError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl IndexError {
    /// Create a not found error for a rendered keyword.
    #[must_use]
    pub fn not_found(keyword: impl Into<String>) -> Self {
        Self::NotFoundKeyword {
            keyword: keyword.into(),
        }
    }

    /// Create a metrics server error.
    #[must_use]
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server(message.into())
    }

    /// Whether this error, or any joined error, is a "no matches" outcome.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFoundKeyword { .. } => true,
            Self::Joined(errors) => errors.iter().any(Self::is_not_found),
            _ => false,
        }
    }

    /// Combine results, keeping every failure.
    ///
    /// No failure yields `Ok`, a single failure is returned as-is, more than one
    /// is wrapped in [`IndexError::Joined`].
    pub fn join(results: impl IntoIterator<Item = Result<()>>) -> Result<()> {
        let mut errors: Vec<IndexError> = results.into_iter().filter_map(Result::err).collect();

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Joined(errors)),
        }
    }
}

/// Result type for indexer operations.
pub type Result<T> = std::result::Result<T, IndexError>;
