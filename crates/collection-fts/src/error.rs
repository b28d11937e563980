//! Error types for the collection full-text index service.
//!
//! Lifecycle and search operations surface one of these variants. Batch
//! operations (`initialize`) log them per collection instead of propagating.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for collection-fts.
#[derive(Debug, Error)]
pub enum FtsError {
    // Introspection errors
    #[error("Collection not found: {collection}")]
    CollectionNotFound { collection: String },

    #[error("No suitable columns found for FTS indexing in collection {collection}")]
    NoIndexableColumns { collection: String },

    // Statement execution errors
    #[error("DDL failure: {message}")]
    DdlFailure {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("Search query failed: {message}")]
    QueryFailure {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("Collection {collection} is not searchable or does not exist")]
    NotSearchable { collection: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Unknown FTS action: {0}")]
    UnknownAction(String),
}

/// Result type alias for collection-fts operations.
pub type Result<T> = std::result::Result<T, FtsError>;

impl From<std::io::Error> for FtsError {
    fn from(err: std::io::Error) -> Self {
        FtsError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for FtsError {
    fn from(err: serde_json::Error) -> Self {
        FtsError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for FtsError {
    fn from(err: rusqlite::Error) -> Self {
        FtsError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl FtsError {
    /// Wrap a failed DDL/trigger statement with context.
    pub fn ddl(context: impl Into<String>, err: rusqlite::Error) -> Self {
        FtsError::DdlFailure {
            message: format!("{}: {}", context.into(), err),
            source: Some(err),
        }
    }

    /// Wrap a failed search or count statement with context.
    pub fn query(context: impl Into<String>, err: rusqlite::Error) -> Self {
        FtsError::QueryFailure {
            message: format!("{}: {}", context.into(), err),
            source: Some(err),
        }
    }

    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        FtsError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Whether the error was caused by caller input rather than a system fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            FtsError::NotSearchable { .. }
                | FtsError::CollectionNotFound { .. }
                | FtsError::UnknownAction(_)
                | FtsError::Config { .. }
        )
    }
}
