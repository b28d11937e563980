//! Configuration for the full-text index service.
//!
//! Constants for naming and pagination live on [`SearchConfig`]; per-instance
//! options (collections, skip columns, force-recreate) live on [`FtsOptions`].

use crate::error::{FtsError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Naming and pagination constants.
pub struct SearchConfig;

impl SearchConfig {
    pub const DEFAULT_PER_PAGE: i64 = 20;
    pub const MAX_PER_PAGE: i64 = 100;
    pub const ID_FIELD: &'static str = "id";
    pub const INDEX_TABLE_SUFFIX: &'static str = "_fts";
    pub const INSERT_TRIGGER_SUFFIX: &'static str = "_fts_insert";
    pub const UPDATE_TRIGGER_SUFFIX: &'static str = "_fts_update";
    pub const DELETE_TRIGGER_SUFFIX: &'static str = "_fts_delete";
    /// Column names FTS5 reserves for its own hidden columns.
    pub const RESERVED_FIELD_NAMES: &'static [&'static str] = &["rank", "rowid"];
    /// Declared-type fragments that mark a column as text-like.
    pub const TEXT_TYPE_MARKERS: &'static [&'static str] = &["text", "char", "json", "string"];
}

/// How a caller's query string is turned into an FTS5 `MATCH` expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuerySyntax {
    /// Pass the query to `MATCH` unchanged.
    #[default]
    Raw,
    /// Lower-case, escape and OR-join terms with prefix matching.
    Prefix,
}

/// Options for a [`FullTextSearchService`](crate::FullTextSearchService).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FtsOptions {
    /// Collections to index and serve searches for.
    pub collections: Vec<String>,
    /// Columns excluded from indexing, per collection.
    pub skip_columns: HashMap<String, Vec<String>>,
    /// Drop existing indexes before creating them during `initialize`.
    pub force_recreate: bool,
    /// Optional FTS5 `tokenize` argument, e.g. `unicode61 remove_diacritics 1`.
    pub tokenizer: Option<String>,
    pub query_syntax: QuerySyntax,
}

impl FtsOptions {
    /// Load options from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| FtsError::io_with_path(e, path))?;
        let options: FtsOptions = serde_json::from_str(&raw)?;
        options.validate()?;
        Ok(options)
    }

    /// Reject tokenizer strings that would break out of the quoted DDL argument.
    pub fn validate(&self) -> Result<()> {
        if let Some(tokenizer) = &self.tokenizer {
            if tokenizer.contains('\'') {
                return Err(FtsError::Config {
                    message: format!("tokenizer must not contain quotes: {}", tokenizer),
                });
            }
        }
        Ok(())
    }
}

/// Name of the FTS table for a collection.
pub fn index_table_name(collection: &str) -> String {
    format!("{}{}", collection, SearchConfig::INDEX_TABLE_SUFFIX)
}

/// Names of the insert, update and delete triggers for a collection.
pub fn trigger_names(collection: &str) -> [String; 3] {
    [
        format!("{}{}", collection, SearchConfig::INSERT_TRIGGER_SUFFIX),
        format!("{}{}", collection, SearchConfig::UPDATE_TRIGGER_SUFFIX),
        format!("{}{}", collection, SearchConfig::DELETE_TRIGGER_SUFFIX),
    ]
}
