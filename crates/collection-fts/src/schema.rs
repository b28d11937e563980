//! Collection schema introspection against the SQLite catalog.

use crate::error::{FtsError, Result};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A column of a source collection as declared in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    /// Declared type; advisory in SQLite and may be empty.
    pub column_type: String,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
        }
    }
}

/// Check if a table (ordinary or virtual) exists, ignoring case like SQLite does.
pub fn table_exists(conn: &Connection, table_name: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1 COLLATE NOCASE",
        [table_name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Check if a trigger exists.
pub fn trigger_exists(conn: &Connection, trigger_name: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='trigger' AND name=?1 COLLATE NOCASE",
        [trigger_name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Read the ordered column list of a table without checking that it exists.
///
/// Returns an empty list for a missing table.
pub fn table_columns(conn: &Connection, table_name: &str) -> Result<Vec<Column>> {
    let mut stmt = conn.prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;
    let rows = stmt.query_map([table_name], |row| {
        let name: Option<String> = row.get(0)?;
        let column_type: Option<String> = row.get(1)?;
        Ok((name, column_type))
    })?;

    let mut columns = Vec::new();
    for row in rows {
        let (name, column_type) = row?;
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            columns.push(Column::new(name, column_type.unwrap_or_default()));
        }
    }
    Ok(columns)
}

/// Read the ordered column list of a collection.
///
/// Fails with [`FtsError::CollectionNotFound`] when no such table exists.
pub fn collection_columns(conn: &Connection, collection: &str) -> Result<Vec<Column>> {
    if !table_exists(conn, collection)? {
        return Err(FtsError::CollectionNotFound {
            collection: collection.to_string(),
        });
    }

    let columns = table_columns(conn, collection)?;
    debug!(
        "Collection {} has {} columns: {:?}",
        collection,
        columns.len(),
        columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
    );
    Ok(columns)
}
