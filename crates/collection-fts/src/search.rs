//! Ranked, paginated search against a collection's FTS table.

use crate::config::{index_table_name, SearchConfig};
use crate::ddl::quote_ident;
use crate::error::{FtsError, Result};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

const ROWID_ALIAS: &str = "__fts_rowid";
const RANK_ALIAS: &str = "__fts_rank";

/// A single search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: String,
    /// Indexed column values keyed by column name.
    pub data: Map<String, Value>,
    pub collection: String,
    /// FTS5 rank; lower is more relevant.
    pub rank: f64,
}

/// Parameters for a search request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchOptions {
    pub query: String,
    pub page: i64,
    pub per_page: i64,
}

/// Search results with pagination details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub items: Vec<SearchResult>,
    pub page: i64,
    pub per_page: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

/// Effective page and page size after clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Pagination {
    /// Clamp `page` to at least 1 and `per_page` into `[1, MAX_PER_PAGE]`,
    /// using the default page size for non-positive values.
    pub fn clamp(page: i64, per_page: i64) -> Self {
        let page = page.max(1);
        let per_page = if per_page < 1 {
            SearchConfig::DEFAULT_PER_PAGE
        } else {
            per_page.min(SearchConfig::MAX_PER_PAGE)
        };
        Self { page, per_page }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

/// Wrap items into the paged envelope.
///
/// `total_pages` is never below 1, even for an empty result.
pub fn prepare_search_response(
    items: Vec<SearchResult>,
    total_items: i64,
    page: i64,
    per_page: i64,
) -> SearchResponse {
    let divisor = per_page.max(1);
    let total = total_items.max(0);
    let total_pages = (total / divisor + i64::from(total % divisor != 0)).max(1);

    SearchResponse {
        items,
        page,
        per_page,
        total_items,
        total_pages,
    }
}

/// Run the ranked match query for one page of results.
pub fn search_index(
    conn: &Connection,
    collection: &str,
    match_expr: &str,
    pagination: Pagination,
) -> Result<Vec<SearchResult>> {
    let table = quote_ident(&index_table_name(collection));
    let sql = format!(
        "SELECT rowid AS {}, rank AS {}, * FROM {} WHERE {} MATCH ?1 ORDER BY rank LIMIT ?2 OFFSET ?3",
        ROWID_ALIAS, RANK_ALIAS, table, table
    );
    debug!("Searching {} with SQL: {}", collection, sql);

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| FtsError::query("search query failed", e))?;
    let column_names: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    let rows = stmt
        .query_map(
            params![match_expr, pagination.per_page, pagination.offset()],
            |row| row_to_result(row, collection, &column_names),
        )
        .map_err(|e| FtsError::query("search query failed", e))?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row.map_err(|e| FtsError::query("search query failed", e))?);
    }
    Ok(items)
}

/// Count all matches for an expression, ignoring pagination.
pub fn count_matches(conn: &Connection, collection: &str, match_expr: &str) -> Result<i64> {
    let table = quote_ident(&index_table_name(collection));
    let sql = format!("SELECT COUNT(*) FROM {} WHERE {} MATCH ?1", table, table);

    conn.query_row(&sql, [match_expr], |row| row.get(0))
        .map_err(|e| FtsError::query("count query failed", e))
}

fn row_to_result(row: &Row, collection: &str, column_names: &[String]) -> rusqlite::Result<SearchResult> {
    let rowid: i64 = row.get(0)?;
    let rank: f64 = row.get(1)?;

    let mut data = Map::new();
    for (idx, name) in column_names.iter().enumerate().skip(2) {
        data.insert(name.clone(), value_to_json(row.get_ref(idx)?));
    }

    let id = match data.get(SearchConfig::ID_FIELD) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => rowid.to_string(),
    };

    Ok(SearchResult {
        id,
        data,
        collection: collection.to_string(),
        rank,
    })
}

fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(hex::encode(bytes)),
    }
}
