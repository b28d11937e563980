//! Index field selection.
//!
//! Decides which columns of a collection go into its FTS table. The resulting
//! [`IndexDefinition`] is computed once per (re)creation and shared by the
//! table DDL and all three triggers.

use crate::config::SearchConfig;
use crate::error::{FtsError, Result};
use crate::schema::Column;
use std::collections::HashSet;
use tracing::debug;

/// Whether a declared column type is treated as text for indexing.
///
/// SQLite column typing is advisory, so this is a case-insensitive substring
/// match rather than an affinity check.
pub fn is_text_like(column_type: &str) -> bool {
    let column_type = column_type.to_lowercase();
    SearchConfig::TEXT_TYPE_MARKERS
        .iter()
        .any(|marker| column_type.contains(marker))
}

/// Whether FTS5 refuses a column of this name.
pub fn is_reserved_field(name: &str) -> bool {
    SearchConfig::RESERVED_FIELD_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
}

/// The ordered field list of a collection's FTS table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    collection: String,
    fields: Vec<String>,
}

impl IndexDefinition {
    /// Build the field list from a collection's columns.
    ///
    /// The identifier field comes first when the collection has one and it is
    /// not skipped. Other columns follow in declared order when text-like, not
    /// skipped, not reserved by FTS5 and not already present.
    pub fn build(collection: &str, columns: &[Column], skip: &[String]) -> Result<Self> {
        let skip: HashSet<&str> = skip.iter().map(String::as_str).collect();
        for col in &skip {
            debug!("Will skip column {} for collection {}", col, collection);
        }

        let mut added: HashSet<&str> = HashSet::new();
        let mut fields = Vec::new();

        let has_id = columns.iter().any(|c| c.name == SearchConfig::ID_FIELD);
        if has_id && !skip.contains(SearchConfig::ID_FIELD) {
            fields.push(SearchConfig::ID_FIELD.to_string());
            added.insert(SearchConfig::ID_FIELD);
        }

        for col in columns {
            let name = col.name.as_str();
            if added.contains(name) {
                debug!("Skipping duplicate column {}", name);
                continue;
            }
            if skip.contains(name) {
                debug!("Skipping configured column {}", name);
                continue;
            }
            if is_reserved_field(name) {
                debug!("Skipping FTS5-reserved column {}", name);
                continue;
            }
            if is_text_like(&col.column_type) {
                debug!("Adding column {} to FTS index", name);
                fields.push(name.to_string());
                added.insert(name);
            }
        }

        if fields.is_empty() {
            return Err(FtsError::NoIndexableColumns {
                collection: collection.to_string(),
            });
        }

        Ok(Self {
            collection: collection.to_string(),
            fields,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Whether an existing FTS table's columns match this definition exactly.
    pub fn matches_columns(&self, columns: &[Column]) -> bool {
        self.fields.len() == columns.len()
            && self
                .fields
                .iter()
                .zip(columns)
                .all(|(field, col)| *field == col.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notes_columns() -> Vec<Column> {
        vec![
            Column::new("id", "TEXT"),
            Column::new("title", "TEXT"),
            Column::new("body", "TEXT"),
            Column::new("created", "DATETIME"),
        ]
    }

    #[test]
    fn test_is_text_like() {
        assert!(is_text_like("TEXT"));
        assert!(is_text_like("varchar(255)"));
        assert!(is_text_like("NCHAR"));
        assert!(is_text_like("JSON"));
        assert!(is_text_like("String"));
        assert!(!is_text_like("INTEGER"));
        assert!(!is_text_like("DATETIME"));
        assert!(!is_text_like("BLOB"));
        assert!(!is_text_like(""));
    }

    #[test]
    fn test_notes_field_list() {
        let def = IndexDefinition::build("notes", &notes_columns(), &[]).unwrap();
        assert_eq!(def.collection(), "notes");
        assert_eq!(def.fields(), ["id", "title", "body"]);
    }

    #[test]
    fn test_skip_columns() {
        let skip = vec!["body".to_string()];
        let def = IndexDefinition::build("notes", &notes_columns(), &skip).unwrap();
        assert_eq!(def.fields(), ["id", "title"]);
    }

    #[test]
    fn test_skip_id() {
        let skip = vec!["id".to_string()];
        let def = IndexDefinition::build("notes", &notes_columns(), &skip).unwrap();
        assert_eq!(def.fields(), ["title", "body"]);
    }

    #[test]
    fn test_id_added_even_when_not_text() {
        let columns = vec![Column::new("id", "INTEGER"), Column::new("n", "REAL")];
        let def = IndexDefinition::build("metrics", &columns, &[]).unwrap();
        assert_eq!(def.fields(), ["id"]);
    }

    #[test]
    fn test_collection_without_id() {
        let columns = vec![Column::new("slug", "VARCHAR(64)"), Column::new("n", "INTEGER")];
        let def = IndexDefinition::build("pages", &columns, &[]).unwrap();
        assert_eq!(def.fields(), ["slug"]);
    }

    #[test]
    fn test_duplicates_collapsed() {
        let columns = vec![
            Column::new("title", "TEXT"),
            Column::new("title", "TEXT"),
            Column::new("id", "TEXT"),
        ];
        let def = IndexDefinition::build("dupes", &columns, &[]).unwrap();
        assert_eq!(def.fields(), ["id", "title"]);
    }

    #[test]
    fn test_reserved_names_excluded() {
        assert!(is_reserved_field("rank"));
        assert!(is_reserved_field("ROWID"));
        assert!(!is_reserved_field("ranking"));

        let columns = vec![
            Column::new("id", "TEXT"),
            Column::new("title", "TEXT"),
            Column::new("rank", "TEXT"),
            Column::new("RowId", "VARCHAR(10)"),
        ];
        let def = IndexDefinition::build("posts", &columns, &[]).unwrap();
        assert_eq!(def.fields(), ["id", "title"]);
    }

    #[test]
    fn test_no_indexable_columns() {
        let columns = vec![Column::new("id", "INTEGER"), Column::new("n", "REAL")];
        let skip = vec!["id".to_string()];
        let err = IndexDefinition::build("metrics", &columns, &skip).unwrap_err();
        assert!(matches!(err, FtsError::NoIndexableColumns { .. }));
    }

    #[test]
    fn test_matches_columns() {
        let def = IndexDefinition::build("notes", &notes_columns(), &[]).unwrap();
        let same = vec![
            Column::new("id", ""),
            Column::new("title", ""),
            Column::new("body", ""),
        ];
        assert!(def.matches_columns(&same));
        assert!(!def.matches_columns(&same[..2]));
    }
}
