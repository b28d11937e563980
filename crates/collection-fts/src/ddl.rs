//! FTS5 virtual table and sync trigger statements.
//!
//! Every statement is derived from a single [`IndexDefinition`] so the table
//! shape and the three triggers always agree on the field list.

use crate::config::{index_table_name, trigger_names};
use crate::definition::IndexDefinition;

/// Quote an SQL identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote an SQL string literal, doubling embedded quotes.
fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Statements that create and drop a collection's FTS index.
#[derive(Debug, Clone)]
pub struct IndexStatements<'a> {
    definition: &'a IndexDefinition,
    tokenizer: Option<&'a str>,
}

impl<'a> IndexStatements<'a> {
    pub fn new(definition: &'a IndexDefinition, tokenizer: Option<&'a str>) -> Self {
        Self {
            definition,
            tokenizer,
        }
    }

    fn table(&self) -> String {
        quote_ident(&index_table_name(self.definition.collection()))
    }

    fn source(&self) -> String {
        quote_ident(self.definition.collection())
    }

    fn field_list(&self) -> String {
        self.definition
            .fields()
            .iter()
            .map(|f| quote_ident(f))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `prefix.field` for every field, in field order.
    fn row_values(&self, prefix: &str) -> String {
        self.definition
            .fields()
            .iter()
            .map(|f| format!("{}.{}", prefix, quote_ident(f)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Insert of a source row's values into the index.
    fn insert_row(&self, prefix: &str) -> String {
        format!(
            "INSERT INTO {}(rowid, {}) VALUES ({}.rowid, {});",
            self.table(),
            self.field_list(),
            prefix,
            self.row_values(prefix)
        )
    }

    /// FTS5 `'delete'` command for a source row's values.
    fn delete_row(&self, prefix: &str) -> String {
        let table = self.table();
        format!(
            "INSERT INTO {}({}, rowid, {}) VALUES ('delete', {}.rowid, {});",
            table,
            table,
            self.field_list(),
            prefix,
            self.row_values(prefix)
        )
    }

    /// `CREATE VIRTUAL TABLE` bound to the source table as external content.
    pub fn create_table(&self) -> String {
        let mut sql = format!(
            "CREATE VIRTUAL TABLE {} USING fts5({}, content={}",
            self.table(),
            self.field_list(),
            quote_literal(self.definition.collection())
        );
        if let Some(tokenizer) = self.tokenizer {
            sql.push_str(&format!(", tokenize={}", quote_literal(tokenizer)));
        }
        sql.push(')');
        sql
    }

    pub fn insert_trigger(&self) -> String {
        let [insert, _, _] = trigger_names(self.definition.collection());
        format!(
            "CREATE TRIGGER IF NOT EXISTS {} AFTER INSERT ON {} BEGIN {} END;",
            quote_ident(&insert),
            self.source(),
            self.insert_row("new")
        )
    }

    /// Removes the stale entry with the old values before inserting the new ones.
    pub fn update_trigger(&self) -> String {
        let [_, update, _] = trigger_names(self.definition.collection());
        format!(
            "CREATE TRIGGER IF NOT EXISTS {} AFTER UPDATE ON {} BEGIN {} {} END;",
            quote_ident(&update),
            self.source(),
            self.delete_row("old"),
            self.insert_row("new")
        )
    }

    pub fn delete_trigger(&self) -> String {
        let [_, _, delete] = trigger_names(self.definition.collection());
        format!(
            "CREATE TRIGGER IF NOT EXISTS {} AFTER DELETE ON {} BEGIN {} END;",
            quote_ident(&delete),
            self.source(),
            self.delete_row("old")
        )
    }

    /// Trigger statements in insert, update, delete order.
    pub fn triggers(&self) -> [String; 3] {
        [
            self.insert_trigger(),
            self.update_trigger(),
            self.delete_trigger(),
        ]
    }
}

/// `DROP TRIGGER IF EXISTS` for each sync trigger of a collection.
pub fn drop_triggers(collection: &str) -> Vec<String> {
    trigger_names(collection)
        .iter()
        .map(|name| format!("DROP TRIGGER IF EXISTS {}", quote_ident(name)))
        .collect()
}

pub fn drop_table(collection: &str) -> String {
    format!(
        "DROP TABLE IF EXISTS {}",
        quote_ident(&index_table_name(collection))
    )
}

/// Regenerate the index contents from the source table.
pub fn rebuild(collection: &str) -> String {
    fts_command(collection, "rebuild")
}

/// Merge the index b-trees.
pub fn optimize(collection: &str) -> String {
    fts_command(collection, "optimize")
}

fn fts_command(collection: &str, command: &str) -> String {
    let table = quote_ident(&index_table_name(collection));
    format!("INSERT INTO {}({}) VALUES('{}')", table, table, command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;

    fn notes_definition() -> IndexDefinition {
        let columns = vec![
            Column::new("id", "TEXT"),
            Column::new("title", "TEXT"),
            Column::new("body", "TEXT"),
            Column::new("created", "DATETIME"),
        ];
        IndexDefinition::build("notes", &columns, &[]).unwrap()
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("notes"), "\"notes\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_create_table() {
        let def = notes_definition();
        let stmts = IndexStatements::new(&def, None);
        assert_eq!(
            stmts.create_table(),
            "CREATE VIRTUAL TABLE \"notes_fts\" USING fts5(\"id\", \"title\", \"body\", content='notes')"
        );

        let stmts = IndexStatements::new(&def, Some("porter unicode61"));
        assert!(stmts
            .create_table()
            .ends_with("content='notes', tokenize='porter unicode61')"));
    }

    #[test]
    fn test_insert_trigger() {
        let def = notes_definition();
        let sql = IndexStatements::new(&def, None).insert_trigger();
        assert_eq!(
            sql,
            "CREATE TRIGGER IF NOT EXISTS \"notes_fts_insert\" AFTER INSERT ON \"notes\" BEGIN \
             INSERT INTO \"notes_fts\"(rowid, \"id\", \"title\", \"body\") \
             VALUES (new.rowid, new.\"id\", new.\"title\", new.\"body\"); END;"
        );
    }

    #[test]
    fn test_update_trigger_deletes_old_before_inserting_new() {
        let def = notes_definition();
        let sql = IndexStatements::new(&def, None).update_trigger();
        let delete_at = sql.find("VALUES ('delete', old.rowid").unwrap();
        let insert_at = sql.find("VALUES (new.rowid").unwrap();
        assert!(delete_at < insert_at);
        assert!(sql.contains("AFTER UPDATE ON \"notes\""));
    }

    #[test]
    fn test_delete_trigger() {
        let def = notes_definition();
        let sql = IndexStatements::new(&def, None).delete_trigger();
        assert!(sql.contains("\"notes_fts_delete\" AFTER DELETE ON \"notes\""));
        assert!(sql.contains(
            "INSERT INTO \"notes_fts\"(\"notes_fts\", rowid, \"id\", \"title\", \"body\") \
             VALUES ('delete', old.rowid, old.\"id\", old.\"title\", old.\"body\");"
        ));
        assert!(!sql.contains("new."));
    }

    #[test]
    fn test_drop_and_commands() {
        assert_eq!(
            drop_triggers("notes"),
            vec![
                "DROP TRIGGER IF EXISTS \"notes_fts_insert\"",
                "DROP TRIGGER IF EXISTS \"notes_fts_update\"",
                "DROP TRIGGER IF EXISTS \"notes_fts_delete\"",
            ]
        );
        assert_eq!(drop_table("notes"), "DROP TABLE IF EXISTS \"notes_fts\"");
        assert_eq!(
            rebuild("notes"),
            "INSERT INTO \"notes_fts\"(\"notes_fts\") VALUES('rebuild')"
        );
        assert_eq!(
            optimize("notes"),
            "INSERT INTO \"notes_fts\"(\"notes_fts\") VALUES('optimize')"
        );
    }
}
