//! Full-text index lifecycle and search entry point.

use crate::config::{index_table_name, FtsOptions, QuerySyntax};
use crate::ddl::{self, quote_ident, IndexStatements};
use crate::definition::IndexDefinition;
use crate::error::{FtsError, Result};
use crate::query::build_match_expression;
use crate::schema;
use crate::search::{self, Pagination, SearchOptions, SearchResponse, SearchResult};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// Outcome of [`FullTextSearchService::initialize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeReport {
    /// Collections whose index is in place.
    pub indexed: Vec<String>,
    pub failures: Vec<CollectionFailure>,
}

impl InitializeReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionFailure {
    pub collection: String,
    pub error: String,
}

/// Statistics about an existing collection index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub collection: String,
    pub table_name: String,
    pub fields: Vec<String>,
    /// Documents currently held by the index.
    pub indexed_rows: i64,
}

/// Maintains trigger-synchronized FTS5 indexes for a set of collections.
///
/// The connection is shared with the application that writes the source
/// tables; each operation holds the lock only for its own statements.
pub struct FullTextSearchService {
    conn: Arc<Mutex<Connection>>,
    collections: Vec<String>,
    skip_columns: HashMap<String, Vec<String>>,
    force_recreate: bool,
    tokenizer: Option<String>,
    query_syntax: QuerySyntax,
}

impl FullTextSearchService {
    /// Create a service with default options for the given collections.
    pub fn new<I, S>(conn: Arc<Mutex<Connection>>, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_options(
            conn,
            FtsOptions {
                collections: collections.into_iter().map(Into::into).collect(),
                ..Default::default()
            },
        )
    }

    /// Create a service from explicit options.
    pub fn with_options(conn: Arc<Mutex<Connection>>, options: FtsOptions) -> Self {
        Self {
            conn,
            collections: options.collections,
            skip_columns: options.skip_columns,
            force_recreate: options.force_recreate,
            tokenizer: options.tokenizer,
            query_syntax: options.query_syntax,
        }
    }

    /// Open a SQLite database file and build a service over it.
    pub fn open(db_path: impl AsRef<Path>, options: FtsOptions) -> Result<Self> {
        options.validate()?;
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| FtsError::io_with_path(e, parent))?;
            }
        }

        let conn = Connection::open(db_path)?;
        Self::configure_connection(&conn)?;
        Ok(Self::with_options(Arc::new(Mutex::new(conn)), options))
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA busy_timeout=30000;
            PRAGMA synchronous=NORMAL;
            ",
        )?;
        Ok(())
    }

    /// Shared handle to the underlying connection.
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| FtsError::Database {
            message: "Failed to acquire connection lock".to_string(),
            source: None,
        })
    }

    /// Replace the skip-column configuration.
    ///
    /// Applies to subsequent (re)creation only.
    pub fn set_skip_columns(&mut self, collection_skip_map: HashMap<String, Vec<String>>) {
        self.skip_columns = collection_skip_map;
    }

    /// Add columns to skip for one collection.
    pub fn add_skip_columns_for_collection<I, S>(&mut self, collection: &str, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_columns
            .entry(collection.to_string())
            .or_default()
            .extend(columns.into_iter().map(Into::into));
    }

    pub fn set_force_recreate(&mut self, force_recreate: bool) {
        self.force_recreate = force_recreate;
    }

    /// Collections configured for full-text search.
    pub fn get_supported_collections(&self) -> &[String] {
        &self.collections
    }

    pub fn is_registered(&self, collection: &str) -> bool {
        self.collections.iter().any(|c| c == collection)
    }

    /// Set up indexes for every registered collection.
    ///
    /// Failures are logged and reported per collection; one failing
    /// collection never stops the others.
    pub fn initialize(&self) -> InitializeReport {
        info!("Initializing full-text search service");
        let mut report = InitializeReport::default();

        for collection in &self.collections {
            if self.force_recreate {
                info!("Force recreate enabled, dropping FTS for collection {}", collection);
                if let Err(e) = self.delete_collection_fts(collection) {
                    warn!("Failed to delete FTS for collection {}: {}", collection, e);
                }
            }

            match self.create_collection_fts(collection) {
                Ok(()) => report.indexed.push(collection.clone()),
                Err(e) => {
                    error!("Failed to create FTS for collection {}: {}", collection, e);
                    report.failures.push(CollectionFailure {
                        collection: collection.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Full-text search initialized: {} indexed, {} failed",
            report.indexed.len(),
            report.failures.len()
        );
        report
    }

    /// Create the FTS table and sync triggers for a collection.
    ///
    /// An existing index with the same field list is rebuilt in place; one
    /// whose field list no longer matches the collection and skip
    /// configuration is dropped and recreated.
    pub fn create_collection_fts(&self, collection: &str) -> Result<()> {
        let mut conn = self.lock()?;
        debug!("Creating FTS for collection: {}", collection);

        let columns = schema::collection_columns(&conn, collection)?;
        let skip = self
            .skip_columns
            .get(collection)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let table = index_table_name(collection);
        let definition = match IndexDefinition::build(collection, &columns, skip) {
            Ok(definition) => definition,
            Err(e @ FtsError::NoIndexableColumns { .. }) => {
                // An index from an earlier configuration must not outlive it.
                let tx = conn.transaction()?;
                if schema::table_exists(&tx, &table)? {
                    info!(
                        "No indexable fields left for {}; dropping existing FTS table",
                        collection
                    );
                    drop_index(&tx, collection)?;
                    commit(tx)?;
                }
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        let statements = IndexStatements::new(&definition, self.tokenizer.as_deref());

        let tx = conn.transaction()?;

        if schema::table_exists(&tx, &table)? {
            let existing = schema::table_columns(&tx, &table)?;
            if definition.matches_columns(&existing) {
                debug!("FTS table for {} already exists", collection);
                create_triggers(&tx, &statements)?;
                execute_ddl(&tx, &ddl::rebuild(collection), "failed to rebuild FTS index")?;
                commit(tx)?;
                return Ok(());
            }

            info!(
                "FTS table for {} has fields {:?}, expected {:?}; recreating",
                collection,
                existing.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                definition.fields()
            );
            drop_index(&tx, collection)?;
        }

        let create_sql = statements.create_table();
        debug!("Creating FTS table with SQL: {}", create_sql);
        execute_ddl(&tx, &create_sql, "failed to create FTS table")?;
        create_triggers(&tx, &statements)?;
        execute_ddl(&tx, &ddl::rebuild(collection), "failed to sync collection")?;
        commit(tx)?;

        info!(
            "Created FTS for collection {} with fields {:?}",
            collection,
            definition.fields()
        );
        Ok(())
    }

    /// Drop the sync triggers and FTS table of a collection.
    ///
    /// Succeeds without doing anything when no index exists.
    pub fn delete_collection_fts(&self, collection: &str) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        if !schema::table_exists(&tx, &index_table_name(collection))? {
            // Triggers left without their table would fail every write.
            for sql in ddl::drop_triggers(collection) {
                execute_ddl(&tx, &sql, "failed to drop trigger")?;
            }
            commit(tx)?;
            debug!("No FTS table found for {}, nothing to delete", collection);
            return Ok(());
        }

        drop_index(&tx, collection)?;
        commit(tx)?;
        info!("Deleted FTS for collection {}", collection);
        Ok(())
    }

    /// Drop and create again, picking up the collection's current shape.
    pub fn recreate_collection_fts(&self, collection: &str) -> Result<()> {
        self.delete_collection_fts(collection)?;
        self.create_collection_fts(collection)
    }

    /// Regenerate the index contents from the source table.
    pub fn rebuild_collection_fts(&self, collection: &str) -> Result<()> {
        let conn = self.lock()?;
        ensure_index(&conn, collection)?;
        debug!("Rebuilding FTS index for {}", collection);
        execute_ddl(&conn, &ddl::rebuild(collection), "failed to rebuild FTS index")
    }

    /// Merge the index b-trees of a collection.
    pub fn optimize_collection_fts(&self, collection: &str) -> Result<()> {
        let conn = self.lock()?;
        ensure_index(&conn, collection)?;
        execute_ddl(&conn, &ddl::optimize(collection), "failed to optimize FTS index")?;
        debug!("Optimized FTS index for {}", collection);
        Ok(())
    }

    /// Shape and size of a collection's index.
    pub fn index_stats(&self, collection: &str) -> Result<IndexStats> {
        let conn = self.lock()?;
        ensure_index(&conn, collection)?;

        let table_name = index_table_name(collection);
        let fields = schema::table_columns(&conn, &table_name)?
            .into_iter()
            .map(|c| c.name)
            .collect();
        let indexed_rows: i64 = conn
            .query_row(
                &format!(
                    "SELECT COUNT(*) FROM {}",
                    quote_ident(&format!("{}_docsize", table_name))
                ),
                [],
                |row| row.get(0),
            )
            .map_err(|e| FtsError::query("failed to count indexed rows", e))?;

        Ok(IndexStats {
            collection: collection.to_string(),
            table_name,
            fields,
            indexed_rows,
        })
    }

    /// Whether a collection is registered and backed by an FTS table.
    pub fn is_collection_searchable(&self, collection: &str) -> bool {
        if !self.is_registered(collection) {
            return false;
        }

        let conn = match self.lock() {
            Ok(conn) => conn,
            Err(e) => {
                error!("Error checking FTS table for {}: {}", collection, e);
                return false;
            }
        };

        match index_present(&conn, collection) {
            Ok(exists) => exists,
            Err(e) => {
                error!("Error checking if FTS table exists for {}: {}", collection, e);
                false
            }
        }
    }

    /// Search one page of a collection's index.
    ///
    /// Returns the page of hits and the total number of matches. An empty
    /// query yields no hits rather than everything.
    pub fn search_collection(
        &self,
        collection: &str,
        query: &str,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<SearchResult>, i64)> {
        if !self.is_collection_searchable(collection) {
            return Err(FtsError::NotSearchable {
                collection: collection.to_string(),
            });
        }

        let Some(match_expr) = build_match_expression(query, self.query_syntax) else {
            return Ok((Vec::new(), 0));
        };

        let pagination = Pagination::clamp(page, per_page);
        let conn = self.lock()?;
        let items = search::search_index(&conn, collection, &match_expr, pagination)?;
        let total = search::count_matches(&conn, collection, &match_expr)?;

        debug!(
            "Search {:?} in {} returned {} of {} matches",
            query,
            collection,
            items.len(),
            total
        );
        Ok((items, total))
    }

    /// Search and wrap the hits in the paged envelope.
    pub fn search(&self, collection: &str, options: &SearchOptions) -> Result<SearchResponse> {
        let pagination = Pagination::clamp(options.page, options.per_page);
        let (items, total) = self.search_collection(
            collection,
            &options.query,
            pagination.page,
            pagination.per_page,
        )?;
        Ok(self.prepare_search_response(items, total, pagination.page, pagination.per_page))
    }

    /// Build the paged envelope for a set of hits.
    pub fn prepare_search_response(
        &self,
        items: Vec<SearchResult>,
        total_items: i64,
        page: i64,
        per_page: i64,
    ) -> SearchResponse {
        search::prepare_search_response(items, total_items, page, per_page)
    }
}

fn execute_ddl(conn: &Connection, sql: &str, context: &str) -> Result<()> {
    conn.execute_batch(sql).map_err(|e| FtsError::ddl(context, e))
}

fn commit(tx: rusqlite::Transaction<'_>) -> Result<()> {
    tx.commit()
        .map_err(|e| FtsError::ddl("failed to commit FTS changes", e))
}

fn create_triggers(conn: &Connection, statements: &IndexStatements<'_>) -> Result<()> {
    let [insert, update, delete] = statements.triggers();
    for (sql, context) in [
        (insert, "failed to create INSERT trigger"),
        (update, "failed to create UPDATE trigger"),
        (delete, "failed to create DELETE trigger"),
    ] {
        debug!("Creating trigger: {}", sql);
        execute_ddl(conn, &sql, context)?;
    }
    Ok(())
}

fn drop_index(conn: &Connection, collection: &str) -> Result<()> {
    for sql in ddl::drop_triggers(collection) {
        execute_ddl(conn, &sql, "failed to drop trigger")?;
    }
    execute_ddl(conn, &ddl::drop_table(collection), "failed to drop FTS table")
}

/// Both the source collection and its FTS table exist.
fn index_present(conn: &Connection, collection: &str) -> Result<bool> {
    Ok(schema::table_exists(conn, collection)?
        && schema::table_exists(conn, &index_table_name(collection))?)
}

fn ensure_index(conn: &Connection, collection: &str) -> Result<()> {
    if schema::table_exists(conn, &index_table_name(collection))? {
        Ok(())
    } else {
        Err(FtsError::NotSearchable {
            collection: collection.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_service() -> (FullTextSearchService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let service = FullTextSearchService::open(
            temp_dir.path().join("data.db"),
            FtsOptions {
                collections: vec!["notes".to_string(), "metrics".to_string()],
                ..Default::default()
            },
        )
        .unwrap();

        service
            .connection()
            .lock()
            .unwrap()
            .execute_batch(
                "CREATE TABLE notes (
                    id TEXT PRIMARY KEY,
                    title TEXT,
                    body TEXT,
                    created DATETIME
                );
                CREATE TABLE metrics (id INTEGER PRIMARY KEY, value REAL);",
            )
            .unwrap();

        (service, temp_dir)
    }

    fn insert_note(service: &FullTextSearchService, id: &str, title: &str, body: &str) {
        service
            .connection()
            .lock()
            .unwrap()
            .execute(
                "INSERT INTO notes (id, title, body, created) VALUES (?1, ?2, ?3, '2024-01-01')",
                [id, title, body],
            )
            .unwrap();
    }

    fn count_triggers(service: &FullTextSearchService) -> i64 {
        service
            .connection()
            .lock()
            .unwrap()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='trigger' AND tbl_name='notes'",
                [],
                |row| row.get(0),
            )
            .unwrap()
    }

    #[test]
    fn test_create_indexes_existing_rows() {
        let (service, _temp) = create_test_service();
        insert_note(&service, "n1", "Hello World", "first post");

        service.create_collection_fts("notes").unwrap();

        let (items, total) = service.search_collection("notes", "hello", 1, 20).unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].id, "n1");
        assert_eq!(items[0].collection, "notes");
        assert_eq!(items[0].data["title"], "Hello World");
        assert!(!items[0].data.contains_key("created"));
    }

    #[test]
    fn test_create_twice_is_idempotent() {
        let (service, _temp) = create_test_service();
        service.create_collection_fts("notes").unwrap();
        service.create_collection_fts("notes").unwrap();

        assert_eq!(count_triggers(&service), 3);
        insert_note(&service, "n1", "Hello", "again");
        let (_, total) = service.search_collection("notes", "hello", 1, 20).unwrap();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_no_indexable_columns_leaves_nothing_behind() {
        let (mut service, _temp) = create_test_service();
        service.add_skip_columns_for_collection("metrics", ["id"]);

        let err = service.create_collection_fts("metrics").unwrap_err();
        assert!(matches!(err, FtsError::NoIndexableColumns { .. }));

        let conn = service.connection();
        let conn = conn.lock().unwrap();
        assert!(!schema::table_exists(&conn, "metrics_fts").unwrap());
    }

    #[test]
    fn test_missing_collection() {
        let (service, _temp) = create_test_service();
        let err = service.create_collection_fts("ghosts").unwrap_err();
        assert!(matches!(err, FtsError::CollectionNotFound { .. }));
    }

    #[test]
    fn test_delete_without_index_is_noop() {
        let (service, _temp) = create_test_service();
        service.delete_collection_fts("notes").unwrap();
        service.delete_collection_fts("ghosts").unwrap();
    }

    #[test]
    fn test_delete_removes_table_and_triggers() {
        let (service, _temp) = create_test_service();
        service.create_collection_fts("notes").unwrap();
        service.delete_collection_fts("notes").unwrap();

        assert_eq!(count_triggers(&service), 0);
        assert!(!service.is_collection_searchable("notes"));
        // Writes still succeed once the triggers are gone.
        insert_note(&service, "n1", "after", "delete");
    }

    #[test]
    fn test_search_rejects_unsearchable() {
        let (service, _temp) = create_test_service();
        let err = service.search_collection("notes", "x", 1, 20).unwrap_err();
        assert!(matches!(err, FtsError::NotSearchable { .. }));

        let err = service.search_collection("other", "x", 1, 20).unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_empty_query() {
        let (service, _temp) = create_test_service();
        insert_note(&service, "n1", "Hello", "world");
        service.create_collection_fts("notes").unwrap();

        let (items, total) = service.search_collection("notes", "", 1, 20).unwrap();
        assert!(items.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn test_invalid_match_syntax_is_query_failure() {
        let (service, _temp) = create_test_service();
        service.create_collection_fts("notes").unwrap();
        let err = service.search_collection("notes", "\"unbalanced", 1, 20).unwrap_err();
        assert!(matches!(err, FtsError::QueryFailure { .. }));
    }

    #[test]
    fn test_stats_and_maintenance() {
        let (service, _temp) = create_test_service();
        insert_note(&service, "n1", "one", "a");
        insert_note(&service, "n2", "two", "b");
        service.create_collection_fts("notes").unwrap();

        service.rebuild_collection_fts("notes").unwrap();
        service.optimize_collection_fts("notes").unwrap();

        let stats = service.index_stats("notes").unwrap();
        assert_eq!(stats.table_name, "notes_fts");
        assert_eq!(stats.fields, vec!["id", "title", "body"]);
        assert_eq!(stats.indexed_rows, 2);

        let err = service.rebuild_collection_fts("metrics").unwrap_err();
        assert!(matches!(err, FtsError::NotSearchable { .. }));
    }

    #[test]
    fn test_initialize_continues_past_failures() {
        let (mut service, _temp) = create_test_service();
        service.add_skip_columns_for_collection("metrics", ["id"]);

        let report = service.initialize();
        assert_eq!(report.indexed, vec!["notes"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].collection, "metrics");
        assert!(!report.is_complete());
        assert!(service.is_collection_searchable("notes"));
    }

    #[test]
    fn test_initialize_force_recreate() {
        let (mut service, _temp) = create_test_service();
        service.set_skip_columns(HashMap::from([(
            "metrics".to_string(),
            vec!["id".to_string()],
        )]));
        service.initialize();

        service.set_force_recreate(true);
        service.add_skip_columns_for_collection("notes", ["body"]);
        service.initialize();

        let stats = service.index_stats("notes").unwrap();
        assert_eq!(stats.fields, vec!["id", "title"]);
        assert_eq!(count_triggers(&service), 3);
    }
}
