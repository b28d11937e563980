//! Collection FTS - trigger-synchronized SQLite FTS5 indexes for arbitrary tables.
//!
//! For each registered collection (a source table) the service introspects the
//! columns, picks the text-like ones, and creates an external-content FTS5
//! table named `<collection>_fts` with insert/update/delete triggers that keep
//! it in step with every write. Searches are ranked by FTS5 `rank` and paged.
//!
//! # Example
//!
//! ```rust,ignore
//! use collection_fts::{FtsOptions, FullTextSearchService, SearchOptions};
//!
//! let options = FtsOptions {
//!     collections: vec!["notes".into()],
//!     ..Default::default()
//! };
//! let service = FullTextSearchService::open("data.db", options)?;
//! service.initialize();
//!
//! let response = service.search(
//!     "notes",
//!     &SearchOptions { query: "hello".into(), page: 1, per_page: 20 },
//! )?;
//! println!("{} matches", response.total_items);
//! ```

pub mod config;
pub mod ddl;
pub mod definition;
pub mod error;
pub mod hooks;
pub mod query;
pub mod schema;
pub mod search;
pub mod service;

pub use config::{FtsOptions, QuerySyntax, SearchConfig};
pub use definition::{is_text_like, IndexDefinition};
pub use error::{FtsError, Result};
pub use hooks::{FtsAction, SchemaChange, SchemaChangeBus, SchemaChangeListener};
pub use schema::Column;
pub use search::{prepare_search_response, Pagination, SearchOptions, SearchResponse, SearchResult};
pub use service::{CollectionFailure, FullTextSearchService, IndexStats, InitializeReport};
