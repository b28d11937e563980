//! Collection FTS CLI - operate full-text indexes on a SQLite database.
//!
//! Wraps the collection-fts library so operators can bring indexes up, tear
//! them down and run searches without the surrounding application.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use collection_fts::{FtsOptions, FullTextSearchService, SearchOptions};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "collection-fts")]
#[command(about = "Manage and query SQLite FTS5 indexes for collections")]
struct Args {
    /// SQLite database holding the collections
    #[arg(long)]
    db: PathBuf,

    /// Collection to register (repeatable; added to any from --config)
    #[arg(short, long = "collection")]
    collections: Vec<String>,

    /// JSON options file (collections, skipColumns, forceRecreate, tokenizer, querySyntax)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create indexes for every registered collection
    Init {
        /// Drop existing indexes first
        #[arg(long)]
        force: bool,
    },
    /// Create (or resync) the index of one collection
    Create { collection: String },
    /// Drop the index and triggers of one collection
    Delete { collection: String },
    /// Drop and create the index of one collection
    Recreate { collection: String },
    /// Regenerate index contents from the source table
    Rebuild { collection: String },
    /// Merge index segments
    Optimize { collection: String },
    /// Show the fields and size of an index
    Stats { collection: String },
    /// Search a collection
    Search {
        collection: String,
        query: String,
        #[arg(long, default_value = "1")]
        page: i64,
        #[arg(long, default_value = "20")]
        per_page: i64,
    },
    /// List registered collections
    Collections,
}

/// Log filter used when `RUST_LOG` is not set.
fn default_log_directive(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_directive(args.debug)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut options = match &args.config {
        Some(path) => FtsOptions::from_json_file(path)
            .with_context(|| format!("Failed to load options from {}", path.display()))?,
        None => FtsOptions::default(),
    };
    for collection in args.collections {
        if !options.collections.contains(&collection) {
            options.collections.push(collection);
        }
    }

    info!("Opening database: {}", args.db.display());
    let mut service = FullTextSearchService::open(&args.db, options)
        .with_context(|| format!("Failed to open {}", args.db.display()))?;

    let output = match args.command {
        Command::Init { force } => {
            if force {
                service.set_force_recreate(true);
            }
            serde_json::to_value(service.initialize())?
        }
        Command::Create { collection } => {
            service.create_collection_fts(&collection)?;
            json!({ "created": collection })
        }
        Command::Delete { collection } => {
            service.delete_collection_fts(&collection)?;
            json!({ "deleted": collection })
        }
        Command::Recreate { collection } => {
            service.recreate_collection_fts(&collection)?;
            json!({ "recreated": collection })
        }
        Command::Rebuild { collection } => {
            service.rebuild_collection_fts(&collection)?;
            json!({ "rebuilt": collection })
        }
        Command::Optimize { collection } => {
            service.optimize_collection_fts(&collection)?;
            json!({ "optimized": collection })
        }
        Command::Stats { collection } => serde_json::to_value(service.index_stats(&collection)?)?,
        Command::Search {
            collection,
            query,
            page,
            per_page,
        } => {
            let response = service.search(
                &collection,
                &SearchOptions {
                    query,
                    page,
                    per_page,
                },
            )?;
            serde_json::to_value(response)?
        }
        Command::Collections => json!(service.get_supported_collections()),
    };

    // Intentional stdout: the JSON result is the command's output
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
