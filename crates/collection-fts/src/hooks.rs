//! Schema-change subscription.
//!
//! The application layer publishes collection created/updated/deleted events
//! on a [`SchemaChangeBus`]; the service reacts by creating, recreating or
//! deleting the matching index. The service itself never watches the store.

use crate::error::{FtsError, Result};
use crate::service::FullTextSearchService;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Index lifecycle action for a single collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FtsAction {
    Create,
    Recreate,
    Delete,
}

impl FtsAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FtsAction::Create => "create",
            FtsAction::Recreate => "recreate",
            FtsAction::Delete => "delete",
        }
    }
}

impl FromStr for FtsAction {
    type Err = FtsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "create" => Ok(FtsAction::Create),
            "recreate" => Ok(FtsAction::Recreate),
            "delete" => Ok(FtsAction::Delete),
            other => Err(FtsError::UnknownAction(other.to_string())),
        }
    }
}

impl fmt::Display for FtsAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A structural change to a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaChange {
    Created(String),
    Updated(String),
    Deleted(String),
}

impl SchemaChange {
    pub fn collection(&self) -> &str {
        match self {
            SchemaChange::Created(name)
            | SchemaChange::Updated(name)
            | SchemaChange::Deleted(name) => name,
        }
    }

    /// The lifecycle action that keeps an index in line with this change.
    pub fn action(&self) -> FtsAction {
        match self {
            SchemaChange::Created(_) => FtsAction::Create,
            SchemaChange::Updated(_) => FtsAction::Recreate,
            SchemaChange::Deleted(_) => FtsAction::Delete,
        }
    }
}

/// Receiver of schema-change notifications.
pub trait SchemaChangeListener: Send + Sync {
    fn on_schema_change(&self, change: &SchemaChange) -> Result<()>;
}

impl FullTextSearchService {
    /// Apply a lifecycle action to a registered collection.
    ///
    /// Returns `Ok(false)` without touching the store for empty or
    /// unregistered names.
    pub fn process_collection_action(&self, collection: &str, action: FtsAction) -> Result<bool> {
        if collection.is_empty() || !self.is_registered(collection) {
            return Ok(false);
        }

        info!("Running FTS {} for collection: {}", action, collection);
        let result = match action {
            FtsAction::Create => self.create_collection_fts(collection),
            FtsAction::Recreate => self.recreate_collection_fts(collection),
            FtsAction::Delete => self.delete_collection_fts(collection),
        };

        if let Err(e) = &result {
            error!("Failed to {} FTS for collection {}: {}", action, collection, e);
        }
        result.map(|()| true)
    }
}

impl SchemaChangeListener for FullTextSearchService {
    fn on_schema_change(&self, change: &SchemaChange) -> Result<()> {
        self.process_collection_action(change.collection(), change.action())
            .map(|_| ())
    }
}

/// Fan-out of schema changes to subscribed listeners.
#[derive(Default)]
pub struct SchemaChangeBus {
    listeners: Vec<Arc<dyn SchemaChangeListener>>,
}

impl SchemaChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Arc<dyn SchemaChangeListener>) {
        self.listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver a change to every listener.
    ///
    /// A failing listener does not stop delivery; its error is logged and
    /// returned.
    pub fn publish(&self, change: &SchemaChange) -> Vec<FtsError> {
        self.listeners
            .iter()
            .filter_map(|listener| match listener.on_schema_change(change) {
                Ok(()) => None,
                Err(e) => {
                    warn!(
                        "Schema change listener failed for {} ({}): {}",
                        change.collection(),
                        change.action(),
                        e
                    );
                    Some(e)
                }
            })
            .collect()
    }
}
