//! # Storage Traits
//!
//! Abstraction over the managed document store: schemaless collections of
//! JSON documents with ordered live-query subscriptions. The domain layer
//! only ever talks to [`DocumentStore`], so the in-memory implementation
//! used for tests and local operation is interchangeable with a real
//! hosted backend adapter.

use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;

/// A raw document as delivered by the store: the canonical ID the store
/// assigned, plus the schemaless payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub id: String,
    pub data: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// An ordered live query over one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionQuery {
    pub collection: String,
    /// Document field the snapshot is ordered by.
    pub order_by: String,
    pub direction: SortDirection,
}

impl CollectionQuery {
    pub fn ascending(collection: &str, order_by: &str) -> Self {
        Self {
            collection: collection.to_string(),
            order_by: order_by.to_string(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(collection: &str, order_by: &str) -> Self {
        Self {
            collection: collection.to_string(),
            order_by: order_by.to_string(),
            direction: SortDirection::Descending,
        }
    }
}

/// Called with the complete, ordered materialization of the collection on
/// subscribe and after every change. Full replace, never an incremental
/// patch.
pub type SnapshotListener = Arc<dyn Fn(&[RawDocument]) + Send + Sync>;

pub type SubscriptionId = u64;

/// The surface of the managed document store consumed by this system.
pub trait DocumentStore: Send + Sync {
    /// Add a document to a collection. The store assigns and returns the
    /// canonical ID; any client-side identifier must be stripped before
    /// calling this.
    fn add_document(&self, collection: &str, data: Value) -> Result<String>;

    /// Replace the named top-level fields of an existing document.
    fn update_document(&self, collection: &str, id: &str, data: Value) -> Result<()>;

    /// Delete a document. Deleting an absent document is not an error.
    fn delete_document(&self, collection: &str, id: &str) -> Result<()>;

    /// Open an ordered live query. The listener fires immediately with the
    /// current snapshot and again after every mutation of the collection.
    fn subscribe(&self, query: CollectionQuery, listener: SnapshotListener)
        -> Result<SubscriptionId>;

    fn unsubscribe(&self, subscription: SubscriptionId);
}
