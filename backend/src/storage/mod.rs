//! # Storage Module
//!
//! The document-store abstraction the rest of the system is written
//! against, the in-memory implementation used by tests and local
//! operation, and the on-disk local session record.

pub mod memory;
pub mod session;
pub mod traits;

pub use memory::MemoryStore;
pub use session::LocalSessionStore;
pub use traits::{
    CollectionQuery, DocumentStore, RawDocument, SnapshotListener, SortDirection, SubscriptionId,
};
