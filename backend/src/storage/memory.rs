//! In-memory document store.
//!
//! Backs the test suite and local single-process operation. Collections
//! are plain vectors of JSON documents; every mutation re-materializes the
//! ordered snapshot for each live query and pushes it to the listeners,
//! which is exactly the contract the sync layer is written against.

use anyhow::{anyhow, Result};
use log::warn;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::storage::traits::{
    CollectionQuery, DocumentStore, RawDocument, SnapshotListener, SortDirection, SubscriptionId,
};

#[derive(Debug, Clone)]
struct StoredDoc {
    id: String,
    data: Value,
}

struct Subscription {
    id: SubscriptionId,
    query: CollectionQuery,
    listener: SnapshotListener,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, Vec<StoredDoc>>,
    subscriptions: Vec<Subscription>,
    next_subscription: SubscriptionId,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ordered materialization of one collection under a query.
    fn snapshot_for(inner: &Inner, query: &CollectionQuery) -> Vec<RawDocument> {
        let mut docs: Vec<RawDocument> = inner
            .collections
            .get(&query.collection)
            .map(|docs| {
                docs.iter()
                    .map(|d| RawDocument {
                        id: d.id.clone(),
                        data: d.data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        docs.sort_by(|a, b| {
            let ord = compare_field(&a.data, &b.data, &query.order_by);
            match query.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
        docs
    }

    /// Collect (listener, snapshot) pairs for the collection, then invoke
    /// them with the lock released so listeners may re-enter the store.
    fn notify(&self, collection: &str) {
        let pending: Vec<(SnapshotListener, Vec<RawDocument>)> = {
            let inner = self.inner.lock().unwrap();
            inner
                .subscriptions
                .iter()
                .filter(|s| s.query.collection == collection)
                .map(|s| (s.listener.clone(), Self::snapshot_for(&inner, &s.query)))
                .collect()
        };
        for (listener, snapshot) in pending {
            listener(&snapshot);
        }
    }
}

/// Compare one document field the way the store orders query results:
/// numbers numerically, everything else lexicographically on the string
/// form. Documents missing the field sort first.
fn compare_field(a: &Value, b: &Value, field: &str) -> Ordering {
    let lhs = a.get(field);
    let rhs = b.get(field);
    match (lhs, rhs) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(xn), Some(yn)) => xn.partial_cmp(&yn).unwrap_or(Ordering::Equal),
            _ => field_string(x).cmp(&field_string(y)),
        },
    }
}

fn field_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl DocumentStore for MemoryStore {
    fn add_document(&self, collection: &str, data: Value) -> Result<String> {
        if !data.is_object() {
            return Err(anyhow!("document for '{}' must be a JSON object", collection));
        }
        let id = Uuid::new_v4().to_string();
        {
            let mut inner = self.inner.lock().unwrap();
            inner
                .collections
                .entry(collection.to_string())
                .or_default()
                .push(StoredDoc {
                    id: id.clone(),
                    data,
                });
        }
        self.notify(collection);
        Ok(id)
    }

    fn update_document(&self, collection: &str, id: &str, data: Value) -> Result<()> {
        let fields = data
            .as_object()
            .ok_or_else(|| anyhow!("update for '{}' must be a JSON object", collection))?
            .clone();
        {
            let mut inner = self.inner.lock().unwrap();
            let doc = inner
                .collections
                .get_mut(collection)
                .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
                .ok_or_else(|| anyhow!("document '{}' not found in '{}'", id, collection))?;

            // Top-level field replace, keyed by ID.
            let target = doc
                .data
                .as_object_mut()
                .ok_or_else(|| anyhow!("stored document '{}' is not an object", id))?;
            for (key, value) in fields {
                target.insert(key, value);
            }
        }
        self.notify(collection);
        Ok(())
    }

    fn delete_document(&self, collection: &str, id: &str) -> Result<()> {
        let removed = {
            let mut inner = self.inner.lock().unwrap();
            match inner.collections.get_mut(collection) {
                Some(docs) => {
                    let before = docs.len();
                    docs.retain(|d| d.id != id);
                    docs.len() != before
                }
                None => false,
            }
        };
        if removed {
            self.notify(collection);
        } else {
            warn!("delete of absent document '{}' in '{}'", id, collection);
        }
        Ok(())
    }

    fn subscribe(
        &self,
        query: CollectionQuery,
        listener: SnapshotListener,
    ) -> Result<SubscriptionId> {
        let (id, initial) = {
            let mut inner = self.inner.lock().unwrap();
            inner.next_subscription += 1;
            let id = inner.next_subscription;
            let initial = Self::snapshot_for(&inner, &query);
            inner.subscriptions.push(Subscription {
                id,
                query,
                listener: listener.clone(),
            });
            (id, initial)
        };
        // Live queries deliver the current snapshot up front.
        listener(&initial);
        Ok(id)
    }

    fn unsubscribe(&self, subscription: SubscriptionId) {
        let mut inner = self.inner.lock().unwrap();
        inner.subscriptions.retain(|s| s.id != subscription);
    }
}
