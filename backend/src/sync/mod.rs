//! # Realtime Sync Layer
//!
//! Mirrors the six store collections into typed, versioned in-memory
//! snapshots. Each collection has an ordered live query; every change
//! notification rebuilds the complete collection from the delivered
//! snapshot (full replace, not incremental patch) and republishes it to
//! subscribers. Subscriptions are torn down when the session ends.

pub mod normalize;

use anyhow::Result;
use log::{error, info, warn};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use shared::{Appointment, Expense, MealLog, SchoolEvent, Student, WeeklyGoal};

use crate::storage::{CollectionQuery, DocumentStore, SnapshotListener, SubscriptionId};

/// Store collection names.
pub mod collections {
    pub const STUDENTS: &str = "students";
    pub const LOGS: &str = "logs";
    pub const APPOINTMENTS: &str = "appointments";
    pub const GOALS: &str = "goals";
    pub const EXPENSES: &str = "expenses";
    pub const EVENTS: &str = "events";
}

type Watcher<T> = Arc<dyn Fn(&[T]) + Send + Sync>;

struct HandleInner<T> {
    version: u64,
    items: Arc<Vec<T>>,
    error: Option<String>,
    watchers: HashMap<u64, Watcher<T>>,
    next_watcher: u64,
}

impl<T> Default for HandleInner<T> {
    fn default() -> Self {
        Self {
            version: 0,
            items: Arc::new(Vec::new()),
            error: None,
            watchers: HashMap::new(),
            next_watcher: 0,
        }
    }
}

/// An owned, versioned snapshot of one collection behind a
/// publish/subscribe interface. Consumers read [`snapshot`] (a cheap
/// `Arc` clone) or register a watcher fired on every published version.
///
/// [`snapshot`]: CollectionHandle::snapshot
pub struct CollectionHandle<T> {
    inner: Arc<Mutex<HandleInner<T>>>,
}

impl<T> Clone for CollectionHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for CollectionHandle<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CollectionHandle<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HandleInner::default())),
        }
    }

    pub fn snapshot(&self) -> Arc<Vec<T>> {
        self.inner.lock().unwrap().items.clone()
    }

    pub fn version(&self) -> u64 {
        self.inner.lock().unwrap().version
    }

    /// The last snapshot-application failure, if the most recent
    /// notification could not be materialized. The previous good snapshot
    /// stays readable.
    pub fn error(&self) -> Option<String> {
        self.inner.lock().unwrap().error.clone()
    }

    pub fn watch(&self, watcher: impl Fn(&[T]) + Send + Sync + 'static) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        inner.next_watcher += 1;
        let id = inner.next_watcher;
        inner.watchers.insert(id, Arc::new(watcher));
        id
    }

    pub fn unwatch(&self, watcher: u64) {
        self.inner.lock().unwrap().watchers.remove(&watcher);
    }

    fn publish(&self, items: Vec<T>) {
        let (items, watchers) = {
            let mut inner = self.inner.lock().unwrap();
            inner.items = Arc::new(items);
            inner.version += 1;
            inner.error = None;
            (
                inner.items.clone(),
                inner.watchers.values().cloned().collect::<Vec<_>>(),
            )
        };
        for watcher in watchers {
            watcher(&items);
        }
    }

    fn publish_error(&self, message: String) {
        self.inner.lock().unwrap().error = Some(message);
    }
}

/// Owns the six collection mirrors and their live subscriptions.
pub struct SyncEngine {
    store: Arc<dyn DocumentStore>,
    pub students: CollectionHandle<Student>,
    pub meal_logs: CollectionHandle<MealLog>,
    pub appointments: CollectionHandle<Appointment>,
    pub goals: CollectionHandle<WeeklyGoal>,
    pub expenses: CollectionHandle<Expense>,
    pub events: CollectionHandle<SchoolEvent>,
    subscriptions: Mutex<Vec<SubscriptionId>>,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            students: CollectionHandle::new(),
            meal_logs: CollectionHandle::new(),
            appointments: CollectionHandle::new(),
            goals: CollectionHandle::new(),
            expenses: CollectionHandle::new(),
            events: CollectionHandle::new(),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Open the six ordered subscriptions. Idempotent: a second call while
    /// active is a no-op.
    pub fn start(&self) -> Result<()> {
        {
            let subscriptions = self.subscriptions.lock().unwrap();
            if !subscriptions.is_empty() {
                warn!("Sync engine already started");
                return Ok(());
            }
        }

        let students = self.students.clone();
        let student_listener: SnapshotListener = Arc::new(move |docs| {
            let items = docs.iter().map(normalize::student_from_document).collect();
            students.publish(items);
        });

        let opened = vec![
            self.store.subscribe(
                CollectionQuery::ascending(collections::STUDENTS, "fullName"),
                student_listener,
            )?,
            self.subscribe_typed(
                CollectionQuery::descending(collections::LOGS, "date"),
                self.meal_logs.clone(),
                collections::LOGS,
            )?,
            self.subscribe_typed(
                CollectionQuery::ascending(collections::APPOINTMENTS, "date"),
                self.appointments.clone(),
                collections::APPOINTMENTS,
            )?,
            self.subscribe_typed(
                CollectionQuery::ascending(collections::GOALS, "createdAt"),
                self.goals.clone(),
                collections::GOALS,
            )?,
            self.subscribe_typed(
                CollectionQuery::descending(collections::EXPENSES, "date"),
                self.expenses.clone(),
                collections::EXPENSES,
            )?,
            self.subscribe_typed(
                CollectionQuery::ascending(collections::EVENTS, "date"),
                self.events.clone(),
                collections::EVENTS,
            )?,
        ];

        *self.subscriptions.lock().unwrap() = opened;
        info!("Sync engine started: 6 live collections");
        Ok(())
    }

    fn subscribe_typed<T>(
        &self,
        query: CollectionQuery,
        handle: CollectionHandle<T>,
        label: &'static str,
    ) -> Result<SubscriptionId>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let listener: SnapshotListener = Arc::new(move |docs| {
            let mapped: Result<Vec<T>> =
                docs.iter().map(normalize::typed_from_document::<T>).collect();
            match mapped {
                Ok(items) => handle.publish(items),
                Err(e) => {
                    // A malformed document fails the whole snapshot; the
                    // last good snapshot stays in place.
                    error!("Malformed document in '{}' snapshot: {:#}", label, e);
                    handle.publish_error(format!("{:#}", e));
                }
            }
        });
        self.store.subscribe(query, listener)
    }

    /// Tear down the subscriptions and clear every mirror (session end).
    pub fn stop(&self) {
        let opened: Vec<SubscriptionId> = std::mem::take(&mut *self.subscriptions.lock().unwrap());
        for subscription in opened {
            self.store.unsubscribe(subscription);
        }
        self.students.publish(Vec::new());
        self.meal_logs.publish(Vec::new());
        self.appointments.publish(Vec::new());
        self.goals.publish(Vec::new());
        self.expenses.publish(Vec::new());
        self.events.publish(Vec::new());
        info!("Sync engine stopped");
    }
}
