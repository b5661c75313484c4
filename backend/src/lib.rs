//! # School Manager Backend
//!
//! The domain and data-sync layer of the school-management application:
//! typed entities mirrored from a managed document store, an optimistic
//! CRUD gateway, the auth session manager, and the aggregation helpers
//! the dashboards consume.
//!
//! The backend is UI-agnostic. It talks to two external services through
//! traits — the document store ([`storage::DocumentStore`]) and the
//! identity provider ([`auth::IdentityProvider`]) — and ships an
//! in-memory store implementation for tests and local operation.
//!
//! ## Architecture
//!
//! ```text
//! Presentation (out of scope)
//!     ↓ snapshots            ↓ commands
//! Sync Layer (typed mirrors) Domain Layer (gateway, services)
//!     ↓                      ↓
//! Storage Layer (document store abstraction)
//! ```

pub mod auth;
pub mod config;
pub mod domain;
pub mod storage;
pub mod sync;

use anyhow::Result;
use log::info;
use std::sync::Arc;

use auth::{AuthService, IdentityProvider, PushNotifier};
use config::AppConfig;
use domain::{CalendarService, DataGateway, EventDispatcher};
use storage::{DocumentStore, LocalSessionStore};
use sync::SyncEngine;

/// Application state holding every service, wired from one config.
pub struct App {
    pub config: AppConfig,
    pub sync: Arc<SyncEngine>,
    pub gateway: DataGateway,
    pub auth: AuthService,
    pub calendar: CalendarService,
    pub dispatcher: EventDispatcher,
}

/// Initialize the backend against a document store and identity provider.
/// Restores any persisted session and opens the live subscriptions when
/// one is found.
pub fn initialize(
    config: AppConfig,
    store: Arc<dyn DocumentStore>,
    provider: Box<dyn IdentityProvider>,
    notifier: Box<dyn PushNotifier>,
) -> Result<App> {
    info!("Setting up domain services");
    let gateway = DataGateway::new(store.clone());
    let sync = Arc::new(SyncEngine::new(store));
    let calendar = CalendarService::new();
    let dispatcher = EventDispatcher::new(
        gateway.clone(),
        config.dispatch,
        config.school_name.clone(),
    );

    let session_store = LocalSessionStore::new(config.data_directory());
    let auth = AuthService::new(
        provider,
        notifier,
        session_store,
        config.local_override.clone(),
    );

    auth.restore_session();
    if auth.state().is_authenticated() {
        sync.start()?;
    }

    Ok(App {
        config,
        sync,
        gateway,
        auth,
        calendar,
        dispatcher,
    })
}

impl App {
    /// Log in and, on success, open the live subscriptions.
    pub fn login(&self, identifier: &str, secret: &str) -> Result<shared::User, auth::AuthError> {
        let user = self.auth.login(identifier, secret)?;
        if let Err(e) = self.sync.start() {
            log::error!("Failed to start sync after login: {:#}", e);
        }
        Ok(user)
    }

    /// End the session: tear down subscriptions, clear mirrors and local
    /// session state.
    pub fn logout(&self) {
        self.sync.stop();
        self.auth.logout();
    }
}
