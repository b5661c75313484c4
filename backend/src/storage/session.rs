//! Local session record.
//!
//! One serialized [`User`] under a fixed file in the data directory. It is
//! written on bypass login, cleared on any successful managed
//! login/registration and on explicit logout, and read at process start to
//! restore a local session.

use anyhow::{Context, Result};
use log::warn;
use shared::User;
use std::fs;
use std::path::{Path, PathBuf};

const SESSION_FILE: &str = "local_user.json";

#[derive(Debug, Clone)]
pub struct LocalSessionStore {
    path: PathBuf,
}

impl LocalSessionStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            path: data_dir.as_ref().join(SESSION_FILE),
        }
    }

    pub fn save(&self, user: &User) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating data directory {}", parent.display()))?;
        }
        let payload = serde_json::to_string_pretty(user)?;
        fs::write(&self.path, payload)
            .with_context(|| format!("writing session record {}", self.path.display()))?;
        Ok(())
    }

    /// Read the persisted record, if any. An unreadable or corrupt record
    /// is treated as absent.
    pub fn load(&self) -> Option<User> {
        let raw = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("Ignoring corrupt local session record: {}", e);
                None
            }
        }
    }

    pub fn clear(&self) {
        if self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                warn!("Failed to clear local session record: {}", e);
            }
        }
    }
}
