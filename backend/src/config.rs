//! Application configuration.
//!
//! A single YAML file under the user's home directory (overridable via
//! `SCHOOL_MANAGER_CONFIG`). Covers the data directory, the local override
//! credential, dispatch pacing, and the school display name used in
//! outbound messages. Missing file or missing keys fall back to defaults.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const CONFIG_ENV_VAR: &str = "SCHOOL_MANAGER_CONFIG";

/// The fixed operator bypass pair shipped by default. A deployer can
/// disable it, or replace both values, via the config file.
const DEFAULT_OVERRIDE_USERNAME: &str = "admin";
const DEFAULT_OVERRIDE_SECRET: &str = "7777777";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where the local session record (and any future local state) lives.
    /// Defaults to `Documents/School Manager` under the home directory.
    pub data_dir: Option<PathBuf>,
    /// Display name used as the header of outbound guardian messages.
    pub school_name: String,
    pub local_override: OverrideCredential,
    pub dispatch: DispatchPacing,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            school_name: "Escola Berçário Pintando 7".to_string(),
            local_override: OverrideCredential::default(),
            dispatch: DispatchPacing::default(),
        }
    }
}

/// The local override credential: a fixed identifier/secret pair that
/// grants a local session without consulting the identity provider.
/// Deliberately carried over from the source system; disable it in
/// deployments that must not have a provider-independent login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverrideCredential {
    pub enabled: bool,
    pub username: String,
    pub secret: String,
}

impl Default for OverrideCredential {
    fn default() -> Self {
        Self {
            enabled: true,
            username: DEFAULT_OVERRIDE_USERNAME.to_string(),
            secret: DEFAULT_OVERRIDE_SECRET.to_string(),
        }
    }
}

impl OverrideCredential {
    pub fn matches(&self, identifier: &str, secret: &str) -> bool {
        self.enabled && identifier == self.username && secret == self.secret
    }
}

/// Artificial per-recipient delay of the simulated bulk dispatch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchPacing {
    pub base_delay_ms: u64,
    /// Upper bound of the timestamp-derived jitter added to the base.
    pub jitter_ms: u64,
}

impl Default for DispatchPacing {
    fn default() -> Self {
        Self {
            base_delay_ms: 100,
            jitter_ms: 200,
        }
    }
}

impl DispatchPacing {
    /// Zero delay, for tests and non-interactive callers.
    pub fn immediate() -> Self {
        Self {
            base_delay_ms: 0,
            jitter_ms: 0,
        }
    }
}

impl AppConfig {
    /// Load the config file, falling back to defaults if it is absent or
    /// unreadable.
    pub fn load_or_default() -> Self {
        let path = Self::config_path();
        match fs::read_to_string(&path) {
            Ok(raw) => match serde_yaml::from_str(&raw) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!(
                        "Invalid configuration at {}: {}. Using defaults.",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return PathBuf::from(path);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".school-manager")
            .join("config.yaml")
    }

    /// Resolved data directory for local state.
    pub fn data_directory(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("School Manager")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_override_enabled() {
        let config = AppConfig::default();
        assert!(config.local_override.matches("admin", "7777777"));
        assert!(!config.local_override.matches("admin", "wrong"));
        assert!(!config.local_override.matches("someone", "7777777"));
    }

    #[test]
    fn disabled_override_never_matches() {
        let config: AppConfig = serde_yaml::from_str("local_override:\n  enabled: false\n").unwrap();
        assert!(!config.local_override.matches("admin", "7777777"));
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let config: AppConfig = serde_yaml::from_str("school_name: Escola Teste\n").unwrap();
        assert_eq!(config.school_name, "Escola Teste");
        assert!(config.local_override.enabled);
        assert_eq!(config.dispatch.base_delay_ms, 100);
    }

    #[test]
    fn explicit_data_dir_wins() {
        let config: AppConfig = serde_yaml::from_str("data_dir: /tmp/escola\n").unwrap();
        assert_eq!(config.data_directory(), PathBuf::from("/tmp/escola"));
    }
}
