//! Vault configuration, parsed from a TOML file + environment variable overrides.
//!
//! Priority: environment variables > config file > defaults.
//!
//! ```toml
//! heartbeat_interval_secs = 86400
//! challenge_window_secs = 604800
//! tree_depth = 20
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::registry::MAX_TREE_DEPTH;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Deployment parameters of one vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// How long each heartbeat keeps the vault alive (seconds)
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    /// How long the owner may revoke an expiry (seconds)
    #[serde(default = "default_challenge_window")]
    pub challenge_window_secs: u64,

    /// Depth of the heir membership tree
    #[serde(default = "default_tree_depth")]
    pub tree_depth: u8,

    /// Round nonce bound into every claim signal
    #[serde(default)]
    pub round: u64,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval(),
            challenge_window_secs: default_challenge_window(),
            tree_depth: default_tree_depth(),
            round: 0,
        }
    }
}

fn default_heartbeat_interval() -> u64 {
    86_400 // 1 day
}

fn default_challenge_window() -> u64 {
    604_800 // 7 days
}

fn default_tree_depth() -> u8 {
    20
}

impl VaultConfig {
    /// Load from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply environment variable overrides.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("HEIRLOOM_HEARTBEAT_INTERVAL_SECS") {
            match v.parse() {
                Ok(secs) => self.heartbeat_interval_secs = secs,
                Err(_) => log::warn!("Ignoring invalid HEIRLOOM_HEARTBEAT_INTERVAL_SECS: {}", v),
            }
        }
        if let Some(v) = lookup("HEIRLOOM_CHALLENGE_WINDOW_SECS") {
            match v.parse() {
                Ok(secs) => self.challenge_window_secs = secs,
                Err(_) => log::warn!("Ignoring invalid HEIRLOOM_CHALLENGE_WINDOW_SECS: {}", v),
            }
        }
        if let Some(v) = lookup("HEIRLOOM_TREE_DEPTH") {
            match v.parse() {
                Ok(depth) => self.tree_depth = depth,
                Err(_) => log::warn!("Ignoring invalid HEIRLOOM_TREE_DEPTH: {}", v),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heartbeat_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "heartbeat_interval_secs",
                reason: "must be positive".into(),
            });
        }
        if self.challenge_window_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "challenge_window_secs",
                reason: "must be positive".into(),
            });
        }
        if self.tree_depth == 0 || self.tree_depth > MAX_TREE_DEPTH {
            return Err(ConfigError::InvalidValue {
                field: "tree_depth",
                reason: format!("must be between 1 and {}", MAX_TREE_DEPTH),
            });
        }
        Ok(())
    }
}
