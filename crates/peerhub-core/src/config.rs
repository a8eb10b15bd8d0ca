//! Configuration system for peerhub.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $PEERHUB_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/peerhub/config.toml
//!   3. ~/.config/peerhub/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub network: NetworkConfig,
    pub hub: HubSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address the line-framed peer acceptor binds to.
    pub listen_addr: String,
    /// Port for the HTTP status endpoint (bound on 127.0.0.1). 0 = disabled.
    pub status_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubSettings {
    /// Capacity of each peer's outbound queue, in messages.
    pub outbound_queue: usize,
    /// Longest peer identifier the acceptor will register.
    pub max_peer_id_len: usize,
    /// Longest inbound frame line, in bytes. Longer lines drop the connection.
    pub max_frame_len: usize,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:7700".to_string(),
            status_port: 7701,
        }
    }
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            outbound_queue: 256,
            max_peer_id_len: 128,
            max_frame_len: 64 * 1024,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("peerhub")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl HubConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::file_path())?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read a config file without env overrides. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(HubConfig::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("PEERHUB_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        write_default_at(&path)?;
        Ok(path)
    }

    /// Apply PEERHUB_* overrides. `lookup` resolves a variable name to its value.
    ///
    /// Unparseable numeric values are ignored and the previous setting kept.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PEERHUB_NETWORK__LISTEN_ADDR") {
            self.network.listen_addr = v;
        }
        if let Some(p) = lookup("PEERHUB_NETWORK__STATUS_PORT").and_then(|v| v.parse().ok()) {
            self.network.status_port = p;
        }
        if let Some(n) = lookup("PEERHUB_HUB__OUTBOUND_QUEUE").and_then(|v| v.parse().ok()) {
            self.hub.outbound_queue = n;
        }
        if let Some(n) = lookup("PEERHUB_HUB__MAX_PEER_ID_LEN").and_then(|v| v.parse().ok()) {
            self.hub.max_peer_id_len = n;
        }
        if let Some(n) = lookup("PEERHUB_HUB__MAX_FRAME_LEN").and_then(|v| v.parse().ok()) {
            self.hub.max_frame_len = n;
        }
    }
}

fn write_default_at(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))?;
    }
    let text =
        toml::to_string_pretty(&HubConfig::default()).map_err(ConfigError::SerializeFailed)?;
    std::fs::write(path, text).map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))
}
