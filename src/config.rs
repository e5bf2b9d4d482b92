// Copyright (c) 2024-2025 Peersync contributors
// Licensed under the MIT License. See LICENSE file for details.

//! Client configuration: gateway URL, poll interval, request timeout.
//!
//! Loaded from `config.json` under the platform config directory, with
//! `PEERSYNC_*` environment variables taking precedence over the file and
//! built-in defaults filling every gap. A missing file is not an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

fn default_server_url() -> String {
    "http://localhost:5050".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the local daemon's REST gateway
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Delay between download poll ticks
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Per-request timeout for transport calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ClientConfig {
    /// Load from the default location, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from an explicit file path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Write to an explicit file path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(self).context("failed to encode config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("failed to write config file {}", path.display()))
    }

    /// Default config file location (`<config dir>/peersync/config.json`).
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("peersync").join("config.json"))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("PEERSYNC_SERVER_URL") {
            if !url.is_empty() {
                self.server_url = url;
            }
        }
        if let Ok(ms) = std::env::var("PEERSYNC_POLL_INTERVAL_MS") {
            match ms.parse::<u64>() {
                Ok(parsed) if parsed > 0 => self.poll_interval_ms = parsed,
                _ => tracing::warn!(value = %ms, "ignoring invalid PEERSYNC_POLL_INTERVAL_MS"),
            }
        }
        if let Ok(secs) = std::env::var("PEERSYNC_REQUEST_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(parsed) if parsed > 0 => self.request_timeout_secs = parsed,
                _ => {
                    tracing::warn!(value = %secs, "ignoring invalid PEERSYNC_REQUEST_TIMEOUT_SECS")
                }
            }
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
