//! Sync layer configuration.
//!
//! Holds retry timing, refetch concurrency, the garbage collection period,
//! the initial online state, the default log filter and per-category cache
//! overrides.
//!
//! Configuration is stored at `~/.config/lifteat/sync.json`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cache::CacheOverrides;
use crate::category::DataCategory;

/// Application name used for the config directory path
const APP_NAME: &str = "lifteat";

/// Config file name
const CONFIG_FILE: &str = "sync.json";

/// First retry waits 1 second, then doubles.
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Backoff never exceeds 30 seconds.
const DEFAULT_MAX_RETRY_DELAY_MS: u64 = 30_000;

/// Parallel refetches after reconnect or focus.
const DEFAULT_MAX_CONCURRENT_REFETCHES: usize = 4;

/// The lifecycle worker sweeps expired entries every 5 minutes.
const DEFAULT_GC_INTERVAL_MS: u64 = 5 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
    pub max_concurrent_refetches: usize,
    pub gc_interval_ms: u64,
    /// Online state assumed until the platform reports otherwise.
    pub start_online: bool,
    pub log_filter: Option<String>,
    pub cache_overrides: HashMap<DataCategory, CacheOverrides>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            max_retry_delay_ms: DEFAULT_MAX_RETRY_DELAY_MS,
            max_concurrent_refetches: DEFAULT_MAX_CONCURRENT_REFETCHES,
            gc_interval_ms: DEFAULT_GC_INTERVAL_MS,
            start_online: true,
            log_filter: None,
            cache_overrides: HashMap::new(),
        }
    }
}

impl ClientConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Missing file means defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}
