//! Configuration for cardhub.
//!
//! Read from `$CARDHUB_CONFIG` or `<config_dir>/cardhub/config.toml`. A missing
//! file yields the defaults; `$CARDHUB_DB` overrides the store path.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::models::{DuplicatePolicy, FilterMode, Topic};

const APP_DIR: &str = "cardhub";
const DEFAULT_DB_NAME: &str = "cardhub.db";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub study: StudyConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("CARDHUB_CONFIG") {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE))
    }

    pub fn db_path(&self) -> PathBuf {
        if let Ok(path) = std::env::var("CARDHUB_DB") {
            return PathBuf::from(path);
        }
        if let Some(path) = &self.store.path {
            return path.clone();
        }

        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);

        std::fs::create_dir_all(&config_dir).ok();
        config_dir.join(DEFAULT_DB_NAME)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
    /// Flat CSV export of the old card table, migrated once at startup.
    #[serde(default)]
    pub legacy_csv: Option<PathBuf>,
}

fn default_busy_timeout() -> u64 {
    2000
}

impl StoreConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: default_busy_timeout(),
            duplicate_policy: DuplicatePolicy::default(),
            legacy_csv: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    #[serde(default = "default_topic")]
    pub default_topic: Topic,
    #[serde(default)]
    pub default_filter: FilterMode,
}

fn default_topic() -> Topic {
    Topic::Physics
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            default_topic: default_topic(),
            default_filter: FilterMode::All,
        }
    }
}
