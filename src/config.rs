//! Application settings
//!
//! Loaded from a YAML file. Every field has a default, so an empty file (or no
//! file at all) yields a working setup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Backend used to persist device mappings
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// One JSON document holding every mapping
    #[default]
    Json,
    /// Embedded sled database in the state directory
    Sled,
}

impl std::str::FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(StoreKind::Json),
            "sled" => Ok(StoreKind::Sled),
            other => anyhow::bail!("Unknown store kind: {} (expected json or sled)", other),
        }
    }
}

/// Root settings structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub store: StoreKind,

    /// Mapping document for the JSON store (defaults to the data directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_config_path: Option<PathBuf>,

    /// Extra SDL-format controller mappings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_db_path: Option<PathBuf>,

    /// Event poll interval of the input thread
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long to wait for slow gamepads before the first enumeration
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Shell commands run after a device has been configured
    #[serde(default)]
    pub on_finish: Vec<String>,

    /// Also write a daily rolling log file to the logs directory
    #[serde(default = "default_true")]
    pub log_file: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store: StoreKind::default(),
            input_config_path: None,
            controller_db_path: None,
            poll_interval_ms: default_poll_interval_ms(),
            settle_ms: default_settle_ms(),
            on_finish: Vec::new(),
            log_file: default_true(),
        }
    }
}

impl Settings {
    /// Load settings from file with validation
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        Self::from_yaml(&contents)
            .with_context(|| format!("Failed to parse YAML settings: {}", path.display()))
    }

    /// Load settings if the file exists, defaults otherwise
    pub async fn load_or_default(path: &Path) -> Result<Self> {
        if fs::try_exists(path).await.unwrap_or(false) {
            Self::load(path).await
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        // An empty document parses as null
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings for consistency
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            anyhow::bail!("poll_interval_ms must be greater than 0");
        }
        if self.on_finish.iter().any(|c| c.trim().is_empty()) {
            anyhow::bail!("on_finish commands cannot be empty");
        }
        Ok(())
    }
}

fn default_poll_interval_ms() -> u64 { 4 }
fn default_settle_ms() -> u64 { 1000 }
fn default_true() -> bool { true }
