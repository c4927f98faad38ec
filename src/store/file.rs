//! Single-document JSON store
//!
//! All device configs live in one file. Saves go to a temporary sibling that
//! is then renamed over the real file, so an interrupted write leaves the
//! previous mappings intact.

use super::ConfigStore;
use crate::error::StoreError;
use crate::mapping::InputConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// On-disk document holding every saved config
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigDocument {
    /// Version of the document format
    pub version: String,
    /// Local time of the last save (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
    #[serde(default)]
    pub configs: Vec<InputConfig>,
}

impl ConfigDocument {
    /// Current document format version
    pub const VERSION: &'static str = "1.0.0";

    fn empty() -> Self {
        Self {
            version: Self::VERSION.to_string(),
            saved_at: None,
            configs: Vec::new(),
        }
    }

    fn upsert(&mut self, config: &InputConfig) {
        match self
            .configs
            .iter_mut()
            .find(|c| c.device_guid == config.device_guid)
        {
            Some(existing) => *existing = config.clone(),
            None => self.configs.push(config.clone()),
        }
    }
}

/// Path used for the in-progress copy of `path`
pub fn temporary_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "input.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// JSON document store
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
    temp_path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let temp_path = temporary_path_for(&path);
        Self { path, temp_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Read the whole document; a missing file is an empty document
    pub fn read_document(&self) -> Result<ConfigDocument, StoreError> {
        if !self.path.exists() {
            return Ok(ConfigDocument::empty());
        }
        let json = fs::read_to_string(&self.path)?;
        serde_json::from_str(&json).map_err(|e| {
            StoreError::Corrupt(format!("{}: {}", self.path.display(), e))
        })
    }

    fn write_document(&self, document: &ConfigDocument) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating config directory: {}", parent.display());
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(document)?;
        fs::write(&self.temp_path, json)?;
        fs::rename(&self.temp_path, &self.path)?;
        Ok(())
    }

    /// Move an unreadable document aside so a save can start over
    fn quarantine(&self) -> Result<(), StoreError> {
        let mut backup = self.path.clone().into_os_string();
        backup.push(".bak");
        warn!(
            "Input config {} is unreadable, moving it to {}",
            self.path.display(),
            PathBuf::from(&backup).display()
        );
        fs::rename(&self.path, backup)?;
        Ok(())
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self, guid: &str) -> Result<InputConfig, StoreError> {
        let document = self.read_document()?;
        document
            .configs
            .into_iter()
            .find(|c| c.device_guid == guid)
            .ok_or_else(|| StoreError::NotFound(guid.to_string()))
    }

    fn save(&mut self, config: &InputConfig) -> Result<(), StoreError> {
        let mut document = match self.read_document() {
            Ok(document) => document,
            Err(StoreError::Corrupt(reason)) => {
                warn!("Discarding corrupt input config: {}", reason);
                self.quarantine()?;
                ConfigDocument::empty()
            },
            Err(e) => return Err(e),
        };

        document.version = ConfigDocument::VERSION.to_string();
        document.saved_at = Some(chrono::Local::now().to_rfc3339());
        document.upsert(config);
        self.write_document(&document)?;

        info!(
            "Saved input config for \"{}\" ({}) to {}",
            config.device_name,
            config.device_guid,
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{Input, HAT_UP};
    use tempfile::TempDir;

    fn sample(guid: &str) -> InputConfig {
        let mut config = InputConfig::new(guid, "Test Pad");
        config.bind("a", Input::button(1, true));
        config.bind("up", Input::hat(0, HAT_UP));
        config.bind("left", Input::axis(0, -1));
        config
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = FileConfigStore::new(dir.path().join("input.json"));
        assert!(store.load("ABC").unwrap_err().is_not_found());
    }

    #[test]
    fn test_save_then_fresh_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("input.json");

        let mut store = FileConfigStore::new(&path);
        store.save(&sample("ABC")).unwrap();

        let fresh = FileConfigStore::new(&path);
        let loaded = fresh.load("ABC").unwrap();
        assert_eq!(loaded.bindings(), sample("ABC").bindings());
        assert_eq!(loaded.device_name, "Test Pad");
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_save_keeps_other_guids() {
        let dir = TempDir::new().unwrap();
        let mut store = FileConfigStore::new(dir.path().join("input.json"));

        store.save(&sample("ABC")).unwrap();
        store.save(&sample("DEF")).unwrap();

        let mut changed = sample("ABC");
        changed.bind("a", Input::button(9, true));
        store.save(&changed).unwrap();

        let document = store.read_document().unwrap();
        assert_eq!(document.configs.len(), 2);
        assert_eq!(document.version, ConfigDocument::VERSION);
        assert!(document.saved_at.is_some());
        assert_eq!(store.load("ABC").unwrap().get("a"), Some(&Input::button(9, true)));
        assert!(store.load("DEF").is_ok());
    }

    #[test]
    fn test_corrupt_file_reports_corrupt_then_recovers_on_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("input.json");
        fs::write(&path, "{ not json").unwrap();

        let mut store = FileConfigStore::new(&path);
        let err = store.load("ABC").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));

        store.save(&sample("ABC")).unwrap();
        assert!(store.load("ABC").is_ok());
        assert!(dir.path().join("input.json.bak").exists());
    }

    #[test]
    fn test_temporary_path() {
        assert_eq!(
            temporary_path_for(Path::new("/cfg/input.json")),
            PathBuf::from("/cfg/input.json.tmp")
        );
    }
}
