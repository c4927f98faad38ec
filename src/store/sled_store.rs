//! Sled-backed config store
//!
//! One key per device model (`input_config:<guid>`) holding the JSON-encoded
//! config. Every save is flushed before returning.

use super::ConfigStore;
use crate::error::StoreError;
use crate::mapping::InputConfig;
use std::path::Path;
use tracing::{debug, info};

/// Prefix for input config keys in the sled database
const INPUT_CONFIG_PREFIX: &str = "input_config:";

pub struct SledConfigStore {
    db: sled::Db,
}

impl SledConfigStore {
    /// Open (or create) the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let db = sled::open(path)?;
        info!("Input config database opened at: {}", path.display());
        Ok(Self { db })
    }

    /// Wrap an already opened database
    pub fn new(db: sled::Db) -> Self {
        Self { db }
    }

    fn key(guid: &str) -> String {
        format!("{}{}", INPUT_CONFIG_PREFIX, guid)
    }

    /// GUIDs of every stored config
    pub fn guids(&self) -> Vec<String> {
        self.db
            .scan_prefix(INPUT_CONFIG_PREFIX)
            .filter_map(|entry| entry.ok())
            .filter_map(|(key, _)| {
                std::str::from_utf8(&key)
                    .ok()
                    .and_then(|k| k.strip_prefix(INPUT_CONFIG_PREFIX))
                    .map(str::to_string)
            })
            .collect()
    }
}

impl ConfigStore for SledConfigStore {
    fn load(&self, guid: &str) -> Result<InputConfig, StoreError> {
        let Some(bytes) = self.db.get(Self::key(guid))? else {
            return Err(StoreError::NotFound(guid.to_string()));
        };
        let config: InputConfig = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", guid, e)))?;
        debug!("Loaded input config for {} from sled", guid);
        Ok(config)
    }

    fn save(&mut self, config: &InputConfig) -> Result<(), StoreError> {
        let json = serde_json::to_vec(config)?;
        self.db.insert(Self::key(&config.device_guid), json)?;
        self.db.flush()?;
        info!(
            "Saved input config for \"{}\" ({}) to sled",
            config.device_name, config.device_guid
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::Input;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip_across_reopen() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("test.sled");

        let mut config = InputConfig::new("ABC", "Pad");
        config.bind("a", Input::button(2, true));
        config.bind("right", Input::axis(0, 1));

        {
            let mut store = SledConfigStore::open(&db_path).unwrap();
            store.save(&config).unwrap();
        }

        let store = SledConfigStore::open(&db_path).unwrap();
        let loaded = store.load("ABC").unwrap();
        assert_eq!(loaded.bindings(), config.bindings());
        assert_eq!(store.guids(), vec!["ABC".to_string()]);
    }

    #[test]
    fn test_unknown_guid_is_not_found() {
        let temp = TempDir::new().unwrap();
        let store = SledConfigStore::open(temp.path().join("test.sled")).unwrap();
        assert!(store.load("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn test_corrupt_value() {
        let temp = TempDir::new().unwrap();
        let db = sled::open(temp.path().join("test.sled")).unwrap();
        db.insert("input_config:BAD", &b"garbage"[..]).unwrap();

        let store = SledConfigStore::new(db);
        assert!(matches!(store.load("BAD"), Err(StoreError::Corrupt(_))));
    }
}
