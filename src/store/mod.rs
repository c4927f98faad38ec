//! Persistent storage of per-device mappings
//!
//! Configs are keyed by device GUID. A store only loads and saves whole
//! configs; deciding when to save is the caller's business.

pub mod file;
pub mod sled_store;

pub use file::FileConfigStore;
pub use sled_store::SledConfigStore;

use crate::error::StoreError;
use crate::mapping::InputConfig;
use std::collections::HashMap;

/// Load/save of [`InputConfig`]s keyed by device GUID
pub trait ConfigStore {
    /// Load the config stored for `guid`
    ///
    /// Returns [`StoreError::NotFound`] when nothing was saved for it, and
    /// another error when stored data exists but cannot be read.
    fn load(&self, guid: &str) -> Result<InputConfig, StoreError>;

    /// Store `config` under its GUID, replacing any previous entry
    fn save(&mut self, config: &InputConfig) -> Result<(), StoreError>;
}

/// Volatile store, used for tests and when persistence is disabled
#[derive(Debug, Default, Clone)]
pub struct MemoryConfigStore {
    configs: HashMap<String, InputConfig>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self, guid: &str) -> Result<InputConfig, StoreError> {
        self.configs
            .get(guid)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(guid.to_string()))
    }

    fn save(&mut self, config: &InputConfig) -> Result<(), StoreError> {
        self.configs.insert(config.device_guid.clone(), config.clone());
        Ok(())
    }
}
