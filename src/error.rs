//! Error types for the input layer
//!
//! Device-level failures are contained at the registry boundary: nothing in
//! here is fatal to the host process.

use crate::input::device::InstanceId;

/// Errors raised by a native input backend
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The backend itself could not be initialized
    #[error("Backend initialization failed: {0}")]
    Initialization(String),

    /// No device exists at this enumeration index (it may have been unplugged)
    #[error("No device at enumeration index {0}")]
    NoSuchIndex(usize),

    /// The platform refused to open the device
    #[error("Failed to open device {index}: {reason}")]
    OpenFailed { index: usize, reason: String },
}

/// Errors surfaced by the device registry and the input manager
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// Native device failed to open; the device is treated as absent
    #[error("Open error: {0}")]
    Open(#[from] BackendError),

    /// Lookup by a stale or unknown instance id
    #[error("Device instance {0} is not registered")]
    NotFound(InstanceId),

    /// Lookup by a slot that holds no device
    #[error("No device in slot {0}")]
    SlotNotFound(usize),

    /// Persisting a config failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors raised by a config store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No config saved for this GUID
    #[error("No stored config for GUID {0}")]
    NotFound(String),

    /// The stored data exists but cannot be parsed
    #[error("Corrupt config data: {0}")]
    Corrupt(String),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Embedded database failure
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// Serialization of a config failed
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether this is a plain "nothing saved yet" miss rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

pub type Result<T, E = InputError> = std::result::Result<T, E>;
