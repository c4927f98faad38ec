//! Opened native devices
//!
//! A device is driven either through the game-controller API (standard
//! layout, portable button/axis semantics) or through the legacy joystick API
//! (raw indices). [`NativeRef`] records which one, and [`DeviceHandle`] gives
//! both the same query surface.

use super::backend::InputBackend;
use crate::error::BackendError;
use tracing::debug;

/// Backend-assigned identifier of an opened device
///
/// Only valid while the device stays connected; a replugged device gets a
/// new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u32);

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which native API backs a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Joystick,
    GameController,
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceKind::Joystick => write!(f, "joystick"),
            DeviceKind::GameController => write!(f, "controller"),
        }
    }
}

/// Native ownership of one opened device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeRef {
    /// Opened through the legacy joystick API
    Joystick(InstanceId),

    /// Opened through the game-controller API
    GameController(InstanceId),
}

impl NativeRef {
    pub fn instance_id(&self) -> InstanceId {
        match self {
            Self::Joystick(id) | Self::GameController(id) => *id,
        }
    }

    pub fn kind(&self) -> DeviceKind {
        match self {
            Self::Joystick(_) => DeviceKind::Joystick,
            Self::GameController(_) => DeviceKind::GameController,
        }
    }

    /// Stable string for logging, e.g. "controller:3"
    pub fn to_log_string(&self) -> String {
        format!("{}:{}", self.kind(), self.instance_id().0)
    }
}

/// What a backend reports about a device it just opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeDevice {
    pub native: NativeRef,
    pub name: String,
    pub guid: String,
    pub buttons: u32,
    pub axes: u32,
    pub hats: u32,
}

/// One opened device
///
/// Only [`DeviceHandle::open`] creates a handle and [`DeviceHandle::close`]
/// consumes it, so every handle corresponds to exactly one open and one close.
#[derive(Debug)]
#[must_use = "an opened device must be closed through DeviceHandle::close"]
pub struct DeviceHandle {
    native: NativeRef,
    name: String,
    guid: String,
    buttons: u32,
    axes: u32,
    hats: u32,
}

impl DeviceHandle {
    /// Open the device at `enumeration_index`
    ///
    /// The controller API is used whenever the backend recognizes the device
    /// as a standard game controller; the joystick API otherwise. The choice
    /// is made here, once.
    pub fn open<B: InputBackend + ?Sized>(
        backend: &mut B,
        enumeration_index: usize,
    ) -> Result<Self, BackendError> {
        let opened = if backend.is_game_controller(enumeration_index) {
            backend.open_game_controller(enumeration_index)?
        } else {
            backend.open_joystick(enumeration_index)?
        };

        debug!(
            "Opened device {} at index {}: \"{}\" ({} buttons, {} axes, {} hats)",
            opened.native.to_log_string(),
            enumeration_index,
            opened.name,
            opened.buttons,
            opened.axes,
            opened.hats
        );

        Ok(Self::from_native(opened))
    }

    pub(crate) fn from_native(device: NativeDevice) -> Self {
        Self {
            native: device.native,
            name: device.name,
            guid: device.guid,
            buttons: device.buttons,
            axes: device.axes,
            hats: device.hats,
        }
    }

    /// Release the native device
    pub fn close<B: InputBackend + ?Sized>(self, backend: &mut B) {
        debug!("Closing device {}: \"{}\"", self.native.to_log_string(), self.name);
        backend.close(self.native);
    }

    pub fn native(&self) -> NativeRef {
        self.native
    }

    pub fn instance_id(&self) -> InstanceId {
        self.native.instance_id()
    }

    pub fn kind(&self) -> DeviceKind {
        self.native.kind()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Model identifier, shared by every device of the same model
    pub fn guid(&self) -> &str {
        &self.guid
    }

    pub fn button_count(&self) -> u32 {
        self.buttons
    }

    pub fn axis_count(&self) -> u32 {
        self.axes
    }

    pub fn hat_count(&self) -> u32 {
        self.hats
    }
}
