//! Input devices: discovery, hot-plug, analog filtering and logical events
//!
//! Native events from an [`InputBackend`] go through [`InputManager`], which
//! resolves the device, filters analog data and hands [`InputEvent`]s to an
//! [`EventSink`].

pub mod axis;
pub mod backend;
pub mod device;
pub mod diagnostics;
pub mod gilrs_backend;
pub mod keys;
pub mod manager;
pub mod registry;

pub use backend::{InputBackend, NativeEvent};
pub use device::{DeviceHandle, DeviceKind, InstanceId, NativeRef};
pub use diagnostics::print_device_diagnostics;
pub use gilrs_backend::GilrsBackend;
pub use keys::Keycode;
pub use manager::{EventSink, InputEvent, InputManager};
pub use registry::{DeviceRef, DeviceRegistry, DeviceSlot};
