//! padmux - input device abstraction layer
//!
//! Discovers keyboards, joysticks and game controllers, normalizes their
//! events into one logical model and persists per-device mappings.

pub mod config;
pub mod error;
pub mod input;
pub mod mapping;
pub mod paths;
pub mod store;

pub use error::{InputError, Result};
pub use input::{InputEvent, InputManager};
pub use mapping::{Input, InputConfig};
