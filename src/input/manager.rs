//! Input manager
//!
//! Owns the backend, the device registry, the keyboard mapping and the config
//! store, and turns native events into logical [`InputEvent`]s.
//!
//! # Lifecycle
//!
//! A manager starts uninitialized. [`InputManager::init`] opens every attached
//! device and loads the keyboard mapping; [`InputManager::deinit`] closes them
//! again. Both may be called repeatedly. Events seen while uninitialized are
//! dropped. Devices still open when the manager is dropped are closed.

use super::backend::{InputBackend, NativeEvent};
use super::device::InstanceId;
use super::keys::{default_keyboard_config, KEYBOARD_BUTTON_COUNT, KEYBOARD_GUID};
use super::registry::{load_config_or, DeviceRef, DeviceRegistry, DeviceSlot};
use crate::error::Result;
use crate::mapping::{Input, InputConfig};
use crate::store::ConfigStore;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

/// A physical input from a known device, with the logical names it triggers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEvent {
    pub device: DeviceRef,
    pub input: Input,
    /// Logical inputs bound to `input` in the device's config
    pub names: Vec<String>,
}

/// Receiver of logical input events
pub trait EventSink {
    fn input(&mut self, event: InputEvent);
}

impl EventSink for Vec<InputEvent> {
    fn input(&mut self, event: InputEvent) {
        self.push(event);
    }
}

impl EventSink for mpsc::UnboundedSender<InputEvent> {
    fn input(&mut self, event: InputEvent) {
        if self.send(event).is_err() {
            trace!("Input event receiver closed, event dropped");
        }
    }
}

pub struct InputManager<B: InputBackend> {
    backend: B,
    store: Box<dyn ConfigStore>,
    registry: DeviceRegistry,
    keyboard: InputConfig,
    on_finish: Vec<String>,
    initialized: bool,
}

impl<B: InputBackend> InputManager<B> {
    pub fn new(backend: B, store: Box<dyn ConfigStore>) -> Self {
        Self {
            backend,
            store,
            registry: DeviceRegistry::new(),
            keyboard: default_keyboard_config(),
            on_finish: Vec::new(),
            initialized: false,
        }
    }

    /// Shell commands run by [`InputManager::run_on_finish_commands`]
    pub fn with_on_finish(mut self, commands: Vec<String>) -> Self {
        self.on_finish = commands;
        self
    }

    /// Open all attached devices and load the keyboard mapping
    pub fn init(&mut self) {
        if self.initialized {
            debug!("Input manager already initialized");
            return;
        }

        let count = self.backend.device_count();
        debug!("Enumerating {} device index(es)", count);
        for index in 0..count {
            // A device that fails to open is treated as absent
            if let Err(e) = self
                .registry
                .add_device(&mut self.backend, self.store.as_ref(), index)
            {
                debug!("Skipped device index {}: {}", index, e);
            }
        }

        self.keyboard = load_config_or(self.store.as_ref(), KEYBOARD_GUID, default_keyboard_config);
        self.initialized = true;

        info!(
            "Input initialized: {} device(s), {} configured",
            self.num_devices(),
            self.num_configured_devices()
        );
    }

    /// Close every device and forget all per-device state
    pub fn deinit(&mut self) {
        if !self.initialized {
            return;
        }

        self.registry.clear(&mut self.backend);
        self.keyboard = default_keyboard_config();
        self.initialized = false;
        info!("Input deinitialized");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Translate one native event, forwarding any logical event to `sink`
    ///
    /// Returns whether a logical input event was produced. Hot-plug events
    /// update the registry but produce nothing; events from unknown devices
    /// are ignored.
    pub fn parse_event(&mut self, event: &NativeEvent, sink: &mut dyn EventSink) -> bool {
        if !self.initialized {
            trace!("Event before init ignored: {:?}", event);
            return false;
        }

        match *event {
            NativeEvent::DeviceAdded { index } => {
                if let Err(e) = self
                    .registry
                    .add_device(&mut self.backend, self.store.as_ref(), index)
                {
                    debug!("Hot-plugged device at index {} not added: {}", index, e);
                }
                false
            },
            NativeEvent::DeviceRemoved { instance } => {
                self.registry.remove_device(&mut self.backend, instance);
                false
            },
            NativeEvent::Button {
                instance,
                index,
                pressed,
            } => self.forward(instance, Input::button(index, pressed), sink),
            NativeEvent::Hat {
                instance,
                index,
                direction,
            } => self.forward(instance, Input::hat(index, direction), sink),
            NativeEvent::Axis {
                instance,
                index,
                value,
            } => {
                match self.registry.observe_rest(instance, index, value) {
                    Ok(false) => {},
                    Ok(true) => return false,
                    Err(_) => {
                        trace!("Axis event from unknown device {} ignored", instance);
                        return false;
                    },
                }
                let Ok(filtered) = self.registry.normalize(instance, index, value) else {
                    return false;
                };
                match self.registry.should_emit(instance, index, filtered) {
                    Ok(true) => self.forward(instance, Input::axis(index, filtered), sink),
                    _ => false,
                }
            },
            NativeEvent::Key {
                keycode,
                pressed,
                repeat,
            } => {
                if repeat {
                    return false;
                }
                let input = Input::key(keycode.raw(), pressed);
                let names = self.keyboard.mapped_to(&input);
                trace!("keyboard: {} -> {:?}", input.describe(), names);
                sink.input(InputEvent {
                    device: DeviceRef::Keyboard,
                    input,
                    names,
                });
                true
            },
        }
    }

    /// Drain the backend queue through [`InputManager::parse_event`]
    ///
    /// Returns how many logical events were produced.
    pub fn pump_events(&mut self, sink: &mut dyn EventSink) -> usize {
        let mut produced = 0;
        while let Some(event) = self.backend.poll_event() {
            if self.parse_event(&event, sink) {
                produced += 1;
            }
        }
        produced
    }

    fn forward(&self, instance: InstanceId, input: Input, sink: &mut dyn EventSink) -> bool {
        let Some(entry) = self.registry.entry(instance) else {
            trace!("Event from unknown device {} ignored", instance);
            return false;
        };

        let names = entry.config.mapped_to(&input);
        trace!("{}: {} -> {:?}", entry.slot, input.describe(), names);
        sink.input(InputEvent {
            device: DeviceRef::Slot(entry.slot),
            input,
            names,
        });
        true
    }

    /// Persist `config` and apply it to every live device of its GUID
    pub fn write_device_config(&mut self, config: &InputConfig) -> Result<()> {
        self.store.save(config)?;

        if config.device_guid == KEYBOARD_GUID {
            self.keyboard = config.clone();
            self.keyboard.mark_stored();
            info!("Keyboard config updated");
            return Ok(());
        }

        let updated = self.registry.replace_configs_for_guid(config);
        info!(
            "Config for \"{}\" saved, applied to {} connected device(s)",
            config.device_name, updated
        );
        Ok(())
    }

    /// Run the configured post-configuration commands
    ///
    /// A failing command is logged and the rest still run. Returns how many
    /// succeeded.
    pub fn run_on_finish_commands(&self) -> usize {
        let mut succeeded = 0;
        for command in &self.on_finish {
            debug!("Running on-finish command: {}", command);
            match shell_command(command).status() {
                Ok(status) if status.success() => succeeded += 1,
                Ok(status) => warn!("On-finish command `{}` exited with {}", command, status),
                Err(e) => warn!("On-finish command `{}` failed to start: {}", command, e),
            }
        }
        succeeded
    }

    /// Number of connected joysticks and controllers (the keyboard excluded)
    pub fn num_devices(&self) -> usize {
        self.registry.count_devices()
    }

    /// Devices with a stored mapping, the keyboard included
    pub fn num_configured_devices(&self) -> usize {
        self.registry.count_configured_devices() + usize::from(self.keyboard.is_configured())
    }

    pub fn button_count(&self, device: DeviceRef) -> Option<u32> {
        match device {
            DeviceRef::Keyboard => Some(KEYBOARD_BUTTON_COUNT),
            DeviceRef::Slot(slot) => self.registry.handle_by_slot(slot).map(|h| h.button_count()),
        }
    }

    pub fn device_guid(&self, device: DeviceRef) -> Option<&str> {
        match device {
            DeviceRef::Keyboard => Some(KEYBOARD_GUID),
            DeviceRef::Slot(slot) => self.registry.handle_by_slot(slot).map(|h| h.guid()),
        }
    }

    pub fn device_name(&self, device: DeviceRef) -> Option<&str> {
        match device {
            DeviceRef::Keyboard => Some(self.keyboard.device_name.as_str()),
            DeviceRef::Slot(slot) => self.registry.handle_by_slot(slot).map(|h| h.name()),
        }
    }

    pub fn input_config(&self, device: DeviceRef) -> Option<&InputConfig> {
        match device {
            DeviceRef::Keyboard => Some(&self.keyboard),
            DeviceRef::Slot(slot) => self.registry.config_by_slot(slot),
        }
    }

    /// Mutable config for in-place edits; call
    /// [`InputManager::write_device_config`] to persist them
    pub fn input_config_mut(&mut self, device: DeviceRef) -> Option<&mut InputConfig> {
        match device {
            DeviceRef::Keyboard => Some(&mut self.keyboard),
            DeviceRef::Slot(slot) => self.registry.config_by_slot_mut(slot),
        }
    }

    /// Slots of all connected devices, ascending
    pub fn slots(&self) -> Vec<DeviceSlot> {
        self.registry.slots()
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn store(&self) -> &dyn ConfigStore {
        self.store.as_ref()
    }
}

impl<B: InputBackend> Drop for InputManager<B> {
    fn drop(&mut self) {
        self.registry.clear(&mut self.backend);
    }
}

#[cfg(windows)]
fn shell_command(command: &str) -> std::process::Command {
    let mut cmd = std::process::Command::new("cmd");
    cmd.args(["/C", command]);
    cmd
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> std::process::Command {
    let mut cmd = std::process::Command::new("sh");
    cmd.args(["-c", command]);
    cmd
}
