//! Live device registry
//!
//! Maps backend instance ids to everything known about a connected device:
//! its handle, its mapping and its axis filter state. Instance ids change on
//! every replug, so callers outside the input layer address devices by
//! [`DeviceSlot`] instead.

use super::axis::AxisState;
use super::backend::InputBackend;
use super::device::{DeviceHandle, InstanceId};
use crate::error::{BackendError, InputError, Result};
use crate::mapping::InputConfig;
use crate::store::ConfigStore;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Stable position of a connected device (player 1 is slot 0)
///
/// Assigned when the device is added and kept until it is removed. The lowest
/// free slot is handed out first, so a replugged controller usually gets its
/// old slot back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceSlot(pub usize);

impl DeviceSlot {
    /// One-based player number for display
    pub fn player(&self) -> usize {
        self.0 + 1
    }
}

impl std::fmt::Display for DeviceSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "player{}", self.player())
    }
}

/// External address of an input device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceRef {
    /// The keyboard pseudo-device, always present
    Keyboard,
    /// A connected joystick or game controller
    Slot(DeviceSlot),
}

impl std::fmt::Display for DeviceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceRef::Keyboard => write!(f, "keyboard"),
            DeviceRef::Slot(slot) => write!(f, "{}", slot),
        }
    }
}

/// Everything tracked for one connected device
#[derive(Debug)]
pub struct DeviceEntry {
    pub slot: DeviceSlot,
    pub handle: DeviceHandle,
    pub config: InputConfig,
    pub axes: AxisState,
    /// When the device was added
    pub connected_at: Instant,
}

/// Load the config stored for `guid`, or fall back to `fallback()`
///
/// A missing entry is expected for new devices; unreadable data is logged and
/// treated the same way. Either way the caller gets a usable mapping.
pub fn load_config_or<S, F>(store: &S, guid: &str, fallback: F) -> InputConfig
where
    S: ConfigStore + ?Sized,
    F: FnOnce() -> InputConfig,
{
    match store.load(guid) {
        Ok(mut config) => {
            config.mark_stored();
            debug!("Loaded stored config for {} ({} bindings)", guid, config.len());
            config
        },
        Err(e) if e.is_not_found() => {
            debug!("No stored config for {}, using defaults", guid);
            fallback()
        },
        Err(e) => {
            warn!("Failed to load config for {}: {}. Using defaults", guid, e);
            fallback()
        },
    }
}

/// Connected devices keyed by instance id
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<InstanceId, DeviceEntry>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the device at `enumeration_index` and register it
    ///
    /// Adding an instance that is already registered returns its current
    /// slot and changes nothing.
    pub fn add_device<B, S>(
        &mut self,
        backend: &mut B,
        store: &S,
        enumeration_index: usize,
    ) -> Result<DeviceSlot>
    where
        B: InputBackend + ?Sized,
        S: ConfigStore + ?Sized,
    {
        let handle = DeviceHandle::open(backend, enumeration_index).map_err(|e| {
            match e {
                // Unplugged between enumeration and open
                BackendError::NoSuchIndex(_) => debug!("{}", e),
                _ => warn!("Ignoring device at index {}: {}", enumeration_index, e),
            }
            InputError::from(e)
        })?;

        let instance = handle.instance_id();
        if let Some(existing) = self.devices.get(&instance) {
            trace!(
                "Device {} already registered in {}",
                instance,
                existing.slot
            );
            // The backend returned the open device again; it owns no extra reference
            drop(handle);
            return Ok(existing.slot);
        }

        let axes = AxisState::detect(backend, &handle);
        let config = load_config_or(store, handle.guid(), || {
            InputConfig::generate_default(
                handle.guid(),
                handle.name(),
                handle.button_count(),
                handle.axis_count(),
            )
        });

        let slot = self.lowest_free_slot();
        info!(
            "✅ {} connected: \"{}\" ({}, {}, {} config)",
            slot,
            handle.name(),
            handle.native().to_log_string(),
            handle.guid(),
            if config.is_configured() { "stored" } else { "default" }
        );
        if !axes.triggers().is_empty() {
            debug!(
                "{} has {} trigger axes",
                slot,
                axes.triggers().len()
            );
        }

        self.devices.insert(
            instance,
            DeviceEntry {
                slot,
                handle,
                config,
                axes,
                connected_at: Instant::now(),
            },
        );
        Ok(slot)
    }

    /// Close and forget `instance`
    ///
    /// Returns whether anything was removed. Unknown instances are ignored.
    pub fn remove_device<B: InputBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        instance: InstanceId,
    ) -> bool {
        let Some(entry) = self.devices.remove(&instance) else {
            trace!("Remove of unregistered device {} ignored", instance);
            return false;
        };

        info!(
            "🔌 {} disconnected: \"{}\" (connected for {:.1}s)",
            entry.slot,
            entry.handle.name(),
            entry.connected_at.elapsed().as_secs_f32()
        );
        entry.handle.close(backend);
        true
    }

    /// Handle and config of a live instance
    pub fn resolve(&self, instance: InstanceId) -> Result<(&DeviceHandle, &InputConfig)> {
        self.devices
            .get(&instance)
            .map(|entry| (&entry.handle, &entry.config))
            .ok_or(InputError::NotFound(instance))
    }

    pub fn entry(&self, instance: InstanceId) -> Option<&DeviceEntry> {
        self.devices.get(&instance)
    }

    /// Consume `raw` as the rest value of an axis whose rest is still unknown
    ///
    /// Returns `true` when the sample was taken as rest and must not be
    /// delivered.
    pub fn observe_rest(&mut self, instance: InstanceId, axis: u32, raw: i16) -> Result<bool> {
        let entry = self
            .devices
            .get_mut(&instance)
            .ok_or(InputError::NotFound(instance))?;
        Ok(entry.axes.observe_rest(axis, raw))
    }

    /// Logical value of a raw sample from `instance`'s `axis`
    pub fn normalize(&self, instance: InstanceId, axis: u32, raw: i16) -> Result<i32> {
        let entry = self
            .devices
            .get(&instance)
            .ok_or(InputError::NotFound(instance))?;
        Ok(entry.axes.normalize(raw, axis))
    }

    /// Whether `value` is a change for `instance`'s `axis`; records it if so
    pub fn should_emit(&mut self, instance: InstanceId, axis: u32, value: i32) -> Result<bool> {
        let entry = self
            .devices
            .get_mut(&instance)
            .ok_or(InputError::NotFound(instance))?;
        Ok(entry.axes.should_emit(axis, value))
    }

    pub fn count_devices(&self) -> usize {
        self.devices.len()
    }

    /// Devices whose mapping came from the store
    pub fn count_configured_devices(&self) -> usize {
        self.devices
            .values()
            .filter(|entry| entry.config.is_configured())
            .count()
    }

    pub fn handle_by_slot(&self, slot: DeviceSlot) -> Option<&DeviceHandle> {
        self.entry_by_slot(slot).map(|entry| &entry.handle)
    }

    pub fn config_by_slot(&self, slot: DeviceSlot) -> Option<&InputConfig> {
        self.entry_by_slot(slot).map(|entry| &entry.config)
    }

    pub fn config_by_slot_mut(&mut self, slot: DeviceSlot) -> Option<&mut InputConfig> {
        self.devices
            .values_mut()
            .find(|entry| entry.slot == slot)
            .map(|entry| &mut entry.config)
    }

    /// Entries ordered by slot
    pub fn entries(&self) -> Vec<&DeviceEntry> {
        let mut entries: Vec<_> = self.devices.values().collect();
        entries.sort_by_key(|entry| entry.slot);
        entries
    }

    /// Occupied slots in ascending order
    pub fn slots(&self) -> Vec<DeviceSlot> {
        let mut slots: Vec<_> = self.devices.values().map(|entry| entry.slot).collect();
        slots.sort();
        slots
    }

    /// Install `config` on every live device of its GUID
    ///
    /// Returns how many devices were updated.
    pub fn replace_configs_for_guid(&mut self, config: &InputConfig) -> usize {
        let mut updated = 0;
        for entry in self
            .devices
            .values_mut()
            .filter(|entry| entry.handle.guid() == config.device_guid)
        {
            entry.config = config.clone();
            entry.config.mark_stored();
            updated += 1;
        }
        updated
    }

    /// Close every device
    pub fn clear<B: InputBackend + ?Sized>(&mut self, backend: &mut B) {
        for (_, entry) in self.devices.drain() {
            debug!("Releasing {}: \"{}\"", entry.slot, entry.handle.name());
            entry.handle.close(backend);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    fn entry_by_slot(&self, slot: DeviceSlot) -> Option<&DeviceEntry> {
        self.devices.values().find(|entry| entry.slot == slot)
    }

    fn lowest_free_slot(&self) -> DeviceSlot {
        (0..)
            .map(DeviceSlot)
            .find(|slot| self.devices.values().all(|entry| entry.slot != *slot))
            .unwrap_or(DeviceSlot(self.devices.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::backend::mock::{MockBackend, MockDevice};
    use crate::mapping::Input;
    use crate::store::MemoryConfigStore;

    fn stored_config(guid: &str) -> InputConfig {
        let mut config = InputConfig::new(guid, "Stored Pad");
        config.bind("a", Input::button(3, true));
        config.bind("up", Input::axis(1, -1));
        config
    }

    #[test]
    fn test_unknown_guid_gets_sequential_defaults() {
        let mut backend = MockBackend::new();
        let store = MemoryConfigStore::new();
        let mut registry = DeviceRegistry::new();
        backend.plug(MockDevice::controller("Pad", "ABC", 4, 2));

        let slot = registry.add_device(&mut backend, &store, 0).unwrap();
        let config = registry.config_by_slot(slot).unwrap();

        for i in 0..4 {
            assert_eq!(config.get(&format!("button{}", i)), Some(&Input::button(i, true)));
        }
        assert!(!config.is_configured());
        assert_eq!(registry.count_devices(), 1);
        assert_eq!(registry.count_configured_devices(), 0);

        registry.clear(&mut backend);
    }

    #[test]
    fn test_stored_config_is_used() {
        let mut backend = MockBackend::new();
        let mut store = MemoryConfigStore::new();
        store.save(&stored_config("ABC")).unwrap();
        let mut registry = DeviceRegistry::new();
        backend.plug(MockDevice::controller("Pad", "ABC", 4, 2));

        let slot = registry.add_device(&mut backend, &store, 0).unwrap();
        let config = registry.config_by_slot(slot).unwrap();

        assert!(config.is_configured());
        assert_eq!(config.get("a"), Some(&Input::button(3, true)));
        assert_eq!(registry.count_configured_devices(), 1);

        registry.clear(&mut backend);
    }

    #[test]
    fn test_same_guid_devices_get_distinct_slots_and_share_stored_entry() {
        let mut backend = MockBackend::new();
        let mut store = MemoryConfigStore::new();
        store.save(&stored_config("ABC")).unwrap();
        let mut registry = DeviceRegistry::new();
        backend.plug(MockDevice::controller("Pad", "ABC", 4, 2));
        backend.plug(MockDevice::controller("Pad", "ABC", 4, 2));

        let first = registry.add_device(&mut backend, &store, 0).unwrap();
        let second = registry.add_device(&mut backend, &store, 1).unwrap();
        assert_ne!(first, second);

        let first_id = backend.instance_of(0).unwrap();
        let second_id = backend.instance_of(1).unwrap();
        assert_ne!(first_id, second_id);

        let (_, a) = registry.resolve(first_id).unwrap();
        let (_, b) = registry.resolve(second_id).unwrap();
        assert_eq!(a.bindings(), b.bindings());

        // Filter state is per instance
        assert!(registry.should_emit(first_id, 0, 1).unwrap());
        assert!(registry.should_emit(second_id, 0, 1).unwrap());
        assert!(!registry.should_emit(first_id, 0, 1).unwrap());

        registry.clear(&mut backend);
    }

    #[test]
    fn test_removing_unknown_instance_is_noop() {
        let mut backend = MockBackend::new();
        let store = MemoryConfigStore::new();
        let mut registry = DeviceRegistry::new();
        backend.plug(MockDevice::controller("Pad", "ABC", 4, 2));
        registry.add_device(&mut backend, &store, 0).unwrap();

        assert!(!registry.remove_device(&mut backend, InstanceId(9999)));
        assert_eq!(registry.count_devices(), 1);
        assert_eq!(backend.close_calls, 0);

        registry.clear(&mut backend);
    }

    #[test]
    fn test_remove_closes_exactly_once() {
        let mut backend = MockBackend::new();
        let store = MemoryConfigStore::new();
        let mut registry = DeviceRegistry::new();
        backend.plug(MockDevice::joystick("Stick", "J", 2, 2, 1));
        registry.add_device(&mut backend, &store, 0).unwrap();
        let instance = backend.instance_of(0).unwrap();

        assert!(registry.remove_device(&mut backend, instance));
        assert!(!registry.remove_device(&mut backend, instance));
        assert_eq!(backend.close_calls, 1);
        assert!(matches!(
            registry.resolve(instance),
            Err(InputError::NotFound(id)) if id == instance
        ));
    }

    #[test]
    fn test_readding_registered_instance_keeps_slot() {
        let mut backend = MockBackend::new();
        let store = MemoryConfigStore::new();
        let mut registry = DeviceRegistry::new();
        backend.plug(MockDevice::controller("Pad", "ABC", 4, 2));

        let first = registry.add_device(&mut backend, &store, 0).unwrap();
        let again = registry.add_device(&mut backend, &store, 0).unwrap();

        assert_eq!(first, again);
        assert_eq!(registry.count_devices(), 1);
        assert_eq!(backend.open_count(), 1);

        registry.clear(&mut backend);
        assert_eq!(backend.open_count(), 0);
    }

    #[test]
    fn test_freed_slot_is_reused() {
        let mut backend = MockBackend::new();
        let store = MemoryConfigStore::new();
        let mut registry = DeviceRegistry::new();
        for guid in ["A", "B", "C"] {
            backend.plug(MockDevice::controller("Pad", guid, 2, 0));
        }

        registry.add_device(&mut backend, &store, 0).unwrap();
        registry.add_device(&mut backend, &store, 1).unwrap();
        let gone = backend.instance_of(0).unwrap();
        registry.remove_device(&mut backend, gone);

        let slot = registry.add_device(&mut backend, &store, 2).unwrap();
        assert_eq!(slot, DeviceSlot(0));
        assert_eq!(registry.slots(), vec![DeviceSlot(0), DeviceSlot(1)]);
        assert_eq!(registry.handle_by_slot(DeviceSlot(0)).unwrap().guid(), "C");

        registry.clear(&mut backend);
    }

    #[test]
    fn test_failed_open_registers_nothing() {
        let mut backend = MockBackend::new();
        let store = MemoryConfigStore::new();
        let mut registry = DeviceRegistry::new();
        backend.plug(MockDevice::controller("Broken", "X", 2, 2).failing());

        let err = registry.add_device(&mut backend, &store, 0).unwrap_err();
        assert!(matches!(err, InputError::Open(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_replace_configs_for_guid() {
        let mut backend = MockBackend::new();
        let store = MemoryConfigStore::new();
        let mut registry = DeviceRegistry::new();
        backend.plug(MockDevice::controller("Pad", "ABC", 2, 0));
        backend.plug(MockDevice::controller("Other", "DEF", 2, 0));
        registry.add_device(&mut backend, &store, 0).unwrap();
        registry.add_device(&mut backend, &store, 1).unwrap();

        assert_eq!(registry.replace_configs_for_guid(&stored_config("ABC")), 1);
        assert_eq!(registry.count_configured_devices(), 1);
        assert_eq!(
            registry.config_by_slot(DeviceSlot(0)).unwrap().get("a"),
            Some(&Input::button(3, true))
        );

        registry.clear(&mut backend);
    }

    #[test]
    fn test_slot_display() {
        assert_eq!(DeviceSlot(0).to_string(), "player1");
        assert_eq!(DeviceRef::Slot(DeviceSlot(2)).to_string(), "player3");
        assert_eq!(DeviceRef::Keyboard.to_string(), "keyboard");
    }
}
