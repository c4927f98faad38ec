//! Native input backend seam
//!
//! The backend owns the platform device API and its event queue. The rest of
//! the crate only sees enumeration indices at open time, [`InstanceId`]s
//! afterwards, and [`NativeEvent`]s.

use super::device::{InstanceId, NativeDevice, NativeRef};
use super::keys::Keycode;
use crate::error::BackendError;

/// Raw axis value range reported by backends (signed 16-bit)
pub const AXIS_MIN: i32 = i16::MIN as i32;
pub const AXIS_MAX: i32 = i16::MAX as i32;

/// Tagged event drained from the native queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeEvent {
    /// A device appeared; `index` is only valid for opening it
    DeviceAdded { index: usize },
    /// A device went away
    DeviceRemoved { instance: InstanceId },
    Button {
        instance: InstanceId,
        index: u32,
        pressed: bool,
    },
    /// Hat moved; `direction` is a mask of the `HAT_*` bits
    Hat {
        instance: InstanceId,
        index: u32,
        direction: i32,
    },
    Axis {
        instance: InstanceId,
        index: u32,
        value: i16,
    },
    Key {
        keycode: Keycode,
        pressed: bool,
        repeat: bool,
    },
}

/// Platform device API and event source
pub trait InputBackend {
    /// Number of enumeration indices currently valid for opening
    fn device_count(&self) -> usize;

    /// Whether the device at `index` has a standard game-controller mapping
    fn is_game_controller(&self, index: usize) -> bool;

    /// Open through the game-controller API
    ///
    /// Opening a device that is already open must return the same
    /// [`NativeRef`] without taking another reference: the caller drops such
    /// a duplicate without closing it, and a single [`InputBackend::close`]
    /// releases the device.
    fn open_game_controller(&mut self, index: usize) -> Result<NativeDevice, BackendError>;

    /// Open through the legacy joystick API
    ///
    /// Same reopen rule as [`InputBackend::open_game_controller`].
    fn open_joystick(&mut self, index: usize) -> Result<NativeDevice, BackendError>;

    /// Release a device previously returned by one of the open calls
    ///
    /// Called exactly once per opened instance.
    fn close(&mut self, native: NativeRef);

    /// Current raw value of `axis` on an opened device
    ///
    /// `None` when the backend has not sampled the axis yet, e.g. because it
    /// only learns axis state from events.
    fn axis_value(&self, instance: InstanceId, axis: u32) -> Option<i16>;

    /// Next pending native event, if any
    fn poll_event(&mut self) -> Option<NativeEvent>;
}

#[cfg(test)]
pub mod mock {
    //! Scriptable backend for tests

    use super::*;
    use std::collections::{HashMap, VecDeque};

    #[derive(Debug, Clone)]
    pub struct MockDevice {
        pub name: String,
        pub guid: String,
        pub controller: bool,
        pub buttons: u32,
        pub hats: u32,
        /// Rest value per axis (`None`: not sampled); the axis count is its length
        pub axes: Vec<Option<i16>>,
        pub fail_open: bool,
    }

    impl MockDevice {
        pub fn controller(name: &str, guid: &str, buttons: u32, axes: u32) -> Self {
            Self {
                name: name.to_string(),
                guid: guid.to_string(),
                controller: true,
                buttons,
                hats: 0,
                axes: vec![Some(0); axes as usize],
                fail_open: false,
            }
        }

        pub fn joystick(name: &str, guid: &str, buttons: u32, axes: u32, hats: u32) -> Self {
            Self {
                controller: false,
                hats,
                ..Self::controller(name, guid, buttons, axes)
            }
        }

        pub fn with_rest(mut self, axis: usize, value: i16) -> Self {
            self.axes[axis] = Some(value);
            self
        }

        /// Report no value for `axis` until an event for it arrives
        pub fn with_unsampled(mut self, axis: usize) -> Self {
            self.axes[axis] = None;
            self
        }

        pub fn failing(mut self) -> Self {
            self.fail_open = true;
            self
        }
    }

    #[derive(Debug, Default)]
    pub struct MockBackend {
        attached: Vec<Option<MockDevice>>,
        opened: HashMap<InstanceId, usize>,
        next_instance: u32,
        events: VecDeque<NativeEvent>,
        pub close_calls: usize,
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self {
                // Instance ids deliberately differ from enumeration indices
                next_instance: 100,
                ..Default::default()
            }
        }

        /// Attach a device, returning its enumeration index
        pub fn plug(&mut self, device: MockDevice) -> usize {
            self.attached.push(Some(device));
            self.attached.len() - 1
        }

        /// Detach the device at `index`, returning its instance id if it was open
        pub fn unplug(&mut self, index: usize) -> Option<InstanceId> {
            if let Some(slot) = self.attached.get_mut(index) {
                *slot = None;
            }
            self.instance_of(index)
        }

        pub fn instance_of(&self, index: usize) -> Option<InstanceId> {
            self.opened
                .iter()
                .filter(|(_, idx)| **idx == index)
                .map(|(id, _)| *id)
                .max()
        }

        pub fn set_axis(&mut self, index: usize, axis: usize, value: i16) {
            if let Some(Some(device)) = self.attached.get_mut(index) {
                device.axes[axis] = Some(value);
            }
        }

        pub fn push(&mut self, event: NativeEvent) {
            self.events.push_back(event);
        }

        pub fn open_count(&self) -> usize {
            self.opened.len()
        }

        fn open(&mut self, index: usize, controller: bool) -> Result<NativeDevice, BackendError> {
            let device = self
                .attached
                .get(index)
                .and_then(|d| d.clone())
                .ok_or(BackendError::NoSuchIndex(index))?;
            if device.fail_open {
                return Err(BackendError::OpenFailed {
                    index,
                    reason: "mock failure".to_string(),
                });
            }

            // Reopening an open device hands back the same instance
            let instance = match self.instance_of(index) {
                Some(existing) => existing,
                None => {
                    let instance = InstanceId(self.next_instance);
                    self.next_instance += 1;
                    self.opened.insert(instance, index);
                    instance
                },
            };

            let native = if controller {
                NativeRef::GameController(instance)
            } else {
                NativeRef::Joystick(instance)
            };
            Ok(NativeDevice {
                native,
                name: device.name,
                guid: device.guid,
                buttons: device.buttons,
                axes: device.axes.len() as u32,
                hats: device.hats,
            })
        }
    }

    impl InputBackend for MockBackend {
        fn device_count(&self) -> usize {
            self.attached.len()
        }

        fn is_game_controller(&self, index: usize) -> bool {
            matches!(self.attached.get(index), Some(Some(d)) if d.controller)
        }

        fn open_game_controller(&mut self, index: usize) -> Result<NativeDevice, BackendError> {
            self.open(index, true)
        }

        fn open_joystick(&mut self, index: usize) -> Result<NativeDevice, BackendError> {
            self.open(index, false)
        }

        fn close(&mut self, native: NativeRef) {
            let removed = self.opened.remove(&native.instance_id());
            assert!(removed.is_some(), "close of unopened device {:?}", native);
            self.close_calls += 1;
        }

        fn axis_value(&self, instance: InstanceId, axis: u32) -> Option<i16> {
            self.opened
                .get(&instance)
                .and_then(|idx| self.attached.get(*idx))
                .and_then(|d| d.as_ref())
                .and_then(|d| d.axes.get(axis as usize).copied().flatten())
        }

        fn poll_event(&mut self) -> Option<NativeEvent> {
            self.events.pop_front()
        }
    }
}
