//! gilrs-backed native input
//!
//! gilrs reports devices by [`GamepadId`] and controls by name plus a raw
//! [`Code`]. This backend exposes them the way the rest of the crate expects:
//! an enumeration index per gamepad (`usize::from(GamepadId)`), a fresh
//! [`InstanceId`] per open, and dense per-device button/axis indices.
//!
//! Devices with an SDL or driver mapping are game controllers, unmapped ones
//! joysticks. The d-pad is reported as buttons, so the hat count is always 0.
//! gilrs has no keyboard support; key events come from the windowing layer.

use super::backend::{InputBackend, NativeEvent, AXIS_MAX};
use super::device::{InstanceId, NativeDevice, NativeRef};
use crate::error::BackendError;
use gilrs::ev::Code;
use gilrs::{Axis, Button, Event, EventType, Gamepad, GamepadId, Gilrs, GilrsBuilder, MappingSource};
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Buttons probed at open time, in index order
const CANONICAL_BUTTONS: [Button; 19] = [
    Button::South,
    Button::East,
    Button::North,
    Button::West,
    Button::LeftTrigger,
    Button::RightTrigger,
    Button::LeftTrigger2,
    Button::RightTrigger2,
    Button::Select,
    Button::Start,
    Button::Mode,
    Button::LeftThumb,
    Button::RightThumb,
    Button::DPadUp,
    Button::DPadDown,
    Button::DPadLeft,
    Button::DPadRight,
    Button::C,
    Button::Z,
];

/// Axes probed at open time, in index order
const CANONICAL_AXES: [Axis; 6] = [
    Axis::LeftStickX,
    Axis::LeftStickY,
    Axis::RightStickX,
    Axis::RightStickY,
    Axis::LeftZ,
    Axis::RightZ,
];

/// Scale a gilrs axis value (-1.0..=1.0) to the signed 16-bit range
pub fn scale_axis(value: f32) -> i16 {
    (value.clamp(-1.0, 1.0) * AXIS_MAX as f32).round() as i16
}

/// Model GUID from the gilrs UUID
pub fn guid_from_uuid(uuid: [u8; 16]) -> String {
    hex::encode(uuid)
}

/// Whether gilrs knows a standard layout for a device with this mapping source
pub fn has_standard_mapping(source: MappingSource) -> bool {
    !matches!(source, MappingSource::None)
}

/// Read an SDL `gamecontrollerdb.txt` style mapping file
///
/// A missing or unreadable file is logged and ignored; gilrs still has its
/// built-in mappings.
pub fn load_controller_db(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(mappings) => {
            let count = mappings
                .lines()
                .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
                .count();
            info!("Loaded {} controller mappings from {}", count, path.display());
            Some(mappings)
        },
        Err(e) => {
            warn!("Failed to read controller mappings {}: {}", path.display(), e);
            None
        },
    }
}

/// Dense index assignment for raw control codes
///
/// Known controls are registered at open time; codes first seen in an event
/// are appended.
#[derive(Debug, Clone, Default)]
struct CodeTable {
    codes: Vec<Code>,
}

impl CodeTable {
    fn index_of(&mut self, code: Code) -> u32 {
        match self.codes.iter().position(|c| *c == code) {
            Some(idx) => idx as u32,
            None => {
                self.codes.push(code);
                (self.codes.len() - 1) as u32
            },
        }
    }

    fn get(&self, index: u32) -> Option<Code> {
        self.codes.get(index as usize).copied()
    }

    fn len(&self) -> u32 {
        self.codes.len() as u32
    }
}

/// One opened gamepad
#[derive(Debug)]
struct OpenPad {
    instance: InstanceId,
    native: NativeRef,
    buttons: CodeTable,
    axes: CodeTable,
}

pub struct GilrsBackend {
    gilrs: Gilrs,
    open: HashMap<GamepadId, OpenPad>,
    next_instance: u32,
}

impl GilrsBackend {
    /// Initialize gilrs, adding `mappings` (SDL format) to the built-in ones
    pub fn new(mappings: Option<&str>) -> Result<Self, BackendError> {
        let mut builder = GilrsBuilder::new();
        if let Some(mappings) = mappings {
            builder = builder.add_mappings(mappings);
        }
        let gilrs = builder
            .build()
            .map_err(|e| BackendError::Initialization(e.to_string()))?;
        info!("gilrs initialized");

        Ok(Self {
            gilrs,
            open: HashMap::new(),
            next_instance: 0,
        })
    }

    /// Pump gilrs for `duration` so slow (Bluetooth) gamepads show up
    ///
    /// Events seen meanwhile are discarded; call before enumerating devices.
    pub fn settle(&mut self, duration: Duration) {
        debug!("Waiting {:?} for gamepad enumeration", duration);
        let start = Instant::now();
        while start.elapsed() < duration {
            while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
                if event == EventType::Connected {
                    debug!("Gamepad connected during scan: {:?}", id);
                }
            }
            std::thread::sleep(Duration::from_millis(50));
        }
    }

    fn gamepad_at(&self, index: usize) -> Option<(GamepadId, Gamepad<'_>)> {
        self.gilrs
            .gamepads()
            .find(|(id, gamepad)| usize::from(*id) == index && gamepad.is_connected())
    }

    fn open(&mut self, index: usize, controller: bool) -> Result<NativeDevice, BackendError> {
        let (id, gamepad) = self.gamepad_at(index).ok_or(BackendError::NoSuchIndex(index))?;
        let name = gamepad.name().to_string();
        let guid = guid_from_uuid(gamepad.uuid());

        let mut buttons = CodeTable::default();
        for button in CANONICAL_BUTTONS {
            if let Some(code) = gamepad.button_code(button) {
                buttons.index_of(code);
            }
        }
        let mut axes = CodeTable::default();
        for axis in CANONICAL_AXES {
            if let Some(code) = gamepad.axis_code(axis) {
                axes.index_of(code);
            }
        }

        // Already open: same instance, no second reference
        let next_instance = &mut self.next_instance;
        let pad = self.open.entry(id).or_insert_with(|| {
            let instance = InstanceId(*next_instance);
            *next_instance += 1;
            let native = if controller {
                NativeRef::GameController(instance)
            } else {
                NativeRef::Joystick(instance)
            };
            OpenPad {
                instance,
                native,
                buttons,
                axes,
            }
        });

        Ok(NativeDevice {
            native: pad.native,
            name,
            guid,
            buttons: pad.buttons.len(),
            axes: pad.axes.len(),
            hats: 0,
        })
    }

    fn translate(&mut self, id: GamepadId, event: EventType) -> Option<NativeEvent> {
        match event {
            EventType::Connected => {
                if self.open.contains_key(&id) {
                    return None;
                }
                Some(NativeEvent::DeviceAdded {
                    index: usize::from(id),
                })
            },
            EventType::Disconnected => self
                .open
                .get(&id)
                .map(|pad| NativeEvent::DeviceRemoved {
                    instance: pad.instance,
                }),
            EventType::ButtonPressed(_, code) | EventType::ButtonReleased(_, code) => {
                let pressed = matches!(event, EventType::ButtonPressed(_, _));
                let pad = self.open.get_mut(&id)?;
                Some(NativeEvent::Button {
                    instance: pad.instance,
                    index: pad.buttons.index_of(code),
                    pressed,
                })
            },
            EventType::AxisChanged(_, value, code) => {
                let pad = self.open.get_mut(&id)?;
                Some(NativeEvent::Axis {
                    instance: pad.instance,
                    index: pad.axes.index_of(code),
                    value: scale_axis(value),
                })
            },
            _ => None,
        }
    }
}

impl InputBackend for GilrsBackend {
    fn device_count(&self) -> usize {
        self.gilrs
            .gamepads()
            .map(|(id, _)| usize::from(id) + 1)
            .max()
            .unwrap_or(0)
    }

    fn is_game_controller(&self, index: usize) -> bool {
        self.gamepad_at(index)
            .is_some_and(|(_, gamepad)| has_standard_mapping(gamepad.mapping_source()))
    }

    fn open_game_controller(&mut self, index: usize) -> Result<NativeDevice, BackendError> {
        self.open(index, true)
    }

    fn open_joystick(&mut self, index: usize) -> Result<NativeDevice, BackendError> {
        self.open(index, false)
    }

    fn close(&mut self, native: NativeRef) {
        let instance = native.instance_id();
        self.open.retain(|_, pad| pad.instance != instance);
    }

    /// gilrs fills gamepad state from the events it processes and reports no
    /// initial values on connect, so a fresh device yields `None` here
    fn axis_value(&self, instance: InstanceId, axis: u32) -> Option<i16> {
        let (id, pad) = self.open.iter().find(|(_, pad)| pad.instance == instance)?;
        let code = pad.axes.get(axis)?;
        self.gilrs
            .connected_gamepad(*id)?
            .state()
            .axis_data(code)
            .map(|data| scale_axis(data.value()))
    }

    fn poll_event(&mut self) -> Option<NativeEvent> {
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            if let Some(native) = self.translate(id, event) {
                trace!("gilrs {:?} {:?} -> {:?}", id, event, native);
                return Some(native);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_axis() {
        assert_eq!(scale_axis(0.0), 0);
        assert_eq!(scale_axis(1.0), i16::MAX);
        assert_eq!(scale_axis(-1.0), -i16::MAX);
        assert_eq!(scale_axis(2.5), i16::MAX);
        assert_eq!(scale_axis(0.5), 16384);
    }

    #[test]
    fn test_guid_is_hex() {
        let mut uuid = [0u8; 16];
        uuid[0] = 0x03;
        uuid[15] = 0xff;
        assert_eq!(guid_from_uuid(uuid), "030000000000000000000000000000ff");
    }

    #[test]
    fn test_mapping_source_decides_api() {
        assert!(has_standard_mapping(MappingSource::SdlMappings));
        assert!(has_standard_mapping(MappingSource::Driver));
        assert!(!has_standard_mapping(MappingSource::None));
    }

    #[test]
    fn test_missing_controller_db_is_ignored() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(load_controller_db(&dir.path().join("gamecontrollerdb.txt")).is_none());
    }

    #[test]
    fn test_controller_db_is_read() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("gamecontrollerdb.txt");
        std::fs::write(&path, "# comment\n03000000,Pad,a:b0,platform:Linux,\n").unwrap();
        assert!(load_controller_db(&path).unwrap().contains("Pad"));
    }
}
