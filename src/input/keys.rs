//! Keyboard pseudo-device
//!
//! The keyboard has no instance id and is always present. Keycodes follow the
//! SDL numbering: printable keys are their ASCII value, the rest carry bit 30.

use crate::mapping::{Input, InputConfig};

/// GUID under which the keyboard mapping is stored
pub const KEYBOARD_GUID: &str = "keyboard";

/// Display name of the keyboard pseudo-device
pub const KEYBOARD_NAME: &str = "Keyboard";

/// Button count reported for the keyboard when a consumer asks for one
pub const KEYBOARD_BUTTON_COUNT: u32 = 120;

const SCANCODE_MASK: u32 = 1 << 30;

/// Virtual key code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Keycode(pub u32);

impl Keycode {
    pub const RETURN: Keycode = Keycode(13);
    pub const ESCAPE: Keycode = Keycode(27);
    pub const SPACE: Keycode = Keycode(32);
    pub const LEFT_BRACKET: Keycode = Keycode(91);
    pub const RIGHT_BRACKET: Keycode = Keycode(93);
    pub const F1: Keycode = Keycode(58 | SCANCODE_MASK);
    pub const F2: Keycode = Keycode(59 | SCANCODE_MASK);
    pub const RIGHT: Keycode = Keycode(79 | SCANCODE_MASK);
    pub const LEFT: Keycode = Keycode(80 | SCANCODE_MASK);
    pub const DOWN: Keycode = Keycode(81 | SCANCODE_MASK);
    pub const UP: Keycode = Keycode(82 | SCANCODE_MASK);

    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Mapping used when no keyboard config has been stored
pub fn default_keyboard_config() -> InputConfig {
    let mut config = InputConfig::new(KEYBOARD_GUID, KEYBOARD_NAME);

    config.bind("up", Input::key(Keycode::UP.raw(), true));
    config.bind("down", Input::key(Keycode::DOWN.raw(), true));
    config.bind("left", Input::key(Keycode::LEFT.raw(), true));
    config.bind("right", Input::key(Keycode::RIGHT.raw(), true));

    config.bind("a", Input::key(Keycode::RETURN.raw(), true));
    config.bind("b", Input::key(Keycode::ESCAPE.raw(), true));
    config.bind("start", Input::key(Keycode::F1.raw(), true));
    config.bind("select", Input::key(Keycode::F2.raw(), true));

    config.bind("pageup", Input::key(Keycode::RIGHT_BRACKET.raw(), true));
    config.bind("pagedown", Input::key(Keycode::LEFT_BRACKET.raw(), true));

    config
}
