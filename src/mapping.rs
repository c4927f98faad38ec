//! Per-device mapping data
//!
//! An [`InputConfig`] binds logical input names (e.g. "a", "up", "pagedown")
//! to physical controls on one device model. Configs are joined to devices by
//! GUID, so two controllers of the same model share one stored entry.

use serde::{Deserialize, Serialize};

/// Hat direction bits, combined for diagonals
pub const HAT_CENTERED: i32 = 0x00;
pub const HAT_UP: i32 = 0x01;
pub const HAT_RIGHT: i32 = 0x02;
pub const HAT_DOWN: i32 = 0x04;
pub const HAT_LEFT: i32 = 0x08;

/// Kind of physical control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Button,
    Axis,
    Hat,
    Key,
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputKind::Button => write!(f, "button"),
            InputKind::Axis => write!(f, "axis"),
            InputKind::Hat => write!(f, "hat"),
            InputKind::Key => write!(f, "key"),
        }
    }
}

/// One physical signal: control kind, control index and value
///
/// `value` is the sign for axes (-1, 0, 1), the direction mask for hats and
/// 1/0 for pressed/released buttons and keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Input {
    #[serde(rename = "type")]
    pub kind: InputKind,
    pub id: u32,
    pub value: i32,
}

impl Input {
    pub fn new(kind: InputKind, id: u32, value: i32) -> Self {
        Self { kind, id, value }
    }

    pub fn button(id: u32, pressed: bool) -> Self {
        Self::new(InputKind::Button, id, pressed as i32)
    }

    pub fn axis(id: u32, value: i32) -> Self {
        Self::new(InputKind::Axis, id, value)
    }

    pub fn hat(id: u32, direction: i32) -> Self {
        Self::new(InputKind::Hat, id, direction)
    }

    pub fn key(keycode: u32, pressed: bool) -> Self {
        Self::new(InputKind::Key, keycode, pressed as i32)
    }

    /// Whether a live input event triggers this binding
    ///
    /// Buttons and keys match on id alone (press and release both belong to
    /// the binding). Axes match when the live value points the same way as
    /// the bound sign, or is neutral (the release of that direction). Hats
    /// match when any bound direction bit is set, or on return to center.
    pub fn matches(&self, live: &Input) -> bool {
        if self.kind != live.kind || self.id != live.id {
            return false;
        }
        match self.kind {
            InputKind::Button | InputKind::Key => true,
            InputKind::Axis => live.value == 0 || live.value.signum() == self.value.signum(),
            InputKind::Hat => live.value == HAT_CENTERED || (live.value & self.value) != 0,
        }
    }

    /// Human readable form used in logs and diagnostics
    pub fn describe(&self) -> String {
        match self.kind {
            InputKind::Axis => {
                let sign = if self.value < 0 { "-" } else { "+" };
                format!("axis {}{}", self.id, sign)
            },
            InputKind::Hat => format!("hat {} {}", self.id, hat_direction_name(self.value)),
            kind => format!("{} {}", kind, self.id),
        }
    }
}

fn hat_direction_name(value: i32) -> &'static str {
    match value {
        HAT_UP => "up",
        HAT_DOWN => "down",
        HAT_LEFT => "left",
        HAT_RIGHT => "right",
        v if v == HAT_UP | HAT_RIGHT => "up-right",
        v if v == HAT_UP | HAT_LEFT => "up-left",
        v if v == HAT_DOWN | HAT_RIGHT => "down-right",
        v if v == HAT_DOWN | HAT_LEFT => "down-left",
        _ => "centered",
    }
}

/// A logical input name bound to a physical control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub name: String,
    #[serde(flatten)]
    pub input: Input,
}

/// Where a config came from. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigOrigin {
    /// Loaded from (or written to) the store
    Stored,
    /// Generated because nothing usable was stored
    #[default]
    Default,
}

/// Named bindings for one device model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    pub device_guid: String,
    pub device_name: String,
    #[serde(default)]
    bindings: Vec<Binding>,
    #[serde(skip)]
    origin: ConfigOrigin,
}

impl InputConfig {
    /// Create an empty, not yet stored config
    pub fn new(device_guid: impl Into<String>, device_name: impl Into<String>) -> Self {
        Self {
            device_guid: device_guid.into(),
            device_name: device_name.into(),
            bindings: Vec::new(),
            origin: ConfigOrigin::Default,
        }
    }

    /// Generate the fallback mapping for a device with no stored config
    ///
    /// Buttons are bound in order ("button0" → button 0, ...), then axes in
    /// their positive direction ("axis0" → axis 0 +, ...).
    pub fn generate_default(
        device_guid: impl Into<String>,
        device_name: impl Into<String>,
        buttons: u32,
        axes: u32,
    ) -> Self {
        let mut config = Self::new(device_guid, device_name);
        for id in 0..buttons {
            config.bind(format!("button{}", id), Input::button(id, true));
        }
        for id in 0..axes {
            config.bind(format!("axis{}", id), Input::axis(id, 1));
        }
        config
    }

    /// Bind `name` to `input`, replacing any previous binding of that name in place
    pub fn bind(&mut self, name: impl Into<String>, input: Input) {
        let name = name.into();
        match self.bindings.iter_mut().find(|b| b.name == name) {
            Some(existing) => existing.input = input,
            None => self.bindings.push(Binding { name, input }),
        }
    }

    /// Remove the binding for `name`, returning what it was bound to
    pub fn unbind(&mut self, name: &str) -> Option<Input> {
        let idx = self.bindings.iter().position(|b| b.name == name)?;
        Some(self.bindings.remove(idx).input)
    }

    /// Remove every binding
    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    /// Physical control bound to `name`
    pub fn get(&self, name: &str) -> Option<&Input> {
        self.bindings.iter().find(|b| b.name == name).map(|b| &b.input)
    }

    /// Whether the live `input` triggers the logical input `name`
    pub fn is_mapped_to(&self, name: &str, input: &Input) -> bool {
        self.get(name).is_some_and(|bound| bound.matches(input))
    }

    /// All logical names triggered by the live `input`
    pub fn mapped_to(&self, input: &Input) -> Vec<String> {
        self.bindings
            .iter()
            .filter(|b| b.input.matches(input))
            .map(|b| b.name.clone())
            .collect()
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn origin(&self) -> ConfigOrigin {
        self.origin
    }

    /// Whether this config came from the store rather than being generated
    pub fn is_configured(&self) -> bool {
        self.origin == ConfigOrigin::Stored
    }

    pub(crate) fn mark_stored(&mut self) {
        self.origin = ConfigOrigin::Stored;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_binds_sequentially() {
        let config = InputConfig::generate_default("ABC", "Pad", 3, 2);

        assert_eq!(config.get("button0"), Some(&Input::button(0, true)));
        assert_eq!(config.get("button1"), Some(&Input::button(1, true)));
        assert_eq!(config.get("button2"), Some(&Input::button(2, true)));
        assert_eq!(config.get("axis1"), Some(&Input::axis(1, 1)));
        assert_eq!(config.len(), 5);
        assert!(!config.is_configured());
    }

    #[test]
    fn test_rebinding_keeps_names_unique_and_order() {
        let mut config = InputConfig::new("ABC", "Pad");
        config.bind("a", Input::button(0, true));
        config.bind("b", Input::button(1, true));
        config.bind("a", Input::button(5, true));

        assert_eq!(config.len(), 2);
        assert_eq!(config.bindings()[0].name, "a");
        assert_eq!(config.get("a"), Some(&Input::button(5, true)));
    }

    #[test]
    fn test_unbind() {
        let mut config = InputConfig::new("ABC", "Pad");
        config.bind("a", Input::button(0, true));
        assert_eq!(config.unbind("a"), Some(Input::button(0, true)));
        assert_eq!(config.unbind("a"), None);
        assert!(config.is_empty());
    }

    #[test]
    fn test_axis_matching_follows_sign() {
        let mut config = InputConfig::new("ABC", "Pad");
        config.bind("left", Input::axis(0, -1));
        config.bind("right", Input::axis(0, 1));

        assert_eq!(config.mapped_to(&Input::axis(0, -1)), vec!["left".to_string()]);
        assert_eq!(config.mapped_to(&Input::axis(0, 1)), vec!["right".to_string()]);
        // Returning to neutral releases both directions
        assert_eq!(config.mapped_to(&Input::axis(0, 0)).len(), 2);
        assert!(config.mapped_to(&Input::axis(1, 1)).is_empty());
    }

    #[test]
    fn test_hat_matching_uses_direction_bits() {
        let mut config = InputConfig::new("ABC", "Pad");
        config.bind("up", Input::hat(0, HAT_UP));
        config.bind("left", Input::hat(0, HAT_LEFT));

        assert!(config.is_mapped_to("up", &Input::hat(0, HAT_UP | HAT_RIGHT)));
        assert!(!config.is_mapped_to("left", &Input::hat(0, HAT_UP)));
        assert!(config.is_mapped_to("left", &Input::hat(0, HAT_CENTERED)));
    }

    #[test]
    fn test_button_release_still_maps() {
        let mut config = InputConfig::new("ABC", "Pad");
        config.bind("a", Input::button(2, true));
        assert!(config.is_mapped_to("a", &Input::button(2, false)));
        assert!(!config.is_mapped_to("a", &Input::key(2, true)));
    }

    #[test]
    fn test_origin_not_serialized() {
        let mut config = InputConfig::generate_default("ABC", "Pad", 1, 0);
        config.mark_stored();

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("origin"));

        let back: InputConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.bindings(), config.bindings());
        assert!(!back.is_configured());
    }

    #[test]
    fn test_describe() {
        assert_eq!(Input::axis(3, -1).describe(), "axis 3-");
        assert_eq!(Input::hat(0, HAT_DOWN).describe(), "hat 0 down");
        assert_eq!(Input::button(7, true).describe(), "button 7");
    }
}
