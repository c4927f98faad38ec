//! Device diagnostics for troubleshooting detection and mapping issues

use super::backend::InputBackend;
use super::device::DeviceKind;
use super::manager::InputManager;
use super::registry::DeviceRef;
use crate::mapping::ConfigOrigin;
use tracing::info;

/// One-line summary per connected device
pub fn device_summaries<B: InputBackend>(manager: &InputManager<B>) -> Vec<String> {
    manager
        .registry()
        .entries()
        .into_iter()
        .map(|entry| {
            let handle = &entry.handle;
            format!(
                "{}: \"{}\" [{}] guid={} buttons={} axes={} hats={}",
                entry.slot,
                handle.name(),
                handle.kind(),
                handle.guid(),
                handle.button_count(),
                handle.axis_count(),
                handle.hat_count()
            )
        })
        .collect()
}

/// Log detailed information about every device the manager knows
pub fn print_device_diagnostics<B: InputBackend>(manager: &InputManager<B>) {
    info!("=== Input Device Diagnostics ===");
    info!("Platform: {}", std::env::consts::OS);
    info!(
        "{} device(s), {} configured",
        manager.num_devices(),
        manager.num_configured_devices()
    );
    info!("");

    let entries = manager.registry().entries();
    if entries.is_empty() {
        info!("⚠️  No joysticks or game controllers detected");
        info!("   Please check:");
        info!("   - The device is connected (USB or Bluetooth paired)");
        info!("   - The current user may read input devices");
    }

    for entry in entries {
        let handle = &entry.handle;
        info!("📋 {} ({})", entry.slot, handle.native().to_log_string());
        info!("   Name: \"{}\"", handle.name());
        info!("   GUID: {}", handle.guid());
        info!(
            "   API: {}",
            match handle.kind() {
                DeviceKind::GameController => "game controller (standard layout)",
                DeviceKind::Joystick => "joystick (raw indices)",
            }
        );
        info!(
            "   Controls: {} buttons, {} axes, {} hats",
            handle.button_count(),
            handle.axis_count(),
            handle.hat_count()
        );

        let triggers = entry.axes.triggers();
        if !triggers.is_empty() {
            let list: Vec<String> = triggers
                .iter()
                .map(|(axis, side)| format!("{} (rests {:?})", axis, side))
                .collect();
            info!("   Trigger axes: {}", list.join(", "));
        }

        print_bindings(manager, DeviceRef::Slot(entry.slot));
        info!("   ─────────────────────────────────");
    }

    info!("⌨️  Keyboard");
    print_bindings(manager, DeviceRef::Keyboard);
    info!("=== End Diagnostics ===");
}

fn print_bindings<B: InputBackend>(manager: &InputManager<B>, device: DeviceRef) {
    let Some(config) = manager.input_config(device) else {
        return;
    };
    let origin = match config.origin() {
        ConfigOrigin::Stored => "stored",
        ConfigOrigin::Default => "default",
    };
    info!("   Mapping ({}, {} bindings):", origin, config.len());
    for binding in config.bindings() {
        info!("      {:<10} {}", binding.name, binding.input.describe());
    }
}
