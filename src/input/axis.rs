//! Analog axis filtering (deadzone, trigger detection, change suppression)
//!
//! Axis values are reduced to logical directions before delivery: sticks
//! report -1, 0 or 1 and triggers 0 or 1. Small movements around rest are
//! swallowed by the deadzone, and repeated samples that do not change the
//! logical direction are dropped.
//!
//! # Trigger axes
//!
//! Analog triggers often report as axes resting at one end of the range
//! (-32768 when released). Treated as a stick, such an axis reads as fully
//! deflected and would fire a spurious press at startup. Each device is
//! therefore sampled once when it is added; axes resting far from center are
//! classified as triggers and remapped so that rest reads as 0.
//!
//! Some backends only learn axis state from events and have nothing to sample
//! at add time. The rest of such an axis is unknown until its first report,
//! which is then classified and recorded as delivered in place of the sample.
//!
//! A trigger that happens to be half pressed while the device is plugged in
//! can be classified as a stick. The sample is only taken once per session.

use super::backend::{InputBackend, AXIS_MAX, AXIS_MIN};
use super::device::DeviceHandle;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Raw magnitude at or below which an axis reads as neutral
pub const DEADZONE: i32 = 23000;

/// Rest magnitude above which an axis is classified as a trigger
pub const TRIGGER_REST_THRESHOLD: i32 = 16384;

/// Upper bound of the canonical trigger range (rest maps to 0)
pub const TRIGGER_RANGE_MAX: i32 = AXIS_MAX - AXIS_MIN;

/// End of the range a trigger axis rests at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestSide {
    /// Rests at the minimum, pressing increases the value
    Negative,
    /// Rests at the maximum, pressing decreases the value
    Positive,
}

/// Axes of one device classified as triggers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerAxes {
    axes: BTreeMap<u32, RestSide>,
}

impl TriggerAxes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `axis` from its rest value
    ///
    /// Returns whether the axis was classified as a trigger.
    pub fn classify(&mut self, axis: u32, rest: i16) -> bool {
        let rest = rest as i32;
        if rest.abs() <= TRIGGER_REST_THRESHOLD {
            return false;
        }
        let side = if rest < 0 {
            RestSide::Negative
        } else {
            RestSide::Positive
        };
        self.axes.insert(axis, side);
        true
    }

    pub fn rest_side(&self, axis: u32) -> Option<RestSide> {
        self.axes.get(&axis).copied()
    }

    pub fn len(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, RestSide)> + '_ {
        self.axes.iter().map(|(axis, side)| (*axis, *side))
    }
}

/// Sample every axis of `handle` once and classify the trigger-style ones
///
/// Must run right after the device is opened, before any of its events are
/// delivered. Axes the backend has no value for are left unclassified.
pub fn detect_trigger_axes<B: InputBackend + ?Sized>(
    backend: &B,
    handle: &DeviceHandle,
) -> TriggerAxes {
    let mut triggers = TriggerAxes::new();

    for axis in 0..handle.axis_count() {
        let Some(rest) = backend.axis_value(handle.instance_id(), axis) else {
            continue;
        };
        if triggers.classify(axis, rest) {
            debug!(
                "Axis {} of \"{}\" rests at {}, treating it as a trigger",
                axis,
                handle.name(),
                rest
            );
        }
    }

    triggers
}

/// Map a trigger's native range to `0..=TRIGGER_RANGE_MAX`, rest at 0
pub fn remap_trigger(raw: i16, side: RestSide) -> i32 {
    match side {
        RestSide::Negative => raw as i32 - AXIS_MIN,
        RestSide::Positive => AXIS_MAX - raw as i32,
    }
}

/// Reduce a raw sample to its logical value
///
/// Stick axes yield -1, 0 or 1; trigger axes yield 0 or 1. A magnitude equal
/// to [`DEADZONE`] is still neutral.
pub fn normalize(raw: i16, axis: u32, triggers: &TriggerAxes) -> i32 {
    match triggers.rest_side(axis) {
        Some(side) => {
            if remap_trigger(raw, side) > DEADZONE {
                1
            } else {
                0
            }
        },
        None => {
            let value = raw as i32;
            if value.abs() <= DEADZONE {
                0
            } else {
                value.signum()
            }
        },
    }
}

/// Per-device axis filter state
#[derive(Debug, Clone, Default)]
pub struct AxisState {
    triggers: TriggerAxes,
    /// Last delivered logical value per axis
    prev: Vec<Option<i32>>,
    /// Axes advertised at open time
    axis_count: u32,
    /// Advertised axes whose rest value is still unknown
    unsampled: BTreeSet<u32>,
}

impl AxisState {
    pub fn new(triggers: TriggerAxes, axis_count: u32) -> Self {
        Self {
            triggers,
            prev: vec![None; axis_count as usize],
            axis_count,
            unsampled: BTreeSet::new(),
        }
    }

    /// Sample rest values and record them as already delivered
    ///
    /// Axes sitting at rest when the device appears then produce no event
    /// until they actually move. Axes without a sample take their rest from
    /// their first report, see [`AxisState::observe_rest`].
    pub fn detect<B: InputBackend + ?Sized>(backend: &B, handle: &DeviceHandle) -> Self {
        let triggers = detect_trigger_axes(backend, handle);
        let mut state = Self::new(triggers, handle.axis_count());
        for axis in 0..handle.axis_count() {
            match backend.axis_value(handle.instance_id(), axis) {
                Some(rest) => {
                    let value = normalize(rest, axis, &state.triggers);
                    state.prime(axis, value);
                },
                None => {
                    state.unsampled.insert(axis);
                },
            }
        }
        if !state.unsampled.is_empty() {
            debug!(
                "\"{}\": no rest value for axes {:?} yet",
                handle.name(),
                state.unsampled
            );
        }
        state
    }

    /// Take `raw` as the rest value of `axis` if that is still unknown
    ///
    /// Applies to axes the backend could not sample at add time and to axes
    /// beyond the advertised count that have not reported before. The value
    /// is classified, recorded as delivered and must not be emitted; returns
    /// `true` in that case. Runs before [`AxisState::normalize`].
    pub fn observe_rest(&mut self, axis: u32, raw: i16) -> bool {
        let unknown = self.unsampled.remove(&axis)
            || (axis >= self.axis_count && self.last_value(axis).is_none());
        if !unknown {
            return false;
        }

        if self.triggers.classify(axis, raw) {
            debug!("Axis {} first reported {}, treating it as a trigger", axis, raw);
        }
        let value = self.normalize(raw, axis);
        self.prime(axis, value);
        true
    }

    pub fn triggers(&self) -> &TriggerAxes {
        &self.triggers
    }

    pub fn normalize(&self, raw: i16, axis: u32) -> i32 {
        normalize(raw, axis, &self.triggers)
    }

    /// Record `value` as delivered without emitting
    pub fn prime(&mut self, axis: u32, value: i32) {
        if let Some(slot) = self.slot_mut(axis) {
            *slot = Some(value);
        }
    }

    /// Whether `value` differs from the last delivered value of `axis`
    ///
    /// Updates the stored value. The first value seen for an axis is always
    /// emitted.
    pub fn should_emit(&mut self, axis: u32, value: i32) -> bool {
        let Some(slot) = self.slot_mut(axis) else {
            return false;
        };
        if *slot == Some(value) {
            return false;
        }
        *slot = Some(value);
        true
    }

    pub fn last_value(&self, axis: u32) -> Option<i32> {
        self.prev.get(axis as usize).copied().flatten()
    }

    fn slot_mut(&mut self, axis: u32) -> Option<&mut Option<i32>> {
        let idx = axis as usize;
        // Backends may report axes beyond the count advertised at open time
        if idx >= self.prev.len() {
            self.prev.resize(idx + 1, None);
        }
        self.prev.get_mut(idx)
    }
}
