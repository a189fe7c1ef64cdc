/// Centralized axis naming utilities
///
/// Provides consistent axis names across the step, coupling and recommendation modules.
pub const AXIS_COUNT: usize = 3;

/// Get all axis names as a static array
pub const AXIS_NAMES: [&str; AXIS_COUNT] = ["Roll", "Pitch", "Yaw"];

/// Lowercase axis keys as used by Betaflight CLI settings (`p_roll`, `d_pitch`, ...)
pub const AXIS_KEYS: [&str; AXIS_COUNT] = ["roll", "pitch", "yaw"];

/// Index of the yaw axis, which gets relaxed tuning thresholds.
pub const YAW_AXIS: usize = 2;

/// Get the standard axis name for a given index
///
/// # Arguments
/// * `index` - Axis index (0=Roll, 1=Pitch, 2=Yaw)
///
/// # Returns
/// Static string slice with the axis name, or "Unknown" for an out-of-range index
/// (step events with invalid axes are skipped, never fatal).
pub fn axis_name(index: usize) -> &'static str {
    AXIS_NAMES.get(index).copied().unwrap_or("Unknown")
}

/// Lowercase settings key for an axis index, "unknown" when out of range.
pub fn axis_key(index: usize) -> &'static str {
    AXIS_KEYS.get(index).copied().unwrap_or("unknown")
}
