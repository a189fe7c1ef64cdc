// src/data_input/filter_settings.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::constants::{
    DEFAULT_DTERM_LPF1_HZ, DEFAULT_DYN_NOTCH_MAX_HZ, DEFAULT_DYN_NOTCH_MIN_HZ,
    DEFAULT_GYRO_LPF1_HZ,
};

/// Current filter cutoffs in Hz. A lowpass cutoff of 0 means the filter is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub gyro_lpf1_static_hz: u32,
    pub dterm_lpf1_static_hz: u32,
    pub dyn_notch_min_hz: u32,
    pub dyn_notch_max_hz: u32,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            gyro_lpf1_static_hz: DEFAULT_GYRO_LPF1_HZ,
            dterm_lpf1_static_hz: DEFAULT_DTERM_LPF1_HZ,
            dyn_notch_min_hz: DEFAULT_DYN_NOTCH_MIN_HZ,
            dyn_notch_max_hz: DEFAULT_DYN_NOTCH_MAX_HZ,
        }
    }
}

impl FilterSettings {
    pub fn gyro_lpf_enabled(&self) -> bool {
        self.gyro_lpf1_static_hz > 0
    }

    pub fn dterm_lpf_enabled(&self) -> bool {
        self.dterm_lpf1_static_hz > 0
    }
}

/// Reads filter cutoffs from Betaflight header metadata.
///
/// Older firmware writes `gyro_lowpass_hz` / `dterm_lowpass_hz`; those are used when the
/// 4.x names are missing. Unknown or unparseable values keep the default.
/// Returns `None` when the header carries none of the filter keys.
pub fn parse_filter_settings(headers: &[(String, String)]) -> Option<FilterSettings> {
    let header_map: HashMap<String, String> = headers
        .iter()
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
        .collect();

    let lookup = |keys: &[&str]| -> Option<u32> {
        keys.iter()
            .filter_map(|key| header_map.get(*key))
            .find_map(|value| value.parse::<u32>().ok())
    };

    let gyro = lookup(&["gyro_lpf1_static_hz", "gyro_lowpass_hz"]);
    let dterm = lookup(&["dterm_lpf1_static_hz", "dterm_lowpass_hz"]);
    let notch_min = lookup(&["dyn_notch_min_hz"]);
    let notch_max = lookup(&["dyn_notch_max_hz"]);

    if gyro.is_none() && dterm.is_none() && notch_min.is_none() && notch_max.is_none() {
        debug!("No filter settings in header metadata");
        return None;
    }

    let defaults = FilterSettings::default();
    let settings = FilterSettings {
        gyro_lpf1_static_hz: gyro.unwrap_or(defaults.gyro_lpf1_static_hz),
        dterm_lpf1_static_hz: dterm.unwrap_or(defaults.dterm_lpf1_static_hz),
        dyn_notch_min_hz: notch_min.unwrap_or(defaults.dyn_notch_min_hz),
        dyn_notch_max_hz: notch_max.unwrap_or(defaults.dyn_notch_max_hz),
    };
    debug!("Filter settings from header: {:?}", settings);
    Some(settings)
}
