// src/data_input/settings.rs

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::data_input::filter_settings::FilterSettings;
use crate::data_input::pid_metadata::PidConfiguration;
use crate::error::AnalysisResult;

/// User-supplied overrides for the current tuning, read from a JSON file.
///
/// Either section may be omitted; omitted sections fall back to the values found in the
/// log header (or the firmware defaults).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningSettings {
    pub pids: Option<PidConfiguration>,
    pub filters: Option<FilterSettings>,
}

impl TuningSettings {
    pub fn load(path: &Path) -> AnalysisResult<Self> {
        let contents = fs::read_to_string(path)?;
        let settings = Self::from_json(&contents)?;
        info!(
            "Loaded settings {:?} (pids: {}, filters: {})",
            path,
            settings.pids.is_some(),
            settings.filters.is_some()
        );
        Ok(settings)
    }

    pub fn from_json(contents: &str) -> AnalysisResult<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Header-derived PIDs, replaced by the override when present.
    pub fn resolve_pids(&self, from_header: PidConfiguration) -> PidConfiguration {
        self.pids.unwrap_or(from_header)
    }

    pub fn resolve_filters(&self, from_header: Option<FilterSettings>) -> Option<FilterSettings> {
        self.filters.or(from_header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_only() {
        let settings =
            TuningSettings::from_json(r#"{"filters": {"gyro_lpf1_static_hz": 0}}"#).unwrap();
        assert!(settings.pids.is_none());
        let filters = settings.resolve_filters(None).unwrap();
        assert_eq!(filters.gyro_lpf1_static_hz, 0);
        assert_eq!(filters.dyn_notch_min_hz, 100);
        assert_eq!(
            settings.resolve_pids(PidConfiguration::default()),
            PidConfiguration::default()
        );
    }

    #[test]
    fn test_pids_override_header() {
        let json = r#"{"pids": {
            "roll": {"p": 50, "i": 80, "d": 45, "f": 100},
            "pitch": {"p": 52, "i": 84, "d": 48},
            "yaw": {"p": 45, "i": 80, "d": 0}
        }}"#;
        let settings = TuningSettings::from_json(json).unwrap();
        let pids = settings.resolve_pids(PidConfiguration::default());
        assert_eq!(pids.roll.d, 45);
        assert_eq!(pids.pitch.f, 0);
        assert!(settings.resolve_filters(None).is_none());
    }

    #[test]
    fn test_invalid_json() {
        assert!(TuningSettings::from_json("{ not json").is_err());
    }
}
