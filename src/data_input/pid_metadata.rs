// src/data_input/pid_metadata.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::constants::{DEFAULT_PID_PITCH, DEFAULT_PID_ROLL, DEFAULT_PID_YAW};

/// Firmware family, detected from the log header. Only changes display terminology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirmwareType {
    Betaflight,
    EmuFlight,
    Inav,
    #[default]
    Unknown,
}

impl FirmwareType {
    /// Label of the feedforward term ("DF" on EmuFlight).
    pub fn ff_label(&self) -> &'static str {
        match self {
            FirmwareType::EmuFlight => "DF",
            _ => "FF",
        }
    }
}

/// PID values for one axis as found in the log header. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxisPid {
    pub p: Option<u32>,
    pub i: Option<u32>,
    pub d: Option<u32>,
    pub d_max: Option<u32>, // Betaflight 4.6+ five-value format
    pub ff: Option<u32>,
}

/// PID metadata for Roll, Pitch and Yaw plus the detected firmware.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PidMetadata {
    pub roll: AxisPid,
    pub pitch: AxisPid,
    pub yaw: AxisPid,
    pub firmware_type: FirmwareType,
}

/// Current gains for one axis, as consumed by the PID recommender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisPidGains {
    pub p: u32,
    pub i: u32,
    pub d: u32,
    #[serde(default)]
    pub f: u32,
}

impl AxisPidGains {
    fn from_defaults(defaults: [u32; 4]) -> Self {
        Self {
            p: defaults[0],
            i: defaults[1],
            d: defaults[2],
            f: defaults[3],
        }
    }

    /// "P:45 I:80 D:40 FF:120"; a zero FF term is omitted.
    pub fn format_compact(&self, firmware_type: FirmwareType) -> String {
        let mut text = format!("P:{} I:{} D:{}", self.p, self.i, self.d);
        if self.f > 0 {
            text.push_str(&format!(" {}:{}", firmware_type.ff_label(), self.f));
        }
        text
    }
}

/// Complete set of current PID gains [Roll, Pitch, Yaw].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PidConfiguration {
    pub roll: AxisPidGains,
    pub pitch: AxisPidGains,
    pub yaw: AxisPidGains,
}

impl Default for PidConfiguration {
    fn default() -> Self {
        Self {
            roll: AxisPidGains::from_defaults(DEFAULT_PID_ROLL),
            pitch: AxisPidGains::from_defaults(DEFAULT_PID_PITCH),
            yaw: AxisPidGains::from_defaults(DEFAULT_PID_YAW),
        }
    }
}

impl PidConfiguration {
    /// Gains for an axis index (0=roll, 1=pitch, 2=yaw). Out-of-range indices yield `None`.
    pub fn axis(&self, axis_index: usize) -> Option<&AxisPidGains> {
        match axis_index {
            0 => Some(&self.roll),
            1 => Some(&self.pitch),
            2 => Some(&self.yaw),
            _ => None,
        }
    }
}

impl PidMetadata {
    /// True when at least one axis carried a P value in the header.
    pub fn has_pids(&self) -> bool {
        self.roll.p.is_some() || self.pitch.p.is_some() || self.yaw.p.is_some()
    }

    /// Resolves header values into a full configuration.
    ///
    /// Each missing term falls back to the Betaflight default for that axis.
    pub fn to_configuration(&self) -> PidConfiguration {
        let defaults = PidConfiguration::default();
        let resolve = |axis: &AxisPid, fallback: AxisPidGains| AxisPidGains {
            p: axis.p.unwrap_or(fallback.p),
            i: axis.i.unwrap_or(fallback.i),
            d: axis.d.unwrap_or(fallback.d),
            f: axis.ff.unwrap_or(if axis.p.is_some() { 0 } else { fallback.f }),
        };
        PidConfiguration {
            roll: resolve(&self.roll, defaults.roll),
            pitch: resolve(&self.pitch, defaults.pitch),
            yaw: resolve(&self.yaw, defaults.yaw),
        }
    }
}

fn detect_firmware_type(header_map: &HashMap<String, String>) -> FirmwareType {
    for key in ["firmware revision", "firmware type"] {
        if let Some(value) = header_map.get(key) {
            let value = value.to_lowercase();
            if value.contains("emuflight") {
                return FirmwareType::EmuFlight;
            }
            if value.contains("betaflight") {
                return FirmwareType::Betaflight;
            }
            if value.contains("inav") {
                return FirmwareType::Inav;
            }
        }
    }

    if header_map.contains_key("df_yaw") {
        return FirmwareType::EmuFlight;
    }
    if header_map.contains_key("ff_weight") {
        return FirmwareType::Betaflight;
    }
    FirmwareType::Unknown
}

/// Parses PID metadata from header key/value pairs (keys are matched case-insensitively).
///
/// Understands `rollPID`/`pitchPID`/`yawPID` in the 3-value (P,I,D), INAV 4-value
/// (P,I,D,FF) and Betaflight 4.6 5-value (P,I,D,D-Max,FF) forms, plus `ff_weight`
/// and EmuFlight's `df_yaw`.
pub fn parse_pid_metadata(header_metadata: &[(String, String)]) -> PidMetadata {
    let mut pid_data = PidMetadata::default();
    if header_metadata.is_empty() {
        return pid_data;
    }

    let header_map: HashMap<String, String> = header_metadata
        .iter()
        .map(|(k, v)| (k.to_lowercase(), v.clone()))
        .collect();
    pid_data.firmware_type = detect_firmware_type(&header_map);

    if let Some(value) = header_map.get("rollpid") {
        pid_data.roll = parse_axis_pid(value);
    }
    if let Some(value) = header_map.get("pitchpid") {
        pid_data.pitch = parse_axis_pid(value);
    }
    if let Some(value) = header_map.get("yawpid") {
        pid_data.yaw = parse_axis_pid(value);
    }

    if let Some(value) = header_map.get("ff_weight") {
        let ff_values = parse_comma_separated_values(value);
        if ff_values.len() >= 3 {
            for (axis, ff) in [&mut pid_data.roll, &mut pid_data.pitch, &mut pid_data.yaw]
                .into_iter()
                .zip(ff_values)
            {
                axis.ff = Some(ff);
            }
        }
    }

    if let Some(df_yaw) = header_map.get("df_yaw").and_then(|v| v.trim().parse::<u32>().ok()) {
        pid_data.yaw.ff = Some(df_yaw);
    }

    debug!(
        "PID metadata ({:?}): roll {:?}, pitch {:?}, yaw {:?}",
        pid_data.firmware_type, pid_data.roll, pid_data.pitch, pid_data.yaw
    );
    pid_data
}

fn parse_axis_pid(pid_str: &str) -> AxisPid {
    let values = parse_comma_separated_values(pid_str);
    let mut axis_pid = AxisPid {
        p: values.first().copied(),
        i: values.get(1).copied(),
        d: values.get(2).copied(),
        ..AxisPid::default()
    };
    match values.len() {
        4 => axis_pid.ff = Some(values[3]),
        5 => {
            axis_pid.d_max = Some(values[3]);
            axis_pid.ff = Some(values[4]);
        }
        _ => {}
    }
    axis_pid
}

fn parse_comma_separated_values(value_str: &str) -> Vec<u32> {
    value_str
        .split(',')
        .filter_map(|s| s.trim().parse::<u32>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_betaflight_parsing() {
        let pid_data = parse_pid_metadata(&metadata(&[
            ("firmware revision", "Betaflight 4.4.2 (8d4f005) STM32F7X2"),
            ("rollPID", "31,56,21"),
            ("pitchPID", "32,58,23"),
            ("yawPID", "31,56,0"),
            ("ff_weight", "84,87,84"),
        ]));

        assert_eq!(pid_data.firmware_type, FirmwareType::Betaflight);
        assert_eq!(pid_data.roll.p, Some(31));
        assert_eq!(pid_data.roll.d, Some(21));
        assert_eq!(pid_data.roll.ff, Some(84));
        assert_eq!(pid_data.pitch.ff, Some(87));
        assert_eq!(pid_data.yaw.d, Some(0));

        let config = pid_data.to_configuration();
        assert_eq!(config.pitch, AxisPidGains { p: 32, i: 58, d: 23, f: 87 });
    }

    #[test]
    fn test_emuflight_df_yaw() {
        let pid_data = parse_pid_metadata(&metadata(&[
            ("rollPID", "52,57,38"),
            ("yawPID", "90,90,7"),
            ("df_yaw", "15"),
        ]));
        assert_eq!(pid_data.firmware_type, FirmwareType::EmuFlight);
        assert_eq!(pid_data.roll.ff, None);
        assert_eq!(pid_data.yaw.ff, Some(15));
        assert_eq!(pid_data.to_configuration().roll.f, 0);
    }

    #[test]
    fn test_inav_and_five_value_formats() {
        let pid_data = parse_pid_metadata(&metadata(&[
            ("rollPID", "45,80,40,120"),
            ("pitchPID", "59,69,72,72,215"),
        ]));
        assert_eq!(pid_data.roll.ff, Some(120));
        assert_eq!(pid_data.roll.d_max, None);
        assert_eq!(pid_data.pitch.d, Some(72));
        assert_eq!(pid_data.pitch.d_max, Some(72));
        assert_eq!(pid_data.pitch.ff, Some(215));
    }

    #[test]
    fn test_missing_axes_fall_back_to_defaults() {
        let pid_data = parse_pid_metadata(&metadata(&[("rollPID", "50,90")]));
        assert!(pid_data.has_pids());
        let config = pid_data.to_configuration();
        assert_eq!(config.roll.p, 50);
        assert_eq!(config.roll.i, 90);
        assert_eq!(config.roll.d, DEFAULT_PID_ROLL[2]);
        assert_eq!(config.yaw, PidConfiguration::default().yaw);
    }

    #[test]
    fn test_empty_metadata() {
        let pid_data = parse_pid_metadata(&[]);
        assert!(!pid_data.has_pids());
        assert_eq!(pid_data.firmware_type, FirmwareType::Unknown);
        assert_eq!(pid_data.to_configuration(), PidConfiguration::default());
    }

    #[test]
    fn test_format_compact() {
        let gains = AxisPidGains { p: 31, i: 56, d: 21, f: 84 };
        assert_eq!(gains.format_compact(FirmwareType::Betaflight), "P:31 I:56 D:21 FF:84");
        assert_eq!(gains.format_compact(FirmwareType::EmuFlight), "P:31 I:56 D:21 DF:84");
        let no_ff = AxisPidGains { f: 0, ..gains };
        assert_eq!(no_ff.format_compact(FirmwareType::Betaflight), "P:31 I:56 D:21");
    }

    #[test]
    fn test_configuration_json_defaults_f() {
        let config: AxisPidGains = serde_json::from_str(r#"{"p":40,"i":70,"d":30}"#).unwrap();
        assert_eq!(config.f, 0);
        assert!(PidConfiguration::default().axis(3).is_none());
    }
}

// src/data_input/pid_metadata.rs
