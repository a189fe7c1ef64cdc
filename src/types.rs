// src/types.rs
// Shared closed enumerations and type aliases used across the analysis modules.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::axis_names::AXIS_COUNT;
use crate::data_analysis::axis_profile::AxisStepProfile;
use crate::data_input::flight_data::TimeSeries;

// Compile-time assertion: per-axis arrays below are indexed Roll/Pitch/Yaw.
const _: () = assert!(AXIS_COUNT == 3, "AXIS_COUNT must be 3 (Roll, Pitch, Yaw)");

/// One series per rotational axis [Roll, Pitch, Yaw].
pub type AxisSeries = [TimeSeries; AXIS_COUNT];

/// Aggregated step profiles for all axes [Roll, Pitch, Yaw].
pub type AxisProfiles = [AxisStepProfile; AXIS_COUNT];

/// Which part of the flight behaviour a recommendation is expected to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Response,
    Stability,
    Both,
}

/// How much the measured data supports a recommendation.
///
/// Ordered so that `max` picks the stronger of two confidences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Impact {
    pub fn name(&self) -> &'static str {
        match self {
            Impact::Response => "response",
            Impact::Stability => "stability",
            Impact::Both => "both",
        }
    }
}

impl Confidence {
    pub fn name(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Round to a fixed number of decimals (used for correlations and FF ratios).
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_orders_low_to_high() {
        assert!(Confidence::High > Confidence::Medium);
        assert!(Confidence::Medium > Confidence::Low);
        assert_eq!(Confidence::Low.max(Confidence::High), Confidence::High);
    }

    #[test]
    fn round_to_three_decimals() {
        assert_eq!(round_to(0.123456, 3), 0.123);
        assert_eq!(round_to(0.9996, 3), 1.0);
    }

    #[test]
    fn enums_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&Impact::Both).unwrap(), "\"both\"");
        assert_eq!(serde_json::to_string(&Confidence::Medium).unwrap(), "\"medium\"");
    }
}
