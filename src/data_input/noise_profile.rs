// src/data_input/noise_profile.rs
//
// Pre-computed gyro noise spectrum summary. The spectrum itself is produced elsewhere;
// this module only describes and loads it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::AnalysisResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseLevel {
    Low,
    Medium,
    High,
}

impl NoiseLevel {
    pub fn name(&self) -> &'static str {
        match self {
            NoiseLevel::Low => "low",
            NoiseLevel::Medium => "medium",
            NoiseLevel::High => "high",
        }
    }
}

impl fmt::Display for NoiseLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Likely source of a spectral peak, as classified by the spectral analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakKind {
    FrameResonance,
    MotorHarmonic,
    Electrical,
    #[default]
    Unknown,
}

impl PeakKind {
    pub fn description(&self) -> &'static str {
        match self {
            PeakKind::FrameResonance => "frame resonance",
            PeakKind::MotorHarmonic => "motor harmonic",
            PeakKind::Electrical => "electrical noise",
            PeakKind::Unknown => "noise peak",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoisePeak {
    pub frequency_hz: f64,
    /// Peak height above the axis noise floor, in dB.
    pub amplitude_db: f64,
    #[serde(default)]
    pub kind: PeakKind,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AxisNoise {
    pub noise_floor_db: f64,
    #[serde(default)]
    pub peaks: Vec<NoisePeak>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseProfile {
    #[serde(default)]
    pub roll: AxisNoise,
    #[serde(default)]
    pub pitch: AxisNoise,
    #[serde(default)]
    pub yaw: AxisNoise,
    pub overall_level: NoiseLevel,
}

impl NoiseProfile {
    pub fn axes(&self) -> [&AxisNoise; 3] {
        [&self.roll, &self.pitch, &self.yaw]
    }

    /// Every peak of every axis, in axis order.
    pub fn all_peaks(&self) -> impl Iterator<Item = &NoisePeak> {
        self.axes().into_iter().flat_map(|axis| axis.peaks.iter())
    }
}

/// Loads a noise profile from a JSON file.
pub fn load_noise_profile(path: &Path) -> AnalysisResult<NoiseProfile> {
    let contents = fs::read_to_string(path)?;
    let profile: NoiseProfile = serde_json::from_str(&contents)?;
    info!(
        "Loaded noise profile {:?}: overall level {}, {} peaks",
        path,
        profile.overall_level,
        profile.all_peaks().count()
    );
    Ok(profile)
}
