// src/data_analysis/filter_recommender.rs

use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::constants::{
    DTERM_LPF_MAX_HZ, DTERM_LPF_MIN_HZ, DTERM_LPF_STEP_HZ, DYN_NOTCH_MARGIN_HZ,
    DYN_NOTCH_MAX_LIMIT_HZ, DYN_NOTCH_MIN_LIMIT_HZ, GYRO_LPF_MAX_HZ, GYRO_LPF_MIN_HZ,
    GYRO_LPF_STEP_HZ, PEAK_ACTION_THRESHOLD_DB, RESONANCE_CUTOFF_MARGIN_HZ,
};
use crate::data_input::filter_settings::FilterSettings;
use crate::data_input::noise_profile::{NoiseLevel, NoisePeak, NoiseProfile};
use crate::types::{Confidence, Impact};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterSetting {
    GyroLpf1StaticHz,
    DtermLpf1StaticHz,
    DynNotchMinHz,
    DynNotchMaxHz,
}

impl FilterSetting {
    /// Betaflight CLI variable name.
    pub fn cli_name(&self) -> &'static str {
        match self {
            FilterSetting::GyroLpf1StaticHz => "gyro_lpf1_static_hz",
            FilterSetting::DtermLpf1StaticHz => "dterm_lpf1_static_hz",
            FilterSetting::DynNotchMinHz => "dyn_notch_min_hz",
            FilterSetting::DynNotchMaxHz => "dyn_notch_max_hz",
        }
    }

    /// Allowed range for recommended values.
    fn limits(&self) -> (u32, u32) {
        match self {
            FilterSetting::GyroLpf1StaticHz => (GYRO_LPF_MIN_HZ, GYRO_LPF_MAX_HZ),
            FilterSetting::DtermLpf1StaticHz => (DTERM_LPF_MIN_HZ, DTERM_LPF_MAX_HZ),
            FilterSetting::DynNotchMinHz | FilterSetting::DynNotchMaxHz => {
                (DYN_NOTCH_MIN_LIMIT_HZ, DYN_NOTCH_MAX_LIMIT_HZ)
            }
        }
    }

    /// Which of two competing values is kept: the higher one only for the notch maximum.
    fn prefers(&self, candidate: u32, existing: u32) -> bool {
        match self {
            FilterSetting::DynNotchMaxHz => candidate > existing,
            _ => candidate < existing,
        }
    }

    fn current_value(&self, settings: &FilterSettings) -> u32 {
        match self {
            FilterSetting::GyroLpf1StaticHz => settings.gyro_lpf1_static_hz,
            FilterSetting::DtermLpf1StaticHz => settings.dterm_lpf1_static_hz,
            FilterSetting::DynNotchMinHz => settings.dyn_notch_min_hz,
            FilterSetting::DynNotchMaxHz => settings.dyn_notch_max_hz,
        }
    }
}

impl fmt::Display for FilterSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cli_name())
    }
}

impl Serialize for FilterSetting {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.cli_name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterRecommendation {
    pub setting: FilterSetting,
    pub current_value: u32,
    pub recommended_value: u32,
    pub reason: String,
    pub impact: Impact,
    pub confidence: Confidence,
}

/// Direction a pass wants to move a setting in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Move {
    Lower,
    Raise,
}

/// Clamps `target_hz` to the setting's limits. Returns `None` when the clamped value
/// does not move an enabled setting in the requested direction.
fn recommendation(
    setting: FilterSetting,
    settings: &FilterSettings,
    direction: Move,
    target_hz: i64,
    reason: String,
    impact: Impact,
    confidence: Confidence,
) -> Option<FilterRecommendation> {
    let (min, max) = setting.limits();
    let current_value = setting.current_value(settings);
    let recommended_value = target_hz.clamp(min as i64, max as i64) as u32;
    // A zero cutoff is a disabled filter; any value enables it.
    let moves_as_asked = current_value == 0
        || match direction {
            Move::Lower => recommended_value < current_value,
            Move::Raise => recommended_value > current_value,
        };
    if !moves_as_asked {
        debug!(
            "Skipping {}: clamped {} -> {} moves the wrong way",
            setting, current_value, recommended_value
        );
        return None;
    }
    Some(FilterRecommendation {
        setting,
        current_value,
        recommended_value,
        reason,
        impact,
        confidence,
    })
}

/// Peaks tall enough above the noise floor to act on, from every axis.
fn significant_peaks(noise: &NoiseProfile) -> Vec<&NoisePeak> {
    let mut peaks: Vec<&NoisePeak> = noise
        .all_peaks()
        .filter(|p| p.amplitude_db >= PEAK_ACTION_THRESHOLD_DB)
        .collect();
    peaks.sort_by(|a, b| {
        a.frequency_hz
            .partial_cmp(&b.frequency_hz)
            .unwrap_or(Ordering::Equal)
    });
    peaks
}

fn noise_floor_pass(noise: &NoiseProfile, settings: &FilterSettings) -> Vec<FilterRecommendation> {
    let mut recs = Vec::new();
    let gyro = settings.gyro_lpf1_static_hz as i64;
    let dterm = settings.dterm_lpf1_static_hz as i64;
    match noise.overall_level {
        NoiseLevel::High => {
            if settings.gyro_lpf_enabled() {
                recs.extend(recommendation(
                    FilterSetting::GyroLpf1StaticHz,
                    settings,
                    Move::Lower,
                    gyro - GYRO_LPF_STEP_HZ as i64,
                    "High noise floor: lower the gyro lowpass cutoff for more filtering".to_string(),
                    Impact::Stability,
                    Confidence::Medium,
                ));
            }
            if settings.dterm_lpf_enabled() {
                recs.extend(recommendation(
                    FilterSetting::DtermLpf1StaticHz,
                    settings,
                    Move::Lower,
                    dterm - DTERM_LPF_STEP_HZ as i64,
                    "High noise floor: lower the D-term lowpass cutoff to keep motors cool".to_string(),
                    Impact::Stability,
                    Confidence::Medium,
                ));
            }
        }
        NoiseLevel::Low => {
            if settings.gyro_lpf_enabled() {
                recs.extend(recommendation(
                    FilterSetting::GyroLpf1StaticHz,
                    settings,
                    Move::Raise,
                    gyro + GYRO_LPF_STEP_HZ as i64,
                    "Low noise floor: raise the gyro lowpass cutoff to reduce filter delay".to_string(),
                    Impact::Response,
                    Confidence::Medium,
                ));
            }
            if settings.dterm_lpf_enabled() {
                recs.extend(recommendation(
                    FilterSetting::DtermLpf1StaticHz,
                    settings,
                    Move::Raise,
                    dterm + DTERM_LPF_STEP_HZ as i64,
                    "Low noise floor: raise the D-term lowpass cutoff to reduce filter delay".to_string(),
                    Impact::Response,
                    Confidence::Medium,
                ));
            }
        }
        NoiseLevel::Medium => {}
    }
    recs
}

fn resonance_pass(peaks: &[&NoisePeak], settings: &FilterSettings) -> Vec<FilterRecommendation> {
    let mut recs = Vec::new();
    let Some(lowest) = peaks.first() else {
        return recs;
    };
    let target = lowest.frequency_hz.round() as i64 - RESONANCE_CUTOFF_MARGIN_HZ as i64;

    for setting in [FilterSetting::GyroLpf1StaticHz, FilterSetting::DtermLpf1StaticHz] {
        let cutoff = setting.current_value(settings);
        if cutoff == 0 || lowest.frequency_hz < cutoff as f64 {
            let label = match setting {
                FilterSetting::GyroLpf1StaticHz => "gyro",
                _ => "D-term",
            };
            recs.extend(recommendation(
                setting,
                settings,
                Move::Lower,
                target,
                format!(
                    "{} at {:.0} Hz ({:.1} dB) passes the {} lowpass; move the cutoff below it",
                    capitalize(lowest.kind.description()),
                    lowest.frequency_hz,
                    lowest.amplitude_db,
                    label
                ),
                Impact::Stability,
                Confidence::High,
            ));
        }
    }
    recs
}

fn dynamic_notch_pass(peaks: &[&NoisePeak], settings: &FilterSettings) -> Vec<FilterRecommendation> {
    let mut recs = Vec::new();
    if let Some(lowest) = peaks.first() {
        if lowest.frequency_hz < settings.dyn_notch_min_hz as f64 {
            recs.extend(recommendation(
                FilterSetting::DynNotchMinHz,
                settings,
                Move::Lower,
                lowest.frequency_hz.round() as i64 - DYN_NOTCH_MARGIN_HZ as i64,
                format!(
                    "Peak at {:.0} Hz is below the dynamic notch range; lower its minimum",
                    lowest.frequency_hz
                ),
                Impact::Stability,
                Confidence::Medium,
            ));
        }
    }
    if let Some(highest) = peaks.last() {
        if highest.frequency_hz > settings.dyn_notch_max_hz as f64 {
            recs.extend(recommendation(
                FilterSetting::DynNotchMaxHz,
                settings,
                Move::Raise,
                highest.frequency_hz.round() as i64 + DYN_NOTCH_MARGIN_HZ as i64,
                format!(
                    "Peak at {:.0} Hz is above the dynamic notch range; raise its maximum",
                    highest.frequency_hz
                ),
                Impact::Stability,
                Confidence::Medium,
            ));
        }
    }
    recs
}

/// Keeps one recommendation per setting, in first-appearance order.
///
/// Lowpass cutoffs and the notch minimum keep the lower value, the notch maximum the
/// higher one. The kept entry is high confidence if either contributor was.
pub fn deduplicate(recommendations: Vec<FilterRecommendation>) -> Vec<FilterRecommendation> {
    let mut merged: Vec<FilterRecommendation> = Vec::new();
    let mut index: HashMap<FilterSetting, usize> = HashMap::new();
    for rec in recommendations {
        match index.get(&rec.setting) {
            Some(&i) => {
                let any_high =
                    merged[i].confidence == Confidence::High || rec.confidence == Confidence::High;
                if rec
                    .setting
                    .prefers(rec.recommended_value, merged[i].recommended_value)
                {
                    merged[i] = rec;
                }
                if any_high {
                    merged[i].confidence = Confidence::High;
                }
            }
            None => {
                index.insert(rec.setting, merged.len());
                merged.push(rec);
            }
        }
    }
    merged
}

/// Filter changes for the measured noise. Defaults are assumed when settings are unknown.
pub fn recommend(
    noise: &NoiseProfile,
    current: Option<&FilterSettings>,
) -> Vec<FilterRecommendation> {
    let settings = current.copied().unwrap_or_default();
    let peaks = significant_peaks(noise);

    let mut all = noise_floor_pass(noise, &settings);
    all.extend(resonance_pass(&peaks, &settings));
    all.extend(dynamic_notch_pass(&peaks, &settings));

    let recs = deduplicate(all);
    debug!(
        "Filter recommender: {} significant peak(s), {} change(s)",
        peaks.len(),
        recs.len()
    );
    recs
}

/// Narrative of the noise situation and the proposed filter changes.
pub fn generate_summary(noise: &NoiseProfile, recommendations: &[FilterRecommendation]) -> String {
    let mut summary = format!("Noise level is {}.", noise.overall_level);

    let peaks = significant_peaks(noise);
    if !peaks.is_empty() {
        let listed: Vec<String> = peaks
            .iter()
            .map(|p| format!("{} at {:.0} Hz", p.kind.description(), p.frequency_hz))
            .collect();
        summary.push_str(&format!(" Detected {}.", listed.join(", ")));
    }

    if recommendations.is_empty() {
        summary.push_str(" Current filter settings look appropriate.");
    } else {
        summary.push_str(&format!(
            " {} filter change(s) recommended.",
            recommendations.len()
        ));
    }
    summary
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
