// src/data_analysis/pid_recommender.rs

use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::axis_names::{axis_key, axis_name, AXIS_COUNT, YAW_AXIS};
use crate::constants::{
    D_GAIN_MAX, D_GAIN_MIN, D_HIGH_FRACTION, OVERSHOOT_IDEAL_MAX_PERCENT,
    OVERSHOOT_SEVERE_PERCENT, PID_GAIN_STEP, P_GAIN_MAX, P_GAIN_MIN, RINGING_MAX_CYCLES,
    SETTLING_MAX_MS, SLUGGISH_RISE_TIME_MS, YAW_SLUGGISH_RISE_TIME_MS, YAW_THRESHOLD_SCALE,
};
use crate::data_analysis::axis_profile::AxisStepProfile;
use crate::data_input::pid_metadata::PidConfiguration;
use crate::types::{Confidence, Impact};

/// PID gain that a recommendation changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PidSetting {
    P(usize),
    D(usize),
}

impl PidSetting {
    pub fn axis(&self) -> usize {
        match self {
            PidSetting::P(axis) | PidSetting::D(axis) => *axis,
        }
    }

    fn term(&self) -> &'static str {
        match self {
            PidSetting::P(_) => "p",
            PidSetting::D(_) => "d",
        }
    }
}

/// Betaflight CLI name, e.g. `p_roll`, `d_pitch`.
impl fmt::Display for PidSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.term(), axis_key(self.axis()))
    }
}

impl Serialize for PidSetting {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PidRecommendation {
    pub setting: PidSetting,
    pub current_value: u32,
    pub recommended_value: u32,
    pub reason: String,
    pub impact: Impact,
    pub confidence: Confidence,
}

/// Overshoot and rise-time limits for one axis. Yaw is judged more leniently.
#[derive(Debug, Clone, Copy)]
struct AxisThresholds {
    overshoot_ideal: f64,
    overshoot_severe: f64,
    sluggish_rise_ms: f64,
}

impl AxisThresholds {
    fn for_axis(axis: usize) -> Self {
        if axis == YAW_AXIS {
            Self {
                overshoot_ideal: OVERSHOOT_IDEAL_MAX_PERCENT * YAW_THRESHOLD_SCALE,
                overshoot_severe: OVERSHOOT_SEVERE_PERCENT * YAW_THRESHOLD_SCALE,
                sluggish_rise_ms: YAW_SLUGGISH_RISE_TIME_MS,
            }
        } else {
            Self {
                overshoot_ideal: OVERSHOOT_IDEAL_MAX_PERCENT,
                overshoot_severe: OVERSHOOT_SEVERE_PERCENT,
                sluggish_rise_ms: SLUGGISH_RISE_TIME_MS,
            }
        }
    }
}

fn adjust(current: u32, increase: bool, min: u32, max: u32) -> u32 {
    let moved = if increase {
        current.saturating_add(PID_GAIN_STEP)
    } else {
        current.saturating_sub(PID_GAIN_STEP)
    };
    moved.clamp(min, max)
}

/// Ordered recommendations with at most one entry per setting.
#[derive(Default)]
struct RecommendationSet {
    ordered: Vec<PidRecommendation>,
    index: HashMap<PidSetting, usize>,
}

impl RecommendationSet {
    fn contains(&self, setting: PidSetting) -> bool {
        self.index.contains_key(&setting)
    }

    fn push(
        &mut self,
        setting: PidSetting,
        current_value: u32,
        increase: bool,
        reason: String,
        impact: Impact,
        confidence: Confidence,
    ) {
        let (min, max) = match setting {
            PidSetting::P(_) => (P_GAIN_MIN, P_GAIN_MAX),
            PidSetting::D(_) => (D_GAIN_MIN, D_GAIN_MAX),
        };
        let recommended_value = adjust(current_value, increase, min, max);
        // Clamping a gain that sits outside the safe range can reverse the move.
        let moves_as_asked = if increase {
            recommended_value > current_value
        } else {
            recommended_value < current_value
        };
        if !moves_as_asked || self.contains(setting) {
            return;
        }
        self.index.insert(setting, self.ordered.len());
        self.ordered.push(PidRecommendation {
            setting,
            current_value,
            recommended_value,
            reason,
            impact,
            confidence,
        });
    }
}

/// Turns the three axis profiles into bounded P and D adjustments.
///
/// Axes without analyzed steps produce nothing. Each setting is recommended at most once.
pub fn recommend_pid(
    roll: &AxisStepProfile,
    pitch: &AxisStepProfile,
    yaw: &AxisStepProfile,
    current: &PidConfiguration,
) -> Vec<PidRecommendation> {
    let mut set = RecommendationSet::default();
    let gains = [current.roll, current.pitch, current.yaw];

    for (axis, profile) in [roll, pitch, yaw].into_iter().enumerate() {
        if !profile.has_steps() {
            continue;
        }
        let limits = AxisThresholds::for_axis(axis);
        let name = axis_name(axis);
        let p = gains[axis].p;
        let d = gains[axis].d;
        let overshoot = profile.mean_overshoot;

        if overshoot > limits.overshoot_severe {
            set.push(
                PidSetting::D(axis),
                d,
                true,
                format!(
                    "{} overshoot is {:.1}% (severe above {:.0}%); more D damps the overshoot",
                    name, overshoot, limits.overshoot_severe
                ),
                Impact::Stability,
                Confidence::High,
            );
            if d as f64 >= D_HIGH_FRACTION * D_GAIN_MAX as f64 {
                set.push(
                    PidSetting::P(axis),
                    p,
                    false,
                    format!(
                        "{} overshoot is {:.1}% with D already high ({}); lower P to reduce the push",
                        name, overshoot, d
                    ),
                    Impact::Both,
                    Confidence::High,
                );
            }
        } else if overshoot > limits.overshoot_ideal {
            set.push(
                PidSetting::D(axis),
                d,
                true,
                format!(
                    "{} overshoot is {:.1}% (ideal at most {:.0}%); a little more D will tighten it",
                    name, overshoot, limits.overshoot_ideal
                ),
                Impact::Stability,
                Confidence::Medium,
            );
        } else if profile.mean_rise_time_ms > limits.sluggish_rise_ms {
            set.push(
                PidSetting::P(axis),
                p,
                true,
                format!(
                    "{} response is sluggish ({:.0} ms rise, target under {:.0} ms); raise P",
                    name, profile.mean_rise_time_ms, limits.sluggish_rise_ms
                ),
                Impact::Response,
                Confidence::Medium,
            );
        }

        if profile.mean_ringing_count > RINGING_MAX_CYCLES && !set.contains(PidSetting::D(axis)) {
            set.push(
                PidSetting::D(axis),
                d,
                true,
                format!(
                    "{} rings for {:.1} cycles after a step; more D settles the oscillation",
                    name, profile.mean_ringing_count
                ),
                Impact::Stability,
                Confidence::Medium,
            );
        }

        if profile.mean_settling_time_ms > SETTLING_MAX_MS
            && overshoot <= limits.overshoot_ideal
            && !set.contains(PidSetting::D(axis))
        {
            set.push(
                PidSetting::D(axis),
                d,
                true,
                format!(
                    "{} takes {:.0} ms to settle (target under {:.0} ms)",
                    name, profile.mean_settling_time_ms, SETTLING_MAX_MS
                ),
                Impact::Both,
                Confidence::Low,
            );
        }
    }

    debug!("PID recommender produced {} change(s)", set.ordered.len());
    set.ordered
}

/// One-paragraph narrative of the PID findings.
pub fn generate_pid_summary(
    profiles: [&AxisStepProfile; AXIS_COUNT],
    recommendations: &[PidRecommendation],
) -> String {
    let total_steps: usize = profiles.iter().map(|p| p.step_count()).sum();
    if total_steps == 0 {
        return "No step inputs detected. Fly sharp stick snaps on roll, pitch and yaw to analyze the PID tune."
            .to_string();
    }

    let mut issues: Vec<String> = Vec::new();
    for (axis, profile) in profiles.iter().enumerate() {
        if !profile.has_steps() {
            continue;
        }
        let limits = AxisThresholds::for_axis(axis);
        let name = axis_name(axis);
        if profile.mean_overshoot > limits.overshoot_ideal {
            issues.push(format!("{} overshoot {:.1}%", name, profile.mean_overshoot));
        } else if profile.mean_rise_time_ms > limits.sluggish_rise_ms {
            issues.push(format!("{} sluggish ({:.0} ms rise)", name, profile.mean_rise_time_ms));
        }
        if profile.mean_ringing_count > RINGING_MAX_CYCLES {
            issues.push(format!("{} ringing ({:.1} cycles)", name, profile.mean_ringing_count));
        }
        if profile.mean_settling_time_ms > SETTLING_MAX_MS {
            issues.push(format!("{} slow settling ({:.0} ms)", name, profile.mean_settling_time_ms));
        }
    }

    if recommendations.is_empty() && issues.is_empty() {
        return format!(
            "Step response looks good across {} step(s). No PID changes recommended.",
            total_steps
        );
    }
    if recommendations.is_empty() {
        return format!(
            "Analyzed {} step(s). Issues: {}. Gains are already at their limits; no PID changes recommended.",
            total_steps,
            issues.join("; ")
        );
    }
    format!(
        "Analyzed {} step(s). Issues: {}. {} PID change(s) recommended.",
        total_steps,
        issues.join("; "),
        recommendations.len()
    )
}
