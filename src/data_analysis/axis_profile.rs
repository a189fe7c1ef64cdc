// src/data_analysis/axis_profile.rs

use serde::Serialize;

use crate::constants::DEGENERATE_OVERSHOOT_PERCENT;
use crate::data_analysis::step_metrics::StepResponse;

/// Mean step-response behaviour of one axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AxisStepProfile {
    /// Every analyzed response, degenerate ones included.
    pub responses: Vec<StepResponse>,
    pub mean_overshoot: f64,
    pub mean_rise_time_ms: f64,
    pub mean_settling_time_ms: f64,
    pub mean_latency_ms: f64,
    pub mean_tracking_error_rms: f64,
    pub mean_steady_state_error: f64,
    pub mean_ringing_count: f64,
}

impl AxisStepProfile {
    pub fn step_count(&self) -> usize {
        self.responses.len()
    }

    pub fn has_steps(&self) -> bool {
        !self.responses.is_empty()
    }
}

/// A zero rise time paired with huge overshoot comes from a mis-detected step.
fn is_degenerate(response: &StepResponse) -> bool {
    response.rise_time_ms == 0.0 && response.overshoot_percent > DEGENERATE_OVERSHOOT_PERCENT
}

/// Averages the per-step metrics of one axis.
///
/// Degenerate responses are left out of the means unless every response is degenerate.
/// An empty input gives an all-zero profile.
pub fn aggregate_axis_metrics(responses: Vec<StepResponse>) -> AxisStepProfile {
    if responses.is_empty() {
        return AxisStepProfile::default();
    }

    let valid: Vec<&StepResponse> = responses.iter().filter(|r| !is_degenerate(r)).collect();
    let included: Vec<&StepResponse> = if valid.is_empty() {
        responses.iter().collect()
    } else {
        valid
    };

    let mean_of = |metric: fn(&StepResponse) -> f64| -> f64 {
        included.iter().map(|r| metric(r)).sum::<f64>() / included.len() as f64
    };
    let tracking: Vec<f64> = included.iter().filter_map(|r| r.tracking_error_rms).collect();
    let mean_tracking_error_rms = if tracking.is_empty() {
        0.0
    } else {
        tracking.iter().sum::<f64>() / tracking.len() as f64
    };

    AxisStepProfile {
        mean_overshoot: mean_of(|r| r.overshoot_percent),
        mean_rise_time_ms: mean_of(|r| r.rise_time_ms),
        mean_settling_time_ms: mean_of(|r| r.settling_time_ms),
        mean_latency_ms: mean_of(|r| r.latency_ms),
        mean_steady_state_error: mean_of(|r| r.steady_state_error_percent),
        mean_ringing_count: mean_of(|r| r.ringing_count as f64),
        mean_tracking_error_rms,
        responses,
    }
}
