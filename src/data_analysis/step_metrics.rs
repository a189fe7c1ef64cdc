// src/data_analysis/step_metrics.rs

use ndarray::{s, Array1, ArrayView1};
use ndarray_stats::QuantileExt;
use serde::Serialize;

use crate::constants::{
    FF_CLASSIFY_MIN_OVERSHOOT_PERCENT, FF_DOMINANCE_RATIO, LATENCY_FRACTION, MAGNITUDE_EPSILON,
    NON_MEASURABLE_TRACKING_ERROR, RINGING_BAND_FRACTION, RISE_TIME_FRACTION,
    SETTLING_TOLERANCE_FRACTION, STEADY_STATE_MIN_PROGRESS, STEADY_STATE_WINDOW_FRACTION,
};
use crate::data_analysis::step_detector::StepEvent;
use crate::data_input::flight_data::TimeSeries;
use crate::types::round_to;

/// Setpoint and gyro samples of one step window, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepTrace {
    /// Milliseconds since the start of the step.
    pub time_ms: Vec<f64>,
    pub setpoint: Vec<f64>,
    pub gyro: Vec<f64>,
}

/// Measured response of the gyro to one commanded step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResponse {
    pub step: StepEvent,
    pub rise_time_ms: f64,
    pub overshoot_percent: f64,
    pub settling_time_ms: f64,
    pub latency_ms: f64,
    pub ringing_count: u32,
    pub peak_value: f64,
    pub steady_state_value: f64,
    pub tracking_error_rms: Option<f64>,
    pub steady_state_error_percent: f64,
    /// Share of the step's control energy coming from feedforward, in [0, 1].
    /// Only set for overshooting steps.
    pub ff_contribution: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<StepTrace>,
}

impl StepResponse {
    fn empty(step: StepEvent) -> Self {
        Self {
            step,
            rise_time_ms: 0.0,
            overshoot_percent: 0.0,
            settling_time_ms: 0.0,
            latency_ms: 0.0,
            ringing_count: 0,
            peak_value: 0.0,
            steady_state_value: 0.0,
            tracking_error_rms: None,
            steady_state_error_percent: 0.0,
            ff_contribution: None,
            trace: None,
        }
    }
}

/// Measures rise, overshoot, settling, latency, ringing and tracking error for one step.
///
/// The window `[start_index, end_index)` is clamped to both series. Never fails: an empty
/// window or a near-zero magnitude yields a well-formed response with neutral metrics.
pub fn compute_step_response(
    setpoint: &TimeSeries,
    gyro: &TimeSeries,
    step: &StepEvent,
    sample_rate_hz: f64,
) -> StepResponse {
    let end = step.end_index.min(setpoint.len()).min(gyro.len());
    let start = step.start_index.min(end);
    let sp = setpoint.window(start, end);
    let g = gyro.window(start, end);
    let len = g.len();
    if len == 0 || !sample_rate_hz.is_finite() || sample_rate_hz <= 0.0 {
        return StepResponse::empty(*step);
    }

    let dt_ms = 1000.0 / sample_rate_hz;
    let window_ms = len as f64 * dt_ms;
    let tail = tail_start(len);
    let measured_steady = g.slice(s![tail..]).mean().unwrap_or(0.0);
    let magnitude = step.magnitude.abs();

    if magnitude < MAGNITUDE_EPSILON {
        let peak_value = g.max_skipnan();
        return StepResponse {
            peak_value: *peak_value,
            steady_state_value: measured_steady,
            tracking_error_rms: Some(NON_MEASURABLE_TRACKING_ERROR),
            ..StepResponse::empty(*step)
        };
    }

    let dir = step.direction.sign();
    let baseline = g[0];
    let target = sp[0] + step.magnitude;
    let steady = if dir * (measured_steady - baseline) < STEADY_STATE_MIN_PROGRESS * magnitude {
        target
    } else {
        measured_steady
    };

    // Rise time: first sample reaching 90% of the net change.
    let rise_threshold = RISE_TIME_FRACTION * dir * (steady - baseline);
    let rise_time_ms = first_crossing(g, baseline, dir, rise_threshold)
        .map_or(window_ms, |k| k as f64 * dt_ms);

    // Peak in the step direction.
    let directional: Array1<f64> = g.mapv(|v| dir * v);
    let peak_index = directional.argmax().unwrap_or(0);
    let peak_value = g[peak_index];
    let overshoot_percent = (dir * (peak_value - steady)).max(0.0) / magnitude * 100.0;

    let ringing_count = count_ringing_cycles(
        g.slice(s![peak_index..]),
        steady,
        RINGING_BAND_FRACTION * magnitude,
    );

    // Latency relative to the setpoint's own crossing of the same level.
    let latency_level = LATENCY_FRACTION * magnitude;
    let latency_ms = match first_crossing(g, baseline, dir, latency_level) {
        Some(gyro_k) => {
            let sp_k = first_crossing(sp, sp[0], dir, latency_level).unwrap_or(0);
            (gyro_k as f64 - sp_k as f64).max(0.0) * dt_ms
        }
        None => window_ms,
    };

    let settle_band = SETTLING_TOLERANCE_FRACTION * magnitude;
    let settling_time_ms = g
        .iter()
        .rposition(|&v| (v - steady).abs() > settle_band)
        .map_or(0.0, |k| (k + 1) as f64 * dt_ms);

    let normalized_error: Array1<f64> = (&g - &sp) / magnitude;
    let tracking_error_rms = normalized_error.mapv(|e| e * e).mean().unwrap_or(0.0).sqrt();
    let steady_state_error_percent =
        normalized_error.slice(s![tail..]).mean().unwrap_or(0.0) * 100.0;

    StepResponse {
        step: *step,
        rise_time_ms,
        overshoot_percent,
        settling_time_ms,
        latency_ms,
        ringing_count,
        peak_value,
        steady_state_value: steady,
        tracking_error_rms: Some(tracking_error_rms),
        steady_state_error_percent,
        ff_contribution: None,
        trace: None,
    }
}

/// Same as [`compute_step_response`], keeping the window samples for display.
pub fn compute_step_response_with_trace(
    setpoint: &TimeSeries,
    gyro: &TimeSeries,
    step: &StepEvent,
    sample_rate_hz: f64,
) -> StepResponse {
    let mut response = compute_step_response(setpoint, gyro, step, sample_rate_hz);
    let end = step.end_index.min(setpoint.len()).min(gyro.len());
    let start = step.start_index.min(end);
    if end > start && sample_rate_hz > 0.0 {
        let dt_ms = 1000.0 / sample_rate_hz;
        response.trace = Some(StepTrace {
            time_ms: (0..end - start).map(|k| k as f64 * dt_ms).collect(),
            setpoint: setpoint.window(start, end).to_vec(),
            gyro: gyro.window(start, end).to_vec(),
        });
    }
    response
}

/// Attributes the overshoot of a step to feedforward or to the PID loop.
///
/// Only overshooting steps are classified. Compares the squared energies of the F and P
/// terms over the step window; the resulting FF share is stored on the response.
/// Returns `Some(true)` when feedforward dominates, `None` when not applicable.
pub fn classify_ff_contribution(
    response: &mut StepResponse,
    pid_p: &TimeSeries,
    pid_f: &TimeSeries,
    gyro: &TimeSeries,
) -> Option<bool> {
    if response.overshoot_percent <= FF_CLASSIFY_MIN_OVERSHOOT_PERCENT {
        return None;
    }
    let (start, end) = (response.step.start_index, response.step.end_index);
    if start >= end || [pid_p.len(), pid_f.len(), gyro.len()].iter().any(|&len| end > len) {
        return None;
    }

    let energy = |series: ArrayView1<f64>| series.iter().map(|v| v * v).sum::<f64>();
    let e_p = energy(pid_p.window(start, end));
    let e_f = energy(pid_f.window(start, end));
    if e_p == 0.0 && e_f == 0.0 {
        return None;
    }

    let ff = round_to(e_f.powi(2) / (e_f.powi(2) + e_p.powi(2)), 3);
    response.ff_contribution = Some(ff);
    Some(ff > FF_DOMINANCE_RATIO)
}

fn tail_start(len: usize) -> usize {
    let tail_len = ((len as f64 * STEADY_STATE_WINDOW_FRACTION).round() as usize).clamp(1, len);
    len - tail_len
}

/// First index where the signal has moved `level` from `baseline` in direction `dir`.
fn first_crossing(signal: ArrayView1<f64>, baseline: f64, dir: f64, level: f64) -> Option<usize> {
    signal.iter().position(|&v| dir * (v - baseline) >= level)
}

/// Oscillation cycles around `steady`, counted from sign changes that leave the band.
fn count_ringing_cycles(after_peak: ArrayView1<f64>, steady: f64, band: f64) -> u32 {
    let mut last_side: Option<bool> = None;
    let mut changes = 0u32;
    for &v in after_peak.iter() {
        let deviation = v - steady;
        let side = if deviation > band {
            true
        } else if deviation < -band {
            false
        } else {
            continue;
        };
        if let Some(previous) = last_side {
            if previous != side {
                changes += 1;
            }
        }
        last_side = Some(side);
    }
    changes / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: f64 = 1000.0;

    fn step_series(n: usize, at: usize, to: f64) -> Vec<f64> {
        (0..n).map(|i| if i < at { 0.0 } else { to }).collect()
    }

    fn event(magnitude: f64) -> StepEvent {
        StepEvent::new(0, 99, 399, magnitude)
    }

    fn analyze(sp: Vec<f64>, gyro: Vec<f64>, step: &StepEvent) -> StepResponse {
        compute_step_response(
            &TimeSeries::from_values(sp, RATE),
            &TimeSeries::from_values(gyro, RATE),
            step,
            RATE,
        )
    }

    #[test]
    fn test_perfect_tracking() {
        let sp = step_series(500, 100, 300.0);
        let r = analyze(sp.clone(), sp, &event(300.0));
        assert!(r.overshoot_percent.abs() < 1e-9);
        assert!(r.tracking_error_rms.unwrap() < 1e-9);
        assert!(r.steady_state_error_percent.abs() < 1e-9);
        assert!((r.steady_state_value - 300.0).abs() < 1e-9);
        assert!((r.rise_time_ms - 1.0).abs() < 1e-9);
        assert_eq!(r.ringing_count, 0);
        assert!(r.latency_ms.abs() < 1e-9);
    }

    #[test]
    fn test_delayed_response_latency() {
        let sp = step_series(500, 100, 300.0);
        let gyro = step_series(500, 110, 300.0);
        let r = analyze(sp, gyro, &event(300.0));
        assert!((r.latency_ms - 10.0).abs() <= 2.0, "latency {}", r.latency_ms);
        assert!((r.rise_time_ms - 11.0).abs() < 1e-9);
        assert!(r.overshoot_percent.abs() < 1e-9);
    }

    #[test]
    fn test_negative_step_is_symmetric() {
        let sp = step_series(500, 100, -300.0);
        let gyro: Vec<f64> = (0..500)
            .map(|i| match i {
                i if i < 105 => 0.0,
                i if i < 120 => -360.0,
                _ => -300.0,
            })
            .collect();
        let r = analyze(sp, gyro, &event(-300.0));
        assert!((r.overshoot_percent - 20.0).abs() < 1e-9);
        assert!((r.peak_value + 360.0).abs() < 1e-9);
        assert!((r.settling_time_ms - 21.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_responsive_gyro() {
        let sp = step_series(500, 100, 300.0);
        let r = analyze(sp, vec![0.0; 500], &event(300.0));
        assert_eq!(r.overshoot_percent, 0.0);
        assert!((r.steady_state_value - 300.0).abs() < 1e-9);
        assert!((r.rise_time_ms - 300.0).abs() < 1e-9);
        assert!((r.latency_ms - 300.0).abs() < 1e-9);
        assert!(r.tracking_error_rms.unwrap() > 0.9);
    }

    #[test]
    fn test_ringing_counts_cycles() {
        let sp = step_series(500, 100, 100.0);
        // Oscillates +-30 around 100 for 4 half periods of 10 samples after the edge.
        let gyro: Vec<f64> = (0..500)
            .map(|i| match i {
                i if i < 100 => 0.0,
                i if i < 110 => 130.0,
                i if i < 120 => 70.0,
                i if i < 130 => 130.0,
                i if i < 140 => 70.0,
                i if i < 150 => 130.0,
                _ => 100.0,
            })
            .collect();
        let r = analyze(sp, gyro, &event(100.0));
        assert_eq!(r.ringing_count, 2);
        assert!((r.overshoot_percent - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_near_zero_magnitude() {
        let sp = vec![0.0; 500];
        let r = analyze(sp.clone(), sp, &event(0.0));
        assert_eq!(r.tracking_error_rms, Some(NON_MEASURABLE_TRACKING_ERROR));
        assert_eq!(r.steady_state_error_percent, 0.0);
        assert_eq!(r.overshoot_percent, 0.0);
    }

    #[test]
    fn test_window_out_of_range_is_empty() {
        let sp = vec![0.0; 50];
        let r = analyze(sp.clone(), sp, &event(300.0));
        assert_eq!(r.tracking_error_rms, None);
        assert_eq!(r.rise_time_ms, 0.0);
    }

    #[test]
    fn test_trace_matches_window() {
        let sp = step_series(500, 100, 300.0);
        let sp_series = TimeSeries::from_values(sp.clone(), RATE);
        let r = compute_step_response_with_trace(&sp_series, &sp_series, &event(300.0), RATE);
        let trace = r.trace.unwrap();
        assert_eq!(trace.time_ms.len(), 300);
        assert_eq!(trace.setpoint[1], 300.0);
        assert!((trace.time_ms[2] - 2.0).abs() < 1e-12);
    }

    fn overshooting_response() -> StepResponse {
        let mut r = StepResponse::empty(event(300.0));
        r.overshoot_percent = 30.0;
        r
    }

    #[test]
    fn test_ff_classification() {
        let gyro = TimeSeries::zeros(500, RATE);
        let p = TimeSeries::from_values(vec![1.0; 500], RATE);
        let f = TimeSeries::from_values(vec![2.0; 500], RATE);

        let mut r = overshooting_response();
        assert_eq!(classify_ff_contribution(&mut r, &p, &f, &gyro), Some(true));
        // E_F = 4 * E_P, so the share is 16 / 17.
        assert_eq!(r.ff_contribution, Some(0.941));

        let mut r = overshooting_response();
        assert_eq!(classify_ff_contribution(&mut r, &f, &p, &gyro), Some(false));
        assert_eq!(r.ff_contribution, Some(0.059));
    }

    #[test]
    fn test_ff_tie_is_pid_dominant() {
        let gyro = TimeSeries::zeros(500, RATE);
        let p = TimeSeries::from_values(vec![1.0; 500], RATE);
        let mut r = overshooting_response();
        assert_eq!(classify_ff_contribution(&mut r, &p, &p, &gyro), Some(false));
        assert_eq!(r.ff_contribution, Some(0.5));
    }

    #[test]
    fn test_ff_not_applicable() {
        let gyro = TimeSeries::zeros(500, RATE);
        let zeros = TimeSeries::zeros(500, RATE);
        let ones = TimeSeries::from_values(vec![1.0; 500], RATE);

        let mut low = StepResponse::empty(event(300.0));
        low.overshoot_percent = 10.0;
        assert_eq!(classify_ff_contribution(&mut low, &ones, &ones, &gyro), None);
        assert_eq!(low.ff_contribution, None);

        let mut r = overshooting_response();
        assert_eq!(classify_ff_contribution(&mut r, &zeros, &zeros, &gyro), None);

        let short = TimeSeries::zeros(100, RATE);
        let mut r = overshooting_response();
        assert_eq!(classify_ff_contribution(&mut r, &ones, &ones, &short), None);
    }
}
