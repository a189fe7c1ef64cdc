// src/data_analysis/step_detector.rs

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use tracing::debug;

use crate::axis_names::{axis_name, AXIS_COUNT};
use crate::constants::{
    STEP_COOLDOWN_MS, STEP_DERIVATIVE_THRESHOLD, STEP_EDGE_CONTINUATION_RATIO,
    STEP_HOLD_MS, STEP_HOLD_TOLERANCE_RATIO, STEP_MIN_MAGNITUDE_DEG_S, STEP_RESPONSE_WINDOW_MS,
};
use crate::data_analysis::derivative::{forward_derivative, ms_to_samples};
use crate::data_input::flight_data::BlackboxFlightData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepDirection {
    Up,
    Down,
}

impl StepDirection {
    pub fn from_magnitude(magnitude: f64) -> Self {
        if magnitude < 0.0 {
            StepDirection::Down
        } else {
            StepDirection::Up
        }
    }

    /// +1.0 for an upward step, -1.0 for a downward one.
    pub fn sign(&self) -> f64 {
        match self {
            StepDirection::Up => 1.0,
            StepDirection::Down => -1.0,
        }
    }
}

impl fmt::Display for StepDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepDirection::Up => f.write_str("up"),
            StepDirection::Down => f.write_str("down"),
        }
    }
}

/// A sharp, held change in commanded rate on one axis.
///
/// `start_index` is the first sample of the edge; `end_index` is the exclusive end of the
/// response-analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    pub axis: usize,
    pub start_index: usize,
    pub end_index: usize,
    /// Signed setpoint change in deg/s.
    pub magnitude: f64,
    pub direction: StepDirection,
}

impl StepEvent {
    pub fn new(axis: usize, start_index: usize, end_index: usize, magnitude: f64) -> Self {
        Self {
            axis,
            start_index,
            end_index,
            magnitude,
            direction: StepDirection::from_magnitude(magnitude),
        }
    }

    pub fn len(&self) -> usize {
        self.end_index.saturating_sub(self.start_index)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Detects step inputs on the roll, pitch and yaw setpoints.
///
/// Events are ordered by descending absolute magnitude; equal magnitudes keep axis order,
/// then time order.
pub fn detect_steps(flight: &BlackboxFlightData) -> Vec<StepEvent> {
    let mut steps: Vec<StepEvent> = Vec::new();
    for axis in 0..AXIS_COUNT {
        let axis_steps = detect_axis_steps(axis, flight);
        debug!("{}: {} step(s) detected", axis_name(axis), axis_steps.len());
        steps.extend(axis_steps);
    }

    steps.sort_by(|a, b| {
        b.magnitude
            .abs()
            .partial_cmp(&a.magnitude.abs())
            .unwrap_or(Ordering::Equal)
    });
    steps
}

fn detect_axis_steps(axis: usize, flight: &BlackboxFlightData) -> Vec<StepEvent> {
    let sample_rate = flight.sample_rate_hz;
    let setpoint = flight.setpoint[axis].values();
    let n = setpoint.len();
    let derivative = forward_derivative(setpoint, sample_rate);
    if derivative.is_empty() {
        return Vec::new();
    }

    let cooldown = ms_to_samples(STEP_COOLDOWN_MS, sample_rate);
    let hold = ms_to_samples(STEP_HOLD_MS, sample_rate);
    let window = ms_to_samples(STEP_RESPONSE_WINDOW_MS, sample_rate);
    let continuation = STEP_DERIVATIVE_THRESHOLD * STEP_EDGE_CONTINUATION_RATIO;

    let mut events = Vec::new();
    let mut last_window_end: Option<usize> = None;
    let mut i = 0;
    while i < derivative.len() {
        if derivative[i].abs() < STEP_DERIVATIVE_THRESHOLD {
            i += 1;
            continue;
        }

        // Extend the edge while the derivative keeps its sign and most of its steepness.
        let edge_start = i;
        let sign = derivative[i].signum();
        let mut edge_end = i;
        while edge_end + 1 < derivative.len()
            && derivative[edge_end + 1].signum() == sign
            && derivative[edge_end + 1].abs() >= continuation
        {
            edge_end += 1;
        }
        i = edge_end + 1;

        // derivative[k] spans setpoint[k]..setpoint[k + 1], so the edge settles at edge_end + 1.
        let settled_index = edge_end + 1;
        let magnitude = setpoint[settled_index] - setpoint[edge_start];
        if magnitude.abs() < STEP_MIN_MAGNITUDE_DEG_S {
            continue;
        }

        if let Some(last_end) = last_window_end {
            if edge_start < last_end + cooldown {
                continue;
            }
        }

        if !holds_new_setpoint(setpoint.as_slice(), settled_index, hold, magnitude) {
            continue;
        }

        let end_index = (edge_start + window).min(n);
        events.push(StepEvent::new(axis, edge_start, end_index, magnitude));
        last_window_end = Some(end_index);
    }
    events
}

/// The setpoint must stay near its new value for the hold period after the edge.
/// A hold period running past the end of the data is accepted.
fn holds_new_setpoint(
    setpoint: Option<&[f64]>,
    settled_index: usize,
    hold: usize,
    magnitude: f64,
) -> bool {
    let Some(setpoint) = setpoint else {
        return true;
    };
    let hold_end = settled_index + hold;
    if hold_end > setpoint.len() {
        return true;
    }
    let new_value = setpoint[settled_index];
    let tolerance = magnitude.abs() * STEP_HOLD_TOLERANCE_RATIO;
    setpoint[settled_index..hold_end]
        .iter()
        .all(|&v| (v - new_value).abs() <= tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: f64 = 1000.0;

    fn flight_with_setpoints(roll: Vec<f64>, pitch: Vec<f64>, yaw: Vec<f64>) -> BlackboxFlightData {
        let n = roll.len();
        BlackboxFlightData::from_axis_samples(
            RATE,
            [roll, pitch, yaw],
            [vec![0.0; n], vec![0.0; n], vec![0.0; n]],
        )
        .unwrap()
    }

    fn step_signal(n: usize, at: usize, from: f64, to: f64) -> Vec<f64> {
        (0..n).map(|i| if i < at { from } else { to }).collect()
    }

    #[test]
    fn test_constant_setpoint_has_no_steps() {
        let flight = flight_with_setpoints(vec![50.0; 1000], vec![0.0; 1000], vec![-20.0; 1000]);
        assert!(detect_steps(&flight).is_empty());
    }

    #[test]
    fn test_too_short_has_no_steps() {
        let flight = flight_with_setpoints(vec![0.0], vec![0.0], vec![0.0]);
        assert!(detect_steps(&flight).is_empty());
    }

    #[test]
    fn test_single_step_per_axis() {
        let flight = flight_with_setpoints(
            step_signal(1000, 200, 0.0, 300.0),
            step_signal(1000, 200, 0.0, -400.0),
            step_signal(1000, 200, 0.0, 200.0),
        );
        let steps = detect_steps(&flight);
        assert_eq!(steps.len(), 3);

        // Sorted by descending |magnitude|: pitch, roll, yaw.
        assert_eq!(steps[0].axis, 1);
        assert_eq!(steps[0].direction, StepDirection::Down);
        assert!((steps[0].magnitude + 400.0).abs() < 1e-9);
        assert_eq!(steps[1].axis, 0);
        assert_eq!(steps[1].direction, StepDirection::Up);
        assert_eq!(steps[2].axis, 2);

        for step in &steps {
            assert_eq!(step.start_index, 199);
            assert_eq!(step.end_index, 199 + 300);
        }
    }

    #[test]
    fn test_window_clamped_to_data_end() {
        let flight = flight_with_setpoints(
            step_signal(400, 300, 0.0, 300.0),
            vec![0.0; 400],
            vec![0.0; 400],
        );
        let steps = detect_steps(&flight);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].end_index, 400);
    }

    #[test]
    fn test_steps_within_cooldown_collapse() {
        let roll: Vec<f64> = (0..1500)
            .map(|i| match i {
                i if i < 200 => 0.0,
                i if i < 300 => 300.0,
                i if i < 400 => 0.0,
                _ => 300.0,
            })
            .collect();
        let flight = flight_with_setpoints(roll, vec![0.0; 1500], vec![0.0; 1500]);
        let steps = detect_steps(&flight);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].start_index, 199);
    }

    #[test]
    fn test_separated_steps_are_both_detected() {
        let roll: Vec<f64> = (0..2000)
            .map(|i| if (200..1000).contains(&i) { 300.0 } else { 0.0 })
            .collect();
        let flight = flight_with_setpoints(roll, vec![0.0; 2000], vec![0.0; 2000]);
        let steps = detect_steps(&flight);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].direction, StepDirection::Up);
        assert_eq!(steps[1].direction, StepDirection::Down);
        assert_eq!(steps[1].start_index, 999);
    }

    #[test]
    fn test_small_and_slow_changes_are_ignored() {
        // 50 deg/s jump is below the minimum magnitude.
        let small = step_signal(1000, 200, 0.0, 50.0);
        // 300 deg/s spread over one second: derivative 300 deg/s^2 never reaches the threshold.
        let ramp: Vec<f64> = (0..1000).map(|i| i as f64 * 0.3).collect();
        let flight = flight_with_setpoints(small, ramp, vec![0.0; 1000]);
        assert!(detect_steps(&flight).is_empty());
    }

    #[test]
    fn test_step_not_held_is_rejected() {
        // A 10 ms spike: the setpoint returns to zero before the hold period ends.
        let roll: Vec<f64> = (0..1000)
            .map(|i| if (200..210).contains(&i) { 300.0 } else { 0.0 })
            .collect();
        let flight = flight_with_setpoints(roll, vec![0.0; 1000], vec![0.0; 1000]);
        let steps = detect_steps(&flight);
        // The rising edge at 199 is dropped; the falling edge back to zero is held and kept.
        assert_eq!(steps, vec![StepEvent::new(0, 209, 509, -300.0)]);
        assert_eq!(steps[0].direction, StepDirection::Down);
    }

    #[test]
    fn test_multi_sample_edge_is_one_step() {
        let roll: Vec<f64> = (0..1000)
            .map(|i| match i {
                i if i < 200 => 0.0,
                200 => 100.0,
                201 => 200.0,
                _ => 300.0,
            })
            .collect();
        let flight = flight_with_setpoints(roll, vec![0.0; 1000], vec![0.0; 1000]);
        let steps = detect_steps(&flight);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].start_index, 199);
        assert!((steps[0].magnitude - 300.0).abs() < 1e-9);
    }
}
