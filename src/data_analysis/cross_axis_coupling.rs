// src/data_analysis/cross_axis_coupling.rs

use ndarray::ArrayView1;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use tracing::debug;

use crate::axis_names::{axis_name, AXIS_COUNT};
use crate::constants::{
    COUPLING_MIN_SAMPLES, COUPLING_NONE_THRESHOLD, COUPLING_SIGNIFICANT_THRESHOLD,
};
use crate::data_analysis::step_detector::StepEvent;
use crate::data_input::flight_data::BlackboxFlightData;
use crate::types::round_to;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CouplingRating {
    None,
    Mild,
    Significant,
}

impl CouplingRating {
    pub fn from_correlation(correlation: f64) -> Self {
        if correlation >= COUPLING_SIGNIFICANT_THRESHOLD {
            CouplingRating::Significant
        } else if correlation < COUPLING_NONE_THRESHOLD {
            CouplingRating::None
        } else {
            CouplingRating::Mild
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CouplingRating::None => "none",
            CouplingRating::Mild => "mild",
            CouplingRating::Significant => "significant",
        }
    }
}

impl fmt::Display for CouplingRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Correlation between a stepped axis and another axis's gyro during its steps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CouplingPair {
    pub source_axis: usize,
    pub affected_axis: usize,
    /// Absolute Pearson correlation in [0, 1], rounded to 3 decimals.
    pub correlation: f64,
    pub rating: CouplingRating,
}

impl CouplingPair {
    pub fn label(&self) -> String {
        format!("{} -> {}", axis_name(self.source_axis), axis_name(self.affected_axis))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossAxisCouplingResult {
    pub pairs: Vec<CouplingPair>,
    pub has_significant_coupling: bool,
    pub summary: String,
}

/// Pearson correlation coefficient of two equally long slices.
///
/// Returns 0.0 for fewer than two samples or when either signal is constant.
pub fn pearson_correlation(x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    let mean_x = x.iter().take(n).sum::<f64>() / n as f64;
    let mean_y = y.iter().take(n).sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (&xi, &yi) in x.iter().zip(y.iter()).take(n) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom < 1e-12 {
        return 0.0;
    }
    cov / denom
}

/// |Pearson| rounded to 3 decimals; 0.0 when there are too few samples to judge.
pub fn normalized_correlation(x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
    if x.len().min(y.len()) < COUPLING_MIN_SAMPLES {
        return 0.0;
    }
    round_to(pearson_correlation(x, y).abs().min(1.0), 3)
}

/// Measures how much a commanded step on one axis disturbs the other two.
///
/// Steps with an invalid axis or window are skipped. Returns `None` when fewer than two
/// valid steps remain. All six ordered pairs are reported; a source axis without steps
/// has correlation 0.0.
pub fn analyze_cross_axis_coupling(
    steps: &[StepEvent],
    flight: &BlackboxFlightData,
) -> Option<CrossAxisCouplingResult> {
    let valid: Vec<&StepEvent> = steps
        .iter()
        .filter(|s| {
            s.axis < AXIS_COUNT
                && s.end_index > s.start_index
                && s.end_index <= flight.gyro[s.axis].len()
        })
        .collect();
    if valid.len() < 2 {
        debug!("Coupling analysis skipped: {} valid step(s)", valid.len());
        return None;
    }

    let mut pairs = Vec::new();
    for source in 0..AXIS_COUNT {
        let source_steps: Vec<&&StepEvent> = valid.iter().filter(|s| s.axis == source).collect();
        for affected in (0..AXIS_COUNT).filter(|&a| a != source) {
            let correlation = source_steps
                .iter()
                .map(|step| {
                    normalized_correlation(
                        flight.gyro[source].window(step.start_index, step.end_index),
                        flight.gyro[affected].window(step.start_index, step.end_index),
                    )
                })
                .fold(0.0, f64::max);
            pairs.push(CouplingPair {
                source_axis: source,
                affected_axis: affected,
                correlation,
                rating: CouplingRating::from_correlation(correlation),
            });
        }
    }

    let has_significant_coupling = pairs
        .iter()
        .any(|p| p.rating == CouplingRating::Significant);
    let summary = summarize(&pairs);
    debug!("Coupling: {} pair(s), significant: {}", pairs.len(), has_significant_coupling);

    Some(CrossAxisCouplingResult {
        pairs,
        has_significant_coupling,
        summary,
    })
}

fn summarize(pairs: &[CouplingPair]) -> String {
    let mut ranked: Vec<&CouplingPair> = pairs.iter().collect();
    ranked.sort_by(|a, b| {
        b.correlation
            .partial_cmp(&a.correlation)
            .unwrap_or(Ordering::Equal)
    });

    let significant: Vec<String> = ranked
        .iter()
        .filter(|p| p.rating == CouplingRating::Significant)
        .map(|p| format!("{} (r={:.3})", p.label(), p.correlation))
        .collect();
    if !significant.is_empty() {
        return format!(
            "Significant cross-axis coupling: {}. Check frame stiffness, motor and prop balance, and mixer setup.",
            significant.join(", ")
        );
    }

    match ranked.first() {
        Some(strongest) if strongest.rating == CouplingRating::Mild => format!(
            "Mild cross-axis coupling (strongest {}, r={:.3}); no action needed.",
            strongest.label(),
            strongest.correlation
        ),
        _ => "No meaningful cross-axis coupling detected.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const RATE: f64 = 1000.0;

    fn decaying(n: usize, scale: f64) -> Vec<f64> {
        (0..n).map(|i| scale * (-(i as f64) / 50.0).exp()).collect()
    }

    fn flight(gyro: [Vec<f64>; 3]) -> BlackboxFlightData {
        let n = gyro[0].len();
        BlackboxFlightData::from_axis_samples(RATE, [vec![0.0; n], vec![0.0; n], vec![0.0; n]], gyro)
            .unwrap()
    }

    #[test]
    fn test_pearson_basics() {
        let x = array![1.0, 2.0, 3.0, 4.0];
        assert!((pearson_correlation(x.view(), x.view()) - 1.0).abs() < 1e-12);
        let neg = array![4.0, 3.0, 2.0, 1.0];
        assert!((pearson_correlation(x.view(), neg.view()) + 1.0).abs() < 1e-12);
        let constant = array![2.0, 2.0, 2.0, 2.0];
        assert_eq!(pearson_correlation(x.view(), constant.view()), 0.0);
    }

    #[test]
    fn test_normalized_correlation_edge_cases() {
        let long: Vec<f64> = (0..20).map(|i| (i as f64 * 0.7).sin()).collect();
        let long = ndarray::Array1::from(long);
        assert_eq!(normalized_correlation(long.view(), long.view()), 1.0);

        let short = array![1.0, 2.0, 3.0];
        assert_eq!(normalized_correlation(short.view(), short.view()), 0.0);

        let flat = ndarray::Array1::from(vec![5.0; 20]);
        assert_eq!(normalized_correlation(long.view(), flat.view()), 0.0);

        let anti = long.mapv(|v| -v);
        assert_eq!(normalized_correlation(long.view(), anti.view()), 1.0);
    }

    #[test]
    fn test_too_few_valid_steps() {
        let f = flight([vec![0.0; 1000], vec![0.0; 1000], vec![0.0; 1000]]);
        assert!(analyze_cross_axis_coupling(&[], &f).is_none());
        let one = [StepEvent::new(0, 100, 400, 300.0)];
        assert!(analyze_cross_axis_coupling(&one, &f).is_none());
        // Invalid steps do not count.
        let mixed = [
            StepEvent::new(0, 100, 400, 300.0),
            StepEvent::new(5, 100, 400, 300.0),
            StepEvent::new(1, 400, 400, 300.0),
            StepEvent::new(1, 900, 1200, 300.0),
        ];
        assert!(analyze_cross_axis_coupling(&mixed, &f).is_none());
    }

    #[test]
    fn test_identical_responses_are_significant() {
        let mut roll = vec![0.0; 1000];
        roll[100..400].copy_from_slice(&decaying(300, 300.0));
        let mut pitch = vec![0.0; 1000];
        pitch[100..400].copy_from_slice(&decaying(300, 300.0));
        let yaw: Vec<f64> = (0..1000).map(|i| ((i * 7919) % 13) as f64).collect();
        let f = flight([roll, pitch, yaw]);

        let steps = [
            StepEvent::new(0, 100, 400, 300.0),
            StepEvent::new(0, 500, 800, -300.0),
        ];
        let result = analyze_cross_axis_coupling(&steps, &f).unwrap();
        assert_eq!(result.pairs.len(), 6);
        let roll_pitch = result.pairs[0];
        assert_eq!((roll_pitch.source_axis, roll_pitch.affected_axis), (0, 1));
        assert_eq!(roll_pitch.correlation, 1.0);
        assert_eq!(roll_pitch.rating, CouplingRating::Significant);
        assert!(result.has_significant_coupling);
        assert!(result.summary.contains("Roll -> Pitch"));

        for pair in &result.pairs {
            assert!((0.0..=1.0).contains(&pair.correlation));
            assert_eq!(pair.correlation, round_to(pair.correlation, 3));
        }
        // Pitch and yaw were never stepped.
        for pair in result.pairs.iter().filter(|p| p.source_axis != 0) {
            assert_eq!(pair.correlation, 0.0);
            assert_eq!(pair.rating, CouplingRating::None);
        }
    }

    #[test]
    fn test_every_ordered_pair_is_reported() {
        let signal: Vec<f64> = (0..1000).map(|i| (i as f64 * 0.05).sin() * 100.0).collect();
        let f = flight([signal.clone(), signal, vec![0.0; 1000]]);
        let steps = [
            StepEvent::new(0, 100, 400, 300.0),
            StepEvent::new(0, 500, 800, -300.0),
        ];
        let result = analyze_cross_axis_coupling(&steps, &f).unwrap();
        let order: Vec<(usize, usize)> = result
            .pairs
            .iter()
            .map(|p| (p.source_axis, p.affected_axis))
            .collect();
        assert_eq!(order, vec![(0, 1), (0, 2), (1, 0), (1, 2), (2, 0), (2, 1)]);
        assert_eq!(result.pairs[0].correlation, 1.0);
        assert_eq!(result.pairs[2].correlation, 0.0);
        assert_eq!(result.pairs[2].rating, CouplingRating::None);
    }

    #[test]
    fn test_uncorrelated_axes() {
        let roll: Vec<f64> = (0..1000).map(|i| (i as f64 * 0.05).sin() * 100.0).collect();
        let f = flight([roll, vec![0.0; 1000], vec![0.0; 1000]]);
        let steps = [
            StepEvent::new(0, 100, 400, 300.0),
            StepEvent::new(0, 600, 900, 300.0),
        ];
        let result = analyze_cross_axis_coupling(&steps, &f).unwrap();
        assert!(!result.has_significant_coupling);
        assert!(result.pairs.iter().all(|p| p.rating == CouplingRating::None));
        assert_eq!(result.summary, "No meaningful cross-axis coupling detected.");
    }

    #[test]
    fn test_rating_thresholds() {
        assert_eq!(CouplingRating::from_correlation(0.299), CouplingRating::None);
        assert_eq!(CouplingRating::from_correlation(0.3), CouplingRating::Mild);
        assert_eq!(CouplingRating::from_correlation(0.599), CouplingRating::Mild);
        assert_eq!(CouplingRating::from_correlation(0.6), CouplingRating::Significant);
    }
}
