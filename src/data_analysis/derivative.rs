// src/data_analysis/derivative.rs

use ndarray::{Array1, ArrayView1};

/// Forward-difference rate of change: `d[i] = (x[i + 1] - x[i]) * sample_rate`.
///
/// The result has one sample fewer than the input. Empty for fewer than two samples or a
/// non-positive / non-finite sample rate.
pub fn forward_derivative(data: ArrayView1<f64>, sample_rate: f64) -> Array1<f64> {
    if data.len() < 2 {
        return Array1::zeros(0);
    }

    // Validate sample_rate to prevent silent failures with invalid values
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Array1::zeros(0);
    }

    Array1::from_iter(data.windows(2).into_iter().map(|w| (w[1] - w[0]) * sample_rate))
}

/// Converts a duration to a whole number of samples (at least one).
pub fn ms_to_samples(duration_ms: f64, sample_rate: f64) -> usize {
    ((duration_ms / 1000.0 * sample_rate).round() as usize).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_forward_derivative() {
        let data = array![0.0, 1.0, 3.0, 3.0];
        let d = forward_derivative(data.view(), 1000.0);
        assert_eq!(d.to_vec(), vec![1000.0, 2000.0, 0.0]);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(forward_derivative(array![1.0].view(), 1000.0).is_empty());
        assert!(forward_derivative(array![1.0, 2.0].view(), 0.0).is_empty());
        assert!(forward_derivative(array![1.0, 2.0].view(), f64::NAN).is_empty());
    }

    #[test]
    fn test_ms_to_samples() {
        assert_eq!(ms_to_samples(300.0, 1000.0), 300);
        assert_eq!(ms_to_samples(50.0, 4000.0), 200);
        assert_eq!(ms_to_samples(0.1, 1000.0), 1);
    }
}
