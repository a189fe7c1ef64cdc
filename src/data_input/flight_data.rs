// src/data_input/flight_data.rs

use ndarray::{s, Array1, ArrayView1};
use tracing::debug;

use crate::axis_names::AXIS_COUNT;
use crate::data_input::log_data::{LogRowData, MOTOR_COUNT};
use crate::data_input::log_parser::ParsedLog;
use crate::error::{AnalysisError, AnalysisResult};
use crate::types::AxisSeries;

/// Fixed-rate sampled signal. `time` (seconds) and `values` always have the same length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    time: Array1<f64>,
    values: Array1<f64>,
}

impl TimeSeries {
    /// Builds a series from explicit timestamps and values.
    pub fn new(time: Vec<f64>, values: Vec<f64>) -> AnalysisResult<Self> {
        if time.len() != values.len() {
            return Err(AnalysisError::SeriesLengthMismatch {
                series: "values".to_string(),
                expected: time.len(),
                actual: values.len(),
            });
        }
        Ok(Self {
            time: Array1::from(time),
            values: Array1::from(values),
        })
    }

    /// Builds a series whose timestamps are `i / sample_rate_hz`.
    pub fn from_values(values: Vec<f64>, sample_rate_hz: f64) -> Self {
        let dt = if sample_rate_hz > 0.0 { 1.0 / sample_rate_hz } else { 0.0 };
        let time = Array1::from_iter((0..values.len()).map(|i| i as f64 * dt));
        Self {
            time,
            values: Array1::from(values),
        }
    }

    /// All-zero series of the given length.
    pub fn zeros(len: usize, sample_rate_hz: f64) -> Self {
        Self::from_values(vec![0.0; len], sample_rate_hz)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn time(&self) -> ArrayView1<'_, f64> {
        self.time.view()
    }

    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }

    pub fn value(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Values in `[start, end)`, clamped to the series length.
    pub fn window(&self, start: usize, end: usize) -> ArrayView1<'_, f64> {
        let end = end.min(self.len());
        let start = start.min(end);
        self.values.slice(s![start..end])
    }
}

/// Immutable per-axis flight recording as produced by the log adapter.
///
/// Axis order is Roll (0), Pitch (1), Yaw (2); `setpoint[3]` is throttle.
/// All series share one sample count and rate.
#[derive(Debug, Clone)]
pub struct BlackboxFlightData {
    pub gyro: AxisSeries,
    pub setpoint: [TimeSeries; 4],
    pub pid_p: AxisSeries,
    pub pid_i: AxisSeries,
    pub pid_d: AxisSeries,
    pub pid_f: AxisSeries,
    pub motor: Vec<TimeSeries>,
    pub sample_rate_hz: f64,
    pub duration_seconds: f64,
    pub frame_count: usize,
}

impl BlackboxFlightData {
    /// Builds the flight model from parsed CSV rows. Missing values become 0.0.
    pub fn from_parsed_log(parsed: &ParsedLog) -> AnalysisResult<Self> {
        let sample_rate_hz = parsed.sample_rate.ok_or_else(|| {
            AnalysisError::InsufficientData("sample rate could not be determined".to_string())
        })?;
        if parsed.rows.len() < 2 {
            return Err(AnalysisError::InsufficientData(format!(
                "{} data rows, need at least 2",
                parsed.rows.len()
            )));
        }

        let time: Vec<f64> = parsed
            .rows
            .iter()
            .map(|row| row.time_sec.unwrap_or_default())
            .collect();

        let gyro = axis_columns(&parsed.rows, &time, |row, axis| row.gyro[axis])?;
        let pid_p = axis_columns(&parsed.rows, &time, |row, axis| row.p_term[axis])?;
        let pid_i = axis_columns(&parsed.rows, &time, |row, axis| row.i_term[axis])?;
        let pid_d = axis_columns(&parsed.rows, &time, |row, axis| row.d_term[axis])?;
        let pid_f = axis_columns(&parsed.rows, &time, |row, axis| row.f_term[axis])?;
        let [sp_roll, sp_pitch, sp_yaw] =
            axis_columns(&parsed.rows, &time, |row, axis| row.setpoint[axis])?;
        let throttle = column(&parsed.rows, &time, |row| row.setpoint[3])?;
        let setpoint = [sp_roll, sp_pitch, sp_yaw, throttle];

        let mut motor = Vec::new();
        for m in 0..MOTOR_COUNT {
            if parsed.motor_header_found[m] {
                motor.push(column(&parsed.rows, &time, |row| row.motor[m])?);
            }
        }

        let duration_seconds = match (time.first(), time.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        };
        debug!(
            "Flight data: {} frames, {:.1} s at {:.0} Hz, {} motors",
            time.len(),
            duration_seconds,
            sample_rate_hz,
            motor.len()
        );

        Ok(Self {
            gyro,
            setpoint,
            pid_p,
            pid_i,
            pid_d,
            pid_f,
            motor,
            sample_rate_hz,
            duration_seconds,
            frame_count: time.len(),
        })
    }

    /// Builds a flight from per-axis setpoint and gyro samples; PID terms and throttle are zero.
    ///
    /// Used by synthetic analyses and tests; all six vectors must have the same length.
    pub fn from_axis_samples(
        sample_rate_hz: f64,
        setpoint: [Vec<f64>; AXIS_COUNT],
        gyro: [Vec<f64>; AXIS_COUNT],
    ) -> AnalysisResult<Self> {
        let n = setpoint[0].len();
        for (name, series) in [("setpoint", &setpoint), ("gyro", &gyro)] {
            for (axis, values) in series.iter().enumerate() {
                if values.len() != n {
                    return Err(AnalysisError::SeriesLengthMismatch {
                        series: format!("{}[{}]", name, axis),
                        expected: n,
                        actual: values.len(),
                    });
                }
            }
        }
        let [sp_roll, sp_pitch, sp_yaw] = setpoint;
        let [g_roll, g_pitch, g_yaw] = gyro;
        let zeros = || TimeSeries::zeros(n, sample_rate_hz);
        Ok(Self {
            gyro: [
                TimeSeries::from_values(g_roll, sample_rate_hz),
                TimeSeries::from_values(g_pitch, sample_rate_hz),
                TimeSeries::from_values(g_yaw, sample_rate_hz),
            ],
            setpoint: [
                TimeSeries::from_values(sp_roll, sample_rate_hz),
                TimeSeries::from_values(sp_pitch, sample_rate_hz),
                TimeSeries::from_values(sp_yaw, sample_rate_hz),
                zeros(),
            ],
            pid_p: [zeros(), zeros(), zeros()],
            pid_i: [zeros(), zeros(), zeros()],
            pid_d: [zeros(), zeros(), zeros()],
            pid_f: [zeros(), zeros(), zeros()],
            motor: Vec::new(),
            sample_rate_hz,
            duration_seconds: if sample_rate_hz > 0.0 && n > 0 {
                (n - 1) as f64 / sample_rate_hz
            } else {
                0.0
            },
            frame_count: n,
        })
    }

    /// Replaces the P and F term series of a synthetic flight.
    ///
    /// Companion to [`from_axis_samples`](Self::from_axis_samples) for synthetic analyses
    /// and tests that exercise feedforward attribution; logs carry these terms already.
    pub fn with_pid_terms(mut self, pid_p: AxisSeries, pid_f: AxisSeries) -> Self {
        self.pid_p = pid_p;
        self.pid_f = pid_f;
        self
    }

    /// Number of samples shared by every series.
    pub fn num_samples(&self) -> usize {
        self.frame_count
    }
}

fn column<F>(rows: &[LogRowData], time: &[f64], extract: F) -> AnalysisResult<TimeSeries>
where
    F: Fn(&LogRowData) -> Option<f64>,
{
    let values = rows.iter().map(|row| extract(row).unwrap_or(0.0)).collect();
    TimeSeries::new(time.to_vec(), values)
}

fn axis_columns<F>(
    rows: &[LogRowData],
    time: &[f64],
    pick: F,
) -> AnalysisResult<AxisSeries>
where
    F: Fn(&LogRowData, usize) -> Option<f64>,
{
    Ok([
        column(rows, time, |row| pick(row, 0))?,
        column(rows, time, |row| pick(row, 1))?,
        column(rows, time, |row| pick(row, 2))?,
    ])
}


// src/data_input/flight_data.rs
