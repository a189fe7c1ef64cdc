// src/constants.rs

// --- Step Detection ---
// Setpoint derivative (deg/s per second) that marks the start of a commanded edge.
pub const STEP_DERIVATIVE_THRESHOLD: f64 = 2000.0;
// An edge keeps extending while the derivative stays at this fraction of the threshold.
pub const STEP_EDGE_CONTINUATION_RATIO: f64 = 0.3;
// Smallest setpoint change (deg/s) accepted as a step.
pub const STEP_MIN_MAGNITUDE_DEG_S: f64 = 100.0;
// Time after the previous response window during which new edges are ignored.
pub const STEP_COOLDOWN_MS: f64 = 100.0;
// The new setpoint must be held this long after the edge.
pub const STEP_HOLD_MS: f64 = 50.0;
// Allowed deviation from the new setpoint during the hold, as a fraction of the magnitude.
pub const STEP_HOLD_TOLERANCE_RATIO: f64 = 0.5;
// Length of the response-analysis window following the edge.
pub const STEP_RESPONSE_WINDOW_MS: f64 = 300.0;

// --- Step Response Metrics ---
pub const RISE_TIME_FRACTION: f64 = 0.9; // Rise time target (90% of net change)
pub const LATENCY_FRACTION: f64 = 0.1; // Crossing used to measure pure delay
pub const SETTLING_TOLERANCE_FRACTION: f64 = 0.05; // Settling band, fraction of |magnitude|
pub const RINGING_BAND_FRACTION: f64 = 0.05; // Hysteresis band for ringing sign changes
pub const STEADY_STATE_WINDOW_FRACTION: f64 = 0.2; // Tail of the window treated as the hold phase
// Below this progress toward the target, steady state falls back to the setpoint target.
pub const STEADY_STATE_MIN_PROGRESS: f64 = 0.1;
// Magnitudes below this are treated as non-measurable.
pub const MAGNITUDE_EPSILON: f64 = 1e-6;
// Sentinel tracking error for non-measurable steps.
pub const NON_MEASURABLE_TRACKING_ERROR: f64 = 1.0;

// --- Feedforward Attribution ---
pub const FF_CLASSIFY_MIN_OVERSHOOT_PERCENT: f64 = 15.0;
pub const FF_DOMINANCE_RATIO: f64 = 0.5;

// --- Axis Aggregation ---
// A response with zero rise time and overshoot beyond this is a detection artifact.
pub const DEGENERATE_OVERSHOOT_PERCENT: f64 = 500.0;

// --- Cross-Axis Coupling ---
pub const COUPLING_MIN_SAMPLES: usize = 10;
pub const COUPLING_NONE_THRESHOLD: f64 = 0.3;
pub const COUPLING_SIGNIFICANT_THRESHOLD: f64 = 0.6;

// --- PID Recommendation ---
pub const OVERSHOOT_IDEAL_MAX_PERCENT: f64 = 10.0;
pub const OVERSHOOT_SEVERE_PERCENT: f64 = 25.0;
pub const SLUGGISH_RISE_TIME_MS: f64 = 80.0;
pub const YAW_THRESHOLD_SCALE: f64 = 1.5; // Yaw overshoot bounds are relaxed by this factor
pub const YAW_SLUGGISH_RISE_TIME_MS: f64 = 120.0;
pub const RINGING_MAX_CYCLES: f64 = 2.0;
pub const SETTLING_MAX_MS: f64 = 200.0;
pub const PID_GAIN_STEP: u32 = 5;
// D is considered "already high" above this fraction of D_MAX.
pub const D_HIGH_FRACTION: f64 = 0.6;
pub const P_GAIN_MIN: u32 = 20;
pub const P_GAIN_MAX: u32 = 120;
pub const D_GAIN_MIN: u32 = 15;
pub const D_GAIN_MAX: u32 = 80;

// --- Betaflight 4.4 PID defaults (used when the log header carries no PIDs) ---
pub const DEFAULT_PID_ROLL: [u32; 4] = [45, 80, 40, 120];
pub const DEFAULT_PID_PITCH: [u32; 4] = [47, 84, 46, 125];
pub const DEFAULT_PID_YAW: [u32; 4] = [45, 80, 0, 120];

// --- Filter Recommendation ---
pub const DEFAULT_GYRO_LPF1_HZ: u32 = 250;
pub const DEFAULT_DTERM_LPF1_HZ: u32 = 75;
pub const DEFAULT_DYN_NOTCH_MIN_HZ: u32 = 100;
pub const DEFAULT_DYN_NOTCH_MAX_HZ: u32 = 600;
pub const GYRO_LPF_STEP_HZ: u32 = 50;
pub const DTERM_LPF_STEP_HZ: u32 = 25;
pub const GYRO_LPF_MIN_HZ: u32 = 100;
pub const GYRO_LPF_MAX_HZ: u32 = 500;
pub const DTERM_LPF_MIN_HZ: u32 = 50;
pub const DTERM_LPF_MAX_HZ: u32 = 300;
pub const DYN_NOTCH_MIN_LIMIT_HZ: u32 = 50;
pub const DYN_NOTCH_MAX_LIMIT_HZ: u32 = 1000;
// Peak prominence above the axis noise floor (dB) that calls for filter action.
pub const PEAK_ACTION_THRESHOLD_DB: f64 = 12.0;
pub const RESONANCE_CUTOFF_MARGIN_HZ: u32 = 20;
pub const DYN_NOTCH_MARGIN_HZ: u32 = 20;

// src/constants.rs
