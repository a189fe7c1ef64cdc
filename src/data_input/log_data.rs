// src/data_input/log_data.rs

/// Number of motor outputs read from the log (quad).
pub const MOTOR_COUNT: usize = 4;

/// Structure to hold data parsed from a single row of the CSV log.
/// Uses `Option<f64>` to handle potentially missing or unparseable values.
#[derive(Debug, Default, Clone)]
pub struct LogRowData {
    pub time_sec: Option<f64>,                 // Timestamp (in seconds).
    pub p_term: [Option<f64>; 3],              // Proportional term [Roll, Pitch, Yaw].
    pub i_term: [Option<f64>; 3],              // Integral term [Roll, Pitch, Yaw].
    pub d_term: [Option<f64>; 3],              // Derivative term [Roll, Pitch, Yaw].
    pub f_term: [Option<f64>; 3],              // Feed-Forward [Roll, Pitch, Yaw].
    pub setpoint: [Option<f64>; 4],            // Target setpoint value [Roll, Pitch, Yaw, Throttle].
    pub gyro: [Option<f64>; 3],                // Gyroscope readings (filtered) [Roll, Pitch, Yaw].
    pub motor: [Option<f64>; MOTOR_COUNT],     // Motor outputs [0..3].
}

// src/data_input/log_data.rs
