// src/data_input/log_parser.rs

use csv::ReaderBuilder;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::data_input::log_data::{LogRowData, MOTOR_COUNT};
use crate::error::{AnalysisError, AnalysisResult};

/// Column names looked up in the CSV header row, by target index.
const TARGET_HEADERS: [&str; 27] = [
    "time (us)",                                                  // 0
    "axisP[0]", "axisP[1]", "axisP[2]",                           // 1, 2, 3
    "axisI[0]", "axisI[1]", "axisI[2]",                           // 4, 5, 6
    "axisD[0]", "axisD[1]", "axisD[2]",                           // 7, 8, 9
    "axisF[0]", "axisF[1]", "axisF[2]",                           // 10, 11, 12
    "setpoint[0]", "setpoint[1]", "setpoint[2]", "setpoint[3]",   // 13, 14, 15, 16 (setpoint[3] is throttle)
    "gyroADC[0]", "gyroADC[1]", "gyroADC[2]",                     // 17, 18, 19
    "motor[0]", "motor[1]", "motor[2]", "motor[3]",               // 20, 21, 22, 23
    "rcCommand[0]", "rcCommand[1]", "rcCommand[2]",               // 24, 25, 26 (presence only)
];

const IDX_TIME: usize = 0;
const IDX_P: usize = 1;
const IDX_I: usize = 4;
const IDX_D: usize = 7;
const IDX_F: usize = 10;
const IDX_SETPOINT: usize = 13;
const IDX_GYRO: usize = 17;
const IDX_MOTOR: usize = 20;

/// Headers without which no step analysis is possible.
const ESSENTIAL_HEADERS: [usize; 7] = [IDX_TIME, 13, 14, 15, 17, 18, 19];

/// Everything extracted from one blackbox CSV export.
#[derive(Debug, Clone, Default)]
pub struct ParsedLog {
    /// All parsed log data rows (rows without a valid timestamp are dropped).
    pub rows: Vec<LogRowData>,
    /// Estimated sample rate in Hz, from the mean timestamp delta.
    pub sample_rate: Option<f64>,
    /// Flags indicating if axisF[0-2] headers were found.
    pub f_term_header_found: [bool; 3],
    /// Flags indicating if motor[0-3] headers were found.
    pub motor_header_found: [bool; MOTOR_COUNT],
    /// Metadata key-value pairs found before the CSV headers.
    pub header_metadata: Vec<(String, String)>,
}

/// Parses the CSV log file, extracts data, determines header presence, and calculates sample rate.
pub fn parse_log_file(input_file_path: &Path) -> AnalysisResult<ParsedLog> {
    info!("Reading blackbox log {:?}", input_file_path);
    let contents = fs::read_to_string(input_file_path)?;
    parse_log_str(&contents)
}

/// Parses an in-memory CSV export (header metadata lines followed by the column table).
pub fn parse_log_str(contents: &str) -> AnalysisResult<ParsedLog> {
    // --- Metadata Extraction ---
    let mut header_metadata: Vec<(String, String)> = Vec::new();
    let mut csv_lines: Vec<&str> = Vec::new();
    let mut found_csv_headers = false;

    for line in contents.lines() {
        let trimmed_line = line.trim();
        if trimmed_line.is_empty() {
            continue;
        }

        // The column header row contains "time" and at least one of the known data columns
        if !found_csv_headers
            && trimmed_line.contains("time")
            && (trimmed_line.contains("axisP") || trimmed_line.contains("gyroADC"))
        {
            found_csv_headers = true;
            csv_lines.push(line);
            continue;
        }

        if found_csv_headers {
            csv_lines.push(line);
        } else if let Some((key, value)) = parse_metadata_line(trimmed_line) {
            header_metadata.push((key, value));
        }
    }

    if !found_csv_headers {
        return Err(AnalysisError::NoHeaderRow);
    }
    debug!("Extracted {} metadata entries", header_metadata.len());

    let csv_content = csv_lines.join("\n");
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(csv_content.as_bytes());

    // Map target headers to CSV column indices.
    let header_record = reader.headers()?.clone();
    let header_indices: Vec<Option<usize>> = TARGET_HEADERS
        .iter()
        .enumerate()
        .map(|(i, &target_header)| {
            if i == IDX_TIME {
                // Special case for time header: check for both "time (us)" and "time"
                header_record.iter().position(|h| {
                    let trimmed = h.trim();
                    trimmed == "time (us)" || trimmed == "time"
                })
            } else {
                header_record.iter().position(|h| h.trim() == target_header)
            }
        })
        .collect();

    let missing_essentials: Vec<String> = ESSENTIAL_HEADERS
        .iter()
        .filter(|&&i| header_indices[i].is_none())
        .map(|&i| format!("'{}'", TARGET_HEADERS[i]))
        .collect();
    if !missing_essentials.is_empty() {
        return Err(AnalysisError::MissingHeaders(missing_essentials.join(", ")));
    }

    let mut f_term_header_found = [false; 3];
    for (axis, found) in f_term_header_found.iter_mut().enumerate() {
        *found = header_indices[IDX_F + axis].is_some();
    }
    let mut motor_header_found = [false; MOTOR_COUNT];
    for (motor, found) in motor_header_found.iter_mut().enumerate() {
        *found = header_indices[IDX_MOTOR + motor].is_some();
    }
    for (i, name) in TARGET_HEADERS.iter().enumerate().skip(1).take(IDX_MOTOR - 1) {
        if header_indices[i].is_none() {
            debug!("Optional header '{}' not found, defaulting to 0.0", name);
        }
    }

    // --- Data Reading and Storage ---
    let mut rows: Vec<LogRowData> = Vec::new();
    for (row_index, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping row {} due to CSV read error: {}", row_index + 1, e);
                continue;
            }
        };

        let parse_f64_by_target_idx = |target_idx: usize| -> Option<f64> {
            header_indices
                .get(target_idx)
                .and_then(|opt_csv_idx| opt_csv_idx.as_ref())
                .and_then(|&csv_idx| record.get(csv_idx))
                .and_then(|val_str| val_str.parse::<f64>().ok())
        };

        let mut current_row_data = LogRowData::default();
        match parse_f64_by_target_idx(IDX_TIME) {
            Some(t_us) => current_row_data.time_sec = Some(t_us / 1_000_000.0),
            None => {
                warn!("Skipping row {} due to missing or invalid 'time (us)'", row_index + 1);
                continue;
            }
        }

        for axis in 0..3 {
            current_row_data.p_term[axis] = parse_f64_by_target_idx(IDX_P + axis);
            current_row_data.i_term[axis] = parse_f64_by_target_idx(IDX_I + axis);
            current_row_data.d_term[axis] = parse_f64_by_target_idx(IDX_D + axis);
            current_row_data.f_term[axis] = parse_f64_by_target_idx(IDX_F + axis);
            current_row_data.gyro[axis] = parse_f64_by_target_idx(IDX_GYRO + axis);
        }
        for axis in 0..4 {
            current_row_data.setpoint[axis] = parse_f64_by_target_idx(IDX_SETPOINT + axis);
        }
        for motor in 0..MOTOR_COUNT {
            current_row_data.motor[motor] = parse_f64_by_target_idx(IDX_MOTOR + motor);
        }

        rows.push(current_row_data);
    }
    info!("Finished reading {} data rows", rows.len());

    let sample_rate = estimate_sample_rate(&rows);
    match sample_rate {
        Some(rate) => info!("Estimated sample rate: {:.2} Hz", rate),
        None => warn!(
            "Could not determine sample rate (need >= 2 data points with distinct timestamps)"
        ),
    }

    Ok(ParsedLog {
        rows,
        sample_rate,
        f_term_header_found,
        motor_header_found,
        header_metadata,
    })
}

/// Parses a `"key","value"` metadata line written by blackbox_decode before the data table.
fn parse_metadata_line(line: &str) -> Option<(String, String)> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    let record = rdr.records().next()?.ok()?;
    if record.len() < 2 {
        return None;
    }
    let key = record.get(0)?.trim().trim_matches('"').to_string();
    // Values such as "45,80,40" are quoted; join any unquoted tail back together.
    let value = record
        .iter()
        .skip(1)
        .map(|v| v.trim().trim_matches('"'))
        .collect::<Vec<_>>()
        .join(",");
    if key.is_empty() {
        None
    } else {
        Some((key, value))
    }
}

/// Mean sample rate from consecutive timestamp deltas, ignoring duplicates.
fn estimate_sample_rate(rows: &[LogRowData]) -> Option<f64> {
    let mut total_delta = 0.0;
    let mut count = 0usize;
    let mut prev_time: Option<f64> = None;
    for current_time in rows.iter().filter_map(|row| row.time_sec) {
        if let Some(pt) = prev_time {
            let delta = current_time - pt;
            if delta > 1e-9 {
                total_delta += delta;
                count += 1;
            }
        }
        prev_time = Some(current_time);
    }
    if count == 0 {
        return None;
    }
    Some(1.0 / (total_delta / count as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_LOG: &str = "\
\"Product\",\"Blackbox flight data recorder by Nicholas Sherlock\"
\"firmware revision\",\"Betaflight 4.4.2\"
\"rollPID\",\"45,80,40\"
time (us),axisP[0],axisP[1],axisP[2],setpoint[0],setpoint[1],setpoint[2],setpoint[3],gyroADC[0],gyroADC[1],gyroADC[2],motor[0]
0,1,2,3,0,0,0,1200,0.5,0.1,0,1100
1000,1,2,3,10,0,0,1200,1.5,0.2,0,1110
2000,1,2,3,20,0,0,1200,2.5,0.3,0,1120
";

    #[test]
    fn parses_metadata_rows_and_sample_rate() {
        let parsed = parse_log_str(SAMPLE_LOG).unwrap();
        assert_eq!(parsed.rows.len(), 3);
        assert!(parsed
            .header_metadata
            .iter()
            .any(|(k, v)| k == "rollPID" && v == "45,80,40"));
        let rate = parsed.sample_rate.unwrap();
        assert!((rate - 1000.0).abs() < 1e-6);
        assert_eq!(parsed.rows[1].setpoint[0], Some(10.0));
        assert_eq!(parsed.rows[2].gyro[0], Some(2.5));
        assert_eq!(parsed.rows[0].motor[0], Some(1100.0));
        assert_eq!(parsed.rows[0].f_term[0], None);
        assert_eq!(parsed.f_term_header_found, [false; 3]);
        assert_eq!(parsed.motor_header_found, [true, false, false, false]);
    }

    #[test]
    fn missing_gyro_headers_is_an_error() {
        let log = "time (us),axisP[0],setpoint[0],setpoint[1],setpoint[2]\n0,1,2,3,4\n";
        match parse_log_str(log) {
            Err(AnalysisError::MissingHeaders(missing)) => assert!(missing.contains("gyroADC[0]")),
            other => panic!("expected MissingHeaders, got {:?}", other),
        }
    }

    #[test]
    fn no_header_row_is_an_error() {
        assert!(matches!(
            parse_log_str("\"Product\",\"x\"\n1,2,3\n"),
            Err(AnalysisError::NoHeaderRow)
        ));
    }

    #[test]
    fn rows_without_time_are_skipped() {
        let log = "time,gyroADC[0],gyroADC[1],gyroADC[2],setpoint[0],setpoint[1],setpoint[2]\n\
                   0,0,0,0,0,0,0\n\
                   x,0,0,0,0,0,0\n\
                   500,0,0,0,0,0,0\n";
        let parsed = parse_log_str(log).unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert!((parsed.sample_rate.unwrap() - 2000.0).abs() < 1e-6);
    }
}

// src/data_input/log_parser.rs
