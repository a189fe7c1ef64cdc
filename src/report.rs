// src/report.rs

use crate::axis_names::{axis_name, AXIS_COUNT};
use crate::data_input::pid_metadata::FirmwareType;
use crate::error::AnalysisResult;
use crate::tuning_analysis::TuningAnalysis;

fn banner(output: &mut String, title: &str) {
    output.push_str(&format!("\n{}\n", "=".repeat(70)));
    output.push_str(&format!("{}\n", title));
    output.push_str(&format!("{}\n", "=".repeat(70)));
}

/// Human-readable report of a tuning analysis, for the terminal.
pub fn format_console_report(
    analysis: &TuningAnalysis,
    source_name: &str,
    firmware_type: FirmwareType,
) -> String {
    let mut output = String::new();
    banner(&mut output, &format!("TUNING ANALYSIS ({})", source_name));
    output.push_str(&format!(
        "Log: {:.1} s at {:.0} Hz, {} step(s) detected\n",
        analysis.duration_seconds,
        analysis.sample_rate_hz,
        analysis.total_steps()
    ));

    output.push_str("\nCurrent PIDs:\n");
    for axis in 0..AXIS_COUNT {
        if let Some(gains) = analysis.current_pids.axis(axis) {
            output.push_str(&format!(
                "  {:<6} {}\n",
                axis_name(axis),
                gains.format_compact(firmware_type)
            ));
        }
    }

    banner(&mut output, "STEP RESPONSE");
    for (axis, profile) in analysis.profiles.iter().enumerate() {
        output.push_str(&format!("{} ({} steps):\n", axis_name(axis), profile.step_count()));
        if !profile.has_steps() {
            output.push_str("  No steps detected\n");
            continue;
        }
        output.push_str(&format!("  ├─ Overshoot:      {:.1}%\n", profile.mean_overshoot));
        output.push_str(&format!("  ├─ Rise time:      {:.1} ms\n", profile.mean_rise_time_ms));
        output.push_str(&format!("  ├─ Settling time:  {:.1} ms\n", profile.mean_settling_time_ms));
        output.push_str(&format!("  ├─ Latency:        {:.1} ms\n", profile.mean_latency_ms));
        output.push_str(&format!("  ├─ Ringing:        {:.1} cycles\n", profile.mean_ringing_count));
        output.push_str(&format!(
            "  ├─ Tracking error: {:.3} RMS\n",
            profile.mean_tracking_error_rms
        ));
        output.push_str(&format!(
            "  └─ Steady-state error: {:.1}%\n",
            profile.mean_steady_state_error
        ));
        let ff = analysis.feedforward[axis];
        if ff.classified > 0 {
            output.push_str(&format!(
                "  Overshoot driven by {}: {}/{} overshooting steps\n",
                firmware_type.ff_label(),
                ff.ff_dominated,
                ff.classified
            ));
        }
    }

    banner(&mut output, "CROSS-AXIS COUPLING");
    match &analysis.coupling {
        Some(coupling) => {
            for pair in &coupling.pairs {
                output.push_str(&format!(
                    "  {:<16} r={:.3} ({})\n",
                    pair.label(),
                    pair.correlation,
                    pair.rating
                ));
            }
            output.push_str(&format!("{}\n", coupling.summary));
        }
        None => output.push_str("Not enough steps for coupling analysis\n"),
    }

    banner(&mut output, "PID RECOMMENDATIONS");
    output.push_str(&format!("{}\n", analysis.pid_summary));
    for rec in &analysis.pid_recommendations {
        output.push_str(&format!(
            "  set {} = {}  (was {}, {} confidence, {})\n    {}\n",
            rec.setting,
            rec.recommended_value,
            rec.current_value,
            rec.confidence,
            rec.impact,
            rec.reason
        ));
    }

    if let Some(filter_summary) = &analysis.filter_summary {
        banner(&mut output, "FILTER RECOMMENDATIONS");
        output.push_str(&format!("{}\n", filter_summary));
        for rec in &analysis.filter_recommendations {
            output.push_str(&format!(
                "  set {} = {}  (was {}, {} confidence, {})\n    {}\n",
                rec.setting,
                rec.recommended_value,
                rec.current_value,
                rec.confidence,
                rec.impact,
                rec.reason
            ));
        }
    }

    output.push_str(&format!("{}\n", "=".repeat(70)));
    output
}

/// Pretty-printed JSON of the full analysis.
pub fn to_json(analysis: &TuningAnalysis) -> AnalysisResult<String> {
    Ok(serde_json::to_string_pretty(analysis)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_input::flight_data::BlackboxFlightData;
    use crate::data_input::pid_metadata::PidConfiguration;

    fn flat_analysis() -> TuningAnalysis {
        let flight = BlackboxFlightData::from_axis_samples(
            1000.0,
            [vec![0.0; 100], vec![0.0; 100], vec![0.0; 100]],
            [vec![0.0; 100], vec![0.0; 100], vec![0.0; 100]],
        )
        .unwrap();
        TuningAnalysis::analyze(&flight, &PidConfiguration::default(), None, None)
    }

    #[test]
    fn test_console_report_sections() {
        let text = format_console_report(&flat_analysis(), "flat.csv", FirmwareType::Betaflight);
        assert!(text.contains("TUNING ANALYSIS (flat.csv)"));
        assert!(text.contains("Roll   P:45 I:80 D:40 FF:120"));
        assert!(text.contains("No steps detected"));
        assert!(text.contains("Not enough steps for coupling analysis"));
        assert!(text.contains("No step inputs detected"));
        assert!(!text.contains("FILTER RECOMMENDATIONS"));
    }

    #[test]
    fn test_json_report() {
        let json = to_json(&flat_analysis()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["steps"].as_array().unwrap().len(), 0);
        assert!(value["coupling"].is_null());
        assert_eq!(value["current_pids"]["roll"]["p"], 45);
        assert!(value["filter_summary"].is_null());
    }
}
