// src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{info, warn, Level};

use BlackBox_Tune_Advisor::crate_version;
use BlackBox_Tune_Advisor::data_input::filter_settings::parse_filter_settings;
use BlackBox_Tune_Advisor::data_input::flight_data::BlackboxFlightData;
use BlackBox_Tune_Advisor::data_input::log_parser::parse_log_file;
use BlackBox_Tune_Advisor::data_input::noise_profile::load_noise_profile;
use BlackBox_Tune_Advisor::data_input::pid_metadata::parse_pid_metadata;
use BlackBox_Tune_Advisor::data_input::settings::TuningSettings;
use BlackBox_Tune_Advisor::report::{format_console_report, to_json};
use BlackBox_Tune_Advisor::tuning_analysis::{AnalysisOptions, TuningAnalysis};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "BlackBox_Tune_Advisor")]
#[command(about = "Step-response and filter tuning advice from Betaflight blackbox CSV logs")]
#[command(version = crate_version())]
struct Args {
    /// Blackbox CSV log (as written by blackbox_decode)
    input: PathBuf,

    /// Pre-computed gyro noise profile (JSON); enables filter recommendations
    #[arg(long)]
    noise_profile: Option<PathBuf>,

    /// JSON file overriding the PID and filter settings found in the log header
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Include per-step setpoint/gyro traces in JSON output
    #[arg(long)]
    traces: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let parsed = parse_log_file(&args.input)
        .with_context(|| format!("failed to parse log {:?}", args.input))?;
    let flight = BlackboxFlightData::from_parsed_log(&parsed)
        .with_context(|| format!("log {:?} has no usable flight data", args.input))?;

    let pid_metadata = parse_pid_metadata(&parsed.header_metadata);
    if !pid_metadata.has_pids() {
        warn!("No PID values in log header, assuming firmware defaults");
    }
    let header_filters = parse_filter_settings(&parsed.header_metadata);

    let settings = match &args.settings {
        Some(path) => TuningSettings::load(path)
            .with_context(|| format!("failed to read settings {:?}", path))?,
        None => TuningSettings::default(),
    };
    let pids = settings.resolve_pids(pid_metadata.to_configuration());
    let filters = settings.resolve_filters(header_filters);

    let noise = match &args.noise_profile {
        Some(path) => Some(
            load_noise_profile(path)
                .with_context(|| format!("failed to read noise profile {:?}", path))?,
        ),
        None => {
            info!("No noise profile given, skipping filter recommendations");
            None
        }
    };

    let options = AnalysisOptions {
        include_traces: args.traces && args.format == OutputFormat::Json,
    };
    let analysis =
        TuningAnalysis::analyze_with_options(&flight, &pids, noise.as_ref(), filters.as_ref(), options);

    match args.format {
        OutputFormat::Text => {
            let source_name = args
                .input
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| args.input.display().to_string());
            println!(
                "{}",
                format_console_report(&analysis, &source_name, pid_metadata.firmware_type)
            );
        }
        OutputFormat::Json => println!("{}", to_json(&analysis)?),
    }

    Ok(())
}
