// src/tuning_analysis.rs

use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::axis_names::{axis_name, AXIS_COUNT};
use crate::data_analysis::axis_profile::aggregate_axis_metrics;
use crate::data_analysis::cross_axis_coupling::{analyze_cross_axis_coupling, CrossAxisCouplingResult};
use crate::data_analysis::filter_recommender::{self, FilterRecommendation};
use crate::data_analysis::pid_recommender::{generate_pid_summary, recommend_pid, PidRecommendation};
use crate::data_analysis::step_detector::{detect_steps, StepEvent};
use crate::data_analysis::step_metrics::{
    classify_ff_contribution, compute_step_response, compute_step_response_with_trace,
    StepResponse,
};
use crate::data_input::filter_settings::FilterSettings;
use crate::data_input::flight_data::BlackboxFlightData;
use crate::data_input::noise_profile::NoiseProfile;
use crate::data_input::pid_metadata::PidConfiguration;
use crate::types::AxisProfiles;

#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisOptions {
    /// Keep the setpoint/gyro samples of every step window in the result.
    pub include_traces: bool,
}

/// Feedforward attribution counts for one axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeedforwardAttribution {
    /// Overshooting steps that could be classified.
    pub classified: usize,
    /// Of those, steps where feedforward dominated.
    pub ff_dominated: usize,
}

/// Complete result of one tuning analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct TuningAnalysis {
    pub sample_rate_hz: f64,
    pub duration_seconds: f64,
    pub steps: Vec<StepEvent>,
    pub profiles: AxisProfiles,
    pub feedforward: [FeedforwardAttribution; AXIS_COUNT],
    pub coupling: Option<CrossAxisCouplingResult>,
    pub current_pids: PidConfiguration,
    pub pid_recommendations: Vec<PidRecommendation>,
    pub pid_summary: String,
    pub current_filters: Option<FilterSettings>,
    pub filter_recommendations: Vec<FilterRecommendation>,
    /// Present only when a noise profile was supplied.
    pub filter_summary: Option<String>,
}

impl TuningAnalysis {
    /// Runs step detection, response analysis, coupling and recommendations on one flight.
    ///
    /// Filter recommendations need a noise profile; without one they are skipped.
    pub fn analyze(
        flight: &BlackboxFlightData,
        pids: &PidConfiguration,
        noise: Option<&NoiseProfile>,
        filters: Option<&FilterSettings>,
    ) -> Self {
        Self::analyze_with_options(flight, pids, noise, filters, AnalysisOptions::default())
    }

    pub fn analyze_with_options(
        flight: &BlackboxFlightData,
        pids: &PidConfiguration,
        noise: Option<&NoiseProfile>,
        filters: Option<&FilterSettings>,
        options: AnalysisOptions,
    ) -> Self {
        let steps = detect_steps(flight);
        info!("Detected {} step(s)", steps.len());

        // Per-step analysis is independent; collect() keeps the step order.
        let responses: Vec<(StepResponse, Option<bool>)> = steps
            .par_iter()
            .filter(|step| step.axis < AXIS_COUNT)
            .map(|step| analyze_step(flight, step, options))
            .collect();

        let mut per_axis: [Vec<StepResponse>; AXIS_COUNT] = Default::default();
        let mut feedforward = [FeedforwardAttribution::default(); AXIS_COUNT];
        for (response, ff_dominant) in responses {
            let axis = response.step.axis;
            if let Some(dominant) = ff_dominant {
                feedforward[axis].classified += 1;
                if dominant {
                    feedforward[axis].ff_dominated += 1;
                }
            }
            per_axis[axis].push(response);
        }

        let [roll, pitch, yaw] = per_axis;
        let profiles: AxisProfiles = [
            aggregate_axis_metrics(roll),
            aggregate_axis_metrics(pitch),
            aggregate_axis_metrics(yaw),
        ];
        for (axis, profile) in profiles.iter().enumerate() {
            info!(
                "{}: {} step(s), overshoot {:.1}%, rise {:.1} ms, settling {:.1} ms",
                axis_name(axis),
                profile.step_count(),
                profile.mean_overshoot,
                profile.mean_rise_time_ms,
                profile.mean_settling_time_ms
            );
        }

        let coupling = analyze_cross_axis_coupling(&steps, flight);

        let pid_recommendations = recommend_pid(&profiles[0], &profiles[1], &profiles[2], pids);
        let pid_summary = generate_pid_summary(
            [&profiles[0], &profiles[1], &profiles[2]],
            &pid_recommendations,
        );
        info!("{} PID recommendation(s)", pid_recommendations.len());

        let (filter_recommendations, filter_summary) = match noise {
            Some(noise) => {
                let recs = filter_recommender::recommend(noise, filters);
                let summary = filter_recommender::generate_summary(noise, &recs);
                info!("{} filter recommendation(s)", recs.len());
                (recs, Some(summary))
            }
            None => (Vec::new(), None),
        };

        Self {
            sample_rate_hz: flight.sample_rate_hz,
            duration_seconds: flight.duration_seconds,
            steps,
            profiles,
            feedforward,
            coupling,
            current_pids: *pids,
            pid_recommendations,
            pid_summary,
            current_filters: filters.copied(),
            filter_recommendations,
            filter_summary,
        }
    }

    pub fn total_steps(&self) -> usize {
        self.profiles.iter().map(|p| p.step_count()).sum()
    }
}

fn analyze_step(
    flight: &BlackboxFlightData,
    step: &StepEvent,
    options: AnalysisOptions,
) -> (StepResponse, Option<bool>) {
    let axis = step.axis;
    let mut response = if options.include_traces {
        compute_step_response_with_trace(
            &flight.setpoint[axis],
            &flight.gyro[axis],
            step,
            flight.sample_rate_hz,
        )
    } else {
        compute_step_response(
            &flight.setpoint[axis],
            &flight.gyro[axis],
            step,
            flight.sample_rate_hz,
        )
    };
    let ff_dominant = classify_ff_contribution(
        &mut response,
        &flight.pid_p[axis],
        &flight.pid_f[axis],
        &flight.gyro[axis],
    );
    (response, ff_dominant)
}
