// src/data_analysis/mod.rs

pub mod axis_profile;
pub mod cross_axis_coupling;
pub mod derivative;
pub mod filter_recommender;
pub mod pid_recommender;
pub mod step_detector;
pub mod step_metrics;

// src/data_analysis/mod.rs
