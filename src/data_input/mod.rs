// src/data_input/mod.rs

pub mod filter_settings;
pub mod flight_data;
pub mod log_data;
pub mod log_parser;
pub mod noise_profile;
pub mod pid_metadata;
pub mod settings;

// src/data_input/mod.rs
