pub mod counting_format;
pub mod harness;
pub mod log_capture;
pub mod recording_extension;
pub mod sample_configs;
