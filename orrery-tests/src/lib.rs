//! Test utilities for the orrery workspace
//!
//! Harnesses and fixtures shared by the integration tests: a format that
//! counts disk reads and writes, an extension that journals its hooks, and
//! a handful of config types with known migration histories.

pub mod helpers;

pub use helpers::counting_format::CountingFormat;
pub use helpers::harness::TestHarness;
pub use helpers::log_capture::LogCapture;
pub use helpers::recording_extension::{Journal, RecordingExtension};
pub use helpers::sample_configs::{Guarded, Plain, Versioned};
