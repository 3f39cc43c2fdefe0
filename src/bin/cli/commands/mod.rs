//! CLI Command Implementations
//!
//! - submit: extract, upload and submit a classification job
//! - analyze: findings report for a job
//! - extract: local-only chunk decoding
//! - doctor: preflight checks
//! - config: configuration template and validation

pub mod analyze;
pub mod config;
pub mod doctor;
pub mod extract;
pub mod submit;

pub use analyze::analyze_command;
pub use config::{init_config, validate_config};
pub use doctor::doctor_command;
pub use extract::extract_command;
pub use submit::submit_command;
