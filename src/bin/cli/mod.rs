//! CLI Module Organization
//!
//! - args: CLI argument structures
//! - commands: command implementations
//! - config_layer: configuration loading and per-run overrides
//! - display: colored terminal output
//! - prompt: interactive configuration correction

pub mod args;
pub mod commands;
pub mod config_layer;
pub mod display;
pub mod prompt;

// Re-export commonly used items for convenience
pub use args::*;
pub use commands::*;
