//! Prober CLI
//!
//! Loads a probe file, runs every probe against its target and prints one
//! JSON report per probe. Also hosts the demo fixture servers the probes
//! can be pointed at.

pub mod config;
pub mod fixtures;
pub mod runner;
pub mod telemetry;

pub use config::{ConfigError, ExecConfig, ProberConfig};
pub use runner::{run_probes, ProbeLine};
