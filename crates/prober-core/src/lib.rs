//! Prober Core
//!
//! Single-shot health probes for containerized workloads: HTTP GET,
//! HTTP POST, TCP connect and remote exec behind one dispatcher.
//!
//! # Classification
//! - Success: the target answered healthy (2xx, connect, exit 0)
//! - Warning: an HTTP redirect was not followed
//! - Failure: the target answered unhealthy or could not be reached
//! - Unknown: the probe itself was malformed and was not attempted
//!
//! # Design Principles
//! - Stateless: every run builds its request from its inputs alone
//! - Bounded: at most 10 KiB of diagnostic output per run

pub mod engine;
pub mod error;

// Re-export contracts
#[path = "../contracts/mod.rs"]
pub mod contracts;

pub use contracts::*;
pub use engine::{Prober, ProberOptions, RemoteExecutor};
pub use error::{ProbeError, Result};
