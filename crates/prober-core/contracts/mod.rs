//! Prober Contracts
//!
//! Data model shared by the engine and its callers: actions, targets and
//! results.

mod action;
mod target;

pub use action::*;
pub use target::*;

use crate::error::ProbeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse health classification of one probe run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeResult {
    /// Target is healthy
    Success,
    /// Logically a success, with something worth reporting (e.g. a blocked redirect)
    Warning,
    /// Target is unhealthy or unreachable
    Failure,
    /// The probe could not be evaluated
    Unknown,
}

impl ProbeResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeResult::Success => "success",
            ProbeResult::Warning => "warning",
            ProbeResult::Failure => "failure",
            ProbeResult::Unknown => "unknown",
        }
    }

    /// Success or Warning
    pub fn is_healthy(&self) -> bool {
        matches!(self, ProbeResult::Success | ProbeResult::Warning)
    }
}

impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answer about the target's health, with its diagnostic output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub result: ProbeResult,
    pub output: String,
}

impl ProbeOutcome {
    pub fn new(result: ProbeResult, output: impl Into<String>) -> Self {
        Self {
            result,
            output: output.into(),
        }
    }

    pub fn success(output: impl Into<String>) -> Self {
        Self::new(ProbeResult::Success, output)
    }

    pub fn warning(output: impl Into<String>) -> Self {
        Self::new(ProbeResult::Warning, output)
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self::new(ProbeResult::Failure, output)
    }
}

/// Flat `(result, output, error)` view of a probe run
///
/// `error` is set only when the probe itself could not be carried out
/// properly. A failing target with no error is reported through `result`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub result: ProbeResult,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<ProbeOutcome, ProbeError>> for ProbeReport {
    fn from(run: Result<ProbeOutcome, ProbeError>) -> Self {
        match run {
            Ok(outcome) => Self {
                result: outcome.result,
                output: outcome.output,
                error: None,
            },
            Err(err) => Self {
                result: err.result(),
                output: String::new(),
                error: Some(err.to_string()),
            },
        }
    }
}
