//! Runs the probes of a probe file and reports one line per probe

use crate::config::ProberConfig;
use prober_core::engine::Prober;
use prober_core::{Probe, ProbeReport, ProbeResult, TargetContext};
use serde::Serialize;

/// Report for one probe of a probe file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeLine {
    /// Position in the probe file
    pub index: usize,
    /// Populated handler kinds, comma separated
    pub kind: String,
    pub result: ProbeResult,
    pub output: String,
    pub error: Option<String>,
}

impl ProbeLine {
    fn new(index: usize, probe: &Probe, report: ProbeReport) -> Self {
        let kind = probe
            .handler
            .kinds()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");

        Self {
            index,
            kind,
            result: report.result,
            output: report.output,
            error: report.error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Run one probe against `target`
pub async fn run_one(
    prober: &Prober,
    index: usize,
    probe: &Probe,
    target: &TargetContext,
) -> ProbeLine {
    let run = prober.run_probe(&probe.handler, target, probe.timeout()).await;
    let line = ProbeLine::new(index, probe, run.into());

    tracing::info!(
        index,
        kind = %line.kind,
        result = %line.result,
        errored = line.is_error(),
        "Probe completed"
    );
    line
}

/// Run every probe of `config` in order
pub async fn run_probes(prober: &Prober, config: &ProberConfig) -> Vec<ProbeLine> {
    let mut lines = Vec::with_capacity(config.probes.len());
    for (index, probe) in config.probes.iter().enumerate() {
        lines.push(run_one(prober, index, probe, &config.target).await);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use prober_core::{ExecAction, ProbeHandler};

    #[test]
    fn test_line_kind_lists_populated_handlers() {
        let probe = Probe::new(ProbeHandler {
            exec: Some(ExecAction::new(["true"])),
            tcp_socket: Some(Default::default()),
            ..Default::default()
        });
        let report = ProbeReport {
            result: ProbeResult::Unknown,
            output: String::new(),
            error: Some("ambiguous".to_string()),
        };

        let line = ProbeLine::new(3, &probe, report);
        assert_eq!(line.kind, "exec,tcpSocket");
        assert_eq!(line.index, 3);
        assert!(line.is_error());
    }

    #[test]
    fn test_line_serializes_flat() {
        let probe = Probe::new(ProbeHandler::default());
        let report = ProbeReport {
            result: ProbeResult::Success,
            output: "ok".to_string(),
            error: None,
        };

        let json = serde_json::to_value(ProbeLine::new(0, &probe, report)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "index": 0,
                "kind": "",
                "result": "success",
                "output": "ok",
                "error": null,
            })
        );
    }
}
