//! Probe engine
//!
//! One dispatcher over the four check strategies. A probe run performs at
//! most one round trip and keeps no state between runs, so a single
//! [`Prober`] can serve any number of concurrent callers.

mod exec;
mod http;
mod http_post;
mod port;
mod tcp;
mod url;

pub use exec::{
    ExecOutput, ExecProber, LocalProcessExecutor, RemoteExecutor, DEFAULT_EXEC_TIMEOUT,
};
pub use http::{HttpProber, MAX_REDIRECTS};
pub use http_post::{encode_form, ContentKind, CONTENT_TYPE_FORM, CONTENT_TYPE_JSON};
pub use port::resolve_port;
pub use tcp::TcpProber;
pub use url::{build_headers, format_url, join_host_port};

use crate::contracts::*;
use crate::error::{ProbeError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Longest diagnostic kept from a response body or command output (10 KiB)
pub const MAX_OUTPUT_LENGTH: usize = 10 * 1024;

/// User-Agent sent when the probe does not set one
pub const DEFAULT_USER_AGENT: &str = concat!("prober/", env!("CARGO_PKG_VERSION"));

/// Engine options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProberOptions {
    /// Follow redirects to other hosts instead of reporting a Warning
    #[serde(default)]
    pub follow_non_local_redirects: bool,

    /// User-Agent for HTTP probes that do not set their own
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for ProberOptions {
    fn default() -> Self {
        Self {
            follow_non_local_redirects: false,
            user_agent: default_user_agent(),
        }
    }
}

/// Probe dispatcher
#[derive(Debug, Clone)]
pub struct Prober {
    http: HttpProber,
    tcp: TcpProber,
    exec: ExecProber,
}

impl Prober {
    /// Create a prober; the HTTP client is built once and shared by all runs
    pub fn new(options: ProberOptions, executor: Arc<dyn RemoteExecutor>) -> Result<Self> {
        Ok(Self {
            http: HttpProber::new(&options)?,
            tcp: TcpProber,
            exec: ExecProber::new(executor),
        })
    }

    /// Run the single handler populated on `handler` against `target`.
    ///
    /// A handler with nothing (or more than one thing) populated is an
    /// `Unknown` error naming the target, and no I/O is attempted.
    #[tracing::instrument(name = "run_probe", skip_all, fields(identity = %target.identity))]
    pub async fn run_probe(
        &self,
        handler: &ProbeHandler,
        target: &TargetContext,
        timeout: Duration,
    ) -> Result<ProbeOutcome> {
        let action = match handler.clone().into_action() {
            Ok(action) => action,
            Err(kinds) if kinds.is_empty() => {
                tracing::warn!("Failed to find probe builder for container");
                return Err(ProbeError::MissingHandler {
                    target: target.identity.to_string(),
                });
            }
            Err(kinds) => {
                let kinds = kinds
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                tracing::warn!(%kinds, "Probe has more than one handler");
                return Err(ProbeError::MultipleHandlers {
                    target: target.identity.to_string(),
                    kinds,
                });
            }
        };

        self.run_action(&action, target, timeout).await
    }

    /// Run a typed action against `target`.
    ///
    /// `timeout` bounds HTTP and TCP probes; exec probes rely on the
    /// executor's own timeout.
    pub async fn run_action(
        &self,
        action: &ProbeAction,
        target: &TargetContext,
        timeout: Duration,
    ) -> Result<ProbeOutcome> {
        let run = self.dispatch(action, target, timeout).await;

        match &run {
            Ok(outcome) => {
                tracing::debug!(kind = %action.kind(), result = %outcome.result, "Probe finished")
            }
            Err(e) => tracing::warn!(kind = %action.kind(), result = %e.result(), error = %e, "Probe errored"),
        }

        run
    }

    async fn dispatch(
        &self,
        action: &ProbeAction,
        target: &TargetContext,
        timeout: Duration,
    ) -> Result<ProbeOutcome> {
        match action {
            ProbeAction::Exec(exec) => {
                tracing::debug!(command = ?exec.command, "Exec-Probe");
                self.exec.probe(&target.identity, &exec.command).await
            }
            ProbeAction::HttpGet(get) => {
                let host = target.host_or_pod_ip(&get.host);
                let port = resolve_port(&get.port, &target.ports)?;
                let url = format_url(get.scheme, host, port, &get.path)?;
                tracing::debug!(%url, headers = ?get.http_headers, "HTTP-Probe GET");
                self.http.get(&url, &get.http_headers, timeout).await
            }
            ProbeAction::HttpPost(post) => {
                let host = target.host_or_pod_ip(&post.host);
                let port = resolve_port(&post.port, &target.ports)?;
                let url = format_url(post.scheme, host, port, &post.path)?;
                tracing::debug!(%url, headers = ?post.http_headers, "HTTP-Probe POST");
                self.http
                    .post(
                        &url,
                        &post.http_headers,
                        post.form.as_ref(),
                        &post.body,
                        timeout,
                    )
                    .await
            }
            ProbeAction::TcpSocket(tcp) => {
                let port = resolve_port(&tcp.port, &target.ports)?;
                let host = target.host_or_pod_ip(&tcp.host);
                tracing::debug!(%host, port, ?timeout, "TCP-Probe");
                self.tcp.probe(host, port, timeout).await
            }
        }
    }
}

/// Lossy UTF-8 rendering of at most [`MAX_OUTPUT_LENGTH`] bytes
pub(crate) fn truncate_output(bytes: &[u8]) -> String {
    let end = bytes.len().min(MAX_OUTPUT_LENGTH);
    let mut text = String::from_utf8_lossy(&bytes[..end]).into_owned();

    // Replacement characters are wider than the bytes they stand for.
    if text.len() > MAX_OUTPUT_LENGTH {
        let mut cut = MAX_OUTPUT_LENGTH;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Unreachable;

    #[async_trait::async_trait]
    impl RemoteExecutor for Unreachable {
        async fn execute(&self, _: &TargetIdentity, _: &[String]) -> ExecOutput {
            panic!("executor must not be called");
        }
    }

    fn prober() -> Prober {
        Prober::new(ProberOptions::default(), Arc::new(Unreachable)).unwrap()
    }

    fn target() -> TargetContext {
        TargetContext::new(
            TargetIdentity::new("default", "prober-demo", "app").with_pod_uid("uid-1"),
            "127.0.0.1",
        )
        .with_port("web", 8080)
    }

    #[tokio::test]
    async fn test_missing_handler_is_unknown_error() {
        let err = prober()
            .run_probe(&ProbeHandler::default(), &target(), Duration::from_secs(1))
            .await
            .unwrap_err();

        assert_eq!(err.result(), ProbeResult::Unknown);
        assert!(err.to_string().contains("prober-demo_default(uid-1):app"));
    }

    #[tokio::test]
    async fn test_multiple_handlers_is_unknown_error() {
        let handler = ProbeHandler {
            exec: Some(ExecAction::new(["true"])),
            tcp_socket: Some(TcpSocketAction {
                port: 8080u16.into(),
                host: String::new(),
            }),
            ..Default::default()
        };

        let err = prober()
            .run_probe(&handler, &target(), Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, ProbeError::MultipleHandlers { ref kinds, .. } if kinds == "exec, tcpSocket"));
        assert_eq!(err.result(), ProbeResult::Unknown);
    }

    #[tokio::test]
    async fn test_unresolved_port_is_unknown_error() {
        let action = ProbeAction::HttpGet(HttpGetAction {
            port: "grpc".into(),
            ..Default::default()
        });

        let err = prober()
            .run_action(&action, &target(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::UnresolvedPort { .. }));
        assert_eq!(err.result(), ProbeResult::Unknown);
    }

    #[tokio::test]
    async fn test_empty_exec_command_is_unknown_error() {
        let action = ProbeAction::Exec(ExecAction::default());
        let err = prober()
            .run_action(&action, &target(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::EmptyCommand));
    }

    #[tokio::test]
    async fn test_tcp_without_host_or_pod_ip_is_unknown_error() {
        let action = ProbeAction::TcpSocket(TcpSocketAction {
            port: 80u16.into(),
            host: String::new(),
        });
        let target = TargetContext::default();

        let err = prober()
            .run_action(&action, &target, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::InvalidAddress { .. }));
    }

    #[test]
    fn test_truncate_output() {
        assert_eq!(truncate_output(b"short"), "short");

        let long = vec![b'a'; MAX_OUTPUT_LENGTH + 10];
        assert_eq!(truncate_output(&long).len(), MAX_OUTPUT_LENGTH);

        // A two-byte character straddling the limit
        let mut straddle = vec![b'a'; MAX_OUTPUT_LENGTH - 1];
        straddle.extend_from_slice("é".as_bytes());
        let text = truncate_output(&straddle);
        assert!(text.len() <= MAX_OUTPUT_LENGTH);
        assert!(text.starts_with('a'));
    }

    #[test]
    fn test_options_defaults_from_empty_config() {
        let options: ProberOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, ProberOptions::default());
        assert!(!options.follow_non_local_redirects);
        assert!(options.user_agent.starts_with("prober/"));
    }
}
