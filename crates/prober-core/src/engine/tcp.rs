//! TCP connect strategy

use super::url::join_host_port;
use crate::contracts::ProbeOutcome;
use crate::error::{ProbeError, Result};
use std::net::Ipv6Addr;
use std::time::Duration;
use tokio::io::AsyncWriteExt as _;
use tokio::net::TcpStream;

/// Attempts a TCP connection to the target
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProber;

impl TcpProber {
    /// Connect to `host:port` within `timeout`.
    ///
    /// A completed connect is Success and the connection is closed right
    /// away. Refusal, resolution failure and timeout are Failures. Only an
    /// address that cannot be parsed is an error.
    pub async fn probe(&self, host: &str, port: u16, timeout: Duration) -> Result<ProbeOutcome> {
        let host = parse_host(host, port)?;
        let address = join_host_port(host, port);

        match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(mut stream)) => {
                if let Err(e) = stream.shutdown().await {
                    tracing::warn!(%address, error = %e, "Unexpected error closing TCP probe socket");
                }
                Ok(ProbeOutcome::success(""))
            }
            Ok(Err(e)) => {
                tracing::debug!(%address, error = %e, "TCP probe failed");
                Ok(ProbeOutcome::failure(format!("dial tcp {}: {}", address, e)))
            }
            Err(_) => {
                tracing::debug!(%address, ?timeout, "TCP probe timed out");
                Ok(ProbeOutcome::failure(format!("dial tcp {}: i/o timeout", address)))
            }
        }
    }
}

/// Validate the host part of a TCP address, stripping IPv6 brackets
fn parse_host(host: &str, port: u16) -> Result<&str> {
    let invalid = |reason: &str| ProbeError::invalid_address(join_host_port(host, port), reason);

    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    if bare.is_empty() {
        return Err(invalid("missing host"));
    }
    if bare.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(invalid("host contains invalid characters"));
    }
    if bare.contains(':') && bare.parse::<Ipv6Addr>().is_err() {
        return Err(invalid("too many colons in address"));
    }

    Ok(bare)
}
