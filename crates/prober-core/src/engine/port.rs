//! Port resolution against a container's declared ports

use crate::contracts::{ContainerPort, PortSpec};
use crate::error::{ProbeError, Result};

/// Resolve a port specifier to a port number.
///
/// Names are matched exactly against the declared ports, first match wins.
/// A name that matches nothing is tried as a number, since some callers pass
/// stringified port numbers.
pub fn resolve_port(spec: &PortSpec, ports: &[ContainerPort]) -> Result<u16> {
    let port = match spec {
        PortSpec::Number(n) => *n,
        PortSpec::Name(name) => match find_port_by_name(ports, name) {
            Some(port) => i64::from(port),
            None => name
                .trim()
                .parse::<i64>()
                .map_err(|_| ProbeError::UnresolvedPort { name: name.clone() })?,
        },
    };

    validate_port(port)
}

fn find_port_by_name(ports: &[ContainerPort], name: &str) -> Option<i32> {
    ports
        .iter()
        .find(|port| port.name == name)
        .map(|port| port.container_port)
}

fn validate_port(port: i64) -> Result<u16> {
    match u16::try_from(port) {
        Ok(valid) if valid > 0 => Ok(valid),
        _ => Err(ProbeError::InvalidPort { port }),
    }
}
