//! Probe targets
//!
//! Everything the engine needs to know about the workload being probed. How
//! the values are discovered (an orchestration API, a static file) is up to
//! the caller.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The workload a probe is addressed to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetContext {
    /// Identity handed to the remote executor
    #[serde(default)]
    pub identity: TargetIdentity,

    /// Pod IP, used when an action leaves its host empty
    #[serde(default)]
    pub pod_ip: String,

    /// Ports declared by the container
    #[serde(default)]
    pub ports: Vec<ContainerPort>,
}

impl TargetContext {
    pub fn new(identity: TargetIdentity, pod_ip: impl Into<String>) -> Self {
        Self {
            identity,
            pod_ip: pod_ip.into(),
            ports: Vec::new(),
        }
    }

    /// Declare a named container port
    pub fn with_port(mut self, name: impl Into<String>, container_port: i32) -> Self {
        self.ports.push(ContainerPort {
            name: name.into(),
            container_port,
        });
        self
    }

    /// The host to use for an action: the action's own host, else the pod IP
    pub fn host_or_pod_ip<'a>(&'a self, host: &'a str) -> &'a str {
        if host.is_empty() {
            &self.pod_ip
        } else {
            host
        }
    }
}

/// A port declared by the container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    #[serde(default)]
    pub name: String,
    pub container_port: i32,
}

/// Opaque identity of the probed container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetIdentity {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub pod_name: String,
    #[serde(default)]
    pub pod_uid: String,
    #[serde(default)]
    pub container_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<ContainerId>,
}

impl TargetIdentity {
    pub fn new(
        namespace: impl Into<String>,
        pod_name: impl Into<String>,
        container_name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            pod_name: pod_name.into(),
            container_name: container_name.into(),
            ..Default::default()
        }
    }

    pub fn with_pod_uid(mut self, uid: impl Into<String>) -> Self {
        self.pod_uid = uid.into();
        self
    }

    pub fn with_container_id(mut self, id: ContainerId) -> Self {
        self.container_id = Some(id);
        self
    }
}

impl fmt::Display for TargetIdentity {
    // Pod names never contain an underscore.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}({}):{}",
            self.pod_name, self.namespace, self.pod_uid, self.container_name
        )
    }
}

/// Runtime-qualified container identifier, e.g. `docker://3f2a...`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContainerId {
    /// Container runtime, e.g. `docker` or `containerd`
    pub runtime: String,
    /// Runtime-specific identifier
    pub id: String,
}

impl ContainerId {
    pub fn new(runtime: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            runtime: runtime.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.runtime, self.id)
    }
}

impl FromStr for ContainerId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_matches('"');
        match trimmed.split_once("://") {
            Some((runtime, id)) if !runtime.is_empty() && !id.is_empty() && !id.contains("://") => {
                Ok(ContainerId::new(runtime, id))
            }
            _ => Err(format!("invalid container ID: {:?}", s)),
        }
    }
}

impl TryFrom<String> for ContainerId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContainerId> for String {
    fn from(id: ContainerId) -> Self {
        id.to_string()
    }
}
