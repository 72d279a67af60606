//! Probe actions
//!
//! The wire form (`ProbeHandler`) mirrors the container-orchestration probe
//! schema, where each handler is an optional field. The engine only ever runs
//! the closed [`ProbeAction`] enum produced from it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Probe handler as written in a probe file.
///
/// Any number of handlers may be present on the wire. Exactly one must be
/// populated for the handler to be runnable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeHandler {
    /// Command executed against the target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<ExecAction>,

    /// HTTP GET request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_get: Option<HttpGetAction>,

    /// HTTP POST request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_post: Option<HttpPostAction>,

    /// TCP connect
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_socket: Option<TcpSocketAction>,
}

impl ProbeHandler {
    /// Kinds of the populated handlers, in declaration order
    pub fn kinds(&self) -> Vec<ProbeKind> {
        let mut kinds = Vec::new();
        if self.exec.is_some() {
            kinds.push(ProbeKind::Exec);
        }
        if self.http_get.is_some() {
            kinds.push(ProbeKind::HttpGet);
        }
        if self.http_post.is_some() {
            kinds.push(ProbeKind::HttpPost);
        }
        if self.tcp_socket.is_some() {
            kinds.push(ProbeKind::TcpSocket);
        }
        kinds
    }

    /// Convert into the closed action type.
    ///
    /// Fails with the list of populated kinds unless exactly one handler is
    /// set; an empty list means no handler was given at all.
    pub fn into_action(self) -> Result<ProbeAction, Vec<ProbeKind>> {
        match self {
            ProbeHandler {
                exec: Some(action),
                http_get: None,
                http_post: None,
                tcp_socket: None,
            } => Ok(ProbeAction::Exec(action)),
            ProbeHandler {
                exec: None,
                http_get: Some(action),
                http_post: None,
                tcp_socket: None,
            } => Ok(ProbeAction::HttpGet(action)),
            ProbeHandler {
                exec: None,
                http_get: None,
                http_post: Some(action),
                tcp_socket: None,
            } => Ok(ProbeAction::HttpPost(action)),
            ProbeHandler {
                exec: None,
                http_get: None,
                http_post: None,
                tcp_socket: Some(action),
            } => Ok(ProbeAction::TcpSocket(action)),
            other => Err(other.kinds()),
        }
    }
}

impl From<ProbeAction> for ProbeHandler {
    fn from(action: ProbeAction) -> Self {
        match action {
            ProbeAction::Exec(a) => Self {
                exec: Some(a),
                ..Default::default()
            },
            ProbeAction::HttpGet(a) => Self {
                http_get: Some(a),
                ..Default::default()
            },
            ProbeAction::HttpPost(a) => Self {
                http_post: Some(a),
                ..Default::default()
            },
            ProbeAction::TcpSocket(a) => Self {
                tcp_socket: Some(a),
                ..Default::default()
            },
        }
    }
}

/// A probe with exactly one action
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeAction {
    Exec(ExecAction),
    HttpGet(HttpGetAction),
    HttpPost(HttpPostAction),
    TcpSocket(TcpSocketAction),
}

impl ProbeAction {
    pub fn kind(&self) -> ProbeKind {
        match self {
            ProbeAction::Exec(_) => ProbeKind::Exec,
            ProbeAction::HttpGet(_) => ProbeKind::HttpGet,
            ProbeAction::HttpPost(_) => ProbeKind::HttpPost,
            ProbeAction::TcpSocket(_) => ProbeKind::TcpSocket,
        }
    }
}

/// Discriminant for the probe mechanism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProbeKind {
    Exec,
    HttpGet,
    HttpPost,
    TcpSocket,
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProbeKind::Exec => "exec",
            ProbeKind::HttpGet => "httpGet",
            ProbeKind::HttpPost => "httpPost",
            ProbeKind::TcpSocket => "tcpSocket",
        };
        f.write_str(name)
    }
}

/// A probe entry from a probe file: one handler plus its timeout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Probe {
    #[serde(flatten)]
    pub handler: ProbeHandler,

    /// Seconds after which the probe times out. Zero means one second.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u32,
}

fn default_timeout_seconds() -> u32 {
    1
}

impl Probe {
    pub fn new(handler: impl Into<ProbeHandler>) -> Self {
        Self {
            handler: handler.into(),
            timeout_seconds: default_timeout_seconds(),
        }
    }

    pub fn with_timeout_seconds(mut self, seconds: u32) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.timeout_seconds.max(1)))
    }
}

/// Run a command against the target
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecAction {
    /// Argument vector; the first element is the program
    #[serde(default)]
    pub command: Vec<String>,
}

impl ExecAction {
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into_iter().map(Into::into).collect(),
        }
    }
}

/// Send an HTTP GET request to the target
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpGetAction {
    /// Request path, optionally with a query string
    #[serde(default)]
    pub path: String,

    /// Port number or declared port name
    pub port: PortSpec,

    /// Host to connect to; defaults to the target's pod IP
    #[serde(default)]
    pub host: String,

    #[serde(default)]
    pub scheme: Scheme,

    /// Custom headers; repeated names are sent as repeated headers
    #[serde(default, rename = "httpHeaders")]
    pub http_headers: Vec<HttpHeader>,
}

/// Send an HTTP POST request to the target
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpPostAction {
    #[serde(default)]
    pub path: String,

    pub port: PortSpec,

    #[serde(default)]
    pub host: String,

    #[serde(default)]
    pub scheme: Scheme,

    #[serde(default, rename = "httpHeaders")]
    pub http_headers: Vec<HttpHeader>,

    /// Literal request body for JSON and raw content
    #[serde(default)]
    pub body: String,

    /// Form values for urlencoded content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<BTreeMap<String, Vec<String>>>,
}

/// Open a TCP connection to the target
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TcpSocketAction {
    pub port: PortSpec,

    #[serde(default)]
    pub host: String,
}

/// One custom request header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpHeader {
    pub name: String,
    pub value: String,
}

impl HttpHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Port given either as a number or as the name of a declared container port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortSpec {
    Number(i64),
    Name(String),
}

impl Default for PortSpec {
    fn default() -> Self {
        PortSpec::Number(0)
    }
}

impl From<i64> for PortSpec {
    fn from(port: i64) -> Self {
        PortSpec::Number(port)
    }
}

impl From<u16> for PortSpec {
    fn from(port: u16) -> Self {
        PortSpec::Number(i64::from(port))
    }
}

impl From<&str> for PortSpec {
    fn from(name: &str) -> Self {
        PortSpec::Name(name.to_string())
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortSpec::Number(n) => write!(f, "{}", n),
            PortSpec::Name(name) => f.write_str(name),
        }
    }
}

/// URL scheme for HTTP probes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            other => Err(format!("unsupported scheme: {}", other)),
        }
    }
}

impl TryFrom<String> for Scheme {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Scheme> for String {
    fn from(scheme: Scheme) -> Self {
        scheme.as_str().to_uppercase()
    }
}
