//! Exec strategy and the remote execution boundary
//!
//! The engine never runs commands itself. It hands the target identity and
//! the argument vector to a [`RemoteExecutor`], which may run the command in
//! a container runtime, over a remote shell, or (for demos and tests) as a
//! local child process via [`LocalProcessExecutor`].

use super::{truncate_output, MAX_OUTPUT_LENGTH};
use crate::contracts::{ProbeOutcome, TargetIdentity};
use crate::error::{ProbeError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt as _};
use tokio::process::Command;

/// Outcome reported by a remote executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    /// Combined stdout and stderr
    pub output: Vec<u8>,
    /// Whether the command completed with exit status zero
    pub success: bool,
}

impl ExecOutput {
    pub fn success(output: impl Into<Vec<u8>>) -> Self {
        Self {
            output: output.into(),
            success: true,
        }
    }

    pub fn failure(output: impl Into<Vec<u8>>) -> Self {
        Self {
            output: output.into(),
            success: false,
        }
    }
}

/// Runs a command against a target
///
/// Implementations own their timeout policy. An unreachable target, a command
/// that cannot be started and a non-zero exit are all reported as a failed
/// [`ExecOutput`].
#[async_trait::async_trait]
pub trait RemoteExecutor: Send + Sync + fmt::Debug {
    async fn execute(&self, target: &TargetIdentity, command: &[String]) -> ExecOutput;
}

/// Exec prober
#[derive(Debug, Clone)]
pub struct ExecProber {
    executor: Arc<dyn RemoteExecutor>,
}

impl ExecProber {
    pub fn new(executor: Arc<dyn RemoteExecutor>) -> Self {
        Self { executor }
    }

    /// Run `command` against `target`; the output becomes the diagnostic
    pub async fn probe(&self, target: &TargetIdentity, command: &[String]) -> Result<ProbeOutcome> {
        if command.is_empty() {
            return Err(ProbeError::EmptyCommand);
        }

        let result = self.executor.execute(target, command).await;
        let output = truncate_output(&result.output);
        tracing::debug!(identity = %target, ?command, success = result.success, %output, "Exec probe response");

        if result.success {
            Ok(ProbeOutcome::success(output))
        } else {
            Ok(ProbeOutcome::failure(output))
        }
    }
}

/// Default time a local command may run
pub const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs commands as local child processes
///
/// The target identity is only logged. Output is stdout followed by stderr,
/// capped at [`MAX_OUTPUT_LENGTH`] bytes while it is read.
#[derive(Debug, Clone)]
pub struct LocalProcessExecutor {
    timeout: Duration,
    env: BTreeMap<String, String>,
}

impl Default for LocalProcessExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalProcessExecutor {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_EXEC_TIMEOUT,
            env: BTreeMap::new(),
        }
    }

    /// Set the time after which the child is killed
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add an environment variable for every command
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_envs(mut self, env: BTreeMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }
}

#[async_trait::async_trait]
impl RemoteExecutor for LocalProcessExecutor {
    async fn execute(&self, target: &TargetIdentity, command: &[String]) -> ExecOutput {
        let Some((program, args)) = command.split_first() else {
            return ExecOutput::failure("empty command");
        };
        tracing::debug!(identity = %target, %program, "Running exec probe locally");

        let child = Command::new(program)
            .args(args)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match child {
            Ok(child) => child,
            Err(e) => return ExecOutput::failure(format!("failed to start {}: {}", program, e)),
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let run = async {
            let (stdout, stderr) = tokio::join!(read_bounded(stdout), read_bounded(stderr));
            let status = child.wait().await?;
            let mut combined = stdout?;
            combined.extend_from_slice(&stderr?);
            combined.truncate(MAX_OUTPUT_LENGTH);
            Ok::<_, io::Error>((combined, status))
        };

        // On timeout the child is dropped and killed.
        match tokio::time::timeout(self.timeout, run).await {
            Ok(Ok((output, status))) => ExecOutput {
                output,
                success: status.success(),
            },
            Ok(Err(e)) => ExecOutput::failure(format!("failed to wait for {}: {}", program, e)),
            Err(_) => ExecOutput::failure(format!(
                "command {} timed out after {:?}",
                program, self.timeout
            )),
        }
    }
}

/// Keep the first [`MAX_OUTPUT_LENGTH`] bytes of a pipe and discard the rest
async fn read_bounded<R>(pipe: Option<R>) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let Some(mut pipe) = pipe else {
        return Ok(Vec::new());
    };

    let mut kept = Vec::new();
    (&mut pipe)
        .take(MAX_OUTPUT_LENGTH as u64)
        .read_to_end(&mut kept)
        .await?;
    // The child blocks on a full pipe unless it is drained.
    tokio::io::copy(&mut pipe, &mut tokio::io::sink()).await?;
    Ok(kept)
}
