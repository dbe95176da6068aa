//! External command execution and execution-context resolution.
//!
//! Every `ip` query the backend makes has to observe the *host's* network
//! state. When the backend runs inside a container with its own network
//! namespace, running `ip` directly would only show the container's veth, so
//! the [`ExecutionContextResolver`] wraps such commands with
//! `nsenter -t 1 -n`, entering the network namespace of PID 1.
//!
//! # Architecture
//!
//! ```text
//! CommandSpec ──► ExecutionContextResolver ──► ResolvedCommand ──► CommandRunner
//!                      │                          (direct | nsenter)
//!                      └── Environment (container? host network?)
//! ```
//!
//! The [`CommandRunner`] trait is the single "run this, give me stdout/stderr"
//! primitive shared by queries and control actions, which keeps both testable
//! with scripted runners.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, instrument, warn};

use netgate_shared::errors::{CommandError, CommandResult};

use crate::environment::Environment;

/// Boxed, sendable future used by the object-safe traits of this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Program used to enter another process's namespaces.
pub const NSENTER_PROGRAM: &str = "nsenter";

/// PID whose network namespace is treated as the host's.
pub const HOST_INIT_PID: u32 = 1;

/// Placeholder printed instead of redacted arguments.
pub const REDACTED: &str = "********";

/// A program and its arguments.
///
/// Arguments registered with [`CommandSpec::redact`] are masked wherever the
/// command is displayed (logs, spans, error messages) but passed verbatim to
/// the process.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    secrets: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            secrets: Vec::new(),
        }
    }

    /// Masks every argument equal to `secret` when displayed.
    pub fn redact(mut self, secret: impl Into<String>) -> Self {
        self.secrets.push(secret.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if self.secrets.contains(arg) {
                write!(f, " {}", REDACTED)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommandSpec({})", self)
    }
}

/// Captured output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Runs external commands.
///
/// A non-zero exit status is reported as [`CommandError::NonZeroExit`]; only
/// commands that succeeded produce a [`CommandOutput`].
pub trait CommandRunner: Send + Sync {
    fn run<'a>(&'a self, command: &'a CommandSpec) -> BoxFuture<'a, CommandResult<CommandOutput>>;
}

/// [`CommandRunner`] spawning real processes with `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandRunner {
    timeout: Option<Duration>,
}

impl SystemCommandRunner {
    /// Runner without a timeout: commands run as long as the tool does.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner killing commands that outlive `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    #[instrument(skip(self), fields(command = %command))]
    async fn execute(&self, command: &CommandSpec) -> CommandResult<CommandOutput> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, cmd.output())
                .await
                .map_err(|_| CommandError::TimedOut {
                    command: command.to_string(),
                    timeout,
                })?,
            None => cmd.output().await,
        }
        .map_err(|e| spawn_error(command, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("Command failed with {}: {}", output.status, stderr);
            return Err(CommandError::NonZeroExit {
                command: command.to_string(),
                status: output.status.to_string(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr,
            });
        }

        debug!("Command succeeded ({} bytes on stdout)", output.stdout.len());
        Ok(CommandOutput {
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run<'a>(&'a self, command: &'a CommandSpec) -> BoxFuture<'a, CommandResult<CommandOutput>> {
        Box::pin(self.execute(command))
    }
}

fn spawn_error(command: &CommandSpec, err: std::io::Error) -> CommandError {
    if err.kind() == std::io::ErrorKind::NotFound {
        CommandError::NotFound {
            program: command.program.clone(),
        }
    } else {
        CommandError::Io {
            command: command.to_string(),
            source: err,
        }
    }
}

/// How a command reaches the host network state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPath {
    /// Run as-is in the caller's namespace
    Direct,
    /// Run inside PID 1's network namespace through `nsenter`
    HostNamespace,
}

/// A command ready to be handed to a [`CommandRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub path: ExecutionPath,
    pub command: CommandSpec,
}

impl ResolvedCommand {
    pub fn direct(command: CommandSpec) -> Self {
        Self {
            path: ExecutionPath::Direct,
            command,
        }
    }

    /// Wraps `command` as `nsenter -t 1 -n <program> <args...>`.
    pub fn host_namespace(command: CommandSpec) -> Self {
        let pid = HOST_INIT_PID.to_string();
        let mut args = vec!["-t".to_string(), pid, "-n".to_string(), command.program];
        args.extend(command.args);

        Self {
            path: ExecutionPath::HostNamespace,
            command: CommandSpec {
                program: NSENTER_PROGRAM.to_string(),
                args,
                secrets: command.secrets,
            },
        }
    }
}

/// Chooses how to run a networking command given the runtime environment.
///
/// Holds no state besides the environment probe; the decision is made again
/// on every call.
#[derive(Clone)]
pub struct ExecutionContextResolver {
    environment: Arc<dyn Environment>,
}

impl ExecutionContextResolver {
    pub fn new(environment: Arc<dyn Environment>) -> Self {
        Self { environment }
    }

    /// Resolves `command` to a direct or namespace-wrapped invocation.
    #[instrument(skip(self), fields(command = %command))]
    pub async fn resolve(&self, command: CommandSpec) -> ResolvedCommand {
        if !self.environment.is_containerized() {
            debug!("Not containerized, executing directly");
            return ResolvedCommand::direct(command);
        }

        if self.environment.looks_like_host_network().await {
            debug!("Container shares the host network namespace, executing directly");
            return ResolvedCommand::direct(command);
        }

        debug!("Container has a private network namespace, entering PID 1's namespace");
        ResolvedCommand::host_namespace(command)
    }
}
