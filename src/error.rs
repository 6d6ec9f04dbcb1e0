//! Error types used by the stdiovisor runtime and the child-side link.
//!
//! This module defines three error enums:
//!
//! - [`RuntimeError`]: constructing, running or closing a [`Supervisor`](crate::Supervisor).
//! - [`RunError`]: outcome of a one-shot [`run`](crate::run).
//! - [`LinkError`]: recovering the session from a child's environment.
//!
//! I/O sources are kept behind an [`Arc`] so one accumulated error can be handed to
//! every caller of [`Supervisor::close`](crate::Supervisor::close).

use std::io;
use std::sync::Arc;

use thiserror::Error;

/// # Errors produced by the supervisor runtime.
///
/// Construction failures are returned synchronously from
/// [`SupervisorBuilder::spawn`](crate::SupervisorBuilder::spawn); runtime failures are
/// accumulated and returned from [`Supervisor::close`](crate::Supervisor::close).
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum RuntimeError {
    /// The virtual network stack could not be allocated.
    #[error("network stack unavailable: {0}")]
    NetstackUnavailable(Arc<io::Error>),

    /// The command description cannot be executed (e.g. empty program).
    #[error("invalid command: {reason}")]
    InvalidCommand {
        /// Why the command was rejected.
        reason: String,
    },

    /// The child process could not be spawned.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying OS error.
        source: Arc<io::Error>,
    },

    /// A piped stdio handle was not available after spawning.
    #[error("child {stream} pipe unavailable")]
    PipeUnavailable {
        /// Which stream (`stdin`, `stdout`, `stderr`).
        stream: &'static str,
    },

    /// The child's exit status could not be determined.
    #[error("failed to wait on child: {0}")]
    Wait(Arc<io::Error>),

    /// Closing the virtual network stack failed.
    #[error("failed to close network stack: {0}")]
    NetstackClose(Arc<io::Error>),

    /// Several independent failures.
    #[error("{}", join_messages(.0))]
    Joined(Vec<RuntimeError>),
}

impl RuntimeError {
    /// Merges two optional errors, flattening nested [`RuntimeError::Joined`] values.
    ///
    /// # Example
    /// ```
    /// use stdiovisor::RuntimeError;
    ///
    /// let a = RuntimeError::PipeUnavailable { stream: "stdin" };
    /// assert!(RuntimeError::join(None, None).is_none());
    /// assert!(matches!(RuntimeError::join(Some(a), None), Some(RuntimeError::PipeUnavailable { .. })));
    /// ```
    pub fn join(a: Option<Self>, b: Option<Self>) -> Option<Self> {
        let mut all: Vec<Self> = Vec::new();
        for err in [a, b].into_iter().flatten() {
            match err {
                RuntimeError::Joined(inner) => all.extend(inner),
                other => all.push(other),
            }
        }
        match all.len() {
            0 => None,
            1 => all.pop(),
            _ => Some(RuntimeError::Joined(all)),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::NetstackUnavailable(_) => "netstack_unavailable",
            RuntimeError::InvalidCommand { .. } => "invalid_command",
            RuntimeError::Spawn { .. } => "spawn_failed",
            RuntimeError::PipeUnavailable { .. } => "pipe_unavailable",
            RuntimeError::Wait(_) => "wait_failed",
            RuntimeError::NetstackClose(_) => "netstack_close_failed",
            RuntimeError::Joined(_) => "joined",
        }
    }

    /// Returns `true` if this error happened while constructing the supervisor.
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            RuntimeError::NetstackUnavailable(_)
                | RuntimeError::InvalidCommand { .. }
                | RuntimeError::Spawn { .. }
                | RuntimeError::PipeUnavailable { .. }
        )
    }
}

fn join_messages(errors: &[RuntimeError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// # Errors reported by a one-shot [`run`](crate::run).
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum RunError {
    /// The program could not be started or waited on.
    #[error("failed to run `{program}`: {source}")]
    Io {
        /// Program that failed.
        program: String,
        /// Underlying OS error.
        source: Arc<io::Error>,
    },

    /// The run was cancelled before the program exited.
    #[error("run of `{program}` cancelled")]
    Cancelled {
        /// Program that was killed.
        program: String,
    },

    /// The program exited with a non-zero code.
    #[error("exit code({code}) stderr({stderr:?})")]
    ExitCode {
        /// Exit code, `-1` when killed by a signal.
        code: i32,
        /// Lossy UTF-8 rendering of captured stderr.
        stderr: String,
    },
}

/// # Errors produced while recovering a session inside the child.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LinkError {
    /// A required environment variable is not set or not unicode.
    #[error("environment variable {name} is not set")]
    MissingVar {
        /// Variable name.
        name: &'static str,
    },

    /// The parent address is not a dotted-decimal IPv4 address.
    #[error("invalid parent address {value:?}: {source}")]
    InvalidAddress {
        /// Raw variable value.
        value: String,
        /// Parse failure.
        source: std::net::AddrParseError,
    },

    /// The child's own virtual network stack could not be allocated.
    #[error("network stack unavailable: {0}")]
    NetstackUnavailable(#[from] io::Error),
}
