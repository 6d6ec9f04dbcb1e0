use std::io;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Child;
use tokio_util::sync::CancellationToken;

use super::supervisor::{Process, Supervisor};
use crate::{
    command::Command,
    config::Config,
    error::RuntimeError,
    netstack::Netstack,
    session::{self, ADDRESS_ENV, PREFIX_ENV},
};

/// Builder for constructing a [`Supervisor`].
#[derive(Debug, Clone)]
pub struct SupervisorBuilder {
    command: Command,
    cfg: Config,
    parent: Option<CancellationToken>,
}

impl SupervisorBuilder {
    /// Creates a builder for `command` with the default configuration.
    pub fn new(command: Command) -> Self {
        Self {
            command,
            cfg: Config::default(),
            parent: None,
        }
    }

    /// Sets the runtime configuration.
    pub fn with_config(mut self, cfg: Config) -> Self {
        self.cfg = cfg;
        self
    }

    /// Ties the supervisor's lifecycle to `parent`: cancelling it closes the supervisor.
    pub fn with_parent(mut self, parent: CancellationToken) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Allocates the netstack with `open`, spawns the child and starts the input and
    /// packet pumps.
    ///
    /// The child runs from this point on, but its stdout/stderr are only pumped once
    /// [`Supervisor::start`] is called.
    ///
    /// ### Unwinding
    /// Any failure releases what was acquired before it, in reverse order: the child is
    /// killed and reaped, the lifecycle token cancelled, the netstack closed.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn spawn<N, F>(self, open: F) -> Result<Supervisor<N>, RuntimeError>
    where
        N: Netstack,
        F: FnOnce() -> io::Result<N>,
    {
        let netstack = open().map_err(|e| RuntimeError::NetstackUnavailable(Arc::new(e)))?;

        if self.command.get_program().is_empty() {
            close_quietly(&netstack).await;
            return Err(RuntimeError::InvalidCommand {
                reason: "empty program".to_string(),
            });
        }

        let token = match &self.parent {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
        let prefix = session::generate_prefix();
        let address = session::random_public_ipv4();

        let mut cmd = self
            .command
            .to_tokio([(PREFIX_ENV, prefix.clone()), (ADDRESS_ENV, address.to_string())]);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                token.cancel();
                close_quietly(&netstack).await;
                return Err(RuntimeError::Spawn {
                    program: self.command.get_program().to_string_lossy().into_owned(),
                    source: Arc::new(e),
                });
            }
        };
        tracing::debug!(
            pid = child.id(),
            program = %self.command.get_program().to_string_lossy(),
            %address,
            "child spawned"
        );

        let pipes = (child.stdin.take(), child.stdout.take(), child.stderr.take());
        let (stdin, stdout, stderr) = match pipes {
            (Some(stdin), Some(stdout), Some(stderr)) => (stdin, stdout, stderr),
            (stdin, stdout, _) => {
                let stream = if stdin.is_none() {
                    "stdin"
                } else if stdout.is_none() {
                    "stdout"
                } else {
                    "stderr"
                };
                reap(&mut child).await;
                token.cancel();
                close_quietly(&netstack).await;
                return Err(RuntimeError::PipeUnavailable { stream });
            }
        };

        let process = Process {
            child,
            stdout,
            stderr,
        };
        Ok(Supervisor::assemble(
            self.cfg, netstack, prefix, address, token, process, stdin,
        ))
    }
}

/// Kills the child (if still running) and waits for it so no zombie is left behind.
pub(super) async fn reap(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        tracing::debug!(error = %e, "kill failed (child already exited?)");
    }
    if let Err(e) = child.wait().await {
        tracing::debug!(error = %e, "failed to reap child");
    }
}

async fn close_quietly<N: Netstack>(netstack: &N) {
    if let Err(e) = netstack.close().await {
        tracing::warn!(error = %e, "failed to close netstack while unwinding");
    }
}
