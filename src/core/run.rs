//! One-shot execution: run a command to completion and capture its output.
//!
//! No netstack or buses are involved; the child's stdin is closed and its stdout and
//! stderr are collected in full. A cancelled run keeps what was written before the kill.

use std::io;
use std::process::Stdio;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

use crate::{
    command::Command,
    config::{Config, DEFAULT_MTU},
    error::RunError,
};

/// Captured result of [`run`].
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    pub stdout: Bytes,
    pub stderr: Bytes,
    /// Exit code; `-1` when killed by a signal or never started.
    pub code: i32,
    /// Failure to start, wait on, or finish the program.
    pub err: Option<RunError>,
}

impl RunOutput {
    /// Folds the outcome into one result: the launch failure if any, otherwise a
    /// non-zero exit code together with the captured stderr.
    pub fn error(&self) -> Result<(), RunError> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        if self.code != 0 {
            return Err(RunError::ExitCode {
                code: self.code,
                stderr: String::from_utf8_lossy(&self.stderr).into_owned(),
            });
        }
        Ok(())
    }
}

/// Runs `cmd` to completion, or until `token` is cancelled (which kills it).
///
/// Output written before a cancellation is kept. After the kill, the pipes are
/// drained for at most [`Config::grace`] in case a grandchild still holds them.
///
/// # Example
/// ```no_run
/// # async fn demo() {
/// use stdiovisor::{Command, run};
/// use tokio_util::sync::CancellationToken;
///
/// let out = run(&Command::new("uname").arg("-a"), &CancellationToken::new()).await;
/// if out.error().is_ok() {
///     println!("{}", String::from_utf8_lossy(&out.stdout));
/// }
/// # }
/// ```
pub async fn run(cmd: &Command, token: &CancellationToken) -> RunOutput {
    let program = cmd.get_program().to_string_lossy().into_owned();
    let mut tokio_cmd = cmd.to_tokio(std::iter::empty::<(&str, String)>());
    tokio_cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = match tokio_cmd.spawn() {
        Ok(child) => child,
        Err(e) => return failed(program, e),
    };
    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return failed(program, io::Error::other("stdout/stderr pipe unavailable"));
    };

    let grace = Config::default().grace;
    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();
    let mut cancelled = false;

    let waiter = async {
        tokio::select! {
            status = child.wait() => status,
            _ = token.cancelled() => {
                cancelled = true;
                tracing::debug!(%program, "run cancelled");
                if let Err(e) = child.start_kill() {
                    tracing::debug!(error = %e, "kill failed (child already exited?)");
                }
                child.wait().await
            }
        }
    };
    let pipes = async {
        let both = async {
            tokio::join!(drain(stdout, &mut stdout_buf), drain(stderr, &mut stderr_buf))
        };
        tokio::select! {
            (out, err) = both => out.and(err),
            _ = async {
                token.cancelled().await;
                tokio::time::sleep(grace).await;
            } => {
                tracing::debug!(%program, "output still open after kill, keeping what was read");
                Ok(())
            }
        }
    };
    let (status, drained) = tokio::join!(waiter, pipes);

    let code = status
        .as_ref()
        .ok()
        .and_then(|status| status.code())
        .unwrap_or(-1);
    let err = if cancelled {
        Some(RunError::Cancelled { program })
    } else {
        status.err().or(drained.err()).map(|e| RunError::Io {
            program,
            source: Arc::new(e),
        })
    };

    RunOutput {
        stdout: Bytes::from(stdout_buf),
        stderr: Bytes::from(stderr_buf),
        code,
        err,
    }
}

/// Appends everything `reader` yields to `buf` until EOF.
///
/// Bytes are appended chunk by chunk, so a dropped call keeps what it read.
async fn drain<R: AsyncRead + Unpin>(mut reader: R, buf: &mut Vec<u8>) -> io::Result<()> {
    let mut chunk = vec![0u8; DEFAULT_MTU * 2];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

fn failed(program: String, source: io::Error) -> RunOutput {
    RunOutput {
        code: -1,
        err: Some(RunError::Io {
            program,
            source: Arc::new(source),
        }),
        ..RunOutput::default()
    }
}
