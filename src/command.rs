//! # Command description.
//!
//! [`Command`] names the program to supervise, its arguments and any extra
//! environment. The supervisor adds the session variables
//! ([`PREFIX_ENV`](crate::session::PREFIX_ENV), [`ADDRESS_ENV`](crate::session::ADDRESS_ENV))
//! on top when it spawns the child.

use std::ffi::{OsStr, OsString};

/// Program, arguments and environment of a child process.
///
/// # Example
/// ```
/// use stdiovisor::Command;
///
/// let cmd = Command::new("sh").args(["-c", "echo hi"]).env("GREETING", "hi");
/// assert_eq!(cmd.get_program(), "sh");
/// assert_eq!(cmd.get_args().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Command {
    program: OsString,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
    env_clear: bool,
}

impl Command {
    /// Describes `program` with no arguments, inheriting the parent environment.
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            args: Vec::new(),
            envs: Vec::new(),
            env_clear: false,
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_owned()));
        self
    }

    /// Sets one environment variable for the child.
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((key.as_ref().to_owned(), value.as_ref().to_owned()));
        self
    }

    /// Sets several environment variables for the child.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        for (k, v) in vars {
            self = self.env(k, v);
        }
        self
    }

    /// Starts the child from an empty environment: only variables set on this
    /// command (plus the session variables) are visible to it.
    pub fn env_clear(mut self) -> Self {
        self.env_clear = true;
        self
    }

    /// Program to execute.
    pub fn get_program(&self) -> &OsStr {
        &self.program
    }

    /// Arguments, in order.
    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Extra environment variables, in the order they were set.
    pub fn get_envs(&self) -> &[(OsString, OsString)] {
        &self.envs
    }

    /// Builds the Tokio command with `extra` variables appended after the user's.
    pub(crate) fn to_tokio<'a>(
        &self,
        extra: impl IntoIterator<Item = (&'a str, String)>,
    ) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args);
        if self.env_clear {
            cmd.env_clear();
        }
        cmd.envs(self.envs.iter().map(|(k, v)| (k, v)));
        for (k, v) in extra {
            cmd.env(k, v);
        }
        cmd
    }
}
