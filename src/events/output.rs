//! # Messages observed from the child.
//!
//! The [`OutputKind`] enum classifies what the supervisor reports:
//! - **Lifecycle**: [`OutputKind::Start`], [`OutputKind::Exit`]
//! - **Stdio**: plain stdout/stderr bytes and echoes of what was written to stdin
//!
//! Every [`Output`] carries a process-wide sequence number and a creation timestamp.
//!
//! ## Example
//! ```rust
//! use stdiovisor::{Output, OutputTag, Stream};
//!
//! let out = Output::stdio(Stream::Stderr, "oops\n");
//! assert_eq!(out.tag(), OutputTag::Stdio);
//! assert_eq!(out.data().map(|d| &d[..]), Some(&b"oops\n"[..]));
//! ```

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};

use super::{lossy, next_seq};

/// One of the child's standard streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Stdout,
    Stderr,
    Stdin,
}

impl Stream {
    /// Returns the serialized name of the stream.
    pub fn as_str(self) -> &'static str {
        match self {
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
            Stream::Stdin => "stdin",
        }
    }
}

/// Stable kind tag of an [`Output`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputTag {
    Start,
    Exit,
    Stdio,
}

impl OutputTag {
    /// Returns the serialized name of the tag.
    pub fn as_str(self) -> &'static str {
        match self {
            OutputTag::Start => "start",
            OutputTag::Exit => "exit",
            OutputTag::Stdio => "stdio",
        }
    }
}

/// Payload of an [`Output`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputKind {
    /// The child was started.
    Start,
    /// The child finished. `code` is `-1` when it was killed by a signal or its
    /// status could not be determined.
    Exit {
        /// Exit code.
        code: i32,
    },
    /// Bytes seen on one of the child's streams.
    Stdio {
        /// Which stream.
        stream: Stream,
        /// Raw bytes.
        data: Bytes,
    },
}

/// A message reported by a [`Supervisor`](crate::Supervisor).
#[derive(Debug, Clone)]
pub struct Output {
    /// Process-wide monotonic sequence number.
    pub seq: u64,
    /// Creation time.
    pub at: DateTime<Utc>,
    /// Payload.
    pub kind: OutputKind,
}

impl Output {
    fn new(kind: OutputKind) -> Self {
        Self {
            seq: next_seq(),
            at: Utc::now(),
            kind,
        }
    }

    /// The child started.
    pub fn start() -> Self {
        Self::new(OutputKind::Start)
    }

    /// The child exited with `code`.
    pub fn exit(code: i32) -> Self {
        Self::new(OutputKind::Exit { code })
    }

    /// Bytes seen on `stream`.
    pub fn stdio(stream: Stream, data: impl Into<Bytes>) -> Self {
        Self::new(OutputKind::Stdio {
            stream,
            data: data.into(),
        })
    }

    /// Returns the kind tag.
    pub fn tag(&self) -> OutputTag {
        match self.kind {
            OutputKind::Start => OutputTag::Start,
            OutputKind::Exit { .. } => OutputTag::Exit,
            OutputKind::Stdio { .. } => OutputTag::Stdio,
        }
    }

    /// Returns the stream for stdio output.
    pub fn stream(&self) -> Option<Stream> {
        match self.kind {
            OutputKind::Stdio { stream, .. } => Some(stream),
            _ => None,
        }
    }

    /// Returns the bytes for stdio output.
    pub fn data(&self) -> Option<&Bytes> {
        match &self.kind {
            OutputKind::Stdio { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Returns the exit code for exit output.
    pub fn exit_code(&self) -> Option<i32> {
        match self.kind {
            OutputKind::Exit { code } => Some(code),
            _ => None,
        }
    }
}

impl Serialize for Output {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("seq", &self.seq)?;
        map.serialize_entry("time", &self.at)?;
        map.serialize_entry("kind", self.tag().as_str())?;
        match &self.kind {
            OutputKind::Start => {}
            OutputKind::Exit { code } => map.serialize_entry("code", code)?,
            OutputKind::Stdio { stream, data } => {
                map.serialize_entry("stdio", stream.as_str())?;
                map.serialize_entry("data", &lossy(data))?;
            }
        }
        map.end()
    }
}
