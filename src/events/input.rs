//! # Messages written to the child's stdin.
//!
//! [`Input`] carries one of three payloads:
//! - [`InputKind::Text`] raw bytes, written verbatim;
//! - [`InputKind::Editor`] an out-of-band editor command behind [`EDITOR_PREFIX`];
//! - [`InputKind::Packet`] a datagram from the supervisor's own netstack, framed as a
//!   tagged line. Only the packet pump creates these.

use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};
use uuid::Uuid;

use super::{lossy, next_seq};
use crate::frame;

/// Control prefix of editor command lines. Never interpreted as network traffic.
pub const EDITOR_PREFIX: &str = "()()()!@#$%%^&*(32u4io32u4i";

/// Stable kind tag of an [`Input`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputTag {
    Text,
    Editor,
    Packet,
}

impl InputTag {
    /// Returns the serialized name of the tag.
    pub fn as_str(self) -> &'static str {
        match self {
            InputTag::Text => "text",
            InputTag::Editor => "editor",
            InputTag::Packet => "packet",
        }
    }
}

/// Payload of an [`Input`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    /// Bytes written as-is; the caller controls any trailing newline.
    Text(Bytes),
    /// Editor command `"<EDITOR_PREFIX> <id> <data>\n"`.
    Editor {
        /// Command identifier.
        id: Uuid,
        /// Command payload.
        data: Bytes,
    },
    /// Datagram framed with the session prefix.
    Packet {
        /// Session prefix of the owning supervisor.
        prefix: Arc<str>,
        /// Raw datagram.
        data: Bytes,
    },
}

/// A message destined for the child's stdin.
#[derive(Debug, Clone)]
pub struct Input {
    /// Process-wide monotonic sequence number.
    pub seq: u64,
    /// Creation time.
    pub at: DateTime<Utc>,
    /// Payload.
    pub kind: InputKind,
}

impl Input {
    fn new(kind: InputKind) -> Self {
        Self {
            seq: next_seq(),
            at: Utc::now(),
            kind,
        }
    }

    /// Raw text, written verbatim.
    pub fn text(data: impl Into<Bytes>) -> Self {
        Self::new(InputKind::Text(data.into()))
    }

    /// Raw text followed by a newline.
    pub fn line(data: impl AsRef<[u8]>) -> Self {
        let data = data.as_ref();
        let mut buf = BytesMut::with_capacity(data.len() + 1);
        buf.put_slice(data);
        buf.put_u8(b'\n');
        Self::new(InputKind::Text(buf.freeze()))
    }

    /// Editor command with the given identifier.
    pub fn editor(id: Uuid, data: impl Into<Bytes>) -> Self {
        Self::new(InputKind::Editor {
            id,
            data: data.into(),
        })
    }

    pub(crate) fn packet(prefix: Arc<str>, data: Bytes) -> Self {
        Self::new(InputKind::Packet { prefix, data })
    }

    /// Returns the kind tag.
    pub fn tag(&self) -> InputTag {
        match self.kind {
            InputKind::Text(_) => InputTag::Text,
            InputKind::Editor { .. } => InputTag::Editor,
            InputKind::Packet { .. } => InputTag::Packet,
        }
    }

    #[inline]
    pub fn is_packet(&self) -> bool {
        matches!(self.kind, InputKind::Packet { .. })
    }

    /// Returns `true` for text input with no bytes; such input is never written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(&self.kind, InputKind::Text(data) if data.is_empty())
    }

    /// Returns the bytes written to the child's stdin for this input.
    pub fn encode(&self) -> Bytes {
        match &self.kind {
            InputKind::Text(data) => data.clone(),
            InputKind::Editor { id, data } => {
                let mut buf = BytesMut::with_capacity(EDITOR_PREFIX.len() + 38 + data.len() + 1);
                buf.put_slice(EDITOR_PREFIX.as_bytes());
                buf.put_u8(b' ');
                buf.put_slice(id.hyphenated().to_string().as_bytes());
                buf.put_u8(b' ');
                buf.put_slice(data);
                buf.put_u8(b'\n');
                buf.freeze()
            }
            InputKind::Packet { prefix, data } => Bytes::from(frame::encode(prefix, data)),
        }
    }
}

impl Serialize for Input {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("seq", &self.seq)?;
        map.serialize_entry("time", &self.at)?;
        map.serialize_entry("kind", self.tag().as_str())?;
        match &self.kind {
            InputKind::Text(data) => map.serialize_entry("data", &lossy(data))?,
            InputKind::Editor { id, data } => {
                map.serialize_entry("id", id)?;
                map.serialize_entry("data", &lossy(data))?;
            }
            InputKind::Packet { data, .. } => map.serialize_entry("data", &lossy(data))?,
        }
        map.end()
    }
}
