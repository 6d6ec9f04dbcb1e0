//! # Line demultiplexer.
//!
//! [`Demux`] splits one byte stream into two sub-streams:
//! - **plain**: ordinary text, forwarded byte-for-byte as soon as it is classified;
//! - **tagged**: lines of the form `<prefix> <payload>\n`, made visible only once the
//!   whole line (including its newline) has arrived, with the prefix and the separating
//!   space stripped.
//!
//! ## State machine
//! ```text
//!                  prefix[0]            prefix[i]              ' '
//!   LineStart ───────────────► Matching(1) ──► ... ──► CheckSpace ──────► Tagged
//!       ▲  │ mismatch                │ mismatch             │ other         │
//!       │  ▼                         ▼                      ▼               │ '\n'
//!       │ Plain ◄──── flush prefix[..i] + byte    flush prefix + byte       │
//!       │  │                                                                │
//!       └──┴──────────────────────── '\n' ─────────────────────────────────┘
//! ```
//!
//! ## Rules
//! - An empty prefix never tags anything: every byte goes to plain.
//! - A partially matched prefix is flushed to plain as soon as it stops matching.
//! - The machine is resumable: feeding `a` then `b` drains the same bytes as feeding `a ++ b`.
//!
//! ## Example
//! ```rust
//! use stdiovisor::Demux;
//!
//! let mut demux = Demux::new("aaa");
//! demux.write(b"hello\naaa aGk=\n");
//! assert_eq!(&demux.drain_plain()[..], b"hello\n");
//! assert_eq!(&demux.drain_tagged()[..], b"aGk=\n");
//! ```

use bytes::{BufMut, Bytes, BytesMut};

/// Parser position within the current line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// At the first byte of a line.
    LineStart,
    /// `n` bytes of the prefix have matched so far (`0 < n < prefix.len()`).
    Matching(usize),
    /// The full prefix matched; the next byte must be a space.
    CheckSpace,
    /// Inside an ordinary line.
    Plain,
    /// Inside a tagged line; bytes accumulate until the newline.
    Tagged,
}

/// Incremental plain/tagged splitter for a single stream.
///
/// Owned by exactly one reader; not synchronized.
#[derive(Debug)]
pub struct Demux {
    prefix: Box<[u8]>,
    state: State,
    plain: BytesMut,
    tagged: BytesMut,
    line: BytesMut,
}

impl Demux {
    /// Creates a demultiplexer recognizing lines tagged with `prefix`.
    ///
    /// An empty prefix produces a pass-through that only ever fills the plain buffer.
    pub fn new(prefix: impl AsRef<[u8]>) -> Self {
        let prefix: Box<[u8]> = prefix.as_ref().into();
        let state = if prefix.is_empty() {
            State::Plain
        } else {
            State::LineStart
        };
        Self {
            prefix,
            state,
            plain: BytesMut::new(),
            tagged: BytesMut::new(),
            line: BytesMut::new(),
        }
    }

    /// Returns the configured prefix.
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// Feeds `bytes` through the state machine. Never fails.
    pub fn write(&mut self, bytes: &[u8]) {
        if self.prefix.is_empty() {
            self.plain.extend_from_slice(bytes);
            return;
        }
        for &b in bytes {
            self.state = self.step(b);
        }
    }

    /// Takes everything classified as plain since the last drain.
    pub fn drain_plain(&mut self) -> Bytes {
        self.plain.split().freeze()
    }

    /// Takes every complete tagged line seen since the last drain.
    ///
    /// Each line excludes the prefix and separator and keeps its trailing `\n`.
    pub fn drain_tagged(&mut self) -> Bytes {
        self.tagged.split().freeze()
    }

    fn step(&mut self, b: u8) -> State {
        match self.state {
            State::LineStart => self.match_prefix(0, b),
            State::Matching(n) => self.match_prefix(n, b),
            State::CheckSpace => {
                if b == b' ' {
                    self.line.clear();
                    return State::Tagged;
                }
                self.plain.extend_from_slice(&self.prefix);
                self.push_plain(b)
            }
            State::Plain => self.push_plain(b),
            State::Tagged => {
                self.line.put_u8(b);
                if b == b'\n' {
                    self.tagged.extend_from_slice(&self.line);
                    self.line.clear();
                    State::LineStart
                } else {
                    State::Tagged
                }
            }
        }
    }

    /// Compares `b` against `prefix[n]`; on mismatch flushes the matched part.
    fn match_prefix(&mut self, n: usize, b: u8) -> State {
        if b == self.prefix[n] {
            return if n + 1 == self.prefix.len() {
                State::CheckSpace
            } else {
                State::Matching(n + 1)
            };
        }
        self.plain.extend_from_slice(&self.prefix[..n]);
        self.push_plain(b)
    }

    fn push_plain(&mut self, b: u8) -> State {
        self.plain.put_u8(b);
        if b == b'\n' {
            State::LineStart
        } else {
            State::Plain
        }
    }
}
