//! # Runtime configuration.
//!
//! Provides [`Config`] centralized settings for a [`Supervisor`](crate::Supervisor)
//! and the child-side [`Link`](crate::Link).
//!
//! ## Sentinel values
//! - `read_batch = 0` → treated as 1
//! - `subscriber_capacity = 0` → treated as 1
//! - `grace = 0s` → stdout/stderr pumps are aborted as soon as the child exits

use std::time::Duration;

/// WireGuard's default MTU; datagram buffers are sized from it.
pub const DEFAULT_MTU: usize = 1420;

/// Configuration shared by the supervisor runtime and the child-side link.
///
/// ## Field semantics
/// - `read_buffer`: bytes per pipe read and per datagram buffer
/// - `read_batch`: datagram buffers offered to one netstack read (min 1)
/// - `grace`: how long stdout/stderr may keep draining after the child exited
/// - `subscriber_capacity`: queue size for attached output subscribers (min 1)
#[derive(Clone, Debug)]
pub struct Config {
    /// Size of each read buffer.
    ///
    /// Used for stdout/stderr pipe reads and for every datagram buffer handed to
    /// [`Netstack::read`](crate::Netstack::read).
    pub read_buffer: usize,

    /// Number of datagram buffers handed to a single netstack read.
    pub read_batch: usize,

    /// Drain window for stdout/stderr after the child exits.
    ///
    /// A grandchild that inherited the pipes can keep them open forever; once the
    /// window passes the pumps are aborted and the Exit message is published.
    pub grace: Duration,

    /// Queue capacity for each subscriber attached with
    /// [`Supervisor::attach`](crate::Supervisor::attach).
    pub subscriber_capacity: usize,
}

impl Config {
    /// Returns the netstack read batch clamped to a minimum of 1.
    #[inline]
    pub fn read_batch_clamped(&self) -> usize {
        self.read_batch.max(1)
    }

    /// Returns the read buffer size clamped to a minimum of 1.
    #[inline]
    pub fn read_buffer_clamped(&self) -> usize {
        self.read_buffer.max(1)
    }

    /// Returns the subscriber queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn subscriber_capacity_clamped(&self) -> usize {
        self.subscriber_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `read_buffer = 2 × MTU` (2840 bytes)
    /// - `read_batch = 1`
    /// - `grace = 2s`
    /// - `subscriber_capacity = 1024`
    fn default() -> Self {
        Self {
            read_buffer: DEFAULT_MTU * 2,
            read_batch: 1,
            grace: Duration::from_secs(2),
            subscriber_capacity: 1024,
        }
    }
}
