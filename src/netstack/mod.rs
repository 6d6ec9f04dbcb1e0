//! # Virtual network stack boundary.
//!
//! The supervisor does not implement TCP/IP. It moves raw datagrams between the
//! child's stdio and an implementation of [`Netstack`], and proxies
//! [`dial`](Netstack::dial)/[`listen`](Netstack::listen) to it.
//!
//! ## Data flow
//! ```text
//! child stdout ─► Demux ─► frame::decode ─► Netstack::write ─┐
//!                                                            │  (userspace TCP/IP)
//! child stdin  ◄─ input pump ◄─ frame::encode ◄─ Netstack::read
//! ```
//!
//! ## Contract
//! - Every method may block and may fail; errors are propagated unchanged.
//! - After [`close`](Netstack::close), pending and later reads must fail so the
//!   packet pump terminates.
//! - One instance is owned by exactly one supervisor (or one child-side link).

use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};

use async_trait::async_trait;

#[cfg(test)]
pub(crate) mod fake;

/// Raw-datagram network stack with TCP connect/listen semantics.
#[async_trait]
pub trait Netstack: Send + Sync + 'static {
    /// Outbound connection returned by [`dial`](Self::dial).
    type Conn: Send + 'static;
    /// Listener returned by [`listen`](Self::listen).
    type Listener: Send + 'static;

    /// Injects datagrams received from the peer. Returns how many were accepted.
    async fn write(&self, datagrams: &[Vec<u8>]) -> io::Result<usize>;

    /// Reads outgoing datagrams into `bufs`, storing each length in `sizes`.
    ///
    /// Returns how many buffers were filled. Blocks until at least one datagram is
    /// ready or the stack is closed.
    async fn read(&self, bufs: &mut [Vec<u8>], sizes: &mut [usize]) -> io::Result<usize>;

    /// Shuts the stack down. Called exactly once by the owner.
    async fn close(&self) -> io::Result<()>;

    /// Opens a TCP connection from `local` to `remote`.
    async fn dial(&self, local: Ipv4Addr, remote: SocketAddrV4) -> io::Result<Self::Conn>;

    /// Listens for TCP connections on `local`.
    async fn listen(&self, local: SocketAddrV4) -> io::Result<Self::Listener>;
}
