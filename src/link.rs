//! # Child-side link: the other end of a supervisor's tunnel.
//!
//! A program started by a [`Supervisor`](crate::Supervisor) recovers its session from
//! the environment ([`LinkEnv`]), allocates its own [`Netstack`] on a random public
//! address, and multiplexes packets over its own stdio:
//!
//! ```text
//! stdin  ──► Demux(prefix) ─┬─ plain  ──► Link::take_stdin()   (what the program reads)
//!                           └─ tagged ──► frame::decode ──► Netstack::write
//!
//! Netstack::read ──► frame::encode ──┐
//! Link::write_stdout(bytes) ─────────┴──► stdout (one lock, whole writes never interleave)
//! ```
//!
//! ## Rules
//! - The plain stdin stream must be read (or dropped); an unread stream eventually
//!   stalls packet delivery.
//! - [`Link::close`] closes the netstack once; later calls return `Ok(())`.

use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    demux::Demux,
    error::LinkError,
    frame,
    netstack::Netstack,
    session::{self, ADDRESS_ENV, PREFIX_ENV},
};

/// Capacity of the in-memory pipe carrying plain stdin bytes to the program.
const STDIN_PIPE_CAPACITY: usize = 64 * 1024;

type SharedWriter = tokio::sync::Mutex<Box<dyn AsyncWrite + Send + Unpin>>;

/// Session parameters handed to the child by its supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEnv {
    /// Prefix tagging packet lines.
    pub prefix: String,
    /// The parent's virtual address.
    pub parent: Ipv4Addr,
}

impl LinkEnv {
    /// Reads [`PREFIX_ENV`] and [`ADDRESS_ENV`] from the process environment.
    pub fn from_env() -> Result<Self, LinkError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the session variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LinkError> {
        let prefix = lookup(PREFIX_ENV)
            .filter(|p| !p.is_empty())
            .ok_or(LinkError::MissingVar { name: PREFIX_ENV })?;
        let raw = lookup(ADDRESS_ENV).ok_or(LinkError::MissingVar { name: ADDRESS_ENV })?;
        let parent = raw
            .parse()
            .map_err(|source| LinkError::InvalidAddress { value: raw, source })?;
        Ok(Self { prefix, parent })
    }
}

struct LinkInner<N: Netstack> {
    env: LinkEnv,
    address: Ipv4Addr,
    netstack: N,
    stdout: SharedWriter,
    token: CancellationToken,
    closed: AtomicBool,
}

/// Packet tunnel over the current process's stdio.
pub struct Link<N: Netstack> {
    inner: Arc<LinkInner<N>>,
    stdin: Mutex<Option<DuplexStream>>,
}

impl<N: Netstack> Link<N> {
    /// Connects to the parent over the process's own stdin/stdout.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn from_stdio(open: impl FnOnce() -> io::Result<N>) -> Result<Self, LinkError> {
        let env = LinkEnv::from_env()?;
        let netstack = open()?;
        Ok(Self::new(
            env,
            netstack,
            tokio::io::stdin(),
            tokio::io::stdout(),
            Config::default(),
        ))
    }

    /// Starts the stdin sorter and the packet writer over `reader` and `writer`.
    pub fn new<R, W>(env: LinkEnv, netstack: N, reader: R, writer: W, cfg: Config) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let address = loop {
            let candidate = session::random_public_ipv4();
            if candidate != env.parent {
                break candidate;
            }
        };
        let demux = Demux::new(&env.prefix);
        let writer: Box<dyn AsyncWrite + Send + Unpin> = Box::new(writer);
        let inner = Arc::new(LinkInner {
            env,
            address,
            netstack,
            stdout: tokio::sync::Mutex::new(writer),
            token: CancellationToken::new(),
            closed: AtomicBool::new(false),
        });

        let (plain_tx, plain_rx) = tokio::io::duplex(STDIN_PIPE_CAPACITY);
        tokio::spawn(sort_stdin(Arc::clone(&inner), reader, plain_tx, demux, cfg.clone()));
        tokio::spawn(write_packets(Arc::clone(&inner), cfg));

        Self {
            inner,
            stdin: Mutex::new(Some(plain_rx)),
        }
    }

    /// Takes the stream of plain (non-packet) stdin bytes. Returns `None` after the first call.
    pub fn take_stdin(&self) -> Option<DuplexStream> {
        self.stdin
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Writes `bytes` to stdout without interleaving with packet lines.
    pub async fn write_stdout(&self, bytes: &[u8]) -> io::Result<()> {
        let mut out = self.inner.stdout.lock().await;
        out.write_all(bytes).await?;
        out.flush().await
    }

    /// Opens a TCP connection from this side's address to `remote`.
    pub async fn dial(&self, remote: SocketAddrV4) -> io::Result<N::Conn> {
        self.inner.netstack.dial(self.inner.address, remote).await
    }

    /// Opens a TCP connection to `port` on the parent.
    pub async fn dial_parent(&self, port: u16) -> io::Result<N::Conn> {
        self.dial(self.parent_addr(port)).await
    }

    /// Listens on `port` at this side's address.
    pub async fn listen(&self, port: u16) -> io::Result<N::Listener> {
        let local = SocketAddrV4::new(self.inner.address, port);
        self.inner.netstack.listen(local).await
    }

    /// Socket address of `port` on the parent.
    pub fn parent_addr(&self, port: u16) -> SocketAddrV4 {
        SocketAddrV4::new(self.inner.env.parent, port)
    }

    /// This side's virtual address.
    pub fn address(&self) -> Ipv4Addr {
        self.inner.address
    }

    /// Session parameters recovered from the parent.
    pub fn env(&self) -> &LinkEnv {
        &self.inner.env
    }

    /// Stops both pumps and closes the netstack. Only the first call closes it.
    pub async fn close(&self) -> io::Result<()> {
        self.inner.token.cancel();
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.inner.netstack.close().await
    }

    /// Returns `true` once [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

/// Routes stdin: plain bytes to the program, packet lines to the netstack.
async fn sort_stdin<N, R>(
    inner: Arc<LinkInner<N>>,
    mut reader: R,
    plain_tx: DuplexStream,
    mut demux: Demux,
    cfg: Config,
) where
    N: Netstack,
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut plain_tx = Some(plain_tx);
    let mut buf = vec![0u8; cfg.read_buffer_clamped()];
    loop {
        let read = tokio::select! {
            _ = inner.token.cancelled() => break,
            res = reader.read(&mut buf) => res,
        };
        let n = match read {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(error = %e, "stdin read failed");
                break;
            }
        };

        demux.write(&buf[..n]);
        let plain = demux.drain_plain();
        if let Some(tx) = plain_tx.as_mut().filter(|_| !plain.is_empty()) {
            if tx.write_all(&plain).await.is_err() {
                // Reader side dropped: discard plain input from now on.
                plain_tx = None;
            }
        }

        let datagrams = frame::decode(&demux.drain_tagged());
        if datagrams.is_empty() {
            continue;
        }
        if let Err(e) = inner.netstack.write(&datagrams).await {
            tracing::warn!(error = %e, count = datagrams.len(), "netstack write failed");
            break;
        }
    }
}

/// Frames every datagram the netstack emits onto stdout.
async fn write_packets<N: Netstack>(inner: Arc<LinkInner<N>>, cfg: Config) {
    let size = cfg.read_buffer_clamped();
    let batch = cfg.read_batch_clamped();
    let mut bufs = vec![vec![0u8; size]; batch];
    let mut sizes = vec![0usize; batch];

    loop {
        let read = tokio::select! {
            _ = inner.token.cancelled() => return,
            res = inner.netstack.read(&mut bufs, &mut sizes) => res,
        };
        let n = match read {
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(error = %e, "netstack read failed");
                return;
            }
        };

        let mut out = inner.stdout.lock().await;
        for (buf, &len) in bufs.iter().zip(&sizes).take(n) {
            if len == 0 {
                continue;
            }
            let line = frame::encode(&inner.env.prefix, &buf[..len.min(buf.len())]);
            if let Err(e) = out.write_all(&line).await {
                tracing::debug!(error = %e, "stdout write failed");
                return;
            }
        }
        if let Err(e) = out.flush().await {
            tracing::debug!(error = %e, "stdout flush failed");
            return;
        }
    }
}
