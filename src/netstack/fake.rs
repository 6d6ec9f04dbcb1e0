//! In-memory netstack used by the unit tests.

use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::DuplexStream;
use tokio::sync::{Notify, mpsc};
use tokio_util::sync::CancellationToken;

use super::Netstack;

struct Shared {
    injected: Mutex<Vec<Vec<u8>>>,
    injected_notify: Notify,
    outbound_tx: mpsc::UnboundedSender<Vec<u8>>,
    outbound_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    closed: CancellationToken,
    close_calls: AtomicUsize,
    fail_close: AtomicBool,
    fail_write: AtomicBool,
    fail_read: AtomicBool,
    refuse_dial: AtomicBool,
    dials: Mutex<Vec<(Ipv4Addr, SocketAddrV4)>>,
    listens: Mutex<Vec<SocketAddrV4>>,
}

/// Records injected datagrams and emits datagrams queued with [`FakeNetstack::send_out`].
#[derive(Clone)]
pub(crate) struct FakeNetstack {
    shared: Arc<Shared>,
}

#[derive(Debug)]
pub(crate) struct FakeListener {
    pub(crate) local: SocketAddrV4,
}

impl FakeNetstack {
    pub(crate) fn new() -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        Self {
            shared: Arc::new(Shared {
                injected: Mutex::new(Vec::new()),
                injected_notify: Notify::new(),
                outbound_tx,
                outbound_rx: tokio::sync::Mutex::new(outbound_rx),
                closed: CancellationToken::new(),
                close_calls: AtomicUsize::new(0),
                fail_close: AtomicBool::new(false),
                fail_write: AtomicBool::new(false),
                fail_read: AtomicBool::new(false),
                refuse_dial: AtomicBool::new(false),
                dials: Mutex::new(Vec::new()),
                listens: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Makes [`Netstack::close`] return an error.
    pub(crate) fn failing_close(self) -> Self {
        self.shared.fail_close.store(true, Ordering::SeqCst);
        self
    }

    /// Makes [`Netstack::write`] return an error.
    pub(crate) fn failing_write(self) -> Self {
        self.shared.fail_write.store(true, Ordering::SeqCst);
        self
    }

    /// Makes [`Netstack::read`] return an error instead of the next datagram
    /// queued with [`send_out`](Self::send_out).
    pub(crate) fn failing_read(self) -> Self {
        self.shared.fail_read.store(true, Ordering::SeqCst);
        self
    }

    /// Makes [`Netstack::dial`] return `ConnectionRefused`.
    pub(crate) fn refusing_dial(self) -> Self {
        self.shared.refuse_dial.store(true, Ordering::SeqCst);
        self
    }

    /// Queues a datagram to be returned by the next [`Netstack::read`].
    pub(crate) fn send_out(&self, datagram: &[u8]) {
        let _ = self.shared.outbound_tx.send(datagram.to_vec());
    }

    pub(crate) fn injected(&self) -> Vec<Vec<u8>> {
        self.shared.injected.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Waits until at least `n` datagrams were injected.
    pub(crate) async fn wait_injected(&self, n: usize) -> Vec<Vec<u8>> {
        let wait = async {
            loop {
                let notified = self.shared.injected_notify.notified();
                let got = self.injected();
                if got.len() >= n {
                    return got;
                }
                notified.await;
            }
        };
        match tokio::time::timeout(Duration::from_secs(5), wait).await {
            Ok(got) => got,
            Err(_) => panic!("timed out waiting for {n} injected datagrams"),
        }
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.shared.close_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn dials(&self) -> Vec<(Ipv4Addr, SocketAddrV4)> {
        self.shared.dials.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub(crate) fn listens(&self) -> Vec<SocketAddrV4> {
        self.shared.listens.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Netstack for FakeNetstack {
    type Conn = DuplexStream;
    type Listener = FakeListener;

    async fn write(&self, datagrams: &[Vec<u8>]) -> io::Result<usize> {
        if self.shared.closed.is_cancelled() {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "netstack closed"));
        }
        if self.shared.fail_write.load(Ordering::SeqCst) {
            return Err(io::Error::other("write failed"));
        }
        if let Ok(mut injected) = self.shared.injected.lock() {
            injected.extend(datagrams.iter().cloned());
        }
        self.shared.injected_notify.notify_waiters();
        Ok(datagrams.len())
    }

    async fn read(&self, bufs: &mut [Vec<u8>], sizes: &mut [usize]) -> io::Result<usize> {
        let mut rx = self.shared.outbound_rx.lock().await;
        tokio::select! {
            _ = self.shared.closed.cancelled() => {
                Err(io::Error::new(io::ErrorKind::NotConnected, "netstack closed"))
            }
            next = rx.recv() => match (next, bufs.first_mut(), sizes.first_mut()) {
                (Some(_), _, _) if self.shared.fail_read.load(Ordering::SeqCst) => {
                    Err(io::Error::other("read failed"))
                }
                (Some(datagram), Some(buf), Some(size)) => {
                    let n = datagram.len().min(buf.len());
                    buf[..n].copy_from_slice(&datagram[..n]);
                    *size = n;
                    Ok(1)
                }
                (Some(_), _, _) => Ok(0),
                (None, _, _) => Err(io::Error::new(io::ErrorKind::NotConnected, "netstack closed")),
            },
        }
    }

    async fn close(&self) -> io::Result<()> {
        self.shared.close_calls.fetch_add(1, Ordering::SeqCst);
        self.shared.closed.cancel();
        if self.shared.fail_close.load(Ordering::SeqCst) {
            return Err(io::Error::other("close failed"));
        }
        Ok(())
    }

    async fn dial(&self, local: Ipv4Addr, remote: SocketAddrV4) -> io::Result<DuplexStream> {
        if let Ok(mut dials) = self.shared.dials.lock() {
            dials.push((local, remote));
        }
        if self.shared.refuse_dial.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        }
        let (ours, _theirs) = tokio::io::duplex(64);
        Ok(ours)
    }

    async fn listen(&self, local: SocketAddrV4) -> io::Result<FakeListener> {
        if let Ok(mut listens) = self.shared.listens.lock() {
            listens.push(local);
        }
        Ok(FakeListener { local })
    }
}
