//! # Supervisor: one child process behind a virtual network interface.
//!
//! A [`Supervisor`] owns the child, its three pipes, a [`Netstack`] and two buses.
//! Packet lines on the child's stdout are injected into the netstack; datagrams the
//! netstack emits are framed and written to the child's stdin.
//!
//! ## Architecture
//! ```text
//! SupervisorBuilder::spawn():
//!   open netstack ─► prefix + address ─► spawn child (env: PACKET_PREFIX, PARENT_ADDRESS)
//!        └─► input pump   (input bus ─► child stdin, echo ─► output bus)
//!        └─► packet pump  (Netstack::read ─► Input::packet ─► input bus)
//!        └─► watcher      (lifecycle cancelled ─► close)
//!
//! Supervisor::start():
//!   publish Start ─► runner:
//!        ├─► stdout pump  (Demux(prefix): plain ─► output bus, tagged ─► Netstack::write)
//!        ├─► stderr pump  (Demux(""):     plain ─► output bus)
//!        └─► child.wait() or lifecycle cancelled (kill)
//!              └─► join pumps within grace ─► finish(Exit(code))
//!
//! finish():
//!   Netstack::close ─► complete input bus ─► complete output bus (+ final Exit)
//!                   ─► done ─► cancel lifecycle
//! ```
//!
//! ## Rules
//! - `start` takes effect once; later calls are no-ops.
//! - `close` before `start` kills and reaps the child, no `Exit` is published.
//! - `close` after `start` waits for the natural completion signal.
//! - Any pump failure cancels the lifecycle, which closes the supervisor.
//! - Every caller of `close` receives the same accumulated error.
//! - All tasks spawned by a supervisor exit once it is closed.
//!
//! ## Example
//! ```no_run
//! # async fn demo<N: stdiovisor::Netstack>(open: impl FnOnce() -> std::io::Result<N>) -> Result<(), stdiovisor::RuntimeError> {
//! use stdiovisor::{Command, Input, SupervisorBuilder};
//! use tokio_util::sync::CancellationToken;
//!
//! let sup = SupervisorBuilder::new(Command::new("my-tool")).spawn(open).await?;
//! let mut out = sup.output(&CancellationToken::new());
//! sup.start();
//! sup.input(Input::line("hello"));
//! while let Some(msg) = out.recv().await {
//!     println!("{}", msg.tag().as_str());
//! }
//! sup.close().await
//! # }
//! ```

use std::fmt;
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use super::builder::reap;
use super::pump;
use crate::{
    config::Config,
    demux::Demux,
    error::RuntimeError,
    events::{Bus, Input, Output, Stream, Subscription},
    netstack::Netstack,
    subscribers::{self, Subscribe},
};

/// Child handle plus the two pipes read once the supervisor starts.
pub(super) struct Process {
    pub(super) child: Child,
    pub(super) stdout: ChildStdout,
    pub(super) stderr: ChildStderr,
}

pub(super) struct Inner<N: Netstack> {
    pub(super) cfg: Config,
    pub(super) netstack: N,
    pub(super) prefix: Arc<str>,
    pub(super) address: Ipv4Addr,
    pub(super) input: Bus<Input>,
    pub(super) output: Bus<Output>,
    /// Lifecycle: cancelled on close, on pump failure, or by the parent token.
    pub(super) token: CancellationToken,
    /// Fires once cleanup finished.
    done: CancellationToken,
    started: AtomicBool,
    process: Mutex<Option<Process>>,
    error: Mutex<Option<RuntimeError>>,
}

/// Supervises one child process and bridges its stdio to a [`Netstack`].
///
/// Cheap to clone; clones share the same child. Created with [`SupervisorBuilder`](crate::SupervisorBuilder).
/// Call [`close`](Supervisor::close) (or cancel the parent token) to release it.
pub struct Supervisor<N: Netstack> {
    inner: Arc<Inner<N>>,
}

impl<N: Netstack> Clone for Supervisor<N> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<N: Netstack> fmt::Debug for Supervisor<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("prefix", &self.inner.prefix)
            .field("address", &self.inner.address)
            .field("started", &self.is_started())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<N: Netstack> Supervisor<N> {
    /// Wires a freshly spawned child to its pumps. Called by the builder only.
    pub(super) fn assemble(
        cfg: Config,
        netstack: N,
        prefix: String,
        address: Ipv4Addr,
        token: CancellationToken,
        process: Process,
        stdin: ChildStdin,
    ) -> Self {
        let inner = Arc::new(Inner {
            cfg,
            netstack,
            prefix: Arc::from(prefix),
            address,
            input: Bus::new(),
            output: Bus::new(),
            token,
            done: CancellationToken::new(),
            started: AtomicBool::new(false),
            process: Mutex::new(Some(process)),
            error: Mutex::new(None),
        });

        // Registered before returning so no early input is missed.
        let rx = inner.input.subscribe(&inner.token);
        tokio::spawn(pump::input(Arc::clone(&inner), rx, stdin));
        tokio::spawn(pump::packets(Arc::clone(&inner)));

        let watcher = Arc::clone(&inner);
        tokio::spawn(async move {
            watcher.token.cancelled().await;
            let _ = watcher.close().await;
        });

        Self { inner }
    }

    /// Starts pumping the child's stdout/stderr and publishes [`Output::start`].
    ///
    /// Only the first call has an effect; calls after [`close`](Self::close) are ignored.
    pub fn start(&self) {
        if self
            .inner
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        self.inner.output.publish(Output::start());
        tokio::spawn(run(Arc::clone(&self.inner)));
    }

    /// Closes the supervisor and returns the accumulated error, if any.
    ///
    /// Idempotent: concurrent and repeated calls all observe the same result.
    pub async fn close(&self) -> Result<(), RuntimeError> {
        self.inner.close().await
    }

    /// Resolves once the supervisor finished cleaning up.
    pub async fn wait(&self) {
        self.inner.done.cancelled().await;
    }

    /// Queues `msg` for the child's stdin.
    ///
    /// Empty text and packet messages are dropped: packets only come from the netstack.
    pub fn input(&self, msg: Input) {
        if msg.is_packet() || msg.is_empty() {
            return;
        }
        self.inner.input.publish(msg);
    }

    /// Subscribes to the output stream for as long as `scope` is alive.
    ///
    /// The subscription ends after the final message once the supervisor closed.
    pub fn output(&self, scope: &CancellationToken) -> Subscription<Output> {
        self.inner.output.subscribe(scope)
    }

    /// Delivers every output message to `sub` on its own worker.
    ///
    /// The returned handle resolves after the subscriber saw the final message.
    pub fn attach(&self, sub: Arc<dyn Subscribe>) -> JoinHandle<()> {
        let rx = self.inner.output.subscribe(&CancellationToken::new());
        subscribers::spawn_worker(sub, rx, self.inner.cfg.subscriber_capacity_clamped())
    }

    /// Opens a TCP connection from the parent's virtual address to `remote`.
    pub async fn dial(&self, remote: SocketAddrV4) -> io::Result<N::Conn> {
        self.inner.netstack.dial(self.inner.address, remote).await
    }

    /// Listens on `port` at the parent's virtual address.
    pub async fn listen(&self, port: u16) -> io::Result<N::Listener> {
        let local = SocketAddrV4::new(self.inner.address, port);
        self.inner.netstack.listen(local).await
    }

    /// Session prefix tagging packet lines.
    pub fn prefix(&self) -> &str {
        &self.inner.prefix
    }

    /// The parent's virtual address.
    pub fn address(&self) -> Ipv4Addr {
        self.inner.address
    }

    /// Returns `true` once [`start`](Self::start) or [`close`](Self::close) ran.
    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    /// Returns `true` once cleanup finished.
    pub fn is_closed(&self) -> bool {
        self.inner.done.is_cancelled()
    }
}

impl<N: Netstack> Inner<N> {
    async fn close(&self) -> Result<(), RuntimeError> {
        self.token.cancel();
        let never_started = self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if never_started {
            if let Some(mut process) = self.take_process() {
                reap(&mut process.child).await;
            }
            self.finish(None).await;
        } else {
            self.done.cancelled().await;
        }
        match lock(&self.error).clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Releases the netstack, completes both buses and signals completion.
    async fn finish(&self, exit: Option<i32>) {
        if let Err(e) = self.netstack.close().await {
            tracing::warn!(error = %e, "failed to close netstack");
            self.record(RuntimeError::NetstackClose(Arc::new(e)));
        }
        self.input.complete([]);
        self.output.complete(exit.map(Output::exit));
        self.done.cancel();
        self.token.cancel();
    }

    fn take_process(&self) -> Option<Process> {
        lock(&self.process).take()
    }

    pub(super) fn record(&self, err: RuntimeError) {
        let mut slot = lock(&self.error);
        *slot = RuntimeError::join(slot.take(), Some(err));
    }
}

/// Runs the started child to completion and finishes the supervisor.
async fn run<N: Netstack>(inner: Arc<Inner<N>>) {
    let Some(Process {
        mut child,
        stdout,
        stderr,
    }) = inner.take_process()
    else {
        inner.finish(None).await;
        return;
    };

    let mut pumps = JoinSet::new();
    pumps.spawn(pump::stream(
        Arc::clone(&inner),
        stdout,
        Stream::Stdout,
        Demux::new(&*inner.prefix),
    ));
    pumps.spawn(pump::stream(
        Arc::clone(&inner),
        stderr,
        Stream::Stderr,
        Demux::new(""),
    ));

    let status = tokio::select! {
        status = child.wait() => status,
        _ = inner.token.cancelled() => {
            if let Err(e) = child.start_kill() {
                tracing::debug!(error = %e, "kill failed (child already exited?)");
            }
            child.wait().await
        }
    };

    let drained = tokio::time::timeout(inner.cfg.grace, async {
        while pumps.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        tracing::warn!(grace = ?inner.cfg.grace, "stdio pumps did not drain in time");
        pumps.abort_all();
    }

    let code = match status {
        Ok(status) => status.code().unwrap_or(-1),
        Err(e) => {
            inner.record(RuntimeError::Wait(Arc::new(e)));
            -1
        }
    };
    tracing::debug!(code, "child exited");
    inner.finish(Some(code)).await;
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;

    use super::*;
    use crate::command::Command;
    use crate::core::SupervisorBuilder;
    use crate::events::OutputTag;
    use crate::frame;
    use crate::netstack::fake::FakeNetstack;

    async fn spawn_sh(script: &str, ns: &FakeNetstack) -> Supervisor<FakeNetstack> {
        let ns = ns.clone();
        SupervisorBuilder::new(Command::new("sh").args(["-c", script]))
            .spawn(move || Ok(ns))
            .await
            .expect("spawn")
    }

    async fn collect(mut rx: Subscription<Output>) -> Vec<Output> {
        let mut all = Vec::new();
        let recv = async {
            while let Some(msg) = rx.recv().await {
                all.push(msg);
            }
        };
        tokio::time::timeout(Duration::from_secs(10), recv)
            .await
            .expect("output did not complete");
        all
    }

    fn stdio_of(msgs: &[Output], stream: Stream) -> Vec<u8> {
        msgs.iter()
            .filter(|m| m.stream() == Some(stream))
            .flat_map(|m| m.data().cloned().unwrap_or_default().to_vec())
            .collect()
    }

    #[tokio::test]
    async fn test_stdout_and_stderr_are_published() {
        let ns = FakeNetstack::new();
        let sup = spawn_sh("echo out; echo err 1>&2; exit 3", &ns).await;
        let rx = sup.output(&CancellationToken::new());
        sup.start();

        let msgs = collect(rx).await;
        assert_eq!(msgs.first().map(Output::tag), Some(OutputTag::Start));
        assert_eq!(msgs.last().and_then(Output::exit_code), Some(3));
        assert_eq!(stdio_of(&msgs, Stream::Stdout), b"out\n");
        assert_eq!(stdio_of(&msgs, Stream::Stderr), b"err\n");

        assert!(sup.close().await.is_ok());
        assert_eq!(ns.close_calls(), 1);
    }

    #[tokio::test]
    async fn test_child_sees_session_env() {
        let ns = FakeNetstack::new();
        let sup = spawn_sh("echo \"$PACKET_PREFIX:$PARENT_ADDRESS\"", &ns).await;
        let rx = sup.output(&CancellationToken::new());
        sup.start();

        let msgs = collect(rx).await;
        let expected = format!("{}:{}\n", sup.prefix(), sup.address());
        assert_eq!(stdio_of(&msgs, Stream::Stdout), expected.as_bytes());
    }

    #[tokio::test]
    async fn test_prefix_and_space_is_always_tagged() {
        let ns = FakeNetstack::new();
        let sup = spawn_sh("echo \"$PACKET_PREFIX $PARENT_ADDRESS\"", &ns).await;
        let rx = sup.output(&CancellationToken::new());
        sup.start();

        let msgs = collect(rx).await;
        // Not base64: the line is consumed as a packet line and dropped.
        assert!(stdio_of(&msgs, Stream::Stdout).is_empty());
        assert!(ns.injected().is_empty());
        assert_eq!(msgs.last().and_then(Output::exit_code), Some(0));
    }

    #[tokio::test]
    async fn test_packet_lines_reach_netstack() {
        let ns = FakeNetstack::new();
        let sup = spawn_sh("echo \"$PACKET_PREFIX aGVsbG8=\"; echo plain", &ns).await;
        let rx = sup.output(&CancellationToken::new());
        sup.start();

        let got = ns.wait_injected(1).await;
        assert_eq!(got, vec![b"hello".to_vec()]);

        let msgs = collect(rx).await;
        assert_eq!(stdio_of(&msgs, Stream::Stdout), b"plain\n");
    }

    #[tokio::test]
    async fn test_prefixed_stderr_is_plain() {
        let ns = FakeNetstack::new();
        let sup = spawn_sh("echo \"$PACKET_PREFIX aGVsbG8=\" 1>&2", &ns).await;
        let rx = sup.output(&CancellationToken::new());
        sup.start();

        let msgs = collect(rx).await;
        let stderr = stdio_of(&msgs, Stream::Stderr);
        assert!(stderr.starts_with(sup.prefix().as_bytes()));
        assert!(ns.injected().is_empty());
    }

    #[tokio::test]
    async fn test_netstack_datagrams_are_framed_on_stdin() {
        let ns = FakeNetstack::new();
        let sup = spawn_sh("read line; echo \"got $line\"", &ns).await;
        let rx = sup.output(&CancellationToken::new());
        sup.start();
        ns.send_out(b"hello");

        let msgs = collect(rx).await;
        let expected = format!("got {}", String::from_utf8_lossy(&frame::encode(sup.prefix(), b"hello")));
        assert_eq!(stdio_of(&msgs, Stream::Stdout), expected.as_bytes());
        // Packets are never echoed.
        assert!(stdio_of(&msgs, Stream::Stdin).is_empty());
    }

    #[tokio::test]
    async fn test_input_is_written_and_echoed() {
        let ns = FakeNetstack::new();
        let sup = spawn_sh("read line; echo \"got $line\"", &ns).await;
        let rx = sup.output(&CancellationToken::new());
        sup.start();
        sup.input(Input::line("hi"));

        let msgs = collect(rx).await;
        assert_eq!(stdio_of(&msgs, Stream::Stdout), b"got hi\n");
        assert_eq!(stdio_of(&msgs, Stream::Stdin), b"hi\n");
    }

    #[tokio::test]
    async fn test_packet_and_empty_input_are_dropped() {
        let ns = FakeNetstack::new();
        let sup = spawn_sh("sleep 5", &ns).await;
        let mut rx = sup.inner.input.subscribe(&CancellationToken::new());

        sup.input(Input::packet(Arc::from("p"), Bytes::from_static(b"x")));
        sup.input(Input::text(Bytes::new()));
        sup.input(Input::line("kept"));

        let first = rx.recv().await.expect("one message");
        assert!(!first.is_packet());
        assert!(rx.try_recv().is_none());

        sup.close().await.expect("close");
    }

    #[tokio::test]
    async fn test_start_twice_publishes_one_start() {
        let ns = FakeNetstack::new();
        let sup = spawn_sh("exit 0", &ns).await;
        let rx = sup.output(&CancellationToken::new());
        sup.start();
        sup.start();

        let msgs = collect(rx).await;
        let starts = msgs.iter().filter(|m| m.tag() == OutputTag::Start).count();
        let exits = msgs.iter().filter(|m| m.tag() == OutputTag::Exit).count();
        assert_eq!((starts, exits), (1, 1));
    }

    #[tokio::test]
    async fn test_close_before_start_publishes_nothing() {
        let ns = FakeNetstack::new();
        let sup = spawn_sh("sleep 30", &ns).await;
        let rx = sup.output(&CancellationToken::new());

        sup.close().await.expect("close");
        assert!(sup.is_closed());
        assert!(collect(rx).await.is_empty());
        assert_eq!(ns.close_calls(), 1);

        // Start after close is ignored.
        sup.start();
        let late = sup.output(&CancellationToken::new());
        assert!(collect(late).await.is_empty());
    }

    #[tokio::test]
    async fn test_close_after_start_kills_child() {
        let ns = FakeNetstack::new();
        let sup = spawn_sh("sleep 30", &ns).await;
        let rx = sup.output(&CancellationToken::new());
        sup.start();

        sup.close().await.expect("close");
        let msgs = collect(rx).await;
        assert_eq!(msgs.last().and_then(Output::exit_code), Some(-1));
    }

    async fn wait_closed(sup: &Supervisor<FakeNetstack>) {
        if tokio::time::timeout(Duration::from_secs(10), sup.wait()).await.is_err() {
            panic!("supervisor did not close");
        }
        assert!(sup.is_closed());
    }

    #[tokio::test]
    async fn test_stdin_write_failure_closes() {
        let ns = FakeNetstack::new();
        let sup = spawn_sh("exec 0<&-; echo ready; sleep 30", &ns).await;
        let mut rx = sup.output(&CancellationToken::new());
        sup.start();

        let ready = async {
            while let Some(msg) = rx.recv().await {
                if msg.stream() == Some(Stream::Stdout) {
                    return;
                }
            }
            panic!("output completed before the child closed stdin");
        };
        tokio::time::timeout(Duration::from_secs(10), ready)
            .await
            .expect("child closed stdin");

        sup.input(Input::line("nobody reads this"));
        let msgs = collect(rx).await;
        wait_closed(&sup).await;
        assert_eq!(msgs.last().and_then(Output::exit_code), Some(-1));
        assert_eq!(ns.close_calls(), 1);
    }

    #[tokio::test]
    async fn test_netstack_write_failure_closes() {
        let ns = FakeNetstack::new().failing_write();
        let sup = spawn_sh("echo \"$PACKET_PREFIX aGVsbG8=\"; sleep 30", &ns).await;
        let rx = sup.output(&CancellationToken::new());
        sup.start();

        let msgs = collect(rx).await;
        wait_closed(&sup).await;
        assert_eq!(msgs.last().and_then(Output::exit_code), Some(-1));
        assert!(ns.injected().is_empty());
    }

    #[tokio::test]
    async fn test_netstack_read_failure_closes() {
        let ns = FakeNetstack::new().failing_read();
        let sup = spawn_sh("sleep 30", &ns).await;
        let rx = sup.output(&CancellationToken::new());
        sup.start();

        ns.send_out(b"never delivered");
        let msgs = collect(rx).await;
        wait_closed(&sup).await;
        assert_eq!(msgs.last().and_then(Output::exit_code), Some(-1));
        assert_eq!(ns.close_calls(), 1);
    }

    #[tokio::test]
    async fn test_close_twice_returns_same_error() {
        let ns = FakeNetstack::new().failing_close();
        let sup = spawn_sh("exit 0", &ns).await;
        sup.start();

        let (a, b) = tokio::join!(sup.close(), sup.close());
        let (a, b) = (a.expect_err("first"), b.expect_err("second"));
        assert_eq!(a.as_label(), "netstack_close_failed");
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(ns.close_calls(), 1);
    }

    #[tokio::test]
    async fn test_parent_cancellation_closes() {
        let ns = FakeNetstack::new();
        let parent = CancellationToken::new();
        let cmd = Command::new("sh").args(["-c", "sleep 30"]);
        let ns2 = ns.clone();
        let sup = SupervisorBuilder::new(cmd)
            .with_parent(parent.clone())
            .spawn(move || Ok(ns2))
            .await
            .expect("spawn");
        let rx = sup.output(&CancellationToken::new());
        sup.start();

        parent.cancel();
        tokio::time::timeout(Duration::from_secs(10), sup.wait())
            .await
            .expect("closed");
        assert_eq!(collect(rx).await.last().and_then(Output::exit_code), Some(-1));
    }

    #[tokio::test]
    async fn test_attached_subscriber_sees_exit() {
        struct Codes(Mutex<Vec<i32>>);

        #[async_trait::async_trait]
        impl Subscribe for Codes {
            async fn on_output(&self, msg: &Output) {
                if let Some(code) = msg.exit_code() {
                    self.0.lock().unwrap().push(code);
                }
            }
        }

        let ns = FakeNetstack::new();
        let sup = spawn_sh("exit 7", &ns).await;
        let codes = Arc::new(Codes(Mutex::new(Vec::new())));
        let handle = sup.attach(codes.clone());
        sup.start();

        tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .expect("worker finished")
            .expect("worker join");
        assert_eq!(*codes.0.lock().unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn test_dial_and_listen_use_parent_address() {
        let ns = FakeNetstack::new();
        let sup = spawn_sh("sleep 30", &ns).await;
        let remote = SocketAddrV4::new(Ipv4Addr::new(1, 2, 3, 4), 80);

        sup.dial(remote).await.expect("dial");
        let listener = sup.listen(8080).await.expect("listen");

        assert_eq!(ns.dials(), vec![(sup.address(), remote)]);
        assert_eq!(listener.local, SocketAddrV4::new(sup.address(), 8080));
        assert_eq!(ns.listens(), vec![SocketAddrV4::new(sup.address(), 8080)]);
        sup.close().await.expect("close");
    }

    #[tokio::test]
    async fn test_dial_error_is_propagated() {
        let ns = FakeNetstack::new().refusing_dial();
        let sup = spawn_sh("sleep 30", &ns).await;
        let remote = SocketAddrV4::new(Ipv4Addr::new(1, 2, 3, 4), 80);

        let err = sup.dial(remote).await.expect_err("refused");
        assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
        sup.close().await.expect("close");
    }

    #[tokio::test]
    async fn test_spawn_failure_closes_netstack() {
        let ns = FakeNetstack::new();
        let ns2 = ns.clone();
        let err = SupervisorBuilder::new(Command::new("/nonexistent/stdiovisor-test"))
            .spawn(move || Ok(ns2))
            .await
            .expect_err("spawn must fail");
        assert_eq!(err.as_label(), "spawn_failed");
        assert!(err.is_construction());
        assert_eq!(ns.close_calls(), 1);
    }

    #[tokio::test]
    async fn test_netstack_unavailable() {
        let err = SupervisorBuilder::new(Command::new("sh"))
            .spawn(|| -> io::Result<FakeNetstack> { Err(io::Error::other("no tun")) })
            .await
            .expect_err("must fail");
        assert_eq!(err.as_label(), "netstack_unavailable");
    }

    #[tokio::test]
    async fn test_empty_program_rejected() {
        let ns = FakeNetstack::new();
        let ns2 = ns.clone();
        let err = SupervisorBuilder::new(Command::new(""))
            .spawn(move || Ok(ns2))
            .await
            .expect_err("must fail");
        assert_eq!(err.as_label(), "invalid_command");
        assert_eq!(ns.close_calls(), 1);
    }
}
