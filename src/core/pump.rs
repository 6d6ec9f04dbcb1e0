//! # Pumps: the tasks moving bytes between the child, the buses and the netstack.
//!
//! ```text
//! input   : input bus ──► encode ──► child stdin      (echo non-packets as Stdio(Stdin))
//! packets : Netstack::read ──► Input::packet ──► input bus
//! stream  : child stdout/stderr ──► Demux ─┬─ plain  ──► output bus
//!                                          └─ tagged ──► frame::decode ──► Netstack::write
//! ```
//!
//! Every pump stops when the lifecycle token is cancelled. A pump that fails cancels
//! the token itself, which closes the supervisor.

use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::ChildStdin;

use super::supervisor::Inner;
use crate::{
    demux::Demux,
    events::{Input, Output, Stream, Subscription},
    frame,
    netstack::Netstack,
};

/// Writes every input message to the child's stdin.
pub(super) async fn input<N: Netstack>(
    inner: Arc<Inner<N>>,
    mut rx: Subscription<Input>,
    mut stdin: ChildStdin,
) {
    loop {
        let msg = tokio::select! {
            _ = inner.token.cancelled() => break,
            msg = rx.recv() => match msg {
                Some(msg) => msg,
                None => break,
            },
        };

        let bytes = msg.encode();
        let written = tokio::select! {
            _ = inner.token.cancelled() => break,
            res = async {
                stdin.write_all(&bytes).await?;
                stdin.flush().await
            } => res,
        };
        if let Err(e) = written {
            tracing::debug!(error = %e, seq = msg.seq, "stdin write failed");
            break;
        }

        if !msg.is_packet() {
            inner.output.publish(Output::stdio(Stream::Stdin, bytes));
        }
    }
    drop(stdin);
    inner.token.cancel();
}

/// Turns every datagram the netstack emits into a packet input message.
pub(super) async fn packets<N: Netstack>(inner: Arc<Inner<N>>) {
    let size = inner.cfg.read_buffer_clamped();
    let batch = inner.cfg.read_batch_clamped();
    let mut bufs = vec![vec![0u8; size]; batch];
    let mut sizes = vec![0usize; batch];

    loop {
        let read = tokio::select! {
            _ = inner.token.cancelled() => break,
            res = inner.netstack.read(&mut bufs, &mut sizes) => res,
        };
        let n = match read {
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(error = %e, "netstack read failed");
                break;
            }
        };
        for (buf, &len) in bufs.iter().zip(&sizes).take(n) {
            if len == 0 {
                continue;
            }
            let data = Bytes::copy_from_slice(&buf[..len.min(buf.len())]);
            inner.input.publish(Input::packet(Arc::clone(&inner.prefix), data));
        }
    }
    inner.token.cancel();
}

/// Splits one child output stream into plain output and injected datagrams.
pub(super) async fn stream<N, R>(inner: Arc<Inner<N>>, mut reader: R, stream: Stream, mut demux: Demux)
where
    N: Netstack,
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut buf = vec![0u8; inner.cfg.read_buffer_clamped()];
    loop {
        let read = tokio::select! {
            _ = inner.token.cancelled() => return,
            res = reader.read(&mut buf) => res,
        };
        let n = match read {
            Ok(0) => return,
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(error = %e, stream = stream.as_str(), "child stream read failed");
                inner.token.cancel();
                return;
            }
        };

        demux.write(&buf[..n]);
        let plain = demux.drain_plain();
        if !plain.is_empty() {
            inner.output.publish(Output::stdio(stream, plain));
        }

        let datagrams = frame::decode(&demux.drain_tagged());
        if datagrams.is_empty() {
            continue;
        }
        if let Err(e) = inner.netstack.write(&datagrams).await {
            tracing::warn!(error = %e, count = datagrams.len(), "netstack write failed");
            inner.token.cancel();
            return;
        }
    }
}
