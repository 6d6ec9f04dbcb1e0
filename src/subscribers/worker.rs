//! # Non-blocking delivery of output to one subscriber.
//!
//! ```text
//! Subscription<Output> ──► forwarder ──try_send──► [bounded queue] ──► worker ──► sub.on_output()
//!                              │                                          └──► panic → error log, continue
//!                              └──► queue full → drop message (warn)
//! ```
//!
//! ## Rules
//! - **Per-subscriber FIFO**: messages reach `on_output` in publish order.
//! - **Overflow**: a full queue drops the message for that subscriber only.
//! - **Isolation**: a panicking subscriber skips the message and keeps running.
//! - **Termination**: the worker ends once the bus completed and the queue drained.
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if a subscriber panics while holding a lock.

use std::any::Any;
use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::{Output, Subscription};
use crate::subscribers::Subscribe;

/// Spawns the forwarder and worker for `sub`, reading from `rx`.
///
/// `max_capacity` caps [`Subscribe::queue_capacity`]; the effective capacity is at least 1.
/// The returned handle resolves once every queued message was handled.
pub fn spawn_worker(
    sub: Arc<dyn Subscribe>,
    mut rx: Subscription<Output>,
    max_capacity: usize,
) -> JoinHandle<()> {
    let cap = sub.queue_capacity().min(max_capacity).max(1);
    let name = sub.name();
    let (tx, mut queue) = mpsc::channel::<Arc<Output>>(cap);

    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match tx.try_send(Arc::new(msg)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(msg)) => {
                    tracing::warn!(subscriber = name, seq = msg.seq, "subscriber queue full, message dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => break,
            }
        }
    });

    tokio::spawn(async move {
        while let Some(msg) = queue.recv().await {
            let fut = sub.on_output(msg.as_ref());
            if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                tracing::error!(
                    subscriber = sub.name(),
                    info = %panic_message(&*panic_err),
                    "subscriber panicked"
                );
            }
        }
    })
}

fn panic_message(any: &(dyn Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
