//! # Broadcast bus with per-subscriber queues.
//!
//! [`Bus`] delivers every published value to every subscriber that is live at
//! publish time. Each subscriber owns an unbounded queue, so a slow reader never
//! causes another reader to miss values.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                 Subscribers (many):
//!   pump 1 ──┐                   ┌──► [queue 1] ──► Subscription 1
//!   pump 2 ──┼──► Bus (registry) ┼──► [queue 2] ──► Subscription 2
//!   caller ──┘                   └──► [queue N] ──► Subscription N
//! ```
//!
//! ## Rules
//! - **Fan-out**: each subscriber receives each value (not load-balanced).
//! - **No replay**: a subscriber only sees values published after it joined.
//! - **Scoped**: a subscription is retired when its scope token is cancelled or the
//!   [`Subscription`] is dropped.
//! - **Completion**: [`Bus::complete`] delivers final values, closes every queue and
//!   turns later publishes into no-ops and later subscriptions into closed handles.
//!   Only the first call has any effect.
//!
//! Publish, subscribe and complete are serialized by one mutex, so a subscriber never
//! sees a value twice and never misses one published while it was registered.

use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

struct Registry<T> {
    next_id: u64,
    subscribers: HashMap<u64, mpsc::UnboundedSender<T>>,
    completed: bool,
}

/// Multi-subscriber broadcast primitive.
///
/// Cheap to clone; clones share the same subscriber set.
pub struct Bus<T> {
    registry: Arc<Mutex<Registry<T>>>,
    done: CancellationToken,
}

impl<T> Clone for Bus<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            done: self.done.clone(),
        }
    }
}

impl<T> fmt::Debug for Bus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reg = lock(&self.registry);
        f.debug_struct("Bus")
            .field("subscribers", &reg.subscribers.len())
            .field("completed", &reg.completed)
            .finish()
    }
}

impl<T: Clone + Send + 'static> Default for Bus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> Bus<T> {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                subscribers: HashMap::new(),
                completed: false,
            })),
            done: CancellationToken::new(),
        }
    }

    /// Delivers `value` to every live subscriber.
    ///
    /// Returns immediately. After [`complete`](Self::complete) this is a no-op.
    pub fn publish(&self, value: T) {
        let mut reg = lock(&self.registry);
        if reg.completed {
            return;
        }
        reg.subscribers.retain(|_, tx| tx.send(value.clone()).is_ok());
    }

    /// Registers a new subscriber whose lifetime is bounded by `scope`.
    ///
    /// Once `scope` is cancelled the subscriber is removed; values already queued can
    /// still be received, after which [`Subscription::recv`] yields `None`.
    /// Subscribing to a completed bus returns an already-closed subscription.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn subscribe(&self, scope: &CancellationToken) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();

        let id = {
            let mut reg = lock(&self.registry);
            if reg.completed {
                return Subscription { rx, _retire: None };
            }
            let id = reg.next_id;
            reg.next_id += 1;
            reg.subscribers.insert(id, tx);
            id
        };

        let retire = CancellationToken::new();
        let watcher = Watcher {
            id,
            registry: Arc::downgrade(&self.registry),
            scope: scope.clone(),
            retire: retire.clone(),
            done: self.done.clone(),
        };
        tokio::spawn(watcher.run());

        Subscription {
            rx,
            _retire: Some(retire.drop_guard()),
        }
    }

    /// Delivers `finals` to every live subscriber, then closes the bus for good.
    ///
    /// Returns `true` if this call completed the bus, `false` if it was already
    /// completed (in which case nothing is delivered).
    pub fn complete(&self, finals: impl IntoIterator<Item = T>) -> bool {
        {
            let mut reg = lock(&self.registry);
            if reg.completed {
                return false;
            }
            reg.completed = true;
            for value in finals {
                for tx in reg.subscribers.values() {
                    let _ = tx.send(value.clone());
                }
            }
            reg.subscribers.clear();
        }
        self.done.cancel();
        true
    }

    /// Returns `true` once [`complete`](Self::complete) has run.
    pub fn is_completed(&self) -> bool {
        lock(&self.registry).completed
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).subscribers.len()
    }

    /// Resolves once the bus has been completed.
    pub async fn completed(&self) {
        self.done.cancelled().await;
    }
}

/// Removes one subscriber when its scope ends, its handle is dropped or the bus completes.
struct Watcher<T> {
    id: u64,
    registry: Weak<Mutex<Registry<T>>>,
    scope: CancellationToken,
    retire: CancellationToken,
    done: CancellationToken,
}

impl<T> Watcher<T> {
    async fn run(self) {
        tokio::select! {
            _ = self.scope.cancelled() => {}
            _ = self.retire.cancelled() => {}
            _ = self.done.cancelled() => return,
        }
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).subscribers.remove(&self.id);
        }
    }
}

/// Receive handle returned by [`Bus::subscribe`].
///
/// Also usable as a [`Stream`].
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
    _retire: Option<DropGuard>,
}

impl<T> Subscription<T> {
    /// Receives the next value, or `None` once the subscription is closed and drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Receives a value if one is already queued.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.rx.is_closed())
            .finish()
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
