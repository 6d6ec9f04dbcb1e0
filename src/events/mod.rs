//! Runtime messages and the broadcast bus that carries them.
//!
//! ## Contents
//! - [`Bus`] generic multi-subscriber broadcast with scoped subscriptions
//! - [`Input`], [`InputKind`] messages toward the child's stdin
//! - [`Output`], [`OutputKind`], [`Stream`] messages observed from the child
//!
//! ## Quick reference
//! - **Input publishers**: callers via `Supervisor::input`, the packet pump.
//! - **Input consumer**: the input pump (single writer of the child's stdin).
//! - **Output publishers**: the stdout/stderr pumps, the input pump (stdin echo),
//!   the lifecycle runner (start/exit).
//! - **Output consumers**: callers via `Supervisor::output`, attached subscribers.

mod bus;
mod input;
mod output;

use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};

pub use bus::{Bus, Subscription};
pub use input::{EDITOR_PREFIX, Input, InputKind, InputTag};
pub use output::{Output, OutputKind, OutputTag, Stream};

/// Global sequence counter shared by inputs and outputs.
static MESSAGE_SEQ: AtomicU64 = AtomicU64::new(0);

fn next_seq() -> u64 {
    MESSAGE_SEQ.fetch_add(1, Ordering::Relaxed)
}

/// Renders raw bytes as text for serialized messages.
fn lossy(data: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(data)
}
