//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for observing a supervisor's output. Each
//! attached subscriber is driven by a dedicated worker fed by a bounded queue
//! (see [`spawn_worker`](crate::subscribers::spawn_worker)).
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching); they do **not** block the pumps
//!   nor other subscribers.
//! - Each subscriber **declares** its preferred queue capacity via
//!   [`Subscribe::queue_capacity`]. If the queue overflows, messages for that
//!   subscriber are **dropped** (warn).
//!
//! ## Example
//! ```rust
//! use stdiovisor::{Output, Subscribe};
//!
//! struct Transcript;
//!
//! #[async_trait::async_trait]
//! impl Subscribe for Transcript {
//!     async fn on_output(&self, msg: &Output) {
//!         if let Some(data) = msg.data() {
//!             let _ = data.len();
//!         }
//!     }
//!     fn name(&self) -> &'static str { "transcript" }
//!     fn queue_capacity(&self) -> usize { 512 }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Output;

/// Contract for output subscribers.
///
/// Called from a subscriber-dedicated worker task. Implementations should avoid
/// blocking the async runtime.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one output message.
    async fn on_output(&self, msg: &Output);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    ///
    /// Bounded above by [`Config::subscriber_capacity`](crate::Config::subscriber_capacity).
    fn queue_capacity(&self) -> usize {
        1024
    }
}
