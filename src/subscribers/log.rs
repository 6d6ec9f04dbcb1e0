//! # LogWriter: output printer
//!
//! A minimal subscriber that reports every [`Output`] through `tracing`.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! INFO [start] seq=0
//! INFO [stdio] seq=1 stream="stdout" data="hello\n"
//! INFO [exit] seq=2 code=0
//! ```

use async_trait::async_trait;

use crate::events::{Output, OutputKind};
use crate::subscribers::Subscribe;

/// Output writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_output(&self, msg: &Output) {
        match &msg.kind {
            OutputKind::Start => {
                tracing::info!(seq = msg.seq, "[start]");
            }
            OutputKind::Exit { code } => {
                tracing::info!(seq = msg.seq, code, "[exit]");
            }
            OutputKind::Stdio { stream, data } => {
                tracing::info!(
                    seq = msg.seq,
                    stream = stream.as_str(),
                    data = ?String::from_utf8_lossy(data),
                    "[stdio]"
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
