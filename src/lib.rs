//! # stdiovisor
//!
//! **Stdiovisor** supervises a child process and tunnels a virtual TCP/IP network
//! over its stdin/stdout.
//!
//! Packet lines share the child's stdio with ordinary text. Each line carrying a
//! datagram starts with a per-session prefix, a space and the base64 payload:
//!
//! ```text
//! <prefix> <base64(datagram)>\n
//! ```
//!
//! Everything else passes through untouched and is reported as output.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!              parent process                         │          child process
//!                                                     │
//!  caller ── Supervisor::input ──► input bus ──► input pump ──► stdin ──► Demux(prefix)
//!                                     ▲               │                 ├─ plain  ─► program
//!  Netstack::read ─► packet pump ─────┘ (Packet)      │                 └─ tagged ─► child Netstack
//!                                                     │
//!  Netstack::write ◄─ frame::decode ◄─ tagged ─┐      │                 ┌─ packet lines ◄─ child Netstack
//!  output bus ◄─────────────────────── plain ──┴ Demux(prefix) ◄── stdout ◄─┴─ program text
//!  output bus ◄───────────────────────────────── Demux("")    ◄── stderr ◄─── program
//!       │
//!       ├──► Supervisor::output (Subscription)
//!       └──► Supervisor::attach (Subscribe worker)
//! ```
//!
//! ### Lifecycle
//! ```text
//! SupervisorBuilder::spawn ──► [constructed] ──start()──► [running] ──exit/close──► [closed]
//!                                    │                                                 ▲
//!                                    └──────────────────── close() ────────────────────┘
//!                                          (child killed, no Exit published)
//! ```
//!
//! ## Features
//! | Area              | Description                                                 | Key types / traits                        |
//! |-------------------|-------------------------------------------------------------|-------------------------------------------|
//! | **Supervision**   | Spawn, start and close one child behind a netstack.         | [`SupervisorBuilder`], [`Supervisor`]     |
//! | **Framing**       | Split stdio into text and packet lines.                     | [`Demux`], [`frame`]                      |
//! | **Messages**      | Typed input/output with a broadcast bus.                    | [`Input`], [`Output`], [`Bus`]            |
//! | **Subscriber API**| Observe output on dedicated workers.                        | [`Subscribe`]                             |
//! | **Child side**    | The other end of the tunnel inside the child.               | [`Link`], [`LinkEnv`]                     |
//! | **One-shot**      | Run to completion and capture output.                       | [`run`], [`RunOutput`]                    |
//! | **Errors**        | Typed errors for construction, runtime and the child side.  | [`RuntimeError`], [`RunError`], [`LinkError`] |
//! | **Configuration** | Buffer sizes, drain window, queue sizes.                    | [`Config`]                                |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```no_run
//! use stdiovisor::{Command, Input, Netstack, SupervisorBuilder};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn demo<N: Netstack>(netstack: N) -> Result<(), Box<dyn std::error::Error>> {
//!     let sup = SupervisorBuilder::new(Command::new("my-agent").arg("--serve"))
//!         .spawn(move || Ok(netstack))
//!         .await?;
//!
//!     let mut out = sup.output(&CancellationToken::new());
//!     sup.start();
//!     sup.input(Input::line("status"));
//!
//!     while let Some(msg) = out.recv().await {
//!         if let Some(code) = msg.exit_code() {
//!             println!("exited with {code}");
//!         }
//!     }
//!     sup.close().await?;
//!     Ok(())
//! }
//! ```
mod command;
mod config;
mod core;
mod demux;
mod error;
mod link;
mod netstack;

pub mod events;
pub mod frame;
pub mod session;
pub mod subscribers;

// ---- Public re-exports ----

pub use command::Command;
pub use config::{Config, DEFAULT_MTU};
pub use core::{RunOutput, Supervisor, SupervisorBuilder, run};
pub use demux::Demux;
pub use error::{LinkError, RunError, RuntimeError};
pub use events::{Bus, Input, InputKind, InputTag, Output, OutputKind, OutputTag, Stream, Subscription};
pub use link::{Link, LinkEnv};
pub use netstack::Netstack;
pub use subscribers::Subscribe;

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
