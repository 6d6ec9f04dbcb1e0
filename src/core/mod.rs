//! Runtime core: process supervision.
//!
//! The public API from this module is [`SupervisorBuilder`], [`Supervisor`] and the
//! one-shot [`run`].
//!
//! Internal modules:
//! - [`builder`]: allocates the netstack, spawns the child, unwinds on failure;
//! - [`supervisor`]: lifecycle (start, close, cleanup) and the public handle;
//! - [`pump`]: tasks moving bytes between the child, the buses and the netstack;
//! - `run`: one-shot execution with captured output.

mod builder;
mod pump;
mod run;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use run::{RunOutput, run};
pub use supervisor::Supervisor;
