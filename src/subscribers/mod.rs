//! # Output subscribers.
//!
//! This module provides the [`Subscribe`] trait and the worker that drives one
//! subscriber from a supervisor's output bus.
//!
//! ## Architecture
//! ```text
//! pumps ── publish(Output) ──► output bus ──► Subscription ──► spawn_worker
//!                                                                  │
//!                                                         ┌────────┴────────┐
//!                                                         ▼                 ▼
//!                                                     LogWriter          Custom
//! ```
//!
//! Attach a subscriber with [`Supervisor::attach`](crate::Supervisor::attach).

mod subscribe;
mod worker;

#[cfg(feature = "logging")]
mod log;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscribe::Subscribe;
pub use worker::spawn_worker;
