//! Application Layer
//!
//! This module contains:
//! - Client: the dial → relay → close session
//! - Indicator: cancellable liveness spinner
//! - Interrupt: Ctrl-C / SIGTERM to shutdown token

pub mod client;
pub mod indicator;
pub mod interrupt;

pub use client::{Client, ClientOptions, SessionReport};
pub use indicator::IndicatorHandle;
