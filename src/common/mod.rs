//! Common types and abstractions
//!
//! This module defines the core types used throughout the crate:
//! - ConnectionTarget: what to dial
//! - Connection: an open stream with close-once semantics
//! - Stream: boxed async I/O handed out by transports
//! - Shutdown: shared cancellation token
//! - pipe: the relay

mod connection;
pub mod pipe;
mod shutdown;
mod stream;
mod target;

pub use connection::Connection;
pub use pipe::{relay, relay_duplex, TransferResult};
pub use shutdown::Shutdown;
pub use stream::{AsyncReadWrite, IntoStream, Stream};
pub use target::ConnectionTarget;

// Re-export error types from crate root
pub use crate::error::{Error, Result};
