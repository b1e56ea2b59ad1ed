//! tcpcat - a minimal TCP connectivity probe
//!
//! # Architecture
//!
//! ```text
//! Interrupt handler ──→ Shutdown token ←── Liveness indicator (own task)
//!                             │
//! ConnectionTarget → dial (timeout) → Connection → relay → sink
//!                                          │
//!                                        close (exactly once)
//! ```
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── common/          # Core types: ConnectionTarget, Connection, Shutdown, relay
//! ├── transport/       # Dialer and listeners (TCP)
//! ├── app/             # Client session, indicator, interrupt handler
//! └── fixture/         # Line-echo server used to exercise the client
//! ```

// Core types
pub mod common;
pub mod error;

// Layers
pub mod transport;
pub mod app;
pub mod fixture;

// Supporting modules
pub mod config;
pub mod logging;

// Re-exports for convenience
pub use common::{Connection, ConnectionTarget, Shutdown, TransferResult};
pub use error::{Error, Result};
pub use config::Config;

pub use app::{Client, ClientOptions, SessionReport};
pub use fixture::{new_server, Server, TcpServer};
pub use transport::{dial, Transport};
