//! Test Fixture Server
//!
//! A tiny line-oriented server that gives the dialer and relay something
//! real to talk to. Every newline-terminated request is answered with
//! `Request received: <line>`; a failed read is answered with
//! `failed to read input` and ends the connection.
//!
//! Not a production component: no limits, no framing beyond newlines.

mod tcp;

pub use tcp::{ServerState, TcpServer, READ_FAILURE_NOTICE, REPLY_PREFIX};

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::common::Result;
use crate::transport::Protocol;

/// Minimum contract a fixture server satisfies
#[async_trait]
pub trait Server: Send + Sync {
    /// Bind and serve until `close` is called
    async fn run(&self) -> Result<()>;

    /// Stop accepting. Calling this twice is an error.
    async fn close(&self) -> Result<()>;

    /// Bound address while listening
    fn local_addr(&self) -> Option<SocketAddr>;

    /// Wait until the server is listening
    async fn listening(&self) -> Result<SocketAddr>;
}

/// Create a fixture server for `protocol` listening on `addr`
pub fn new_server(protocol: &str, addr: impl Into<String>) -> Result<Arc<dyn Server>> {
    let protocol = Protocol::parse(&protocol.to_lowercase())?;
    Ok(Arc::new(TcpServer::with_protocol(addr, protocol)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_new_server_rejects_udp() {
        let result = new_server("udp", ":0");
        assert!(matches!(result, Err(Error::InvalidProtocol(p)) if p == "udp"));
    }

    #[test]
    fn test_new_server_protocol_is_case_insensitive() {
        let server = new_server("TCP", "127.0.0.1:0").unwrap();
        assert!(server.local_addr().is_none());
    }
}
