//! TCP Transport implementation

use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::{lookup_host, TcpListener, TcpStream};
use tracing::trace;

use crate::common::{ConnectionTarget, IntoStream, Result, Stream};
use crate::error::Error;

use super::{Listener, Protocol, Transport};

/// TCP transport - raw TCP connections
pub struct TcpTransport {
    protocol: Protocol,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self::with_protocol(Protocol::Tcp)
    }

    /// Restrict resolved addresses to the family `protocol` names
    pub fn with_protocol(protocol: Protocol) -> Self {
        Self { protocol }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&self, target: &ConnectionTarget) -> Result<(Stream, SocketAddr)> {
        let addr = target.socket_addr();
        let candidates: Vec<SocketAddr> = lookup_host(&addr)
            .await
            .map_err(|e| Error::Resolve(format!("{} ({})", addr, e)))?
            .filter(|candidate| self.protocol.accepts(candidate))
            .collect();

        let mut last_error = Error::Resolve(format!(
            "{} (no {} address)",
            addr,
            self.protocol.as_str()
        ));

        for candidate in candidates {
            trace!("Trying {} for {}", candidate, addr);
            match TcpStream::connect(candidate).await {
                Ok(stream) => {
                    // Disable Nagle's algorithm for lower latency
                    stream.set_nodelay(true)?;
                    return Ok((stream.into_stream(), candidate));
                }
                Err(e) => {
                    trace!("Connect to {} failed: {}", candidate, e);
                    last_error = Error::from_connect(candidate.to_string(), e);
                }
            }
        }

        Err(last_error)
    }

    async fn bind(&self, addr: SocketAddr) -> Result<Box<dyn Listener>> {
        if !self.protocol.accepts(&addr) {
            return Err(Error::Config(format!(
                "Cannot bind {} on {}",
                self.protocol.as_str(),
                addr
            )));
        }

        let listener = TcpListener::bind(addr).await?;
        Ok(Box::new(TcpListenerWrapper { listener }))
    }
}

/// Wrapper for TcpListener to implement Listener trait
struct TcpListenerWrapper {
    listener: TcpListener,
}

#[async_trait]
impl Listener for TcpListenerWrapper {
    async fn accept(&self) -> Result<(Stream, SocketAddr)> {
        let (stream, addr) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        Ok((stream.into_stream(), addr))
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_connect_and_accept() {
        let transport = TcpTransport::new();
        let listener = transport
            .bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let port = listener.local_addr().unwrap().port();

        let target = ConnectionTarget::tcp("localhost", port).unwrap();
        let connect = transport.connect(&target);
        let accept = listener.accept();
        let (connected, accepted) = tokio::join!(connect, accept);

        let (mut client, peer) = connected.unwrap();
        let (mut server, _) = accepted.unwrap();
        assert_eq!(peer.port(), port);

        client.write_all(b"hi").await.unwrap();
        let mut buf = [0u8; 2];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hi");
    }

    #[tokio::test]
    async fn test_family_filter_leaves_nothing_to_dial() {
        let transport = TcpTransport::with_protocol(Protocol::Tcp4);
        let target = ConnectionTarget::new("tcp4", "::1", 80).unwrap();

        let result = transport.connect(&target).await;
        assert!(matches!(result, Err(Error::Resolve(_))));
    }

    #[tokio::test]
    async fn test_bind_rejects_wrong_family() {
        let transport = TcpTransport::with_protocol(Protocol::Tcp6);
        let result = transport.bind("127.0.0.1:0".parse().unwrap()).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
