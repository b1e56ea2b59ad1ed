//! Connection - an open stream bound to the target it was dialed for
//!
//! The stream is held in an `Option` so that closing is explicit and
//! happens at most once. Any I/O after `close()` fails with
//! `NotConnected` instead of touching a released socket.

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tracing::trace;

use super::stream::Stream;
use super::target::ConnectionTarget;
use crate::error::Result;

/// An open bidirectional byte stream to a `ConnectionTarget`
pub struct Connection {
    inner: Option<Stream>,
    target: ConnectionTarget,
    peer: Option<SocketAddr>,
}

impl Connection {
    pub fn new(stream: Stream, target: ConnectionTarget) -> Self {
        Self {
            inner: Some(stream),
            target,
            peer: None,
        }
    }

    /// Record the resolved peer address
    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    /// Resolved remote address, if the transport reported one
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// Shut down the write side and release the stream.
    ///
    /// Closing an already closed connection is a no-op. A failed shutdown
    /// still releases the stream, so the connection counts as closed either way.
    pub async fn close(&mut self) -> Result<()> {
        let Some(mut stream) = self.inner.take() else {
            trace!("Connection to {} already closed", self.target);
            return Ok(());
        };

        let result = stream.shutdown().await;
        drop(stream);
        trace!("Connection to {} closed", self.target);

        match result {
            // Peer may already have torn the socket down
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other.map_err(Into::into),
        }
    }

    fn stream_mut(&mut self) -> io::Result<&mut Stream> {
        self.inner
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection closed"))
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("target", &self.target)
            .field("peer", &self.peer)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl AsyncRead for Connection {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.stream_mut() {
            Ok(stream) => Pin::new(stream).poll_read(cx, buf),
            Err(e) => Poll::Ready(Err(e)),
        }
    }
}

impl AsyncWrite for Connection {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.stream_mut() {
            Ok(stream) => Pin::new(stream).poll_write(cx, buf),
            Err(e) => Poll::Ready(Err(e)),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.stream_mut() {
            Ok(stream) => Pin::new(stream).poll_flush(cx),
            Err(e) => Poll::Ready(Err(e)),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.stream_mut() {
            Ok(stream) => Pin::new(stream).poll_shutdown(cx),
            Err(e) => Poll::Ready(Err(e)),
        }
    }
}
