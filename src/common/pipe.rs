//! Relay - one-directional byte copy with shutdown support
//!
//! `relay` copies a source into a sink until end-of-stream, an I/O error or
//! shutdown, and always reports how many bytes made it across. It never
//! decides what an error means for the process; callers get a
//! `TransferResult` and choose.
//!
//! `relay_duplex` drives both directions over one connection: input is
//! forwarded to the peer (half-closing on input EOF) while the peer's bytes
//! are relayed to the sink. The session ends with the inbound direction.

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use super::connection::Connection;
use super::shutdown::Shutdown;
use crate::error::{Error, Result};

/// Default buffer size for relay operations (32KB)
const RELAY_BUFFER_SIZE: usize = 32 * 1024;

/// Outcome of a single relay run
#[derive(Debug)]
pub struct TransferResult {
    /// Bytes written to the sink
    pub bytes_transferred: u64,
    /// Why the relay stopped early, if it did
    pub error: Option<Error>,
}

impl TransferResult {
    fn completed(bytes_transferred: u64) -> Self {
        Self {
            bytes_transferred,
            error: None,
        }
    }

    fn failed(bytes_transferred: u64, error: Error) -> Self {
        Self {
            bytes_transferred,
            error: Some(error),
        }
    }

    /// True if the source reached end-of-stream cleanly
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Byte count on success, the recorded error otherwise
    pub fn into_result(self) -> Result<u64> {
        match self.error {
            None => Ok(self.bytes_transferred),
            Some(e) => Err(e),
        }
    }
}

/// Copy `source` into `sink` until EOF, error or shutdown
pub async fn relay<W, R>(sink: &mut W, source: &mut R, shutdown: &Shutdown) -> TransferResult
where
    W: AsyncWrite + Unpin + ?Sized,
    R: AsyncRead + Unpin + ?Sized,
{
    let mut total = 0u64;
    let mut buf = BytesMut::with_capacity(RELAY_BUFFER_SIZE);
    buf.resize(RELAY_BUFFER_SIZE, 0);

    loop {
        let n = tokio::select! {
            biased;
            _ = shutdown.triggered() => {
                debug!("Relay cancelled after {} bytes", total);
                return TransferResult::failed(total, Error::Cancelled);
            }
            read = source.read(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => return TransferResult::failed(total, e.into()),
            },
        };

        tokio::select! {
            biased;
            _ = shutdown.triggered() => {
                debug!("Relay cancelled after {} bytes", total);
                return TransferResult::failed(total, Error::Cancelled);
            }
            written = write_chunk(sink, &buf[..n]) => {
                if let Err(e) = written {
                    return TransferResult::failed(total, e.into());
                }
            }
        }

        total += n as u64;
    }

    debug!("Relay reached end of stream after {} bytes", total);
    TransferResult::completed(total)
}

/// Forward `input` to the peer while relaying the peer into `sink`.
///
/// The returned result describes the inbound (peer to sink) direction.
pub async fn relay_duplex<I, W>(
    input: &mut I,
    sink: &mut W,
    conn: &mut Connection,
    shutdown: &Shutdown,
) -> TransferResult
where
    I: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let (mut reader, mut writer) = tokio::io::split(conn);

    let upload = async {
        let sent = relay(&mut writer, input, shutdown).await;
        // Half-close so the peer sees end-of-stream
        if let Err(e) = writer.shutdown().await {
            debug!("Half-close failed: {}", e);
        }
        sent
    };
    let download = relay(sink, &mut reader, shutdown);

    tokio::pin!(upload);
    tokio::pin!(download);

    let mut upload_done = false;
    loop {
        tokio::select! {
            received = &mut download => return received,
            sent = &mut upload, if !upload_done => {
                upload_done = true;
                match sent.error {
                    Some(ref e) if !e.is_cancelled() => {
                        warn!("Forwarding input failed after {} bytes: {}", sent.bytes_transferred, e);
                    }
                    _ => debug!("Forwarded {} bytes of input", sent.bytes_transferred),
                }
            }
        }
    }
}

async fn write_chunk<W>(sink: &mut W, chunk: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    sink.write_all(chunk).await?;
    sink.flush().await
}
