//! TCP fixture server

use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::common::{Result, Shutdown, Stream};
use crate::error::Error;
use crate::transport::{parse_listen_address, Protocol, TcpTransport, Transport};

use super::Server;

/// Prefix of every reply to a complete request line
pub const REPLY_PREFIX: &str = "Request received: ";

/// Sent once when a read fails, right before the connection is dropped
pub const READ_FAILURE_NOTICE: &str = "failed to read input";

/// Lifecycle of a `TcpServer`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Constructed, not yet bound
    Idle,
    /// Accepting on the given address
    Listening(SocketAddr),
    /// Closed; cannot be restarted
    Closed,
}

/// Line-echo fixture over TCP
pub struct TcpServer {
    addr: String,
    transport: TcpTransport,
    hold_first: bool,
    state: watch::Sender<ServerState>,
    shutdown: Shutdown,
}

impl TcpServer {
    pub fn new(addr: impl Into<String>) -> Self {
        Self::with_protocol(addr, Protocol::Tcp)
    }

    pub fn with_protocol(addr: impl Into<String>, protocol: Protocol) -> Self {
        let (state, _) = watch::channel(ServerState::Idle);
        Self {
            addr: addr.into(),
            transport: TcpTransport::with_protocol(protocol),
            hold_first: false,
            state,
            shutdown: Shutdown::new(),
        }
    }

    /// Hold the first accepted connection open without serving it.
    ///
    /// Later connections are served as usual. The held connection is
    /// released when the server closes.
    pub fn hold_first_connection(mut self, hold: bool) -> Self {
        self.hold_first = hold;
        self
    }

    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Move Idle -> Listening; reports the state that blocked the move otherwise
    fn enter_listening(&self, local: SocketAddr) -> std::result::Result<(), ServerState> {
        let mut blocked = None;
        self.state.send_if_modified(|state| {
            if *state == ServerState::Idle {
                *state = ServerState::Listening(local);
                true
            } else {
                blocked = Some(*state);
                false
            }
        });

        match blocked {
            None => Ok(()),
            Some(state) => Err(state),
        }
    }
}

#[async_trait]
impl Server for TcpServer {
    async fn run(&self) -> Result<()> {
        match self.state() {
            ServerState::Idle => {}
            ServerState::Closed => return Err(Error::AlreadyClosed),
            ServerState::Listening(addr) => {
                return Err(Error::Config(format!("Server already listening on {}", addr)));
            }
        }

        let addr = parse_listen_address(&self.addr)?;
        let listener = self.transport.bind(addr).await?;
        let local = listener.local_addr()?;

        match self.enter_listening(local) {
            Ok(()) => {}
            Err(ServerState::Listening(other)) => {
                return Err(Error::Config(format!("Server already listening on {}", other)));
            }
            Err(_) => return Err(Error::AlreadyClosed),
        }
        info!("Fixture listening on {}", local);

        let mut held: Option<Stream> = None;
        let mut hold_next = self.hold_first;
        let mut conn_count: u64 = 0;

        let result = loop {
            tokio::select! {
                _ = self.shutdown.triggered() => break Ok(()),
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        conn_count += 1;
                        if hold_next {
                            hold_next = false;
                            debug!("Holding first connection #{} from {}", conn_count, peer);
                            held = Some(stream);
                        } else {
                            debug!("New connection #{} from {}", conn_count, peer);
                            tokio::spawn(handle_connection(stream, peer));
                        }
                    }
                    Err(e) => {
                        error!("Accept error on {}: {}", local, e);
                        break Err(e);
                    }
                },
            }
        };

        drop(held);
        drop(listener);
        self.state.send_replace(ServerState::Closed);
        info!("Fixture on {} closed (handled {} connections)", local, conn_count);

        result
    }

    async fn close(&self) -> Result<()> {
        let mut already_closed = false;
        self.state.send_if_modified(|state| {
            if *state == ServerState::Closed {
                already_closed = true;
                false
            } else {
                *state = ServerState::Closed;
                true
            }
        });

        if already_closed {
            return Err(Error::AlreadyClosed);
        }

        self.shutdown.trigger();
        Ok(())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        match self.state() {
            ServerState::Listening(addr) => Some(addr),
            _ => None,
        }
    }

    async fn listening(&self) -> Result<SocketAddr> {
        let mut rx = self.state.subscribe();
        loop {
            let state = *rx.borrow_and_update();
            match state {
                ServerState::Listening(addr) => return Ok(addr),
                ServerState::Closed => return Err(Error::AlreadyClosed),
                ServerState::Idle => {}
            }
            rx.changed().await.map_err(|_| Error::AlreadyClosed)?;
        }
    }
}

/// Serve one connection until a read fails
async fn handle_connection(stream: Stream, peer: SocketAddr) {
    let (reader, writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);
    let mut writer = BufWriter::new(writer);
    let mut line = Vec::new();

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(_) if line.ends_with(b"\n") => {
                if let Err(e) = reply(&mut writer, &[REPLY_PREFIX.as_bytes(), &line[..]]).await {
                    debug!("Write to {} failed: {}", peer, e);
                    break;
                }
            }
            outcome => {
                // EOF, a trailing partial line and I/O errors all end the session
                if let Err(e) = outcome {
                    debug!("Read from {} failed: {}", peer, e);
                }
                if let Err(e) = reply(&mut writer, &[READ_FAILURE_NOTICE.as_bytes()]).await {
                    debug!("Failure notice to {} not delivered: {}", peer, e);
                }
                break;
            }
        }
    }

    let _ = writer.shutdown().await;
    debug!("Connection from {} closed", peer);
}

async fn reply<W>(writer: &mut W, parts: &[&[u8]]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    for part in parts {
        writer.write_all(part).await?;
    }
    writer.flush().await
}
