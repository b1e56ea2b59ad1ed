//! Client session - dial, optionally relay, always close
//!
//! ```text
//! indicator.start()
//!        ↓
//! dial(target, timeout) ──fail──→ Err
//!        ↓
//! wait? ──no──→ close → Ok(relayed: None)
//!        ↓ yes
//! relay(conn → sink) [+ input → conn]
//!        ↓
//! close → Ok(relayed: Some(n)) | Err
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use crate::common::{relay, relay_duplex, ConnectionTarget, Result, Shutdown, TransferResult};
use crate::transport;

use super::indicator;

/// Default bound on a single dial attempt
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default delay between indicator frames
pub const DEFAULT_INDICATOR_INTERVAL: Duration = Duration::from_millis(100);

/// Runtime options for one client session
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub target: ConnectionTarget,
    pub timeout: Duration,
    /// Relay received bytes to the sink after connecting
    pub wait: bool,
    /// Also forward input to the peer while relaying (only with `wait`)
    pub forward_input: bool,
    /// Spinner interval; `None` disables it
    pub indicator_interval: Option<Duration>,
}

impl ClientOptions {
    pub fn new(target: ConnectionTarget) -> Self {
        Self {
            target,
            timeout: DEFAULT_DIAL_TIMEOUT,
            wait: false,
            forward_input: false,
            indicator_interval: Some(DEFAULT_INDICATOR_INTERVAL),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_forward_input(mut self, forward: bool) -> Self {
        self.forward_input = forward;
        self
    }

    pub fn with_indicator(mut self, interval: Option<Duration>) -> Self {
        self.indicator_interval = interval;
        self
    }
}

/// What a finished session did
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub target: ConnectionTarget,
    /// Address the dialer actually reached
    pub peer: Option<SocketAddr>,
    /// Bytes relayed to the sink, if the session waited for data
    pub relayed: Option<u64>,
}

/// Client that probes a single target
pub struct Client {
    options: ClientOptions,
}

impl Client {
    pub fn new(options: ClientOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Run against the process stdout (and stdin, when forwarding input)
    pub async fn run(&self, shutdown: &Shutdown) -> Result<SessionReport> {
        let mut stdout = tokio::io::stdout();
        let mut stdin = tokio::io::stdin();
        self.run_with(&mut stdout, &mut stdin, shutdown).await
    }

    /// Run with an explicit sink and input
    pub async fn run_with<W, I>(
        &self,
        sink: &mut W,
        input: &mut I,
        shutdown: &Shutdown,
    ) -> Result<SessionReport>
    where
        W: AsyncWrite + Unpin + ?Sized,
        I: AsyncRead + Unpin + ?Sized,
    {
        let indicator = self.options.indicator_interval.map(indicator::start);

        let result = self.session(sink, input, shutdown).await;

        if let Some(indicator) = indicator {
            indicator.stop().await;
        }
        result
    }

    async fn session<W, I>(
        &self,
        sink: &mut W,
        input: &mut I,
        shutdown: &Shutdown,
    ) -> Result<SessionReport>
    where
        W: AsyncWrite + Unpin + ?Sized,
        I: AsyncRead + Unpin + ?Sized,
    {
        let options = &self.options;
        let mut conn = transport::dial(&options.target, options.timeout, shutdown).await?;
        let peer = conn.peer_addr();

        let transfer = if options.wait {
            let transfer = if options.forward_input {
                relay_duplex(input, sink, &mut conn, shutdown).await
            } else {
                relay(sink, &mut conn, shutdown).await
            };
            Some(transfer)
        } else {
            None
        };

        // Released on every path, including relay failures
        if let Err(e) = conn.close().await {
            debug!("Closing connection to {} failed: {}", options.target, e);
        }

        let relayed = transfer.map(TransferResult::into_result).transpose()?;
        if let Some(bytes) = relayed {
            info!("Relayed {} bytes from {}", bytes, options.target);
        }

        Ok(SessionReport {
            target: options.target.clone(),
            peer,
            relayed,
        })
    }
}
