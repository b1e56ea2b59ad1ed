//! Transport Layer
//!
//! Responsibilities:
//! - Establish raw outbound connections (the dialer)
//! - Bind listeners for the fixture server
//! - NO framing, NO retries, NO content inspection
//!
//! `dial` owns the timeout and cancellation policy; transports only know how
//! to open a socket.

mod tcp;

pub use tcp::TcpTransport;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::common::{Connection, ConnectionTarget, Result, Shutdown, Stream};
use crate::error::Error;

/// Stream protocols the dialer can serve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// TCP over any address family
    Tcp,
    /// TCP over IPv4 only
    Tcp4,
    /// TCP over IPv6 only
    Tcp6,
}

impl Protocol {
    /// Parse a lower-cased protocol name, for both the dialer and the fixture
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "tcp" => Ok(Protocol::Tcp),
            "tcp4" => Ok(Protocol::Tcp4),
            "tcp6" => Ok(Protocol::Tcp6),
            other => Err(Error::InvalidProtocol(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Tcp4 => "tcp4",
            Protocol::Tcp6 => "tcp6",
        }
    }

    /// Whether a resolved address belongs to this protocol's family
    pub fn accepts(&self, addr: &SocketAddr) -> bool {
        match self {
            Protocol::Tcp => true,
            Protocol::Tcp4 => addr.is_ipv4(),
            Protocol::Tcp6 => addr.is_ipv6(),
        }
    }
}

/// Transport trait for establishing raw connections
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to a target, returning the stream and the address it reached.
    ///
    /// Not bounded in time; callers apply their own timeout.
    async fn connect(&self, target: &ConnectionTarget) -> Result<(Stream, SocketAddr)>;

    /// Create a listener bound to an address
    async fn bind(&self, addr: SocketAddr) -> Result<Box<dyn Listener>>;
}

/// Listener trait for accepting incoming connections
#[async_trait]
pub trait Listener: Send + Sync {
    /// Accept a new connection
    async fn accept(&self) -> Result<(Stream, SocketAddr)>;

    /// Get the local bound address
    fn local_addr(&self) -> Result<SocketAddr>;
}

/// Pick the transport serving a protocol name
pub fn transport_for(protocol: &str) -> Result<Arc<dyn Transport>> {
    let protocol = Protocol::parse(protocol)?;
    Ok(Arc::new(TcpTransport::with_protocol(protocol)))
}

/// Dial `target`, giving up after `timeout` or when `shutdown` fires
pub async fn dial(
    target: &ConnectionTarget,
    timeout: Duration,
    shutdown: &Shutdown,
) -> Result<Connection> {
    let transport = transport_for(target.protocol())?;
    dial_with(transport.as_ref(), target, timeout, shutdown).await
}

/// Dial through an explicit transport
pub async fn dial_with(
    transport: &dyn Transport,
    target: &ConnectionTarget,
    timeout: Duration,
    shutdown: &Shutdown,
) -> Result<Connection> {
    info!(
        "Starting connection to {} port {}",
        target.host(),
        target.port()
    );

    let attempt = tokio::time::timeout(timeout, transport.connect(target));
    let (stream, peer) = tokio::select! {
        biased;
        _ = shutdown.triggered() => return Err(Error::Cancelled),
        result = attempt => match result {
            Ok(connected) => connected?,
            Err(_) => {
                return Err(Error::Timeout {
                    addr: target.socket_addr(),
                    timeout,
                });
            }
        },
    };

    info!("Connection opened");
    Ok(Connection::new(stream, target.clone()).with_peer(peer))
}

/// Parse a listen address: `ip:port`, or `:port` for all interfaces
pub fn parse_listen_address(s: &str) -> Result<SocketAddr> {
    if let Ok(addr) = s.parse() {
        return Ok(addr);
    }

    if let Some((host, port)) = s.rsplit_once(':') {
        let port: u16 = port
            .parse()
            .map_err(|_| Error::Config(format!("Invalid port in address: {}", s)))?;

        if host.is_empty() {
            return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port));
        }
        if host == "localhost" {
            return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port));
        }
        if let Ok(ip) = host.trim_start_matches('[').trim_end_matches(']').parse() {
            return Ok(SocketAddr::new(ip, port));
        }
        return Err(Error::Config(format!("Cannot bind to domain address: {}", s)));
    }

    Err(Error::Config(format!("Invalid listen address: {}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::net::TcpListener;

    /// Transport whose connect never completes, like a black-holed address
    struct BlackholeTransport;

    #[async_trait]
    impl Transport for BlackholeTransport {
        async fn connect(&self, _target: &ConnectionTarget) -> Result<(Stream, SocketAddr)> {
            std::future::pending().await
        }

        async fn bind(&self, _addr: SocketAddr) -> Result<Box<dyn Listener>> {
            Err(Error::Config("Blackhole transport cannot bind".into()))
        }
    }

    #[test]
    fn test_protocol_parse() {
        assert_eq!(Protocol::parse("tcp").unwrap(), Protocol::Tcp);
        assert_eq!(Protocol::parse("tcp6").unwrap().as_str(), "tcp6");
        assert!(matches!(
            Protocol::parse("udp"),
            Err(Error::InvalidProtocol(p)) if p == "udp"
        ));
    }

    #[test]
    fn test_parse_listen_address() {
        assert_eq!(
            parse_listen_address(":8080").unwrap(),
            "0.0.0.0:8080".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_listen_address("127.0.0.1:0").unwrap(),
            "127.0.0.1:0".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_listen_address("localhost:9000").unwrap().port(),
            9000
        );
        assert!(parse_listen_address("example.com:80").is_err());
        assert!(parse_listen_address(":http").is_err());
        assert!(parse_listen_address("nonsense").is_err());
    }

    #[tokio::test]
    async fn test_dial_success() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let target = ConnectionTarget::tcp("127.0.0.1", port).unwrap();
        let mut conn = dial(&target, Duration::from_secs(5), &Shutdown::new())
            .await
            .unwrap();

        let (_accepted, _) = listener.accept().await.unwrap();
        assert_eq!(conn.peer_addr().map(|a| a.port()), Some(port));
        assert_eq!(conn.target(), &target);
        conn.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_dial_refused() {
        // Grab a free port, then release it so nothing is listening
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let target = ConnectionTarget::tcp("127.0.0.1", port).unwrap();
        let result = dial(&target, Duration::from_secs(5), &Shutdown::new()).await;

        assert!(
            matches!(result, Err(Error::ConnectionRefused(_))),
            "expected refusal, got {:?}",
            result
        );
    }

    #[tokio::test]
    async fn test_dial_times_out() {
        let target = ConnectionTarget::tcp("192.0.2.1", 81).unwrap();
        let timeout = Duration::from_millis(50);
        let started = Instant::now();

        let result = dial_with(&BlackholeTransport, &target, timeout, &Shutdown::new()).await;

        assert!(matches!(result, Err(Error::Timeout { timeout: t, .. }) if t == timeout));
        assert!(started.elapsed() < timeout + Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_dial_cancelled_by_shutdown() {
        let target = ConnectionTarget::tcp("192.0.2.1", 81).unwrap();
        let shutdown = Shutdown::new();

        let trigger = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                shutdown.trigger();
            })
        };

        let result = dial_with(
            &BlackholeTransport,
            &target,
            Duration::from_secs(30),
            &shutdown,
        )
        .await;
        trigger.await.unwrap();

        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_dial_rejects_udp() {
        let target = ConnectionTarget::new("UDP", "127.0.0.1", 53).unwrap();
        let result = dial(&target, Duration::from_secs(1), &Shutdown::new()).await;

        assert!(matches!(result, Err(Error::InvalidProtocol(p)) if p == "udp"));
    }
}
