//! Error types for tcpcat

use std::io::{self, ErrorKind};
use std::time::Duration;

use thiserror::Error;

/// Main error type for tcpcat
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Protocol the dialer or the fixture cannot serve; only the tcp
    /// family is supported on either side
    #[error("Invalid protocol given: {0} (expected tcp, tcp4 or tcp6)")]
    InvalidProtocol(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Connection to {addr} timed out after {timeout:?}")]
    Timeout { addr: String, timeout: Duration },

    #[error("Connection refused by {0}")]
    ConnectionRefused(String),

    #[error("Network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("Could not resolve {0}")]
    Resolve(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Already closed")]
    AlreadyClosed,
}

impl Error {
    /// Classify an OS-level connect failure for `addr`
    pub fn from_connect(addr: impl Into<String>, err: io::Error) -> Self {
        match err.kind() {
            ErrorKind::ConnectionRefused => Error::ConnectionRefused(addr.into()),
            ErrorKind::NetworkUnreachable | ErrorKind::HostUnreachable => {
                Error::NetworkUnreachable(addr.into())
            }
            _ => Error::Io(err),
        }
    }

    /// True if this error came from the shutdown token rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// Result type alias for tcpcat
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_connect_classifies_refusal() {
        let err = Error::from_connect("127.0.0.1:1", io::Error::from(ErrorKind::ConnectionRefused));
        assert!(matches!(err, Error::ConnectionRefused(addr) if addr == "127.0.0.1:1"));
    }

    #[test]
    fn test_from_connect_classifies_unreachable() {
        let err = Error::from_connect("10.0.0.1:80", io::Error::from(ErrorKind::HostUnreachable));
        assert!(matches!(err, Error::NetworkUnreachable(_)));

        let err = Error::from_connect("10.0.0.1:80", io::Error::from(ErrorKind::NetworkUnreachable));
        assert!(matches!(err, Error::NetworkUnreachable(_)));
    }

    #[test]
    fn test_from_connect_keeps_other_io_errors() {
        let err = Error::from_connect("x:1", io::Error::from(ErrorKind::PermissionDenied));
        assert!(matches!(err, Error::Io(e) if e.kind() == ErrorKind::PermissionDenied));
    }

    #[test]
    fn test_messages_distinguish_failures() {
        let timeout = Error::Timeout {
            addr: "h:1".into(),
            timeout: Duration::from_millis(50),
        };
        assert!(timeout.to_string().contains("timed out"));
        assert!(Error::ConnectionRefused("h:1".into()).to_string().contains("refused"));
        assert!(Error::NetworkUnreachable("h:1".into()).to_string().contains("unreachable"));
    }

    #[test]
    fn test_invalid_protocol_names_supported_set() {
        let msg = Error::InvalidProtocol("udp".into()).to_string();
        assert!(msg.contains("udp"));
        assert!(msg.contains("tcp, tcp4 or tcp6"));
    }
}
