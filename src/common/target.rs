//! Connection target for outbound dials

use std::fmt;

use crate::error::{Error, Result};

/// Where to dial: protocol name, host and port.
///
/// Built once from user configuration and read-only afterwards. The protocol
/// is stored lower-cased; no other validation is applied to it here, the
/// transport layer decides whether it can be served.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionTarget {
    protocol: String,
    host: String,
    port: u16,
}

impl ConnectionTarget {
    /// Create a target, rejecting port 0 and empty hosts
    pub fn new(protocol: impl AsRef<str>, host: impl Into<String>, port: u16) -> Result<Self> {
        let host = host.into();
        if host.is_empty() {
            return Err(Error::InvalidTarget("empty host".into()));
        }
        if port == 0 {
            return Err(Error::InvalidTarget(format!(
                "port must be in 1-65535 (host {})",
                host
            )));
        }

        Ok(Self {
            protocol: protocol.as_ref().to_lowercase(),
            host,
            port,
        })
    }

    /// Shorthand for a plain TCP target
    pub fn tcp(host: impl Into<String>, port: u16) -> Result<Self> {
        Self::new("tcp", host, port)
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Composite `host:port` string, bracketing bare IPv6 literals
    pub fn socket_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.protocol, self.socket_addr())
    }
}
