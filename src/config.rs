//! Configuration module for tcpcat
//!
//! Optional JSON file; every field has a default, and CLI flags override
//! whatever the file sets.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::app::ClientOptions;
use crate::common::ConnectionTarget;
use crate::error::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Log configuration
    #[serde(default)]
    pub log: LogConfig,

    /// Client configuration
    #[serde(default)]
    pub client: ClientConfig,
}

impl Config {
    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_json(&content)
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Serialize back to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }
}

/// Log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Transport protocol name
    #[serde(default = "default_proto")]
    pub proto: String,

    /// Target host or IP
    #[serde(default = "default_address")]
    pub address: String,

    /// Target port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Relay received bytes to stdout after connecting
    #[serde(default)]
    pub wait: bool,

    /// Forward stdin to the peer while waiting
    #[serde(default)]
    pub stdin: bool,

    /// Dial timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Indicator frame interval in milliseconds; 0 disables the indicator
    #[serde(default = "default_indicator_ms")]
    pub indicator_ms: u64,
}

fn default_proto() -> String {
    "tcp".to_string()
}

fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    22
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_indicator_ms() -> u64 {
    100
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            proto: default_proto(),
            address: default_address(),
            port: default_port(),
            wait: false,
            stdin: false,
            timeout_ms: default_timeout_ms(),
            indicator_ms: default_indicator_ms(),
        }
    }
}

impl ClientConfig {
    /// Build the dial target
    pub fn target(&self) -> Result<ConnectionTarget> {
        ConnectionTarget::new(&self.proto, self.address.clone(), self.port)
    }

    /// Validate and convert into runtime options
    pub fn options(&self) -> Result<ClientOptions> {
        if self.timeout_ms == 0 {
            return Err(Error::Config("timeout_ms must be greater than 0".into()));
        }
        if self.stdin && !self.wait {
            return Err(Error::Config("stdin forwarding requires wait".into()));
        }

        let indicator = match self.indicator_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };

        Ok(ClientOptions::new(self.target()?)
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_wait(self.wait)
            .with_forward_input(self.stdin)
            .with_indicator(indicator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.log.level, "info");
        assert_eq!(config.client.proto, "tcp");
        assert_eq!(config.client.address, "0.0.0.0");
        assert_eq!(config.client.port, 22);
        assert!(!config.client.wait);

        let options = config.client.options().unwrap();
        assert_eq!(options.timeout, Duration::from_millis(5000));
        assert_eq!(options.indicator_interval, Some(Duration::from_millis(100)));
        assert_eq!(options.target.socket_addr(), "0.0.0.0:22");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = Config::from_json(
            r#"{ "client": { "address": "localhost", "port": 8080, "wait": true, "indicator_ms": 0 } }"#,
        )
        .unwrap();

        assert_eq!(config.log.level, "info");
        assert_eq!(config.client.proto, "tcp");
        assert_eq!(config.client.timeout_ms, 5000);

        let options = config.client.options().unwrap();
        assert!(options.wait);
        assert!(options.indicator_interval.is_none());
        assert_eq!(options.target.socket_addr(), "localhost:8080");
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        assert!(matches!(Config::from_json("{ not json"), Err(Error::Config(_))));

        let mut client = ClientConfig::default();
        client.timeout_ms = 0;
        assert!(matches!(client.options(), Err(Error::Config(_))));

        let mut client = ClientConfig::default();
        client.port = 0;
        assert!(matches!(client.options(), Err(Error::InvalidTarget(_))));
    }

    #[test]
    fn test_stdin_requires_wait() {
        let mut client = ClientConfig::default();
        client.stdin = true;
        assert!(matches!(client.options(), Err(Error::Config(msg)) if msg.contains("wait")));

        client.wait = true;
        let options = client.options().unwrap();
        assert!(options.forward_input);
        assert!(options.wait);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = config.to_json().unwrap();
        let parsed = Config::from_json(&json).unwrap();
        assert_eq!(parsed.client.port, config.client.port);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/tcpcat.json");
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("read")));
    }
}
