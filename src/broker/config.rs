//! Broker configuration.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MqttError, Result};

/// Runtime configuration for the broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// TCP listener address.
    pub bind_address: SocketAddr,

    /// Upper bound on a packet's remaining length, in bytes.
    pub max_packet_size: usize,

    /// Depth of the per-client send queue.
    pub send_queue_depth: usize,

    /// Time a fresh connection gets to present its CONNECT.
    pub connect_timeout: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:1883".parse().unwrap(),
            max_packet_size: 1024 * 1024, // 1 MB
            send_queue_depth: 1024,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl BrokerConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the listener address.
    #[must_use]
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Sets the maximum accepted remaining length.
    #[must_use]
    pub fn with_max_packet_size(mut self, size: usize) -> Self {
        self.max_packet_size = size;
        self
    }

    /// Sets the per-client send queue depth.
    #[must_use]
    pub fn with_send_queue_depth(mut self, depth: usize) -> Self {
        self.send_queue_depth = depth;
        self
    }

    /// Sets the handshake timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for zero-valued limits.
    pub fn validate(&self) -> Result<()> {
        if self.max_packet_size == 0 {
            return Err(MqttError::Configuration(
                "max_packet_size must be greater than zero".to_string(),
            ));
        }
        if self.send_queue_depth == 0 {
            return Err(MqttError::Configuration(
                "send_queue_depth must be greater than zero".to_string(),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(MqttError::Configuration(
                "connect_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = BrokerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_address.port(), 1883);
        assert_eq!(config.send_queue_depth, 1024);
    }

    #[test]
    fn test_builders() {
        let config = BrokerConfig::new()
            .with_bind_address("127.0.0.1:0".parse().unwrap())
            .with_max_packet_size(4096)
            .with_send_queue_depth(8)
            .with_connect_timeout(Duration::from_secs(2));

        assert!(config.validate().is_ok());
        assert_eq!(config.max_packet_size, 4096);
        assert_eq!(config.send_queue_depth, 8);
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_zero_limits_rejected() {
        assert!(BrokerConfig::new()
            .with_max_packet_size(0)
            .validate()
            .is_err());
        assert!(BrokerConfig::new()
            .with_send_queue_depth(0)
            .validate()
            .is_err());
        assert!(BrokerConfig::new()
            .with_connect_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }
}
