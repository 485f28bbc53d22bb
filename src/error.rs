use thiserror::Error;

pub type Result<T> = std::result::Result<T, MqttError>;

/// Errors surfaced by the codec and the broker core.
///
/// # Error Categories
///
/// - **I/O and Network**: `Io`, `ConnectionClosed`, `ConnectTimeout`
/// - **Framing and Validation**: `MalformedPacket`, `PacketTooLarge`
/// - **Protocol**: `ProtocolError`, `InvalidPacketType`
/// - **Backpressure**: `QueueFull`, `SubscriberClosed`
/// - **Operations**: `Configuration`, `InvalidState`
#[derive(Error, Debug, Clone)]
pub enum MqttError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Connect timeout")]
    ConnectTimeout,

    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    #[error("Packet too large: remaining length {size} exceeds maximum {max}")]
    PacketTooLarge { size: usize, max: usize },

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Invalid packet type: {0}")]
    InvalidPacketType(u8),

    #[error("Send queue full")]
    QueueFull,

    #[error("Subscriber closed")]
    SubscriberClosed,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl From<std::io::Error> for MqttError {
    fn from(err: std::io::Error) -> Self {
        MqttError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_display() {
        let err = MqttError::MalformedPacket("empty topic name".to_string());
        assert_eq!(err.to_string(), "Malformed packet: empty topic name");

        let err = MqttError::PacketTooLarge {
            size: 2048,
            max: 1024,
        };
        assert_eq!(
            err.to_string(),
            "Packet too large: remaining length 2048 exceeds maximum 1024"
        );

        let err = MqttError::InvalidPacketType(0);
        assert_eq!(err.to_string(), "Invalid packet type: 0");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer");
        let mqtt_err: MqttError = io_err.into();
        match mqtt_err {
            MqttError::Io(e) => assert!(e.contains("reset by peer")),
            _ => panic!("Expected Io error"),
        }
    }
}
