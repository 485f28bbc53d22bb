//! # wispmq
//!
//! A lightweight publish/subscribe broker speaking the MQTT 3.1.1 QoS-0
//! subset over TCP.
//!
//! The broker accepts CONNECT, PUBLISH (QoS 0), SUBSCRIBE, PINGREQ and
//! DISCONNECT, and routes every publish to the clients whose
//! subscription filters (including `+` and `#` wildcards) match the
//! topic. Each client gets a bounded send queue drained by its own
//! writer task, so one slow consumer never stalls a publisher; the
//! subscription tree is published copy-on-write, so fan-out reads a
//! consistent snapshot without taking a lock.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wispmq::broker::MqttBroker;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut broker = MqttBroker::bind("0.0.0.0:1883").await?;
//!     broker.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! Out of scope by design: QoS 1/2, retained messages, wills,
//! authentication, shared subscriptions, TLS and persistence. The
//! keep-alive interval is parsed but not enforced.

#![warn(clippy::pedantic)]

pub mod broker;
pub mod constants;
pub mod encoding;
pub mod error;
pub mod packet;
pub mod transport;

pub use broker::{BrokerConfig, MqttBroker, Router, ShutdownHandle, Subscriber, TopicTree};
pub use error::{MqttError, Result};
pub use packet::{FixedHeader, MqttPacket, Packet, PacketType};
