//! Broker core: subscription state, routing, and per-connection tasks.

pub mod client;
pub mod client_handler;
pub mod config;
pub mod router;
pub mod server;
pub mod topic_tree;

pub use client::Client;
pub use client_handler::ClientHandler;
pub use config::BrokerConfig;
pub use router::Router;
pub use server::{MqttBroker, ShutdownHandle};
pub use topic_tree::{Subscriber, TopicTree};
