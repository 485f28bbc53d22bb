//! Per-connection state machine: handshake, then the dispatch loop.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::broker::client::Client;
use crate::broker::config::BrokerConfig;
use crate::broker::router::Router;
use crate::broker::topic_tree::Subscriber;
use crate::constants::CONNECT_ACCEPTED;
use crate::error::{MqttError, Result};
use crate::packet::connack::ConnAckPacket;
use crate::packet::publish::PublishPacket;
use crate::packet::suback::SubAckPacket;
use crate::packet::subscribe::SubscribePacket;
use crate::packet::{MqttPacket, Packet};
use crate::transport::read_packet;

/// Drives a single client connection from handshake to disconnect.
pub struct ClientHandler {
    config: Arc<BrokerConfig>,
    router: Arc<Router>,
    peer_addr: SocketAddr,
    shutdown_rx: broadcast::Receiver<()>,
}

impl ClientHandler {
    /// Creates a handler for an accepted connection.
    #[must_use]
    pub fn new(
        config: Arc<BrokerConfig>,
        router: Arc<Router>,
        peer_addr: SocketAddr,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            config,
            router,
            peer_addr,
            shutdown_rx,
        }
    }

    /// Runs the connection to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the handshake fails or the established loop
    /// ends on a protocol violation or I/O failure. A client-initiated
    /// disconnect and a broker shutdown both end with `Ok`.
    pub async fn run(mut self, stream: TcpStream) -> Result<()> {
        let (mut reader, writer) = stream.into_split();

        // AwaitConnect: exactly one packet, and it must be CONNECT.
        // Anything else closes the connection with no reply.
        let connect = match timeout(
            self.config.connect_timeout,
            read_packet(&mut reader, self.config.max_packet_size),
        )
        .await
        {
            Ok(Ok(Packet::Connect(connect))) => connect,
            Ok(Ok(_)) => {
                warn!(peer = %self.peer_addr, "first packet was not CONNECT");
                return Err(MqttError::ProtocolError(
                    "expected CONNECT".to_string(),
                ));
            }
            Ok(Err(e)) => {
                warn!(peer = %self.peer_addr, error = %e, "handshake failed");
                return Err(e);
            }
            Err(_) => {
                warn!(peer = %self.peer_addr, "connect timeout");
                return Err(MqttError::ConnectTimeout);
            }
        };

        let client = Client::spawn(
            connect.client_id.clone(),
            writer,
            self.config.send_queue_depth,
        );
        info!(
            client = %client.id(),
            peer = %self.peer_addr,
            clean_session = connect.clean_session,
            keep_alive = connect.keep_alive,
            "client connected"
        );

        let connack = Packet::ConnAck(ConnAckPacket::new(false, CONNECT_ACCEPTED));
        client.send(connack.to_bytes()?).await?;

        let result = self.handle_packets(&mut reader, &client).await;

        client.close();
        info!(client = %client.id(), "client disconnected");
        result
    }

    /// Established state: dispatch one packet at a time until the
    /// client disconnects or the broker shuts down.
    async fn handle_packets(
        &mut self,
        reader: &mut OwnedReadHalf,
        client: &Arc<Client>,
    ) -> Result<()> {
        loop {
            tokio::select! {
                packet = read_packet(reader, self.config.max_packet_size) => {
                    match packet {
                        Ok(packet) => {
                            if !self.handle_packet(packet, client).await? {
                                return Ok(());
                            }
                        }
                        Err(MqttError::ConnectionClosed) => {
                            debug!(client = %client.id(), "connection closed by peer");
                            return Ok(());
                        }
                        Err(e) => {
                            warn!(client = %client.id(), error = %e, "closing connection");
                            return Err(e);
                        }
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    debug!(client = %client.id(), "shutdown signal received");
                    return Ok(());
                }
            }
        }
    }

    /// Dispatches one packet. Returns `false` when the connection
    /// should terminate.
    async fn handle_packet(&self, packet: Packet, client: &Arc<Client>) -> Result<bool> {
        match packet {
            Packet::PingReq => {
                client.send(Packet::PingResp.to_bytes()?).await?;
                Ok(true)
            }
            Packet::Subscribe(subscribe) => {
                self.handle_subscribe(subscribe, client).await?;
                Ok(true)
            }
            Packet::Publish(publish) => {
                self.handle_publish(&publish)?;
                Ok(true)
            }
            Packet::Disconnect => {
                debug!(client = %client.id(), "client requested disconnect");
                Ok(false)
            }
            Packet::Connect(_)
            | Packet::ConnAck(_)
            | Packet::SubAck(_)
            | Packet::PingResp => {
                warn!(client = %client.id(), "unexpected packet, closing connection");
                Ok(false)
            }
        }
    }

    async fn handle_subscribe(
        &self,
        subscribe: SubscribePacket,
        client: &Arc<Client>,
    ) -> Result<()> {
        for filter in &subscribe.filters {
            debug!(client = %client.id(), filter = %filter.filter, "subscribe");
            self.router
                .subscribe(&filter.filter, Arc::clone(client) as Arc<dyn Subscriber>);
        }

        let suback = SubAckPacket::granted(subscribe.packet_id, subscribe.filters.len());
        client.send(Packet::SubAck(suback).to_bytes()?).await?;
        Ok(())
    }

    /// Encodes the outbound frame once and hands it to the router; every
    /// matching subscriber gets the same bytes.
    fn handle_publish(&self, publish: &PublishPacket) -> Result<()> {
        let mut frame = BytesMut::with_capacity(
            4 + publish.topic_name.len() + publish.payload.len(),
        );
        publish.encode(&mut frame)?;

        debug!(
            topic = %publish.topic_name,
            payload_len = publish.payload.len(),
            "publish"
        );
        self.router.publish(publish, &frame.freeze());
        Ok(())
    }
}
