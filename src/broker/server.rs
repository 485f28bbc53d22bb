//! Broker server: the TCP listener and per-connection task spawning.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::broker::client_handler::ClientHandler;
use crate::broker::config::BrokerConfig;
use crate::broker::router::Router;
use crate::error::{MqttError, Result};

/// MQTT 3.1.1 QoS-0 broker.
pub struct MqttBroker {
    config: Arc<BrokerConfig>,
    router: Arc<Router>,
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
}

impl MqttBroker {
    /// Binds to `addr` with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or binding fails.
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self> {
        let addr = addr
            .as_ref()
            .parse::<SocketAddr>()
            .map_err(|e| MqttError::Configuration(format!("invalid address: {e}")))?;
        Self::with_config(BrokerConfig::default().with_bind_address(addr)).await
    }

    /// Binds with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or binding
    /// fails.
    pub async fn with_config(config: BrokerConfig) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.bind_address).await?;
        let local_addr = listener.local_addr()?;
        info!("MQTT broker listening on {local_addr}");

        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config: Arc::new(config),
            router: Arc::new(Router::new()),
            listener: Some(listener),
            local_addr,
            shutdown_tx,
        })
    }

    /// Address the listener is bound to. Useful with port 0.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns a handle that triggers a broker-wide shutdown.
    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            shutdown_tx: self.shutdown_tx.clone(),
        }
    }

    /// Accepts connections and spawns a handler per client until the
    /// shutdown handle fires.
    ///
    /// # Errors
    ///
    /// Returns an error if called twice on the same broker.
    pub async fn run(&mut self) -> Result<()> {
        let Some(listener) = self.listener.take() else {
            return Err(MqttError::InvalidState(
                "broker already running".to_string(),
            ));
        };

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer_addr)) => {
                            debug!(%peer_addr, "accepted connection");

                            let handler = ClientHandler::new(
                                Arc::clone(&self.config),
                                Arc::clone(&self.router),
                                peer_addr,
                                self.shutdown_tx.subscribe(),
                            );

                            tokio::spawn(async move {
                                if let Err(e) = handler.run(stream).await {
                                    warn!(%peer_addr, error = %e, "client handler finished with error");
                                }
                            });
                        }
                        Err(e) => {
                            warn!(error = %e, "accept failed");
                        }
                    }
                }

                _ = shutdown_rx.recv() => {
                    info!("broker shutting down");
                    return Ok(());
                }
            }
        }
    }
}

/// Cloneable handle that stops a running [`MqttBroker`].
#[derive(Clone)]
pub struct ShutdownHandle {
    shutdown_tx: broadcast::Sender<()>,
}

impl ShutdownHandle {
    /// Signals the accept loop and every connection handler to stop.
    /// Redundant calls are harmless.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
