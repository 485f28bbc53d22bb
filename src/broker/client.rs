//! Per-connection client: bounded send queue plus the writer task that
//! drains it.
//!
//! Frames reach the socket through exactly one path, so per-client FIFO
//! holds across handler replies and router fan-out. Enqueueing never
//! blocks; a slow consumer costs it frames, not the publisher time.

use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::broker::topic_tree::Subscriber;
use crate::error::{MqttError, Result};

/// Handle to a connected client.
pub struct Client {
    id: String,
    frames: mpsc::Sender<Bytes>,
    shutdown: watch::Sender<bool>,
}

impl Client {
    /// Spawns the writer task for `writer` and returns the shared
    /// handle used by the connection handler and the router.
    pub fn spawn<W>(id: String, writer: W, queue_depth: usize) -> Arc<Self>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (frame_tx, frame_rx) = mpsc::channel(queue_depth);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let client = Arc::new(Self {
            id,
            frames: frame_tx,
            shutdown: shutdown_tx,
        });

        tokio::spawn(write_loop(
            client.id.clone(),
            writer,
            frame_rx,
            shutdown_rx,
        ));

        client
    }

    /// Client identifier from the CONNECT handshake.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Queues a reply from the connection handler itself.
    ///
    /// Unlike [`Subscriber::enqueue`] this waits for queue capacity, so
    /// control replies are never dropped under fan-out pressure.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::SubscriberClosed`] if the writer has exited.
    pub async fn send(&self, frame: Bytes) -> Result<()> {
        self.frames
            .send(frame)
            .await
            .map_err(|_| MqttError::SubscriberClosed)
    }

    /// Signals the writer task to stop and close the connection.
    ///
    /// Safe to call more than once; later calls are no-ops.
    pub fn close(&self) {
        let _ = self.shutdown.send(true);
    }
}

impl Subscriber for Client {
    fn id(&self) -> &str {
        &self.id
    }

    fn enqueue(&self, frame: Bytes) -> Result<()> {
        match self.frames.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(MqttError::QueueFull),
            Err(TrySendError::Closed(_)) => Err(MqttError::SubscriberClosed),
        }
    }
}

async fn write_loop<W>(
    id: String,
    mut writer: W,
    mut frames: mpsc::Receiver<Bytes>,
    mut shutdown: watch::Receiver<bool>,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = writer.write_all(&frame).await {
                        warn!(client = %id, error = %e, "write failed, closing connection");
                        break;
                    }
                    if let Err(e) = writer.flush().await {
                        warn!(client = %id, error = %e, "flush failed, closing connection");
                        break;
                    }
                }
                None => break,
            },
            _ = shutdown.changed() => break,
        }
    }

    let _ = writer.shutdown().await;
    debug!(client = %id, "writer task finished");
}
