//! Per-connection session handling
//!
//! A session owns one upgraded socket for its whole life:
//! 1. Join the hub, which queues the client's `id` message and replay
//! 2. Read frames, caching `move` frames and relaying every data frame
//! 3. On read failure, close or idle timeout, leave the hub and close the socket
//! 4. Tell the remaining clients with a `leave` message
//!
//! Outbound frames go through a bounded queue drained by a writer task, so
//! the hub never waits on a socket. If the writer stops, the session ends; if
//! the peer stops draining its socket, the writer is given `close_timeout` to
//! finish after cleanup and is then aborted.

use crate::client_manager::ClientId;
use crate::relay::Hub;
use axum::extract::ws::Message;
use futures::{Sink, SinkExt, Stream, StreamExt};
use log::{debug, error, info, warn};
use shared::classify;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// How long a closing session waits for its queued frames to be written
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-session settings
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Close the session if no frame arrives for this long
    pub idle_timeout: Option<Duration>,
    /// Abort the writer if it has not finished this long after cleanup
    pub close_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: None,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }
}

/// Why the session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Close frame or end of stream
    Closed,
    /// Transport error while reading
    ReadError,
    /// The writer stopped, usually because a socket write failed
    WriteError,
    /// No frame within the configured idle timeout
    IdleTimeout,
}

/// Runs one client session to completion
///
/// `reader` and `writer` are the two halves of the upgraded socket. The
/// function returns after the client has been removed from the hub, the
/// remaining clients have been notified, and the writer has either finished
/// or been aborted.
pub async fn run_session<R, W, E>(hub: Arc<Hub>, reader: R, writer: W, config: SessionConfig)
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
    W: Sink<Message> + Unpin + Send + 'static,
    W::Error: Display,
{
    let joined = match hub.connect().await {
        Ok(joined) => joined,
        Err(e) => {
            // Dropping both halves closes the socket.
            error!("Rejecting connection: {}", e);
            return;
        }
    };
    let client_id = joined.client_id;
    let mut writer_task = tokio::spawn(write_outbound(joined.outbound, writer));
    let mut writer_finished = false;

    let reason = tokio::select! {
        reason = read_inbound(&hub, &client_id, reader, config) => reason,
        result = &mut writer_task => {
            if let Err(e) = result {
                warn!("Writer for client {} panicked: {}", client_id, e);
            }
            writer_finished = true;
            CloseReason::WriteError
        }
    };

    // Dropping the registry's handle ends the writer once queued frames are out.
    hub.disconnect(&client_id).await;
    info!("Client {} disconnected ({:?})", client_id, reason);

    hub.broadcast_leave(&client_id).await;

    if writer_finished {
        return;
    }
    match tokio::time::timeout(config.close_timeout, &mut writer_task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Writer for client {} panicked: {}", client_id, e),
        Err(_) => {
            warn!(
                "Client {} stopped reading, dropping its connection after {:?}",
                client_id, config.close_timeout
            );
            writer_task.abort();
        }
    }
}

async fn read_inbound<R, E>(
    hub: &Hub,
    client_id: &ClientId,
    mut reader: R,
    config: SessionConfig,
) -> CloseReason
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    loop {
        let next = match config.idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, reader.next()).await {
                Ok(next) => next,
                Err(_) => {
                    info!("Client {} idle for {:?}", client_id, limit);
                    return CloseReason::IdleTimeout;
                }
            },
            None => reader.next().await,
        };

        match next {
            Some(Ok(Message::Close(_))) | None => return CloseReason::Closed,
            Some(Ok(message @ (Message::Text(_) | Message::Binary(_)))) => {
                relay_frame(hub, client_id, message).await;
            }
            // Pings are answered by the transport.
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!("Error reading from client {}: {}", client_id, e);
                return CloseReason::ReadError;
            }
        }
    }
}

async fn relay_frame(hub: &Hub, client_id: &ClientId, message: Message) {
    let kind = match &message {
        Message::Text(text) => classify(text.as_str().as_bytes()),
        Message::Binary(bytes) => classify(bytes),
        _ => return,
    };
    debug!("Received {:?} frame from client {}", kind, client_id);

    if kind.is_state_update() {
        hub.record_state(client_id, message.clone()).await;
    }
    hub.broadcast(client_id, message).await;
}

async fn write_outbound<W>(mut outbound: mpsc::Receiver<Message>, mut writer: W)
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    while let Some(message) = outbound.recv().await {
        if let Err(e) = writer.send(message).await {
            debug!("Stopping writer: {}", e);
            break;
        }
    }
    // Later sends to this client now fail and are skipped by broadcasts.
    outbound.close();
    let _ = writer.close().await;
}
