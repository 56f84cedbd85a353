//! Shared hub state and broadcast fan-out
//!
//! The [`Hub`] owns the connection registry, the state cache and the player
//! roster behind a single lock. Every lifecycle event (join, state update,
//! leave) is one critical section, so a concurrent broadcast never observes a
//! client that is registered but missing from the roster, or a cached state
//! whose owner is already gone.
//!
//! Broadcasts copy the recipient list under the lock and push to each
//! recipient's bounded queue after releasing it. A recipient whose queue is
//! full or closed misses that frame; the others are unaffected.

use crate::client_manager::{ClientHandle, ClientId, ClientManager};
use crate::error::RelayError;
use crate::game::GameState;
use axum::extract::ws::Message;
use log::{debug, info, warn};
use shared::{Player, ServerMessage};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};

/// Frames a client may fall behind by before broadcasts to it are dropped
pub const DEFAULT_SEND_QUEUE: usize = 256;

/// Outcome of a single broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Result of admitting a new client
#[derive(Debug)]
pub struct Joined {
    pub client_id: ClientId,
    /// Number of other clients' states replayed to the newcomer
    pub replayed: usize,
    /// Frames queued for this client, starting with its `id` message
    pub outbound: mpsc::Receiver<Message>,
}

struct HubState {
    clients: ClientManager,
    game_state: GameState,
}

/// Single-room relay hub shared by all sessions
pub struct Hub {
    state: Mutex<HubState>,
    send_queue: usize,
}

impl Hub {
    pub fn new() -> Self {
        Self::with_game_state(GameState::new())
    }

    pub fn with_game_state(game_state: GameState) -> Self {
        Self {
            state: Mutex::new(HubState {
                clients: ClientManager::new(),
                game_state,
            }),
            send_queue: DEFAULT_SEND_QUEUE,
        }
    }

    /// Creates a hub whose clients may lag `send_queue` frames behind
    ///
    /// Once a client's queue holds that many unsent broadcasts, further
    /// frames for it are dropped and counted as failed until it catches up.
    /// A value of zero is treated as one.
    pub fn with_send_queue(send_queue: usize) -> Self {
        Self {
            send_queue: send_queue.max(1),
            ..Self::new()
        }
    }

    /// Admits a client under a freshly generated identity
    pub async fn connect(&self) -> Result<Joined, RelayError> {
        self.join(ClientId::generate()).await
    }

    /// Admits a client under the given identity
    ///
    /// Registration, roster update, and the queuing of the `id` message and
    /// the state replay all happen in one critical section. Anything
    /// broadcast afterwards lands behind them in the client's queue.
    ///
    /// The queue is sized so the greeting and the full replay always fit,
    /// with room for the configured backlog of broadcasts on top.
    pub async fn join(&self, client_id: ClientId) -> Result<Joined, RelayError> {
        let mut state = self.state.lock().await;
        if state.clients.contains(&client_id) {
            return Err(RelayError::DuplicateClient(client_id));
        }

        let replay = state.clients.snapshot_except(&client_id);
        let replayed = replay.len();
        let (sender, outbound) = mpsc::channel(self.send_queue + replayed + 1);
        let handle = ClientHandle::new(client_id.clone(), sender);

        state.clients.register(handle.clone())?;
        state.game_state.add_player(Player::new(client_id.as_str()));

        let greeting = ServerMessage::Id {
            id: client_id.to_string(),
        };
        // The queue was sized for these frames and its receiver is still ours
        let _ = handle.send(Message::Text(greeting.to_json().into()));
        for (_, payload) in replay {
            let _ = handle.send(payload);
        }
        drop(state);

        info!("Client {} connected ({} states replayed)", client_id, replayed);
        Ok(Joined {
            client_id,
            replayed,
            outbound,
        })
    }

    /// Caches `payload` as the client's latest state
    pub async fn record_state(&self, client_id: &ClientId, payload: Message) -> bool {
        let mut state = self.state.lock().await;
        state.clients.put_state(client_id, payload)
    }

    /// Removes a client from registry, state cache and roster
    ///
    /// Returns false if the client was already gone.
    pub async fn disconnect(&self, client_id: &ClientId) -> bool {
        let mut state = self.state.lock().await;
        let removed = state.clients.unregister(client_id);
        if removed {
            state.game_state.remove_player(client_id.as_str());
        }
        removed
    }

    /// Sends `message` to every registered client except `sender`
    ///
    /// Recipients whose queue is full or closed are skipped; the rest still
    /// get the message.
    pub async fn broadcast(&self, sender: &ClientId, message: Message) -> BroadcastReport {
        let recipients = {
            let state = self.state.lock().await;
            state.clients.recipients_except(sender)
        };

        let mut report = BroadcastReport::default();
        for recipient in recipients {
            match recipient.send(message.clone()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!("Send queue full for client {}, dropping message", recipient.id);
                    report.failed += 1;
                }
                Err(TrySendError::Closed(_)) => {
                    warn!("Failed to send to client {}", recipient.id);
                    report.failed += 1;
                }
            }
        }

        debug!(
            "Broadcast from {}: {} delivered, {} failed",
            sender, report.delivered, report.failed
        );
        report
    }

    /// Announces that `client_id` has left
    pub async fn broadcast_leave(&self, client_id: &ClientId) -> BroadcastReport {
        let notice = ServerMessage::Leave {
            id: client_id.to_string(),
        };
        self.broadcast(client_id, Message::Text(notice.to_json().into()))
            .await
    }

    /// Returns the number of currently connected clients
    pub async fn client_count(&self) -> usize {
        self.state.lock().await.clients.len()
    }

    /// Checks whether a client is still registered
    ///
    /// Turns false as soon as its session has run cleanup, even if the leave
    /// notice has not gone out yet.
    pub async fn is_connected(&self, client_id: &ClientId) -> bool {
        self.state.lock().await.clients.contains(client_id)
    }

    /// Returns a copy of the last `move` frame cached for a client
    ///
    /// This is exactly what a client joining now would be replayed for it.
    /// `None` if the client never moved or has already left.
    pub async fn cached_state(&self, client_id: &ClientId) -> Option<Message> {
        let state = self.state.lock().await;
        state.clients.state_of(client_id).cloned()
    }

    /// Copy of the current player roster
    pub async fn roster(&self) -> GameState {
        self.state.lock().await.game_state.clone()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}
