//! Connection registry and per-client state cache
//!
//! This module tracks which clients are currently connected and the last
//! state frame each of them reported:
//! - Registration and removal of client connection handles
//! - Last-known `move` frame per client, replayed to newcomers
//! - Recipient enumeration for fan-out, always excluding the sender
//!
//! The two maps are only ever mutated together. The manager itself is not
//! synchronized; the [`Hub`](crate::relay::Hub) owns it behind one lock.

use crate::error::RelayError;
use axum::extract::ws::Message;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

/// Opaque identity assigned to a client for the lifetime of its connection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    /// Generates a fresh random identity
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrows the identity as it appears on the wire
    ///
    /// This is the value sent in the `id` and `leave` messages and the key
    /// used by the player roster.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClientId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Non-owning handle to a client's connection
///
/// The session that owns the socket drains the other end of this bounded
/// queue into the socket. Pushing never blocks, so it is safe to do while the
/// hub lock is held. A client that stops reading fills its queue, after which
/// further frames for it are rejected instead of piling up in memory.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    pub id: ClientId,
    sender: mpsc::Sender<Message>,
}

impl ClientHandle {
    pub fn new(id: ClientId, sender: mpsc::Sender<Message>) -> Self {
        Self { id, sender }
    }

    /// Queues a frame for this client without waiting
    ///
    /// Fails with `Full` while the client is behind on reading and with
    /// `Closed` once the owning session has stopped writing. The rejected
    /// frame is handed back inside the error.
    pub fn send(&self, message: Message) -> Result<(), TrySendError<Message>> {
        self.sender.try_send(message)
    }
}

/// Registry of live connections plus their last reported state
pub struct ClientManager {
    /// Connected clients indexed by identity
    clients: HashMap<ClientId, ClientHandle>,
    /// Last `move` frame per client; keys are always a subset of `clients`
    states: HashMap<ClientId, Message>,
}

impl ClientManager {
    /// Creates an empty registry
    ///
    /// One manager exists per hub. It starts with no clients and no cached
    /// states; both maps grow and shrink together as sessions come and go.
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
            states: HashMap::new(),
        }
    }

    /// Registers a new connection
    ///
    /// Identities are generated uniquely, so a collision means a bug
    /// upstream. The registry is left untouched in that case.
    pub fn register(&mut self, handle: ClientHandle) -> Result<(), RelayError> {
        if self.clients.contains_key(&handle.id) {
            return Err(RelayError::DuplicateClient(handle.id));
        }
        self.clients.insert(handle.id.clone(), handle);
        Ok(())
    }

    /// Removes a connection and its cached state
    ///
    /// Returns true if the client was registered. Calling it again for the
    /// same identity is a no-op.
    pub fn unregister(&mut self, client_id: &ClientId) -> bool {
        self.remove_state(client_id);
        self.clients.remove(client_id).is_some()
    }

    /// Invokes `f` for every registered connection except the sender's
    pub fn for_each_except<F>(&self, sender: &ClientId, mut f: F)
    where
        F: FnMut(&ClientHandle),
    {
        for (id, handle) in &self.clients {
            if id != sender {
                f(handle);
            }
        }
    }

    /// Copies out the current recipients for a broadcast from `sender`
    pub fn recipients_except(&self, sender: &ClientId) -> Vec<ClientHandle> {
        let mut recipients = Vec::with_capacity(self.clients.len());
        self.for_each_except(sender, |handle| recipients.push(handle.clone()));
        recipients
    }

    /// Overwrites the last state frame of a registered client
    ///
    /// Unknown identities are ignored so that a late update can never
    /// resurrect state for a client that has already been cleaned up.
    pub fn put_state(&mut self, client_id: &ClientId, payload: Message) -> bool {
        if !self.clients.contains_key(client_id) {
            return false;
        }
        self.states.insert(client_id.clone(), payload);
        true
    }

    /// Drops the cached state of a client, if any
    ///
    /// The registration itself is kept. Returns true if a state was removed,
    /// so repeated calls for the same identity are harmless.
    pub fn remove_state(&mut self, client_id: &ClientId) -> bool {
        self.states.remove(client_id).is_some()
    }

    /// Returns the last state frame cached for a client
    pub fn state_of(&self, client_id: &ClientId) -> Option<&Message> {
        self.states.get(client_id)
    }

    /// Point-in-time copy of every other client's last state
    pub fn snapshot_except(&self, client_id: &ClientId) -> Vec<(ClientId, Message)> {
        self.states
            .iter()
            .filter(|(id, _)| *id != client_id)
            .map(|(id, payload)| (id.clone(), payload.clone()))
            .collect()
    }

    /// Checks whether a client is currently registered
    ///
    /// Only registered clients receive broadcasts and may cache state.
    pub fn contains(&self, client_id: &ClientId) -> bool {
        self.clients.contains_key(client_id)
    }

    /// Returns the number of currently connected clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns the number of clients with a cached state
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Returns true if no clients are currently connected
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl Default for ClientManager {
    fn default() -> Self {
        Self::new()
    }
}
