use log::info;
use serde::Serialize;
use shared::Player;
use std::collections::HashMap;

/// Roster of players currently in the session
#[derive(Debug, Clone, Default, Serialize)]
pub struct GameState {
    pub players: HashMap<String, Player>,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
        }
    }

    /// Adds a player to the roster
    ///
    /// Called by the hub in the same critical section that registers the
    /// connection, so the roster never lags the registry.
    pub fn add_player(&mut self, player: Player) {
        info!("Added player {}", player.id);
        self.players.insert(player.id.clone(), player);
    }

    /// Removes a player, doing nothing if it is already gone
    pub fn remove_player(&mut self, player_id: &str) {
        if self.players.remove(player_id).is_some() {
            info!("Removed player {}", player_id);
        }
    }

    /// Checks whether a player with this id is on the roster
    ///
    /// Player ids are the client identities handed out in `id` messages.
    pub fn contains(&self, player_id: &str) -> bool {
        self.players.contains_key(player_id)
    }

    /// Returns the number of players on the roster
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Returns true once the last player has left
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
