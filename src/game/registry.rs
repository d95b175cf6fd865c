//! Registry of connected players

use std::collections::HashMap;

use super::PlayerState;

/// Authoritative map of who is online, keyed by player id
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: HashMap<String, PlayerState>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&PlayerState> {
        self.players.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut PlayerState> {
        self.players.get_mut(id)
    }

    /// Insert, returning any entry it replaced
    pub fn insert(&mut self, state: PlayerState) -> Option<PlayerState> {
        self.players.insert(state.id.clone(), state)
    }

    /// Remove a player and forget it from everyone's visibility set
    pub fn remove(&mut self, id: &str) -> Option<PlayerState> {
        let removed = self.players.remove(id)?;
        for other in self.players.values_mut() {
            other.visible_targets.remove(id);
        }
        Some(removed)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.players.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerState> {
        self.players.values()
    }

    pub fn ids(&self) -> Vec<String> {
        self.players.keys().cloned().collect()
    }

    /// Chat colours currently assigned
    pub fn used_colors(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.players.values().map(|p| p.chat_color)
    }
}
