//! Chat relay - bounded history, colour assignment and system notices

use std::collections::{HashSet, VecDeque};

use crate::ws::protocol::{ChatEntry, ChatSender};

use super::{PlayerState, CHAT_HISTORY_LIMIT, CHAT_MAX_LENGTH};

/// Palette handed out to players round-robin
pub const CHAT_COLORS: [&str; 11] = [
    "#7DF5C3", "#69B7DD", "#B0A7FF", "#F2A77E", "#F0E989", "#FFB7D5", "#9BCF53", "#E26D5A",
    "#A2F2B4", "#C5A3FF", "#FFDE85",
];

pub const SERVER_SENDER_ID: &str = "server";
pub const SERVER_SENDER_NAME: &str = "Server";
pub const SERVER_COLOR: &str = "#9FE3FF";

/// Ring of the most recent chat and system messages
#[derive(Debug)]
pub struct ChatHistory {
    entries: VecDeque<ChatEntry>,
    capacity: usize,
}

impl ChatHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append, evicting the oldest entry beyond capacity
    pub fn push(&mut self, entry: ChatEntry) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Retained entries, oldest first
    pub fn snapshot(&self) -> Vec<ChatEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self::new(CHAT_HISTORY_LIMIT)
    }
}

/// Trim and cap a chat line. Empty lines are dropped.
pub fn sanitize_text(raw: &str) -> Option<String> {
    let text: String = raw.trim().chars().take(CHAT_MAX_LENGTH).collect();
    (!text.is_empty()).then_some(text)
}

/// First palette colour nobody holds, else a stable fallback by player count
pub fn pick_chat_color<'a>(
    used: impl IntoIterator<Item = &'a str>,
    player_count: usize,
) -> &'static str {
    let used: HashSet<&str> = used.into_iter().collect();
    CHAT_COLORS
        .iter()
        .copied()
        .find(|color| !used.contains(color))
        .unwrap_or(CHAT_COLORS[player_count % CHAT_COLORS.len()])
}

/// Entry authored by a player
pub fn player_entry(state: &PlayerState, text: String, at: u64) -> ChatEntry {
    ChatEntry {
        from: ChatSender {
            id: state.id.clone(),
            name: state.name.clone(),
            jet_id: Some(state.jet_id.clone()),
            color: state.chat_color,
        },
        text,
        at,
    }
}

/// Entry authored by the server
pub fn system_entry(text: String, at: u64) -> ChatEntry {
    ChatEntry {
        from: ChatSender {
            id: SERVER_SENDER_ID.to_string(),
            name: SERVER_SENDER_NAME.to_string(),
            jet_id: None,
            color: SERVER_COLOR,
        },
        text,
        at,
    }
}
