//! Dogfight Server - live session server for the jet combat arena
//!
//! Pilots connect over WebSocket with a signed session credential. One arena
//! task owns every player's state, relays positions as radar contacts, gates
//! cannon fire, settles client-reported hits and carries the shared chat.

pub mod app;
pub mod catalog;
pub mod config;
pub mod game;
pub mod http;
pub mod util;
pub mod ws;
