//! WebSocket transport: upgrade, admission and message framing

pub mod handler;
pub mod protocol;
