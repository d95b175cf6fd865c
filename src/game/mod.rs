//! Arena simulation modules
//!
//! The server does not integrate physics. It stores what clients report,
//! clamps it, and layers fuel, sensor and weapon bookkeeping on top.

pub mod arena;
pub mod chat;
pub mod combat;
pub mod fuel;
pub mod outbound;
pub mod physics;
pub mod player;
pub mod radar;
pub mod registry;

pub use arena::{Arena, ArenaCommand, ArenaHandle, LeaveReason};
pub use outbound::{Outbound, OutboundRx, OutboundTx};
pub use player::{CannonState, PlayerState};
pub use registry::PlayerRegistry;

/// Symmetric bound applied to every reported coordinate
pub const COORD_LIMIT: f64 = 1e6;

/// Ceiling on a single self-reported hit
pub const MAX_DAMAGE_PER_HIT: f64 = 250.0;

/// Cannon round speed relative to the shooter (world units per second)
pub const CANNON_MUZZLE_SPEED: f64 = 600.0;

/// Cannon round lifetime
pub const CANNON_PROJECTILE_TTL_MS: u64 = 2500;

/// Chat ring capacity
pub const CHAT_HISTORY_LIMIT: usize = 50;

/// Longest chat line kept, in characters
pub const CHAT_MAX_LENGTH: usize = 280;

/// Player id derived from the session identity
pub fn player_id(name: &str, jet_id: &str) -> String {
    let name = if name.is_empty() { "anon" } else { name };
    format!("{}:{}", name, jet_id)
}
