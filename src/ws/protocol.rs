//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 2D world position or velocity
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared distance, avoids the square root for range checks
    pub fn distance_sq(self, other: Vec2) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }
}

/// Partial position report; either axis may be omitted
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct PosReport {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMsg {
    /// Periodic flight sample from the client's local simulation
    #[serde(rename = "state:update")]
    StateUpdate {
        #[serde(default)]
        pos: Option<PosReport>,
        #[serde(default)]
        heading: Option<f64>,
        #[serde(default)]
        speed: Option<f64>,
    },

    /// Trigger pull
    #[serde(rename = "combat:fire")]
    Fire { weapon: String },

    /// Client-side hit report
    #[serde(rename = "combat:damage", rename_all = "camelCase")]
    Damage {
        target_id: String,
        amount: f64,
        #[serde(default)]
        weapon: Option<String>,
        #[serde(default)]
        pos: Option<PosReport>,
    },

    /// Chat line
    #[serde(rename = "chat:send")]
    ChatSend { text: String },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerMsg {
    /// Sent once after admission
    #[serde(rename = "session:init", rename_all = "camelCase")]
    SessionInit {
        player: PlayerView,
        chat_color: &'static str,
        jet: Value,
    },

    /// Retained chat, sent once after admission when non-empty
    #[serde(rename = "chat:history")]
    ChatHistory { messages: Vec<ChatEntry> },

    /// Fuel, health and sensor picture for the receiving player
    #[serde(rename = "state:sync")]
    StateSync {
        fuel: f64,
        health: f64,
        radar: Vec<RadarContact>,
        rwr: RwrStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        cannon: Option<CannonStatus>,
    },

    /// Answer to every `combat:fire`
    #[serde(rename = "combat:fire:ack")]
    FireAck(FireAck),

    /// Authorized projectile, broadcast to everyone but the shooter
    #[serde(rename = "combat:projectile")]
    Projectile(ProjectileEvent),

    #[serde(rename = "combat:damage")]
    Damage(DamageEvent),

    #[serde(rename = "combat:death")]
    Death(DeathEvent),

    #[serde(rename = "chat:message")]
    ChatMessage(ChatEntry),
}

/// Sanitized own state sent in `session:init`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: String,
    pub name: String,
    pub jet_id: String,
    pub pos: Vec2,
    pub heading: f64,
    pub health: f64,
    pub max_health: f64,
    pub fuel: f64,
    pub max_fuel: f64,
    pub radar: Vec<RadarContact>,
    pub cannon: CannonView,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CannonView {
    pub ammo: u32,
    pub rate: f64,
    pub cooldown_ms: f64,
    pub burst_ms: f64,
}

/// Another player as seen on radar. Fuel and weapon state are never exposed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarContact {
    pub id: String,
    pub name: String,
    pub pos: Vec2,
    pub heading: f64,
    pub health: f64,
    pub max_health: f64,
}

/// Who currently has this player on radar
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RwrStatus {
    pub detected: bool,
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CannonStatus {
    pub ammo: u32,
    pub cooldown_remaining: u64,
}

/// Why a fire request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DenyReason {
    Cooldown,
    Ammo,
    Rate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FireAck {
    pub weapon: &'static str,
    pub allowed: bool,
    pub ammo: u32,
    pub cooldown_remaining: u64,
    /// Remaining burst budget in ms; `null` on denial
    pub burst_remaining: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenyReason>,
    /// Time until the fire rate allows another shot, on `rate` denials
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileEvent {
    pub weapon: &'static str,
    pub shooter_id: String,
    pub pos: Vec2,
    pub vel: Vec2,
    pub ttl_ms: u64,
    pub at: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageEvent {
    pub attacker_id: String,
    pub target_id: String,
    pub amount: f64,
    pub remaining_health: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weapon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<Vec2>,
    pub at: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeathEvent {
    pub attacker_id: String,
    pub target_id: String,
    pub pos: Vec2,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weapon: Option<String>,
    pub at: u64,
}

/// Sender block of a chat entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSender {
    pub id: String,
    pub name: String,
    pub jet_id: Option<String>,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatEntry {
    pub from: ChatSender,
    pub text: String,
    pub at: u64,
}
