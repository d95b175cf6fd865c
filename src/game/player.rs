//! Live per-player state

use std::collections::HashSet;

use crate::catalog::{CannonSpec, JetMechanics};
use crate::ws::protocol::{CannonStatus, CannonView, PlayerView, PosReport, RadarContact, Vec2};

use super::physics::clamp_coord;

/// Cannon bookkeeping. Times are Unix milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct CannonState {
    pub ammo: u32,
    /// Shots per second
    pub rate: f64,
    pub cooldown_ms: f64,
    pub burst_ms: f64,
    pub last_fire: Option<u64>,
    /// Sustained fire accumulated since the last reset (ms)
    pub burst_used: f64,
    pub cooldown_until: Option<u64>,
    /// Accepted shots not yet matched by a damage report
    pub pending_shots: u32,
}

impl CannonState {
    pub fn new(spec: &CannonSpec) -> Self {
        Self {
            ammo: spec.ammo,
            rate: spec.rate,
            cooldown_ms: spec.cooldown_ms.max(0.0),
            burst_ms: spec.burst_ms.max(0.0),
            last_fire: None,
            burst_used: 0.0,
            cooldown_until: None,
            pending_shots: 0,
        }
    }

    pub fn cooldown_remaining(&self, now: u64) -> u64 {
        self.cooldown_until
            .map(|until| until.saturating_sub(now))
            .unwrap_or(0)
    }

    pub fn status(&self, now: u64) -> CannonStatus {
        CannonStatus {
            ammo: self.ammo,
            cooldown_remaining: self.cooldown_remaining(now),
        }
    }
}

/// Authoritative server-side state of a connected player
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub id: String,
    pub name: String,
    pub jet_id: String,

    // Last report
    pub pos: Vec2,
    pub heading: f64,
    pub speed: f64,

    // Resources
    pub health: f64,
    pub max_health: f64,
    pub fuel: f64,
    pub max_fuel: f64,
    pub fuel_rate_ms: f64,
    pub max_speed: f64,
    pub last_fuel_tick: u64,

    // Sensors
    pub radar_distance: f64,
    pub rwr_distance: f64,
    pub next_radar_push: u64,
    pub last_radar_contacts: Vec<RadarContact>,
    pub visible_targets: HashSet<String>,

    pub cannon: CannonState,
    pub chat_color: &'static str,
}

impl PlayerState {
    pub fn new(
        id: String,
        name: String,
        jet_id: String,
        mechanics: &JetMechanics,
        chat_color: &'static str,
        now: u64,
    ) -> Self {
        Self {
            id,
            name,
            jet_id,
            pos: Vec2::ZERO,
            heading: 0.0,
            speed: 0.0,
            health: mechanics.max_health,
            max_health: mechanics.max_health,
            fuel: mechanics.max_fuel,
            max_fuel: mechanics.max_fuel,
            fuel_rate_ms: mechanics.fuel_rate_ms,
            max_speed: mechanics.max_speed,
            last_fuel_tick: now,
            radar_distance: mechanics.radar_distance,
            rwr_distance: mechanics.rwr_distance,
            next_radar_push: now,
            last_radar_contacts: Vec::new(),
            visible_targets: HashSet::new(),
            cannon: CannonState::new(&mechanics.cannon),
            chat_color,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Store a flight sample. Returns the speed to burn fuel against.
    pub fn apply_report(
        &mut self,
        pos: Option<PosReport>,
        heading: Option<f64>,
        speed: Option<f64>,
    ) -> f64 {
        if let Some(pos) = pos {
            if let Some(x) = pos.x {
                self.pos.x = clamp_coord(x);
            }
            if let Some(y) = pos.y {
                self.pos.y = clamp_coord(y);
            }
        }
        if let Some(heading) = heading.filter(|h| h.is_finite()) {
            self.heading = heading;
        }
        self.speed = speed.filter(|s| s.is_finite()).unwrap_or(0.0).max(0.0);
        self.speed
    }

    /// Display name for system notices
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "Player"
        } else {
            &self.name
        }
    }

    /// Own state as sent in `session:init`
    pub fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id.clone(),
            name: self.name.clone(),
            jet_id: self.jet_id.clone(),
            pos: self.pos,
            heading: self.heading,
            health: self.health,
            max_health: self.max_health,
            fuel: self.fuel,
            max_fuel: self.max_fuel,
            radar: self.last_radar_contacts.clone(),
            cannon: CannonView {
                ammo: self.cannon.ammo,
                rate: self.cannon.rate,
                cooldown_ms: self.cannon.cooldown_ms,
                burst_ms: self.cannon.burst_ms,
            },
        }
    }

    /// This player as seen on someone else's radar
    pub fn as_contact(&self) -> RadarContact {
        RadarContact {
            id: self.id.clone(),
            name: self.name.clone(),
            pos: self.pos,
            heading: self.heading,
            health: self.health,
            max_health: self.max_health,
        }
    }
}
