//! Arena task - single owner of the player registry and chat history
//!
//! Connections never touch shared state directly. They send commands to the
//! arena task, which handles each one to completion before the next and also
//! runs the periodic `state:sync` ticker. Outbound traffic goes back through
//! one bounded queue per connection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::http::auth::Identity;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, PosReport, ServerMsg};

use super::chat::{self, ChatHistory};
use super::combat::{fire_cannon, resolve_damage_report, HitMeta, CANNON};
use super::fuel::apply_fuel_burn;
use super::outbound::OutboundTx;
use super::radar::{collect_radar_contacts, threat_status};
use super::{PlayerRegistry, PlayerState};

/// Queue depth from connections into the arena
pub const COMMAND_CHANNEL_CAPACITY: usize = 1024;

/// Close code for a connection replaced by a newer one with the same identity
pub const CLOSE_SUPERSEDED: u16 = 4001;
/// Close code for a connection evicted for silence
pub const CLOSE_IDLE: u16 = 4408;

/// Why a connection is leaving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveReason {
    /// Socket closed or errored
    Closed,
    /// No inbound traffic within the idle timeout
    Idle,
}

/// Commands handled by the arena task
#[derive(Debug)]
pub enum ArenaCommand {
    Join {
        identity: Identity,
        conn_id: Uuid,
        outbound: OutboundTx,
    },
    Inbound {
        player_id: String,
        conn_id: Uuid,
        msg: ClientMsg,
    },
    Leave {
        player_id: String,
        conn_id: Uuid,
        reason: LeaveReason,
    },
}

/// The arena task has stopped
#[derive(Debug, thiserror::Error)]
#[error("Arena task is not running")]
pub struct ArenaClosed;

/// Handle to the running arena
#[derive(Clone)]
pub struct ArenaHandle {
    tx: mpsc::Sender<ArenaCommand>,
    player_count: Arc<AtomicUsize>,
}

impl ArenaHandle {
    pub async fn join(
        &self,
        identity: Identity,
        conn_id: Uuid,
        outbound: OutboundTx,
    ) -> Result<(), ArenaClosed> {
        self.send(ArenaCommand::Join {
            identity,
            conn_id,
            outbound,
        })
        .await
    }

    pub async fn inbound(&self, player_id: &str, conn_id: Uuid, msg: ClientMsg) -> Result<(), ArenaClosed> {
        self.send(ArenaCommand::Inbound {
            player_id: player_id.to_string(),
            conn_id,
            msg,
        })
        .await
    }

    pub async fn leave(&self, player_id: &str, conn_id: Uuid, reason: LeaveReason) -> Result<(), ArenaClosed> {
        self.send(ArenaCommand::Leave {
            player_id: player_id.to_string(),
            conn_id,
            reason,
        })
        .await
    }

    async fn send(&self, command: ArenaCommand) -> Result<(), ArenaClosed> {
        self.tx.send(command).await.map_err(|_| ArenaClosed)
    }

    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }
}

/// Writer side of a live connection
struct Connection {
    id: Uuid,
    outbound: OutboundTx,
}

/// Registry, chat history and live connections
pub struct Arena {
    registry: PlayerRegistry,
    connections: HashMap<String, Connection>,
    chat: ChatHistory,
    command_rx: mpsc::Receiver<ArenaCommand>,
    sync_interval: Duration,
    player_count: Arc<AtomicUsize>,
}

impl Arena {
    /// Create an arena and the handle connections use to reach it
    pub fn new(sync_interval: Duration) -> (Self, ArenaHandle) {
        let (tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let player_count = Arc::new(AtomicUsize::new(0));

        let handle = ArenaHandle {
            tx,
            player_count: player_count.clone(),
        };
        let arena = Self {
            registry: PlayerRegistry::new(),
            connections: HashMap::new(),
            chat: ChatHistory::default(),
            command_rx,
            sync_interval,
            player_count,
        };

        (arena, handle)
    }

    /// Process commands and sync ticks until every handle is dropped
    pub async fn run(mut self) {
        info!(sync_interval_ms = self.sync_interval.as_millis() as u64, "Arena started");

        let mut sync_tick = interval(self.sync_interval);
        sync_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command, unix_millis()),
                    None => break,
                },
                _ = sync_tick.tick() => self.sync_all(unix_millis()),
            }
        }

        info!("Arena stopped");
    }

    pub fn handle_command(&mut self, command: ArenaCommand, now: u64) {
        match command {
            ArenaCommand::Join {
                identity,
                conn_id,
                outbound,
            } => self.join(identity, conn_id, outbound, now),
            ArenaCommand::Inbound {
                player_id,
                conn_id,
                msg,
            } => self.handle_message(&player_id, conn_id, msg, now),
            ArenaCommand::Leave {
                player_id,
                conn_id,
                reason,
            } => self.leave(&player_id, conn_id, reason, now),
        }
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn chat(&self) -> &ChatHistory {
        &self.chat
    }

    fn join(&mut self, identity: Identity, conn_id: Uuid, outbound: OutboundTx, now: u64) {
        let Identity {
            player_id,
            name,
            jet,
        } = identity;

        if let Some(previous) = self.connections.remove(&player_id) {
            info!(player_id = %player_id, "Session superseded by a new connection");
            previous.outbound.close(CLOSE_SUPERSEDED, "Session superseded");
            self.registry.remove(&player_id);
        }

        let chat_color = chat::pick_chat_color(self.registry.used_colors(), self.registry.len());
        let state = PlayerState::new(
            player_id.clone(),
            name,
            jet.id.clone(),
            &jet.mechanics,
            chat_color,
            now,
        );
        let init = ServerMsg::SessionInit {
            player: state.view(),
            chat_color,
            jet: jet.detail.clone(),
        };
        let notice = format!("{} joined the fight", state.display_name());

        self.registry.insert(state);
        self.connections.insert(
            player_id.clone(),
            Connection {
                id: conn_id,
                outbound,
            },
        );
        self.update_player_count();

        self.send_to(&player_id, init);
        if !self.chat.is_empty() {
            self.send_to(
                &player_id,
                ServerMsg::ChatHistory {
                    messages: self.chat.snapshot(),
                },
            );
        }
        self.announce(notice, now);

        info!(
            player_id = %player_id,
            jet = %jet.id,
            player_count = self.registry.len(),
            "Player joined"
        );
    }

    fn leave(&mut self, player_id: &str, conn_id: Uuid, reason: LeaveReason, now: u64) {
        if !self.is_current(player_id, conn_id) {
            debug!(player_id = %player_id, conn_id = %conn_id, "Close from superseded connection ignored");
            return;
        }

        if let Some(conn) = self.connections.remove(player_id) {
            if reason == LeaveReason::Idle {
                conn.outbound.close(CLOSE_IDLE, "Idle timeout");
            }
        }

        if let Some(state) = self.registry.remove(player_id) {
            self.update_player_count();
            self.announce(format!("{} left the fight", state.display_name()), now);
            info!(
                player_id = %player_id,
                reason = ?reason,
                player_count = self.registry.len(),
                "Player left"
            );
        }
    }

    fn handle_message(&mut self, player_id: &str, conn_id: Uuid, msg: ClientMsg, now: u64) {
        if !self.is_current(player_id, conn_id) {
            return;
        }

        match msg {
            ClientMsg::StateUpdate {
                pos,
                heading,
                speed,
            } => self.on_state_update(player_id, pos, heading, speed, now),
            ClientMsg::Fire { weapon } => self.on_fire(player_id, &weapon, now),
            ClientMsg::Damage {
                target_id,
                amount,
                weapon,
                pos,
            } => self.on_damage(player_id, &target_id, amount, HitMeta { weapon, pos }, now),
            ClientMsg::ChatSend { text } => self.on_chat(player_id, &text, now),
        }
    }

    fn on_state_update(
        &mut self,
        player_id: &str,
        pos: Option<PosReport>,
        heading: Option<f64>,
        speed: Option<f64>,
        now: u64,
    ) {
        let Some(state) = self.registry.get_mut(player_id) else {
            return;
        };
        let speed = state.apply_report(pos, heading, speed);
        apply_fuel_burn(state, speed, now);

        if let Some(sync) = self.sync_payload(player_id, now, false) {
            self.send_to(player_id, sync);
        }
    }

    fn on_fire(&mut self, player_id: &str, weapon: &str, now: u64) {
        if weapon != CANNON {
            debug!(player_id = %player_id, weapon = %weapon, "Fire request for unsupported weapon");
            return;
        }
        let Some(state) = self.registry.get_mut(player_id) else {
            return;
        };

        let fire = fire_cannon(state, now);
        if !fire.allowed() {
            debug!(player_id = %player_id, reason = ?fire.ack.reason, "Cannon fire denied");
        }
        self.send_to(player_id, ServerMsg::FireAck(fire.ack));
        if let Some(projectile) = fire.projectile {
            self.broadcast(ServerMsg::Projectile(projectile), Some(player_id));
        }
    }

    fn on_damage(&mut self, player_id: &str, target_id: &str, amount: f64, meta: HitMeta, now: u64) {
        let Some(outcome) =
            resolve_damage_report(&mut self.registry, player_id, target_id, amount, meta, now)
        else {
            debug!(player_id = %player_id, target_id = %target_id, "Damage report dropped");
            return;
        };

        self.broadcast(ServerMsg::Damage(outcome.damage), None);
        if let Some(death) = outcome.death {
            info!(attacker_id = %death.attacker_id, target_id = %death.target_id, "Player destroyed");
            self.broadcast(ServerMsg::Death(death), None);
        }
    }

    fn on_chat(&mut self, player_id: &str, text: &str, now: u64) {
        let Some(text) = chat::sanitize_text(text) else {
            return;
        };
        let Some(state) = self.registry.get(player_id) else {
            return;
        };

        let entry = chat::player_entry(state, text, now);
        self.chat.push(entry.clone());
        self.broadcast(ServerMsg::ChatMessage(entry), None);
    }

    /// Push fuel, health, radar and RWR to every player
    pub fn sync_all(&mut self, now: u64) {
        for player_id in self.registry.ids() {
            if let Some(sync) = self.sync_payload(&player_id, now, true) {
                self.send_to(&player_id, sync);
            }
        }
    }

    fn sync_payload(&mut self, player_id: &str, now: u64, include_cannon: bool) -> Option<ServerMsg> {
        let radar = collect_radar_contacts(&mut self.registry, player_id, now);
        let rwr = threat_status(&self.registry, player_id);
        let state = self.registry.get(player_id)?;

        Some(ServerMsg::StateSync {
            fuel: state.fuel,
            health: state.health,
            radar,
            rwr,
            cannon: include_cannon.then(|| state.cannon.status(now)),
        })
    }

    /// Record a system notice and send it to everyone
    fn announce(&mut self, text: String, now: u64) {
        let entry = chat::system_entry(text, now);
        self.chat.push(entry.clone());
        self.broadcast(ServerMsg::ChatMessage(entry), None);
    }

    fn is_current(&self, player_id: &str, conn_id: Uuid) -> bool {
        self.connections
            .get(player_id)
            .is_some_and(|conn| conn.id == conn_id)
    }

    fn send_to(&self, player_id: &str, msg: ServerMsg) {
        if let Some(conn) = self.connections.get(player_id) {
            deliver(player_id, conn, msg);
        }
    }

    fn broadcast(&self, msg: ServerMsg, exclude: Option<&str>) {
        for (player_id, conn) in &self.connections {
            if exclude == Some(player_id.as_str()) {
                continue;
            }
            deliver(player_id, conn, msg.clone());
        }
    }

    fn update_player_count(&self) {
        self.player_count
            .store(self.registry.len(), Ordering::Relaxed);
    }
}

/// Queue a message for one connection. A full or closed queue only affects
/// that recipient.
fn deliver(player_id: &str, conn: &Connection, msg: ServerMsg) {
    match conn.outbound.try_send(msg) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            warn!(player_id = %player_id, "Outbound queue full, dropping message");
        }
        Err(TrySendError::Closed(_)) => {
            debug!(player_id = %player_id, "Outbound queue closed");
        }
    }
}
