//! Combat system - cannon fire control and damage resolution

use crate::ws::protocol::{
    DamageEvent, DeathEvent, DenyReason, FireAck, PosReport, ProjectileEvent,
};

use super::physics::{muzzle_velocity, report_pos};
use super::{
    PlayerRegistry, PlayerState, CANNON_MUZZLE_SPEED, CANNON_PROJECTILE_TTL_MS,
    MAX_DAMAGE_PER_HIT,
};

/// Weapon name on the wire
pub const CANNON: &str = "cannon";

/// Result of a trigger pull
#[derive(Debug, Clone, PartialEq)]
pub struct CannonFire {
    pub ack: FireAck,
    /// Present only when the shot was granted
    pub projectile: Option<ProjectileEvent>,
}

impl CannonFire {
    fn denied(state: &PlayerState, reason: DenyReason, now: u64, wait_ms: Option<u64>) -> Self {
        Self {
            ack: FireAck {
                weapon: CANNON,
                allowed: false,
                ammo: state.cannon.ammo,
                cooldown_remaining: state.cannon.cooldown_remaining(now),
                burst_remaining: None,
                reason: Some(reason),
                wait_ms,
            },
            projectile: None,
        }
    }

    pub fn allowed(&self) -> bool {
        self.ack.allowed
    }
}

/// Run the cannon state machine for one fire request.
///
/// Ready -> Firing -> (burst exhausted) -> Cooldown -> Ready. Requests that
/// arrive faster than the fire rate are refused, never queued. The shot that
/// exhausts the burst is still granted; the cooldown starts once that shot's
/// own interval has passed.
pub fn fire_cannon(state: &mut PlayerState, now: u64) -> CannonFire {
    let cannon = &mut state.cannon;

    // Cooldown elapsed: back to Ready
    if let Some(until) = cannon.cooldown_until {
        if now >= until {
            cannon.cooldown_until = None;
            cannon.burst_used = 0.0;
        }
    }
    let interval_ms = if cannon.rate > 0.0 { 1000.0 / cannon.rate } else { 0.0 };

    // Trigger released for longer than a shot interval plus a cooldown also
    // restores the burst. Fire at the rated interval never counts as released.
    if let Some(last) = cannon.last_fire {
        if now.saturating_sub(last) as f64 > interval_ms + cannon.cooldown_ms {
            cannon.burst_used = 0.0;
        }
    }

    if cannon.cooldown_until.is_some_and(|until| now < until) {
        return CannonFire::denied(state, DenyReason::Cooldown, now, None);
    }
    if cannon.ammo == 0 {
        return CannonFire::denied(state, DenyReason::Ammo, now, None);
    }
    if !(cannon.rate > 0.0) {
        return CannonFire::denied(state, DenyReason::Rate, now, None);
    }

    if let Some(last) = cannon.last_fire {
        let since = now.saturating_sub(last) as f64;
        if since < interval_ms {
            let wait = (interval_ms - since).ceil() as u64;
            return CannonFire::denied(state, DenyReason::Rate, now, Some(wait));
        }
    }

    cannon.ammo -= 1;
    cannon.last_fire = Some(now);
    cannon.burst_used += interval_ms;
    cannon.pending_shots += 1;

    if cannon.burst_ms > 0.0 && cannon.burst_used >= cannon.burst_ms {
        if cannon.cooldown_ms > 0.0 {
            let pause_ms = (interval_ms + cannon.cooldown_ms).ceil() as u64;
            cannon.cooldown_until = Some(now.saturating_add(pause_ms));
        }
        cannon.burst_used = 0.0;
    }

    let burst_remaining = (cannon.burst_ms - cannon.burst_used).max(0.0);
    let ack = FireAck {
        weapon: CANNON,
        allowed: true,
        ammo: cannon.ammo,
        cooldown_remaining: cannon.cooldown_remaining(now),
        burst_remaining: Some(burst_remaining),
        reason: None,
        wait_ms: None,
    };
    let projectile = ProjectileEvent {
        weapon: CANNON,
        shooter_id: state.id.clone(),
        pos: state.pos,
        vel: muzzle_velocity(state.heading, CANNON_MUZZLE_SPEED, state.speed),
        ttl_ms: CANNON_PROJECTILE_TTL_MS,
        at: now,
    };

    CannonFire {
        ack,
        projectile: Some(projectile),
    }
}

/// Optional context attached to a hit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HitMeta {
    pub weapon: Option<String>,
    pub pos: Option<PosReport>,
}

/// Events produced by an applied hit
#[derive(Debug, Clone, PartialEq)]
pub struct DamageOutcome {
    pub damage: DamageEvent,
    /// Emitted only on the transition from alive to dead
    pub death: Option<DeathEvent>,
}

/// Apply a reported hit to `target`.
///
/// Refuses non-finite or non-positive amounts and targets that are already
/// dead. The amount is capped at [`MAX_DAMAGE_PER_HIT`].
pub fn apply_damage(
    target: &mut PlayerState,
    attacker_id: &str,
    amount: f64,
    meta: HitMeta,
    now: u64,
) -> Option<DamageOutcome> {
    if !amount.is_finite() || amount <= 0.0 {
        return None;
    }
    if !target.is_alive() {
        return None;
    }

    let applied = amount.min(MAX_DAMAGE_PER_HIT);
    let previous = target.health;
    target.health = (target.health - applied).clamp(0.0, target.max_health);

    let damage = DamageEvent {
        attacker_id: attacker_id.to_string(),
        target_id: target.id.clone(),
        amount: applied,
        remaining_health: target.health,
        weapon: meta.weapon.clone(),
        pos: report_pos(meta.pos),
        at: now,
    };

    let death = (previous > 0.0 && target.health <= 0.0).then(|| DeathEvent {
        attacker_id: attacker_id.to_string(),
        target_id: target.id.clone(),
        pos: target.pos,
        weapon: meta.weapon,
        at: now,
    });

    Some(DamageOutcome { damage, death })
}

/// Validate a client hit report and apply it.
///
/// Cannon hits must be backed by a granted shot: a valid report consumes one
/// pending shot from the attacker and is dropped when none remain. Other
/// weapons are trusted for timing; only the amount is bounded.
pub fn resolve_damage_report(
    registry: &mut PlayerRegistry,
    attacker_id: &str,
    target_id: &str,
    amount: f64,
    meta: HitMeta,
    now: u64,
) -> Option<DamageOutcome> {
    if target_id == attacker_id || !amount.is_finite() || amount <= 0.0 {
        return None;
    }
    if !registry.get(target_id)?.is_alive() {
        return None;
    }

    if meta.weapon.as_deref() == Some(CANNON) {
        let attacker = registry.get_mut(attacker_id)?;
        if attacker.cannon.pending_shots == 0 {
            return None;
        }
        attacker.cannon.pending_shots -= 1;
    }

    let target = registry.get_mut(target_id)?;
    apply_damage(target, attacker_id, amount, meta, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::player::tests::player;
    use crate::ws::protocol::Vec2;

    fn cannon_meta() -> HitMeta {
        HitMeta {
            weapon: Some(CANNON.to_string()),
            pos: None,
        }
    }

    #[test]
    fn burst_cooldown_sequence() {
        // rate 2/s, burst 1000ms, cooldown 500ms, ammo 3
        let mut state = player("a", 0.0, 0.0);

        let shot1 = fire_cannon(&mut state, 0);
        assert!(shot1.allowed());
        assert_eq!(shot1.ack.ammo, 2);
        assert_eq!(shot1.ack.burst_remaining, Some(500.0));

        let shot2 = fire_cannon(&mut state, 500);
        assert!(shot2.allowed());
        assert_eq!(shot2.ack.ammo, 1);
        assert_eq!(state.cannon.cooldown_until, Some(1500));
        assert_eq!(shot2.ack.cooldown_remaining, 1000);

        let shot3 = fire_cannon(&mut state, 1000);
        assert!(!shot3.allowed());
        assert_eq!(shot3.ack.reason, Some(DenyReason::Cooldown));
        assert_eq!(shot3.ack.cooldown_remaining, 500);
        assert_eq!(shot3.ack.ammo, 1);
        assert!(shot3.projectile.is_none());

        let shot4 = fire_cannon(&mut state, 1500);
        assert!(shot4.allowed());
        assert_eq!(shot4.ack.ammo, 0);

        let shot5 = fire_cannon(&mut state, 5000);
        assert_eq!(shot5.ack.reason, Some(DenyReason::Ammo));
    }

    #[test]
    fn rate_gate_rejects_without_queueing() {
        let mut state = player("a", 0.0, 0.0);
        assert!(fire_cannon(&mut state, 100).allowed());

        let early = fire_cannon(&mut state, 300);
        assert!(!early.allowed());
        assert_eq!(early.ack.reason, Some(DenyReason::Rate));
        assert_eq!(early.ack.wait_ms, Some(300));
        assert_eq!(early.ack.burst_remaining, None);
        assert_eq!(state.cannon.ammo, 2);
        assert_eq!(state.cannon.pending_shots, 1);

        // The denial did not reset the clock
        assert!(fire_cannon(&mut state, 600).allowed());
    }

    #[test]
    fn non_positive_rate_is_refused() {
        let mut state = player("a", 0.0, 0.0);
        state.cannon.rate = 0.0;
        let fire = fire_cannon(&mut state, 0);
        assert_eq!(fire.ack.reason, Some(DenyReason::Rate));
        assert_eq!(state.cannon.ammo, 3);
    }

    #[test]
    fn idle_trigger_restores_burst_budget() {
        let mut state = player("a", 0.0, 0.0);
        state.cannon.burst_ms = 2000.0;
        state.cannon.ammo = 10;

        assert!(fire_cannon(&mut state, 0).allowed());
        assert_eq!(state.cannon.burst_used, 500.0);

        // Idle for longer than one interval plus the cooldown
        let later = fire_cannon(&mut state, 2000);
        assert!(later.allowed());
        assert_eq!(state.cannon.burst_used, 500.0);
    }

    #[test]
    fn sustained_fire_at_rated_interval_exhausts_burst() {
        // Cooldown shorter than the shot interval
        let mut state = player("a", 0.0, 0.0);
        state.cannon.rate = 1.0;
        state.cannon.burst_ms = 2000.0;
        state.cannon.cooldown_ms = 500.0;
        state.cannon.ammo = 100;

        let results: Vec<_> = (0..10u64)
            .map(|i| {
                let fire = fire_cannon(&mut state, i * 1000);
                (i * 1000, fire.allowed(), fire.ack.reason)
            })
            .collect();

        assert!(results[0].1 && results[1].1);
        assert_eq!(state.cannon.ammo, 100 - results.iter().filter(|r| r.1).count() as u32);
        assert_eq!(results[2], (2000, false, Some(DenyReason::Cooldown)));
        assert!(results[3].1);
        assert!(results.iter().filter(|r| !r.1).count() >= 3);
    }

    #[test]
    fn huge_cooldown_saturates_instead_of_overflowing() {
        let mut state = player("a", 0.0, 0.0);
        state.cannon.burst_ms = 500.0;
        state.cannon.cooldown_ms = 1e30;

        assert!(fire_cannon(&mut state, 1000).allowed());
        assert_eq!(state.cannon.cooldown_until, Some(u64::MAX));

        let denied = fire_cannon(&mut state, 10_000);
        assert_eq!(denied.ack.reason, Some(DenyReason::Cooldown));
    }

    #[test]
    fn zero_burst_limit_never_forces_cooldown() {
        let mut state = player("a", 0.0, 0.0);
        state.cannon.burst_ms = 0.0;
        state.cannon.ammo = 20;
        for i in 0..20u64 {
            assert!(fire_cannon(&mut state, i * 500).allowed());
        }
        assert_eq!(state.cannon.cooldown_until, None);
    }

    #[test]
    fn projectile_leaves_along_heading() {
        let mut state = player("a", 10.0, 20.0);
        state.heading = std::f64::consts::FRAC_PI_2;
        state.speed = 100.0;

        let fire = fire_cannon(&mut state, 42);
        let projectile = fire.projectile.unwrap();
        assert_eq!(projectile.shooter_id, "a");
        assert_eq!(projectile.pos, Vec2::new(10.0, 20.0));
        assert!((projectile.vel.x - 700.0).abs() < 1e-9);
        assert!(projectile.vel.y.abs() < 1e-9);
        assert_eq!(projectile.ttl_ms, CANNON_PROJECTILE_TTL_MS);
        assert_eq!(projectile.at, 42);
    }

    #[test]
    fn damage_is_capped_and_floored() {
        let mut target = player("b", 0.0, 0.0);
        target.max_health = 1000.0;
        target.health = 1000.0;

        let outcome = apply_damage(&mut target, "a", 1e12, HitMeta::default(), 0).unwrap();
        assert_eq!(outcome.damage.amount, MAX_DAMAGE_PER_HIT);
        assert_eq!(target.health, 750.0);
        assert!(outcome.death.is_none());
    }

    #[test]
    fn death_fires_once_and_dead_targets_are_immune() {
        let mut target = player("b", 3.0, 4.0);

        let first = apply_damage(&mut target, "a", 60.0, HitMeta::default(), 1).unwrap();
        assert!(first.death.is_none());

        let killing = apply_damage(&mut target, "a", 60.0, HitMeta::default(), 2).unwrap();
        assert_eq!(killing.damage.remaining_health, 0.0);
        let death = killing.death.unwrap();
        assert_eq!(death.target_id, "b");
        assert_eq!(death.pos, Vec2::new(3.0, 4.0));

        assert!(apply_damage(&mut target, "a", 10.0, HitMeta::default(), 3).is_none());
        assert_eq!(target.health, 0.0);
    }

    #[test]
    fn invalid_amounts_are_rejected() {
        let mut target = player("b", 0.0, 0.0);
        for amount in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            assert!(apply_damage(&mut target, "a", amount, HitMeta::default(), 0).is_none());
        }
        assert_eq!(target.health, 100.0);
    }

    #[test]
    fn hit_position_is_clamped() {
        let mut target = player("b", 0.0, 0.0);
        let meta = HitMeta {
            weapon: Some("missile".into()),
            pos: Some(PosReport { x: Some(5e9), y: Some(1.0) }),
        };
        let outcome = apply_damage(&mut target, "a", 1.0, meta, 0).unwrap();
        assert_eq!(outcome.damage.pos, Some(Vec2::new(crate::game::COORD_LIMIT, 1.0)));
        assert_eq!(outcome.damage.weapon.as_deref(), Some("missile"));
    }

    #[test]
    fn cannon_hits_need_pending_shots() {
        let mut registry = PlayerRegistry::new();
        registry.insert(player("a", 0.0, 0.0));
        registry.insert(player("b", 50.0, 0.0));

        // No shot fired yet
        assert!(resolve_damage_report(&mut registry, "a", "b", 10.0, cannon_meta(), 0).is_none());

        let fired = fire_cannon(registry.get_mut("a").unwrap(), 0);
        assert!(fired.allowed());

        let hit = resolve_damage_report(&mut registry, "a", "b", 10.0, cannon_meta(), 10);
        assert!(hit.is_some());
        assert_eq!(registry.get("a").unwrap().cannon.pending_shots, 0);
        assert_eq!(registry.get("b").unwrap().health, 90.0);

        // The single shot was already spent
        assert!(resolve_damage_report(&mut registry, "a", "b", 10.0, cannon_meta(), 20).is_none());
    }

    #[test]
    fn invalid_reports_do_not_spend_pending_shots() {
        let mut registry = PlayerRegistry::new();
        registry.insert(player("a", 0.0, 0.0));
        registry.insert(player("b", 50.0, 0.0));
        fire_cannon(registry.get_mut("a").unwrap(), 0);

        assert!(resolve_damage_report(&mut registry, "a", "a", 10.0, cannon_meta(), 1).is_none());
        assert!(resolve_damage_report(&mut registry, "a", "ghost", 10.0, cannon_meta(), 1).is_none());
        assert!(resolve_damage_report(&mut registry, "a", "b", -1.0, cannon_meta(), 1).is_none());
        assert_eq!(registry.get("a").unwrap().cannon.pending_shots, 1);
    }

    #[test]
    fn non_cannon_hits_are_trusted_for_timing() {
        let mut registry = PlayerRegistry::new();
        registry.insert(player("a", 0.0, 0.0));
        registry.insert(player("b", 50.0, 0.0));

        let outcome =
            resolve_damage_report(&mut registry, "a", "b", 30.0, HitMeta::default(), 0).unwrap();
        assert_eq!(outcome.damage.remaining_health, 70.0);
        assert!(outcome.damage.weapon.is_none());
    }
}
