//! Radar contacts and radar-warning (RWR) threat lists
//!
//! Radar is computed per observer at a fixed cadence; the ids it finds become
//! the observer's visibility set. The threat list of a target is derived from
//! the *other* players' visibility sets, so it trails radar by at most one
//! refresh interval.

use std::collections::HashSet;

use crate::util::time::RADAR_PUSH_INTERVAL_MS;
use crate::ws::protocol::{RadarContact, RwrStatus};

use super::PlayerRegistry;

/// Radar picture for `observer_id`.
///
/// Between refresh ticks the cached list is returned unchanged. On a refresh,
/// every other player within `radar_distance` becomes a contact and the
/// observer's visibility set is replaced by exactly those ids.
pub fn collect_radar_contacts(
    registry: &mut PlayerRegistry,
    observer_id: &str,
    now: u64,
) -> Vec<RadarContact> {
    let Some(observer) = registry.get(observer_id) else {
        return Vec::new();
    };
    if observer.next_radar_push > now {
        return observer.last_radar_contacts.clone();
    }

    let origin = observer.pos;
    let range = observer.radar_distance;

    let mut contacts = Vec::new();
    let mut visible = HashSet::new();
    if range > 0.0 {
        let range_sq = range * range;
        for target in registry.iter() {
            if target.id == observer_id {
                continue;
            }
            if origin.distance_sq(target.pos) <= range_sq {
                contacts.push(target.as_contact());
                visible.insert(target.id.clone());
            }
        }
    }

    let Some(observer) = registry.get_mut(observer_id) else {
        return Vec::new();
    };
    observer.next_radar_push = now + RADAR_PUSH_INTERVAL_MS;
    observer.last_radar_contacts = contacts.clone();
    observer.visible_targets = visible;
    contacts
}

/// Observers that currently track `target_id`.
///
/// An observer counts when its last visibility set contains the target and it
/// sits inside the target's own RWR range. An RWR range of zero disables the
/// range gate.
pub fn threat_status(registry: &PlayerRegistry, target_id: &str) -> RwrStatus {
    let Some(target) = registry.get(target_id) else {
        return RwrStatus::default();
    };
    let max_dist_sq = target.rwr_distance * target.rwr_distance;

    let mut targets: Vec<String> = registry
        .iter()
        .filter(|observer| observer.id != target_id)
        .filter(|observer| observer.visible_targets.contains(target_id))
        .filter(|observer| max_dist_sq <= 0.0 || observer.pos.distance_sq(target.pos) <= max_dist_sq)
        .map(|observer| observer.id.clone())
        .collect();
    targets.sort();

    RwrStatus {
        detected: !targets.is_empty(),
        targets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::player::tests::player;

    fn registry_with(players: Vec<crate::game::PlayerState>) -> PlayerRegistry {
        let mut registry = PlayerRegistry::new();
        for p in players {
            registry.insert(p);
        }
        registry
    }

    fn contact_ids(contacts: &[RadarContact]) -> Vec<String> {
        let mut ids: Vec<String> = contacts.iter().map(|c| c.id.clone()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn contacts_exclude_self_and_respect_range_boundary() {
        // radar 1000 for everyone
        let mut registry = registry_with(vec![
            player("a", 0.0, 0.0),
            player("edge", 600.0, 800.0), // exactly 1000 away
            player("near", 10.0, 10.0),
            player("far", 1000.0, 1.0),
        ]);

        let contacts = collect_radar_contacts(&mut registry, "a", 0);
        assert_eq!(contact_ids(&contacts), vec!["edge", "near"]);

        let observer = registry.get("a").unwrap();
        let mut visible: Vec<_> = observer.visible_targets.iter().cloned().collect();
        visible.sort();
        assert_eq!(visible, vec!["edge", "near"]);
    }

    #[test]
    fn cached_between_refresh_ticks() {
        let mut registry = registry_with(vec![player("a", 0.0, 0.0), player("b", 100.0, 0.0)]);

        let first = collect_radar_contacts(&mut registry, "a", 1000);
        assert_eq!(first.len(), 1);

        // b flies out of range, but the next refresh is not due yet
        registry.get_mut("b").unwrap().pos.x = 5000.0;
        let cached = collect_radar_contacts(&mut registry, "a", 1000 + RADAR_PUSH_INTERVAL_MS - 1);
        assert_eq!(cached, first);

        let refreshed = collect_radar_contacts(&mut registry, "a", 1000 + RADAR_PUSH_INTERVAL_MS);
        assert!(refreshed.is_empty());
        assert!(registry.get("a").unwrap().visible_targets.is_empty());
    }

    #[test]
    fn zero_radar_sees_nothing() {
        let mut blind = player("a", 0.0, 0.0);
        blind.radar_distance = 0.0;
        blind.visible_targets.insert("b".into());
        let mut registry = registry_with(vec![blind, player("b", 1.0, 1.0)]);

        assert!(collect_radar_contacts(&mut registry, "a", 0).is_empty());
        assert!(registry.get("a").unwrap().visible_targets.is_empty());
    }

    #[test]
    fn asymmetric_ranges_hide_distant_tracker() {
        // A's radar reaches 1000; B's RWR only hears 500
        let mut a = player("a", 0.0, 0.0);
        a.radar_distance = 1000.0;
        let mut b = player("b", 800.0, 0.0);
        b.rwr_distance = 500.0;
        let mut registry = registry_with(vec![a, b]);

        let contacts = collect_radar_contacts(&mut registry, "a", 0);
        assert_eq!(contact_ids(&contacts), vec!["b"]);

        let rwr = threat_status(&registry, "b");
        assert!(!rwr.detected);
        assert!(rwr.targets.is_empty());

        // Closing to within B's RWR range makes A show up
        registry.get_mut("a").unwrap().pos.x = 400.0;
        let rwr = threat_status(&registry, "b");
        assert!(rwr.detected);
        assert_eq!(rwr.targets, vec!["a"]);
    }

    #[test]
    fn threat_requires_observer_visibility() {
        let mut registry = registry_with(vec![player("a", 0.0, 0.0), player("b", 100.0, 0.0)]);

        // Nobody has refreshed radar yet
        assert_eq!(threat_status(&registry, "b"), RwrStatus::default());

        collect_radar_contacts(&mut registry, "a", 0);
        let rwr = threat_status(&registry, "b");
        assert_eq!(rwr.targets, vec!["a"]);

        // b has not refreshed, so a is not threatened by b yet
        assert!(!threat_status(&registry, "a").detected);
    }

    #[test]
    fn threat_lags_until_observer_refreshes() {
        let mut registry = registry_with(vec![player("a", 0.0, 0.0), player("b", 100.0, 0.0)]);
        collect_radar_contacts(&mut registry, "a", 0);

        // b leaves a's radar range but is still inside its own RWR range of a
        registry.get_mut("b").unwrap().rwr_distance = 5000.0;
        registry.get_mut("b").unwrap().pos.x = 3000.0;
        assert!(threat_status(&registry, "b").detected);

        collect_radar_contacts(&mut registry, "a", RADAR_PUSH_INTERVAL_MS);
        assert!(!threat_status(&registry, "b").detected);
    }

    #[test]
    fn zero_rwr_range_disables_gate() {
        let mut registry = registry_with(vec![player("a", 0.0, 0.0), player("b", 900.0, 0.0)]);
        registry.get_mut("b").unwrap().rwr_distance = 0.0;
        collect_radar_contacts(&mut registry, "a", 0);

        assert_eq!(threat_status(&registry, "b").targets, vec!["a"]);
    }

    #[test]
    fn unknown_ids_yield_empty_results() {
        let mut registry = PlayerRegistry::new();
        assert!(collect_radar_contacts(&mut registry, "ghost", 0).is_empty());
        assert_eq!(threat_status(&registry, "ghost"), RwrStatus::default());
    }
}
