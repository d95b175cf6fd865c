//! Kinematic helpers for client-reported motion
//!
//! Nothing here integrates motion over time; the client owns its flight
//! model. These helpers only bound and interpret what it reports.

use crate::ws::protocol::{PosReport, Vec2};

use super::COORD_LIMIT;

/// Clamp a reported coordinate to the world bound. Non-finite values map to 0.
pub fn clamp_coord(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    value.clamp(-COORD_LIMIT, COORD_LIMIT)
}

/// Clamp a full position
pub fn clamp_pos(pos: Vec2) -> Vec2 {
    Vec2::new(clamp_coord(pos.x), clamp_coord(pos.y))
}

/// Position attached to a report, only when both axes were given
pub fn report_pos(report: Option<PosReport>) -> Option<Vec2> {
    match report {
        Some(PosReport {
            x: Some(x),
            y: Some(y),
        }) => Some(clamp_pos(Vec2::new(x, y))),
        _ => None,
    }
}

/// Unit vector for a heading. Heading 0 points up the screen (negative y),
/// increasing clockwise.
pub fn heading_vector(heading: f64) -> Vec2 {
    Vec2::new(heading.sin(), -heading.cos())
}

/// Velocity of a round fired along `heading` by a shooter moving at `speed`
pub fn muzzle_velocity(heading: f64, muzzle_speed: f64, shooter_speed: f64) -> Vec2 {
    let dir = heading_vector(heading);
    let speed = (muzzle_speed + shooter_speed).max(0.0);
    Vec2::new(dir.x * speed, dir.y * speed)
}
