//! Fuel burn over wall-clock time

use super::PlayerState;

/// Burn interval floor, guards against a zero or tiny catalog rate
const MIN_FUEL_RATE_MS: f64 = 50.0;

/// Deplete fuel for the time elapsed since the last burn.
///
/// Burn scales linearly with `reported_speed / max_speed` and is not capped at
/// 1, so reports above rated speed burn proportionally faster. Fuel is only
/// burned when the client reports; a silent client's fuel stays frozen.
pub fn apply_fuel_burn(state: &mut PlayerState, reported_speed: f64, now: u64) {
    let elapsed_ms = now.saturating_sub(state.last_fuel_tick) as f64;
    state.last_fuel_tick = state.last_fuel_tick.max(now);

    let rate_ms = state.fuel_rate_ms.max(MIN_FUEL_RATE_MS);
    let reference_speed = state.max_speed.max(1.0);
    let speed_factor = (reported_speed / reference_speed).max(0.0);
    let burn = (elapsed_ms / rate_ms) * speed_factor;

    if burn > 0.0 {
        state.fuel = (state.fuel - burn).clamp(0.0, state.max_fuel);
    }
}
