//! Time utilities for the session server

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Get current Unix timestamp in seconds (session credential expiry)
pub fn unix_secs() -> u64 {
    unix_millis() / 1000
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Radar recomputation cadence per observer
pub const RADAR_REFRESH_HZ: u64 = 30;
pub const RADAR_PUSH_INTERVAL_MS: u64 = 1000 / RADAR_REFRESH_HZ;

/// Default cadence of the shared `state:sync` ticker
pub const STATE_SYNC_INTERVAL_MS: u64 = 100;
