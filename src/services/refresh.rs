//! Periodic rebuild of cached read snapshots.

use crate::state::AppState;
use crate::services::leaderboard;
use chrono::Utc;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Timeline snapshots older than this many TTLs are dropped.
const TIMELINE_EVICT_TTLS: u32 = 10;

/// One refresh pass: rebuild every tracked leaderboard, evict stale
/// timelines. Failures are logged and the previous snapshot stays served.
pub fn refresh_once(state: &AppState) {
    let now = Utc::now();
    let events = state.leaderboards.keys();
    for event_id in &events {
        if let Err(e) = leaderboard::refresh_board(
            state.db.as_ref(),
            &state.leaderboards,
            &state.config,
            event_id,
            now,
        ) {
            tracing::warn!(event_id = %event_id, error = %e, "Leaderboard refresh failed");
        }
    }

    let evicted = state
        .timelines
        .evict_older_than(state.timelines.ttl() * TIMELINE_EVICT_TTLS);
    tracing::debug!(leaderboards = events.len(), evicted, "Snapshot refresh pass");
}

pub fn spawn_refresher(state: Arc<AppState>) -> std::io::Result<JoinHandle<()>> {
    let interval = state.config.leaderboard.refresh_interval;
    std::thread::Builder::new()
        .name("snapshot-refresh".into())
        .spawn(move || loop {
            std::thread::sleep(interval);
            refresh_once(&state);
        })
}
