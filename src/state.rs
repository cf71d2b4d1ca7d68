use crate::config::Config;
use crate::db::Db;
use crate::services::accumulator::ScoreAccumulator;
use crate::services::leaderboard::LeaderboardCache;
use crate::services::timeline::TimelineCache;
use std::sync::Arc;

pub struct AppState {
    pub db: Arc<Db>,
    pub config: Config,
    pub accumulator: ScoreAccumulator,
    pub leaderboards: LeaderboardCache,
    pub timelines: TimelineCache,
}

impl AppState {
    pub fn new(db: Arc<Db>, config: Config) -> Self {
        Self {
            accumulator: ScoreAccumulator::new(config.scoring.clone()),
            leaderboards: LeaderboardCache::new(config.leaderboard.cache_ttl),
            timelines: TimelineCache::new(config.timeline.cache_ttl),
            db,
            config,
        }
    }
}
