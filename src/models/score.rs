use chrono::{DateTime, Utc};
use serde::Serialize;

/// Accumulated, decayed score of one participant in one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreState {
    pub event_id: String,
    pub user_id: String,
    pub score: f64,
    pub last_update_at: DateTime<Utc>,
    #[serde(skip)]
    pub version: i64,
}

impl ScoreState {
    pub fn new(event_id: &str, user_id: &str, at: DateTime<Utc>) -> Self {
        Self {
            event_id: event_id.to_string(),
            user_id: user_id.to_string(),
            score: 0.0,
            last_update_at: at,
            version: 0,
        }
    }
}
