use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedScore {
    pub rank: u32,
    pub user_id: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub display_name: String,
    pub avatar_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub event_id: String,
    pub user_id: String,
    pub score: f64,
    pub rank: u32,
    pub display_name: Option<String>,
    pub avatar_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard {
    pub event_id: String,
    /// Snapshot generation the entries were served from.
    #[serde(skip)]
    pub generation: u64,
    pub participants: usize,
    pub entries: Vec<LeaderboardEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_rank: Option<RankedScore>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub top_n: Option<usize>,
    pub user_id: Option<String>,
}
