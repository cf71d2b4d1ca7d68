//! Seams to the durable collaborators the engine reads from and writes to.
//! [`crate::db::Db`] implements all of them on SQLite.

use crate::error::AppError;
use crate::models::event::Event;
use crate::models::leaderboard::Profile;
use crate::models::samples::AcceptedSample;
use crate::models::score::ScoreState;
use crate::models::timeline::Contribution;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

pub trait EventCatalog {
    fn event(&self, event_id: &str) -> Result<Option<Event>, AppError>;
}

pub trait ScoreStore {
    fn load_score(&self, event_id: &str, user_id: &str) -> Result<Option<ScoreState>, AppError>;

    /// Writes `state` if the stored version still equals `expected_version`
    /// (`None` = row must not exist yet). Returns `false` on a lost race.
    fn save_score(&self, state: &ScoreState, expected_version: Option<i64>)
        -> Result<bool, AppError>;

    fn scores_for_event(&self, event_id: &str) -> Result<Vec<ScoreState>, AppError>;
}

pub trait SampleArchive {
    fn archive(&self, samples: &[AcceptedSample]) -> Result<(), AppError>;
}

pub trait SampleSource {
    /// Contributions observed in `[from, to)`, in no particular order.
    fn contributions_between(
        &self,
        event_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Contribution>, AppError>;
}

pub trait ProfileDirectory {
    fn profiles(&self, user_ids: &[String]) -> Result<HashMap<String, Profile>, AppError>;
}
