use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct MotionObservation {
    pub observed_at: Option<DateTime<Utc>>,
    pub magnitude: f64,
    #[serde(default)]
    pub step_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct SampleBatch {
    pub user_id: String,
    pub samples: Vec<MotionObservation>,
}

/// A validated, timestamped observation ready to score and archive.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedSample {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub observed_at: DateTime<Utc>,
    pub magnitude: f64,
    pub step_count: i64,
    pub contribution: f64,
}

/// Raw signals another component may use for anti-cheat decisions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MotionSignals {
    pub sample_count: usize,
    pub total_steps: i64,
    pub peak_magnitude: f64,
    pub mean_magnitude: f64,
    pub still_fraction: f64,
    pub steps_per_second: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct AcceptedBatch {
    pub event_id: String,
    pub user_id: String,
    pub received_at: DateTime<Utc>,
    pub samples: Vec<AcceptedSample>,
    pub delta_seconds: f64,
    pub signals: MotionSignals,
}

impl AcceptedBatch {
    pub fn increment(&self) -> f64 {
        self.samples.iter().map(|s| s.contribution).sum()
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitResult {
    pub event_id: String,
    pub user_id: String,
    pub score: f64,
    pub accepted: usize,
    pub delta_seconds: f64,
    pub signals: MotionSignals,
}
