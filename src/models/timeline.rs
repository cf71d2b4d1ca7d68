use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One archived sample's energy at the moment it was observed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution {
    pub observed_at: DateTime<Utc>,
    pub energy: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnergyBucket {
    pub event_id: String,
    pub bucket_start: DateTime<Utc>,
    pub width_seconds: i64,
    pub energy: f64,
}

/// Contiguous run of buckets, `start_index..=end_index`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(rename = "total")]
    pub total_energy: f64,
    pub start_index: usize,
    pub end_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub t: DateTime<Utc>,
    pub energy: f64,
    pub cumulative: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyTimeline {
    pub event_id: String,
    pub resolution_seconds: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub series: Vec<SeriesPoint>,
    pub peaks: Vec<PeakWindow>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TimelineQuery {
    pub resolution: Option<i64>,
    pub window_minutes: Option<i64>,
    pub peak_minutes: Option<i64>,
    pub peaks: Option<usize>,
}
