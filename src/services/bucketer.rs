//! Dense, fixed-width energy series over a time range.
//!
//! Buckets sum the raw per-sample contributions that fall inside them,
//! not changes in anyone's decayed score, so a bucket measures activity
//! during its own slot. Every slot in range is emitted, empty ones at zero.
//! Bucket edges are multiples of the width counted from the Unix epoch, so
//! a sample lands in the same bucket on every read.

use crate::config::TimelineConfig;
use crate::models::event::Event;
use crate::models::timeline::{Contribution, EnergyBucket};
use chrono::{DateTime, Duration, Utc};

pub fn clamp_width(requested: i64, cfg: &TimelineConfig) -> i64 {
    requested.clamp(cfg.min_bucket_secs, cfg.max_bucket_secs)
}

fn floor_to(t: DateTime<Utc>, width_secs: i64) -> DateTime<Utc> {
    t - Duration::milliseconds(t.timestamp_millis().rem_euclid(width_secs * 1000))
}

fn ceil_to(t: DateTime<Utc>, width_secs: i64) -> DateTime<Utc> {
    let floor = floor_to(t, width_secs);
    if floor == t {
        t
    } else {
        floor + Duration::seconds(width_secs)
    }
}

/// Time range a timeline covers, snapped outward to bucket edges. With
/// `window_minutes` the range is the trailing `ceil(window_minutes*60/width)`
/// buckets ending at the bucket that holds the event's effective end;
/// otherwise the whole event so far.
pub fn resolve_range(
    event: &Event,
    window_minutes: Option<i64>,
    width_secs: i64,
    now: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let end = ceil_to(event.effective_end(now), width_secs);
    let start = match window_minutes {
        Some(minutes) => {
            let n = (minutes * 60 + width_secs - 1) / width_secs;
            end - Duration::seconds(n * width_secs)
        }
        None => floor_to(event.starts_at, width_secs),
    };
    (start, end.max(start))
}

pub fn bucket_count(start: DateTime<Utc>, end: DateTime<Utc>, width_secs: i64) -> usize {
    let span_ms = (end - start).num_milliseconds().max(0);
    let width_ms = width_secs * 1000;
    ((span_ms + width_ms - 1) / width_ms) as usize
}

pub fn bucketize(
    event_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    width_secs: i64,
    contributions: &[Contribution],
) -> Vec<EnergyBucket> {
    let end = end.max(start);
    let width_ms = width_secs * 1000;
    let n = bucket_count(start, end, width_secs);

    let mut energy = vec![0.0f64; n];
    for c in contributions {
        if c.observed_at < start || c.observed_at >= end {
            continue;
        }
        let idx = ((c.observed_at - start).num_milliseconds() / width_ms) as usize;
        if let Some(slot) = energy.get_mut(idx) {
            *slot += c.energy.max(0.0);
        }
    }

    energy
        .into_iter()
        .enumerate()
        .map(|(i, energy)| EnergyBucket {
            event_id: event_id.to_string(),
            bucket_start: start + Duration::seconds(width_secs * i as i64),
            width_seconds: width_secs,
            energy,
        })
        .collect()
}
