use crate::cache::SnapshotCache;
use crate::config::TimelineConfig;
use crate::error::AppError;
use crate::models::event::Event;
use crate::models::timeline::*;
use crate::services::{bucketer, peaks};
use crate::store::{EventCatalog, SampleSource};
use crate::validation;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimelineKey {
    pub event_id: String,
    pub resolution_secs: i64,
    pub window_minutes: Option<i64>,
    pub peak_window_secs: i64,
    pub peak_count: usize,
}

pub type TimelineCache = SnapshotCache<TimelineKey, EnergyTimeline>;

impl TimelineKey {
    pub fn resolve(
        event_id: &str,
        query: &TimelineQuery,
        cfg: &TimelineConfig,
    ) -> Result<Self, AppError> {
        let window_minutes = validation::validate_window_minutes(query.window_minutes)?;
        let peak_window_secs = validation::validate_peak_minutes(query.peak_minutes)?
            .map(|m| m * 60)
            .unwrap_or(cfg.peak_window_secs);
        Ok(Self {
            event_id: event_id.to_string(),
            resolution_secs: bucketer::clamp_width(
                query.resolution.unwrap_or(cfg.default_resolution_secs),
                cfg,
            ),
            window_minutes,
            peak_window_secs,
            peak_count: validation::clamp_peak_count(query.peaks.unwrap_or(cfg.peak_count)),
        })
    }
}

pub fn build_timeline<S: SampleSource + ?Sized>(
    store: &S,
    event: &Event,
    key: &TimelineKey,
    now: DateTime<Utc>,
) -> Result<EnergyTimeline, AppError> {
    let (start, end) = bucketer::resolve_range(event, key.window_minutes, key.resolution_secs, now);
    let contributions = store.contributions_between(&event.id, start, end)?;
    let buckets = bucketer::bucketize(&event.id, start, end, key.resolution_secs, &contributions);

    let w = peaks::window_len(key.peak_window_secs, key.resolution_secs);
    let peaks = peaks::detect_peaks(&buckets, w, key.peak_count);

    let mut cumulative = 0.0;
    let series = buckets
        .iter()
        .map(|b| {
            cumulative += b.energy;
            SeriesPoint {
                t: b.bucket_start,
                energy: b.energy,
                cumulative,
            }
        })
        .collect();

    tracing::debug!(
        event_id = %event.id,
        buckets = buckets.len(),
        samples = contributions.len(),
        peaks = peaks.len(),
        "Timeline built"
    );

    Ok(EnergyTimeline {
        event_id: event.id.clone(),
        resolution_seconds: key.resolution_secs,
        start,
        end,
        series,
        peaks,
    })
}

pub fn get_energy_timeline<S>(
    store: &S,
    cache: &TimelineCache,
    cfg: &TimelineConfig,
    event_id: &str,
    query: &TimelineQuery,
    now: DateTime<Utc>,
) -> Result<EnergyTimeline, AppError>
where
    S: EventCatalog + SampleSource + ?Sized,
{
    let key = TimelineKey::resolve(event_id, query, cfg)?;
    let snapshot = cache.get_or_build(&key, || {
        let event = store
            .event(event_id)?
            .ok_or_else(|| AppError::NotFound(format!("Event {}", event_id)))?;
        build_timeline(store, &event, &key, now)
    })?;
    Ok(snapshot.value.clone())
}
