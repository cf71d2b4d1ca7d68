use crate::config::ScoringConfig;
use crate::error::AppError;
use crate::models::samples::*;
use crate::services::accumulator::{sample_contribution, ScoreAccumulator};
use crate::store::{EventCatalog, SampleArchive, ScoreStore};
use crate::validation;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Validates one batch and stamps observations that carry no time of
/// their own with the receipt time.
pub fn accept_batch(
    event_id: &str,
    caller: Option<&str>,
    batch: SampleBatch,
    received_at: DateTime<Utc>,
    params: &ScoringConfig,
) -> Result<AcceptedBatch, AppError> {
    validation::validate_user_id(&batch.user_id, caller)?;
    validation::validate_batch_size(batch.samples.len())?;
    for (i, obs) in batch.samples.iter().enumerate() {
        validation::validate_observation(i, obs, received_at)?;
    }

    let samples: Vec<AcceptedSample> = batch
        .samples
        .into_iter()
        .map(|obs| AcceptedSample {
            id: Uuid::new_v4().to_string(),
            event_id: event_id.to_string(),
            user_id: batch.user_id.clone(),
            observed_at: obs.observed_at.unwrap_or(received_at),
            magnitude: obs.magnitude,
            step_count: obs.step_count,
            contribution: sample_contribution(obs.magnitude, obs.step_count, params),
        })
        .collect();

    let delta_seconds = active_span_seconds(&samples);
    let signals = motion_signals(&samples, delta_seconds, params.stillness_threshold);

    Ok(AcceptedBatch {
        event_id: event_id.to_string(),
        user_id: batch.user_id,
        received_at,
        samples,
        delta_seconds,
        signals,
    })
}

/// `max(observed_at) - min(observed_at)` in seconds, never negative.
pub fn active_span_seconds(samples: &[AcceptedSample]) -> f64 {
    let first = samples.iter().map(|s| s.observed_at).min();
    let last = samples.iter().map(|s| s.observed_at).max();
    match (first, last) {
        (Some(first), Some(last)) => ((last - first).num_milliseconds().max(0) as f64) / 1000.0,
        _ => 0.0,
    }
}

pub fn motion_signals(
    samples: &[AcceptedSample],
    delta_seconds: f64,
    stillness_threshold: f64,
) -> MotionSignals {
    let sample_count = samples.len();
    let total_steps: i64 = samples.iter().map(|s| s.step_count).sum();
    let peak_magnitude = samples.iter().map(|s| s.magnitude).fold(0.0, f64::max);
    let still = samples
        .iter()
        .filter(|s| s.step_count == 0 && s.magnitude < stillness_threshold)
        .count();
    let (mean_magnitude, still_fraction) = if sample_count == 0 {
        (0.0, 0.0)
    } else {
        let n = sample_count as f64;
        (
            samples.iter().map(|s| s.magnitude).sum::<f64>() / n,
            still as f64 / n,
        )
    };

    MotionSignals {
        sample_count,
        total_steps,
        peak_magnitude,
        mean_magnitude,
        still_fraction,
        steps_per_second: (delta_seconds > 0.0).then(|| total_steps as f64 / delta_seconds),
    }
}

/// Scores an accepted batch, then archives its samples. The archive write
/// is best effort: its failure is logged and the score update stands.
pub fn submit_samples<S, A>(
    store: &S,
    archive: &A,
    accumulator: &ScoreAccumulator,
    batch: AcceptedBatch,
) -> Result<SubmitResult, AppError>
where
    S: EventCatalog + ScoreStore + ?Sized,
    A: SampleArchive + ?Sized,
{
    let event = store
        .event(&batch.event_id)?
        .ok_or_else(|| AppError::NotFound(format!("Event {}", batch.event_id)))?;
    if event.has_ended(batch.received_at) {
        return Err(AppError::EventClosed(event.id));
    }

    let state = accumulator.apply(
        store,
        &batch.event_id,
        &batch.user_id,
        batch.increment(),
        batch.received_at,
    )?;

    if let Err(e) = archive.archive(&batch.samples) {
        tracing::warn!(
            event_id = %batch.event_id,
            user_id = %batch.user_id,
            samples = batch.samples.len(),
            error = %e,
            "Sample archive write failed, continuing"
        );
    }

    tracing::debug!(
        event_id = %batch.event_id,
        user_id = %batch.user_id,
        samples = batch.samples.len(),
        score = state.score,
        "Batch accepted"
    );

    Ok(SubmitResult {
        event_id: batch.event_id,
        user_id: batch.user_id,
        score: state.score,
        accepted: batch.samples.len(),
        delta_seconds: batch.delta_seconds,
        signals: batch.signals,
    })
}
