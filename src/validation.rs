use crate::error::AppError;
use crate::models::samples::MotionObservation;
use chrono::{DateTime, Duration, Utc};

const MAX_BATCH_SIZE: usize = 1000;
const MAX_CLOCK_SKEW_SECS: i64 = 300;
const MAX_USER_ID_LEN: usize = 128;
const MAX_EVENT_NAME_LEN: usize = 120;
const MAX_TIMELINE_MINUTES: i64 = 24 * 60;
const MAX_PEAK_COUNT: usize = 10;

pub fn validate_user_id(user_id: &str, caller: Option<&str>) -> Result<(), AppError> {
    if user_id.trim().is_empty() {
        return Err(AppError::InvalidPayload("user_id is required".into()));
    }
    if user_id.len() > MAX_USER_ID_LEN {
        return Err(AppError::InvalidPayload("user_id too long".into()));
    }
    match caller {
        Some(caller) if caller != user_id => Err(AppError::InvalidPayload(
            "user_id does not match the authenticated caller".into(),
        )),
        _ => Ok(()),
    }
}

pub fn validate_batch_size(len: usize) -> Result<(), AppError> {
    if len == 0 {
        Err(AppError::InvalidPayload("Sample batch is empty".into()))
    } else if len > MAX_BATCH_SIZE {
        Err(AppError::InvalidPayload(format!(
            "Sample batch exceeds {} observations",
            MAX_BATCH_SIZE
        )))
    } else {
        Ok(())
    }
}

pub fn validate_observation(
    index: usize,
    obs: &MotionObservation,
    received_at: DateTime<Utc>,
) -> Result<(), AppError> {
    if !obs.magnitude.is_finite() || obs.magnitude < 0.0 {
        return Err(AppError::InvalidPayload(format!(
            "samples[{}].magnitude must be a finite non-negative number",
            index
        )));
    }
    if obs.step_count < 0 {
        return Err(AppError::InvalidPayload(format!(
            "samples[{}].step_count cannot be negative",
            index
        )));
    }
    if let Some(t) = obs.observed_at {
        if t > received_at + Duration::seconds(MAX_CLOCK_SKEW_SECS) {
            return Err(AppError::InvalidPayload(format!(
                "samples[{}].observed_at is in the future",
                index
            )));
        }
    }
    Ok(())
}

pub fn validate_event_name(name: &str) -> Result<String, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(AppError::InvalidPayload("Event name is required".into()))
    } else {
        Ok(trimmed.chars().take(MAX_EVENT_NAME_LEN).collect())
    }
}

pub fn validate_window_minutes(minutes: Option<i64>) -> Result<Option<i64>, AppError> {
    match minutes {
        Some(m) if !(1..=MAX_TIMELINE_MINUTES).contains(&m) => Err(AppError::InvalidPayload(
            format!("window_minutes must be 1-{}", MAX_TIMELINE_MINUTES),
        )),
        other => Ok(other),
    }
}

pub fn validate_peak_minutes(minutes: Option<i64>) -> Result<Option<i64>, AppError> {
    match minutes {
        Some(m) if !(1..=MAX_TIMELINE_MINUTES).contains(&m) => Err(AppError::InvalidPayload(
            format!("peak_minutes must be 1-{}", MAX_TIMELINE_MINUTES),
        )),
        other => Ok(other),
    }
}

pub fn clamp_peak_count(count: usize) -> usize {
    count.min(MAX_PEAK_COUNT)
}
