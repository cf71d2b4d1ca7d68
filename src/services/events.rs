use crate::db::Db;
use crate::error::AppError;
use crate::models::event::*;
use crate::store::EventCatalog;
use crate::validation;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub fn create_event(
    db: &Db,
    req: CreateEventRequest,
    now: DateTime<Utc>,
) -> Result<Event, AppError> {
    let name = validation::validate_event_name(&req.name)?;
    let starts_at = req.starts_at.unwrap_or(now);
    if let Some(ends_at) = req.ends_at {
        if ends_at <= starts_at {
            return Err(AppError::InvalidPayload(
                "ends_at must be after starts_at".into(),
            ));
        }
    }

    let event = Event {
        id: Uuid::new_v4().to_string(),
        name,
        starts_at,
        ends_at: req.ends_at,
    };
    db.insert_event(&event)?;
    tracing::info!(event_id = %event.id, name = %event.name, "Event created");
    Ok(event)
}

pub fn get_event(db: &Db, event_id: &str) -> Result<Event, AppError> {
    db.event(event_id)?
        .ok_or_else(|| AppError::NotFound(format!("Event {}", event_id)))
}

/// Closes the event at `now` unless it already has an end. Scores become
/// read-only from that instant.
pub fn end_event(db: &Db, event_id: &str, now: DateTime<Utc>) -> Result<Event, AppError> {
    if !db.close_event(event_id, now)? {
        return Err(AppError::NotFound(format!("Event {}", event_id)));
    }
    let event = get_event(db, event_id)?;
    tracing::info!(event_id, ends_at = ?event.ends_at, "Event ended");
    Ok(event)
}
