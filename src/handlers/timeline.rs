use crate::error::AppError;
use crate::models::timeline::TimelineQuery;
use crate::services::timeline as service;
use crate::state::AppState;
use chrono::Utc;
use ntex::web::{self, HttpResponse};
use std::sync::Arc;

pub async fn get_energy_timeline(
    state: web::types::State<Arc<AppState>>,
    path: web::types::Path<String>,
    query: web::types::Query<TimelineQuery>,
) -> Result<HttpResponse, AppError> {
    let timeline = service::get_energy_timeline(
        state.db.as_ref(),
        &state.timelines,
        &state.config.timeline,
        &path.into_inner(),
        &query,
        Utc::now(),
    )?;
    Ok(HttpResponse::Ok().json(&timeline))
}
