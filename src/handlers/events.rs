use crate::error::AppError;
use crate::models::event::CreateEventRequest;
use crate::services::events as service;
use crate::state::AppState;
use chrono::Utc;
use ntex::web::{self, HttpResponse};
use std::sync::Arc;

pub async fn create_event(
    state: web::types::State<Arc<AppState>>,
    body: web::types::Json<CreateEventRequest>,
) -> Result<HttpResponse, AppError> {
    let event = service::create_event(&state.db, body.into_inner(), Utc::now())?;
    Ok(HttpResponse::Created().json(&event))
}

pub async fn get_event(
    state: web::types::State<Arc<AppState>>,
    path: web::types::Path<String>,
) -> Result<HttpResponse, AppError> {
    let event = service::get_event(&state.db, &path.into_inner())?;
    Ok(HttpResponse::Ok().json(&event))
}

pub async fn end_event(
    state: web::types::State<Arc<AppState>>,
    path: web::types::Path<String>,
) -> Result<HttpResponse, AppError> {
    let event = service::end_event(&state.db, &path.into_inner(), Utc::now())?;
    Ok(HttpResponse::Ok().json(&event))
}
