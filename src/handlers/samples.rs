use crate::error::AppError;
use crate::models::samples::SampleBatch;
use crate::services::intake as service;
use crate::state::AppState;
use chrono::Utc;
use ntex::web::{self, HttpRequest, HttpResponse};
use std::sync::Arc;

pub async fn submit_samples(
    req: HttpRequest,
    state: web::types::State<Arc<AppState>>,
    path: web::types::Path<String>,
    body: web::types::Json<SampleBatch>,
) -> Result<HttpResponse, AppError> {
    let event_id = path.into_inner();
    let caller = super::caller_id(&req);
    let batch = service::accept_batch(
        &event_id,
        caller.as_deref(),
        body.into_inner(),
        Utc::now(),
        state.accumulator.params(),
    )?;
    let db = state.db.as_ref();
    let result = service::submit_samples(db, db, &state.accumulator, batch)?;
    Ok(HttpResponse::Ok().json(&result))
}
