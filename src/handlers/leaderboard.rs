use crate::error::AppError;
use crate::models::leaderboard::LeaderboardQuery;
use crate::services::leaderboard as service;
use crate::state::AppState;
use chrono::Utc;
use ntex::web::{self, HttpRequest, HttpResponse};
use std::sync::Arc;

pub async fn get_leaderboard(
    req: HttpRequest,
    state: web::types::State<Arc<AppState>>,
    path: web::types::Path<String>,
    query: web::types::Query<LeaderboardQuery>,
) -> Result<HttpResponse, AppError> {
    let mut query = query.into_inner();
    if query.user_id.is_none() {
        query.user_id = super::caller_id(&req);
    }
    let board = service::get_leaderboard(
        state.db.as_ref(),
        &state.leaderboards,
        &state.config,
        &path.into_inner(),
        &query,
        Utc::now(),
    )?;
    tracing::debug!(
        event_id = %board.event_id,
        generation = board.generation,
        entries = board.entries.len(),
        "Leaderboard served"
    );
    Ok(HttpResponse::Ok().json(&board))
}
