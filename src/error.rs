use ntex::http::StatusCode;
use ntex::web::{HttpResponse, WebResponseError};
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Event closed: {0}")]
    EventClosed(String),
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("Conflicting write on {0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Db(rusqlite::Error),
}

impl AppError {
    /// Whether the caller may retry the same request after backing off.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::StorageUnavailable(_) | AppError::Conflict(_))
    }
}

impl WebResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::EventClosed(_) | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self, _: &ntex::web::HttpRequest) -> HttpResponse {
        let message = match self {
            AppError::InvalidPayload(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::EventClosed(_) => "Event has ended".to_string(),
            AppError::Conflict(_) => "Concurrent update, retry".to_string(),
            AppError::StorageUnavailable(msg) => {
                tracing::warn!(error = %msg, "Storage unavailable");
                "Storage temporarily unavailable".to_string()
            }
            AppError::Db(e) => {
                tracing::error!(error = ?e, "Database error");
                "Database error".to_string()
            }
        };
        HttpResponse::build(self.status_code()).json(&serde_json::json!({
            "error": message,
            "retryable": self.is_retryable(),
        }))
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                AppError::StorageUnavailable(e.to_string())
            }
            _ => AppError::Db(e),
        }
    }
}
