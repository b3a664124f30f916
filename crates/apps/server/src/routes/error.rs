use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use color_eyre::eyre;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found")]
    NotFound,

    #[error("internal error")]
    Internal(#[from] eyre::Report),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // log details server-side; clients get generic messages only
        let (status, message) = match &self {
            Self::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
            Self::NotFound => (StatusCode::NOT_FOUND, "Not found.".to_string()),
            Self::Internal(report) => {
                error!("request failed: {report}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected internal error occurred.".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<media_services::SearchError> for ApiError {
    fn from(error: media_services::SearchError) -> Self {
        Self::Internal(eyre::Report::new(error))
    }
}

impl From<media_services::MediaError> for ApiError {
    fn from(error: media_services::MediaError) -> Self {
        Self::Internal(eyre::Report::new(error))
    }
}
