use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::rules::RegistryError;

/// Failures surfaced by admin handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("rule not found")]
    NotFound,

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("admin task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::NotFound => StatusCode::NOT_FOUND.into_response(),
            ApiError::Registry(_) | ApiError::Task(_) => {
                tracing::error!(error = %self, "Admin operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": self.to_string() })),
                )
                    .into_response()
            }
        }
    }
}
