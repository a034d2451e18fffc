use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::orchestration::SettlementError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Settlement(#[from] SettlementError),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Settlement(SettlementError::Storage(err))
    }
}

impl AppError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "storage_failure"),
            AppError::Settlement(err) => {
                let status = match err {
                    SettlementError::NotFound(_) => StatusCode::NOT_FOUND,
                    SettlementError::AlreadyClosed(_)
                    | SettlementError::InsufficientShares { .. } => StatusCode::CONFLICT,
                    SettlementError::InvalidCloseWindow { .. }
                    | SettlementError::UnsupportedAssignment(_) => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    SettlementError::Validation(_) => StatusCode::BAD_REQUEST,
                    SettlementError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
                };
                (status, err.kind())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        if status.is_server_error() {
            tracing::error!(kind, error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "kind": kind,
        }));

        (status, body).into_response()
    }
}
