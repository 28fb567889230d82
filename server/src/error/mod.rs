//! HTTP-facing error surface.
//!
//! Transaction failures keep their taxonomy (`TxnError`) until the handler
//! boundary, where each kind maps to a status code and a small JSON body.
//! Internal failures are logged with their detail and answered with a generic
//! message.

use crate::txn::TxnError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    /// No connection could be handed out: pool exhausted, closed, or the
    /// database is unreachable. Retryable by the client.
    ServiceUnavailable(String),
    Internal(anyhow::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code().to_string();
        let error = match self {
            AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::ServiceUnavailable(msg) => msg,
            AppError::Internal(err) => {
                // Detail goes to the log, not to the client.
                tracing::error!(error = ?err, "request failed with internal error");
                "Internal server error".to_string()
            }
        };

        (status, Json(ErrorBody { error, code })).into_response()
    }
}

impl From<TxnError> for AppError {
    fn from(err: TxnError) -> Self {
        match err {
            TxnError::Format(err) => AppError::BadRequest(err.to_string()),
            TxnError::UnknownTransaction(id) => {
                AppError::NotFound(format!("unknown transaction {id}"))
            }
            TxnError::Acquire(err) => AppError::ServiceUnavailable(err.to_string()),
            TxnError::Statement(err) => AppError::Internal(anyhow::Error::new(err)),
        }
    }
}
