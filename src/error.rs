use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use once_cell::sync::OnceCell;
use serde_json::json;
use std::fmt;

/// Whether server-side failures carry their diagnostic detail to clients.
/// Set once at startup from the configured environment; defaults to hiding.
static EXPOSE_INTERNAL_ERRORS: OnceCell<bool> = OnceCell::new();

pub fn set_expose_internal_errors(expose: bool) {
    if EXPOSE_INTERNAL_ERRORS.set(expose).is_err() {
        tracing::debug!("Error detail exposure already configured");
    }
}

fn expose_internal_errors() -> bool {
    EXPOSE_INTERNAL_ERRORS.get().copied().unwrap_or(false)
}

#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    Conflict(String),
    Capacity(String),
    Transaction(String),
    Database(String),
    Internal(String),
}

impl AppError {
    /// Machine-readable error kind sent in the `error` field of the envelope
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Capacity(_) => "capacity",
            AppError::Transaction(_) => "transaction",
            AppError::Database(_) => "database",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Capacity(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Transaction(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Validation(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::Capacity(msg)
            | AppError::Transaction(msg)
            | AppError::Database(msg)
            | AppError::Internal(msg) => msg,
        }
    }

    fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Capacity(msg) => write!(f, "Capacity exceeded: {}", msg),
            AppError::Transaction(msg) => write!(f, "Transaction failed: {}", msg),
            AppError::Database(msg) => write!(f, "Database error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if self.is_server_error() {
            tracing::error!("{}", self);
            if expose_internal_errors() {
                self.to_string()
            } else {
                "Internal server error".to_string()
            }
        } else {
            self.message().to_string()
        };

        let body = Json(json!({
            "success": false,
            "error": self.kind(),
            "message": message,
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("Document serialization failed: {}", err))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
