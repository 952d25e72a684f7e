use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Error taxonomy shared by the auth gate, the media authorizer, and the
/// handlers. Nothing below this translation layer writes to the transport.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No credential, or a credential that failed verification.
    #[error("authentication error: {0}")]
    Authentication(String),
    /// Verified identity, but insufficient role or entitlement.
    #[error("authorization error: {0}")]
    Authorization(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// Entity exists but is structurally unusable (e.g. lesson without video).
    #[error("validation error: {0}")]
    Validation(String),
    #[error("internal error: {0}")]
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, code) = match self {
            AppError::Authentication(msg) => {
                tracing::debug!(reason = %msg, "authentication rejected");
                (
                    StatusCode::UNAUTHORIZED,
                    msg,
                    "AUTHENTICATION_ERROR".to_string(),
                )
            }
            AppError::Authorization(msg) => (
                StatusCode::FORBIDDEN,
                msg,
                "AUTHORIZATION_ERROR".to_string(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND".to_string()),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                msg,
                "VALIDATION_ERROR".to_string(),
            ),
            AppError::Internal(err) => {
                tracing::error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_SERVER_ERROR".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            code,
            details: None,
        });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource not found".to_string()),
            _ => AppError::Internal(err.into()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    let code = e.code.as_ref();
                    format!("{}: {}", field, code)
                })
            })
            .collect();
        AppError::Validation(messages.join(", "))
    }
}
