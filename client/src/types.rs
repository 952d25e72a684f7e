use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeResponse {
    pub id: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketResponse {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyAccessResponse {
    pub authorized: bool,
}

/// Error envelope the backend returns for every non-2xx response.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default)]
    pub code: String,
}

/// Client-side error taxonomy. `Clone` so a single refresh settlement can be
/// broadcast to every queued waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    /// 401: no, invalid, or expired credential.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// 403: valid identity, insufficient role or enrollment.
    #[error("access denied: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unexpected response ({status}): {message}")]
    Unexpected { status: u16, message: String },
}

impl ApiError {
    pub fn from_status(status: u16, body: ErrorBody) -> Self {
        match status {
            401 => ApiError::Authentication(body.error),
            403 => ApiError::Forbidden(body.error),
            404 => ApiError::NotFound(body.error),
            400 => ApiError::BadRequest(body.error),
            status => ApiError::Unexpected {
                status,
                message: body.error,
            },
        }
    }

    /// Whether a not-yet-retried call may recover via refresh-and-retry.
    pub fn is_authentication(&self) -> bool {
        matches!(self, ApiError::Authentication(_))
    }
}
