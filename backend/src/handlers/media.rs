use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::{error::AppError, middleware::Caller, services::media::VideoTicket, state::AppState};

/// Playback ticket for one lesson. Anonymous callers are admitted only as far
/// as the authorizer's free-preview policy allows.
pub async fn playback_ticket(
    State(state): State<AppState>,
    Path((course_id, lesson_id)): Path<(String, String)>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<VideoTicket>, AppError> {
    let ticket = state
        .media
        .issue_ticket(&course_id, &lesson_id, caller.0.as_ref())
        .await?;
    Ok(Json(ticket))
}

/// Yes/no access check without signing a URL.
pub async fn key_access(
    State(state): State<AppState>,
    Path((course_id, lesson_id)): Path<(String, String)>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Value>, AppError> {
    state
        .media
        .authorize_key_access(&course_id, &lesson_id, caller.0.as_ref())
        .await?;
    Ok(Json(json!({"authorized": true})))
}
