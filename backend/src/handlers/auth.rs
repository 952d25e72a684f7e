use axum::{
    extract::{Extension, State},
    http::header,
    response::AppendHeaders,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use validator::Validate;

use crate::{
    error::AppError,
    middleware::AuthenticatedUser,
    models::user::{LoginRequest, LoginResponse, RegisterRequest, Role, User, UserResponse},
    repositories::{refresh_token as token_repo, user as user_repo},
    state::AppState,
    utils::{
        cookies::{
            build_auth_cookie, build_clear_cookie, CookieOptions, SameSite, ACCESS_COOKIE_NAME,
            ACCESS_COOKIE_PATH, REFRESH_COOKIE_NAME, REFRESH_COOKIE_PATH,
        },
        jwt::{create_access_token, create_refresh_token, decode_refresh_token,
            verify_refresh_secret},
        password::{hash_password, verify_password},
    },
};

type SetCookie = AppendHeaders<Vec<(header::HeaderName, String)>>;

fn cookie_options(state: &AppState) -> CookieOptions {
    CookieOptions {
        secure: state.config.cookie_secure,
        same_site: SameSite::Lax,
    }
}

/// Issues an access token plus a stored rotation token for `user`, and
/// returns the response body together with the refresh Set-Cookie header.
async fn issue_session(
    state: &AppState,
    user: User,
    remember: bool,
) -> Result<(LoginResponse, SetCookie), AppError> {
    let (access_token, _claims) = create_access_token(
        user.id.clone(),
        user.email.clone(),
        user.role,
        &state.config.jwt_secret,
        state.config.jwt_expiration_minutes,
    )
    .map_err(AppError::Internal)?;

    let refresh_days = state.config.refresh_lifetime_days(remember);
    let refresh_token = create_refresh_token(user.id.clone(), refresh_days, remember)
        .map_err(AppError::Internal)?;
    token_repo::insert_refresh_token(&state.pool, &refresh_token).await?;

    let cookie = build_auth_cookie(
        REFRESH_COOKIE_NAME,
        &refresh_token.encoded(),
        Duration::from_secs(refresh_days * 24 * 3600),
        REFRESH_COOKIE_PATH,
        cookie_options(state),
    );

    let response = LoginResponse {
        access_token,
        user: UserResponse::from(user),
    };
    Ok((response, AppendHeaders(vec![(header::SET_COOKIE, cookie)])))
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(SetCookie, Json<LoginResponse>), AppError> {
    payload.validate()?;

    if user_repo::find_user_by_email(&state.pool, &payload.email)
        .await?
        .is_some()
    {
        return Err(AppError::Validation("Email already registered".to_string()));
    }

    let password_hash = hash_password(&payload.password).map_err(AppError::Internal)?;
    let user = User::new(payload.email, password_hash, payload.full_name, Role::Student);
    user_repo::insert_user(&state.pool, &user).await?;

    tracing::info!(user_id = %user.id, "registered new student account");
    let (response, cookie) = issue_session(&state, user, false).await?;
    Ok((cookie, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<(SetCookie, Json<LoginResponse>), AppError> {
    payload.validate()?;

    let user = user_repo::find_user_by_email(&state.pool, &payload.email)
        .await?
        .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

    let password_ok =
        verify_password(&payload.password, &user.password_hash).map_err(AppError::Internal)?;
    if !password_ok {
        return Err(AppError::Authentication(
            "Invalid email or password".to_string(),
        ));
    }

    let (response, cookie) = issue_session(&state, user, payload.remember).await?;
    Ok((cookie, Json(response)))
}

/// Consumes the rotation cookie and exchanges it for a fresh access token and
/// a rotated cookie. The presented token is single-use: whichever request
/// deletes the stored row first wins, and any concurrent request presenting
/// the same cookie is rejected.
pub async fn refresh(
    State(state): State<AppState>,
    headers: header::HeaderMap,
) -> Result<(SetCookie, Json<LoginResponse>), AppError> {
    let encoded = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| crate::utils::cookies::extract_cookie_value(raw, REFRESH_COOKIE_NAME))
        .ok_or_else(|| AppError::Authentication("Missing refresh token".to_string()))?;

    let (token_id, secret) = decode_refresh_token(&encoded)
        .map_err(|_| AppError::Authentication("Invalid refresh token".to_string()))?;

    let record = token_repo::find_refresh_token(&state.pool, &token_id)
        .await?
        .ok_or_else(|| AppError::Authentication("Invalid refresh token".to_string()))?;

    if record.expires_at <= Utc::now() {
        return Err(AppError::Authentication(
            "Invalid refresh token".to_string(),
        ));
    }

    let secret_ok =
        verify_refresh_secret(&secret, &record.token_hash).map_err(AppError::Internal)?;
    if !secret_ok {
        return Err(AppError::Authentication(
            "Invalid refresh token".to_string(),
        ));
    }

    // Rotation is one-way. If the row is already gone another request won the
    // race and this presentation is a reuse.
    let consumed = token_repo::delete_refresh_token(&state.pool, &token_id).await?;
    if !consumed {
        tracing::warn!(user_id = %record.user_id, "refresh token reuse detected");
        return Err(AppError::Authentication(
            "Invalid refresh token".to_string(),
        ));
    }

    let user = user_repo::find_user_by_id(&state.pool, &record.user_id)
        .await?
        .ok_or_else(|| AppError::Authentication("Invalid refresh token".to_string()))?;

    // Rotation preserves the original session's remember choice.
    let (response, cookie) = issue_session(&state, user, record.remember).await?;
    Ok((cookie, Json(response)))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedUser>,
    headers: header::HeaderMap,
) -> Result<(SetCookie, Json<Value>), AppError> {
    if let Some(encoded) = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| crate::utils::cookies::extract_cookie_value(raw, REFRESH_COOKIE_NAME))
    {
        if let Ok((token_id, _)) = decode_refresh_token(&encoded) {
            token_repo::delete_refresh_token(&state.pool, &token_id).await?;
        }
    } else {
        // No cookie to revoke by id; drop every session for the caller.
        token_repo::delete_tokens_for_user(&state.pool, &identity.id).await?;
    }

    let options = cookie_options(&state);
    let clear_headers = AppendHeaders(vec![
        (
            header::SET_COOKIE,
            build_clear_cookie(REFRESH_COOKIE_NAME, REFRESH_COOKIE_PATH, options),
        ),
        (
            header::SET_COOKIE,
            build_clear_cookie(ACCESS_COOKIE_NAME, ACCESS_COOKIE_PATH, options),
        ),
    ]);

    Ok((clear_headers, Json(json!({"message": "Logged out"}))))
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: String,
    pub email: String,
    pub role: Role,
}

pub async fn me(Extension(identity): Extension<AuthenticatedUser>) -> Json<MeResponse> {
    Json(MeResponse {
        id: identity.id,
        email: identity.email,
        role: identity.role,
    })
}
