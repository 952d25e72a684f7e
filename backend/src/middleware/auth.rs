//! Stateless per-request verification gate. Trusts signed claims as of token
//! issuance; no database lookup happens here, so a role change or account
//! deactivation only takes effect once the current access token expires.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::{config::Config, error::AppError, models::user::Role, utils::cookies, utils::jwt};

/// Verified identity decoded from the access token. The only trusted source
/// of "who is calling" for the remainder of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
    pub role: Role,
}

/// Caller identity on routes where anonymous access may be acceptable
/// (free-preview playback). `None` means no credential was presented.
#[derive(Debug, Clone)]
pub struct Caller(pub Option<AuthenticatedUser>);

/// Allowed-role set declared per route. An empty set admits any verified
/// identity.
#[derive(Debug, Clone, Copy)]
pub struct RouteRoles(pub &'static [Role]);

impl RouteRoles {
    pub const ANY_AUTHENTICATED: RouteRoles = RouteRoles(&[]);

    pub fn admits(&self, role: Role) -> bool {
        self.0.is_empty() || self.0.contains(&role)
    }
}

/// One way of carrying a bearer credential. Strategies are tried in order;
/// the cookie outranks the header when both are present.
type CredentialExtractor = fn(&HeaderMap) -> Option<String>;

const CREDENTIAL_EXTRACTORS: &[CredentialExtractor] = &[from_access_cookie, from_bearer_header];

fn from_access_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| cookies::extract_cookie_value(raw, cookies::ACCESS_COOKIE_NAME))
}

fn from_bearer_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer_token)
        .map(|token| token.to_string())
}

fn parse_bearer_token(header: &str) -> Option<&str> {
    let (scheme, rest) = header.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        let token = rest.trim_start();
        if !token.is_empty() {
            return Some(token);
        }
    }
    None
}

fn extract_credential(headers: &HeaderMap) -> Option<String> {
    CREDENTIAL_EXTRACTORS
        .iter()
        .find_map(|extract| extract(headers))
}

/// Verifies the presented credential and decodes the identity claims.
/// "No token" and "bad token" differ only in logging detail; both map to the
/// same 401 response.
pub fn verify_request(headers: &HeaderMap, config: &Config) -> Result<AuthenticatedUser, AppError> {
    let token = extract_credential(headers).ok_or_else(|| {
        tracing::debug!("no credential presented");
        AppError::Authentication("Authentication required".to_string())
    })?;

    let claims = jwt::verify_access_token(&token, &config.jwt_secret).map_err(|err| {
        tracing::debug!(error = %err, "credential verification failed");
        AppError::Authentication("Authentication required".to_string())
    })?;

    Ok(AuthenticatedUser {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
    })
}

/// Route-layer gate: requires a verified identity whose role is admitted by
/// the route's declared allow-list.
pub async fn auth_gate(
    State((config, allow)): State<(Config, RouteRoles)>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = verify_request(request.headers(), &config)?;
    if !allow.admits(identity.role) {
        return Err(AppError::Authorization(
            "Insufficient privileges".to_string(),
        ));
    }

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Gate for routes where anonymous callers are acceptable. A missing
/// credential passes through as `Caller(None)`; a credential that is present
/// but fails verification is still rejected.
pub async fn optional_auth_gate(
    State(config): State<Config>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let caller = match extract_credential(request.headers()) {
        Some(_) => Caller(Some(verify_request(request.headers(), &config)?)),
        None => Caller(None),
    };

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}
