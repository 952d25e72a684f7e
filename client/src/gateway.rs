//! Request gateway: attaches the bearer credential to every outbound call
//! and recovers from one authentication failure per call via the shared
//! refresh coordinator.

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::{
    refresh::{RefreshCoordinator, RefreshTransport},
    token_store::{Session, TokenStore},
    types::{
        ApiError, ErrorBody, KeyAccessResponse, LoginRequest, LoginResponse, MeResponse,
        RegisterRequest, TicketResponse,
    },
};

pub struct ApiClient {
    http: Client,
    base_url: String,
    store: Arc<TokenStore>,
    refresher: Arc<RefreshCoordinator>,
}

/// Production transport: posts to the refresh endpoint; the cookie store
/// attaches the HTTP-only rotation cookie and records its rotated successor.
struct HttpRefreshTransport {
    http: Client,
    base_url: String,
}

#[async_trait::async_trait]
impl RefreshTransport for HttpRefreshTransport {
    async fn refresh(&self) -> Result<LoginResponse, ApiError> {
        let response = self
            .http
            .post(format!("{}/auth/refresh", self.base_url))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        parse_response(response).await
    }
}

async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if status.is_success() {
        response
            .json()
            .await
            .map_err(|e| ApiError::Network(format!("failed to parse response: {}", e)))
    } else {
        let body = response.json::<ErrorBody>().await.unwrap_or(ErrorBody {
            error: status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
            code: String::new(),
        });
        Err(ApiError::from_status(status.as_u16(), body))
    }
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let store = Arc::new(TokenStore::new());
        Self::with_store(base_url, store)
    }

    /// Client over an existing store (e.g. one configured with persistence).
    pub fn with_store(base_url: impl Into<String>, store: Arc<TokenStore>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = Client::builder()
            .cookie_store(true)
            .build()
            .expect("failed to build HTTP client");
        let transport = Arc::new(HttpRefreshTransport {
            http: http.clone(),
            base_url: base_url.clone(),
        });
        let refresher = Arc::new(RefreshCoordinator::new(store.clone(), transport));
        Self {
            http,
            base_url,
            store,
            refresher,
        }
    }

    pub fn session(&self) -> Session {
        self.store.session()
    }

    pub fn initialize(&self) {
        self.store.initialize();
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends a request with the current credential attached. On the first
    /// 401 the call delegates to the refresh coordinator and resends exactly
    /// once with the replacement token; a second 401 is surfaced untouched.
    async fn execute(
        &self,
        build: impl Fn(&Client) -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        let had_token = self.store.current_token().is_some();
        let response = self.send_with_token(&build).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        // Nothing to refresh for an anonymous caller; the 401 stands.
        if !had_token {
            return Ok(response);
        }

        // Retry-eligible once; a refresh failure clears the session and
        // propagates to the original caller.
        self.refresher.refresh_access_token().await?;
        self.send_with_token(&build).await
    }

    async fn send_with_token(
        &self,
        build: &impl Fn(&Client) -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        let mut request = build(&self.http);
        if let Some(token) = self.store.current_token() {
            request = request.bearer_auth(token);
        }
        request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))
    }

    pub async fn register(&self, payload: RegisterRequest) -> Result<LoginResponse, ApiError> {
        let response = self
            .http
            .post(self.url("/auth/register"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let login: LoginResponse = parse_response(response).await?;
        self.store.store(login.access_token.clone(), false);
        Ok(login)
    }

    pub async fn login(&self, payload: LoginRequest) -> Result<LoginResponse, ApiError> {
        let remember = payload.remember;
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let login: LoginResponse = parse_response(response).await?;
        self.store.store(login.access_token.clone(), remember);
        Ok(login)
    }

    /// Logs out locally even when the server call fails; the stored
    /// credential is gone either way.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let result = self
            .execute(|http| http.post(self.url("/auth/logout")))
            .await;
        self.store.clear();
        match result {
            Ok(response) => {
                parse_response::<serde_json::Value>(response).await?;
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    pub async fn me(&self) -> Result<MeResponse, ApiError> {
        let response = self.execute(|http| http.get(self.url("/auth/me"))).await?;
        parse_response(response).await
    }

    /// Requests a playback ticket for one lesson. Any non-2xx means access
    /// denied; there is no retry beyond the single refresh recovery.
    pub async fn playback_ticket(
        &self,
        course_id: &str,
        lesson_id: &str,
    ) -> Result<TicketResponse, ApiError> {
        let path = format!("/courses/{}/lessons/{}/ticket", course_id, lesson_id);
        let response = self.execute(|http| http.get(self.url(&path))).await?;
        parse_response(response).await
    }

    pub async fn key_access(
        &self,
        course_id: &str,
        lesson_id: &str,
    ) -> Result<KeyAccessResponse, ApiError> {
        let path = format!("/courses/{}/lessons/{}/access", course_id, lesson_id);
        let response = self.execute(|http| http.get(self.url(&path))).await?;
        parse_response(response).await
    }
}
