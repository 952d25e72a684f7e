//! End-to-end gateway behavior against a mock backend: credential
//! attachment, the single refresh-and-retry recovery, and pass-through of
//! non-authentication failures.

use courseware_client::types::LoginRequest;
use courseware_client::{ApiClient, ApiError, TokenStore};
use httpmock::prelude::*;
use std::sync::Arc;

fn client_with_token(server: &MockServer, token: &str) -> ApiClient {
    let store = Arc::new(TokenStore::new());
    store.store(token.to_string(), false);
    ApiClient::with_store(server.base_url(), store)
}

#[tokio::test]
async fn stale_token_triggers_one_refresh_and_retry() {
    let server = MockServer::start_async().await;

    let rejected = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/auth/me")
                .header("authorization", "Bearer stale");
            then.status(401)
                .json_body(serde_json::json!({"error": "Token expired", "code": "AUTHENTICATION_ERROR"}));
        })
        .await;

    let refresh = server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/refresh");
            then.status(200).json_body(serde_json::json!({
                "access_token": "fresh",
                "user": {
                    "id": "u1",
                    "email": "student@example.com",
                    "full_name": "Student",
                    "role": "STUDENT"
                }
            }));
        })
        .await;

    let accepted = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/auth/me")
                .header("authorization", "Bearer fresh");
            then.status(200).json_body(serde_json::json!({
                "id": "u1",
                "email": "student@example.com",
                "role": "STUDENT"
            }));
        })
        .await;

    let client = client_with_token(&server, "stale");
    let me = client.me().await.unwrap();

    assert_eq!(me.email, "student@example.com");
    rejected.assert_async().await;
    refresh.assert_async().await;
    accepted.assert_async().await;
    assert!(client.session().is_authenticated);
}

#[tokio::test]
async fn second_rejection_after_refresh_is_surfaced_without_another_retry() {
    let server = MockServer::start_async().await;

    // The resource rejects both the stale and the refreshed credential.
    let rejected = server
        .mock_async(|when, then| {
            when.method(GET).path("/auth/me");
            then.status(401)
                .json_body(serde_json::json!({"error": "Token revoked", "code": "AUTHENTICATION_ERROR"}));
        })
        .await;

    let refresh = server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/refresh");
            then.status(200).json_body(serde_json::json!({
                "access_token": "fresh",
                "user": {
                    "id": "u1",
                    "email": "student@example.com",
                    "full_name": "Student",
                    "role": "STUDENT"
                }
            }));
        })
        .await;

    let client = client_with_token(&server, "stale");
    let err = client.me().await.unwrap_err();

    assert_eq!(err, ApiError::Authentication("Token revoked".to_string()));
    // One original attempt, one retry, no third attempt.
    rejected.assert_hits_async(2).await;
    refresh.assert_hits_async(1).await;
}

#[tokio::test]
async fn anonymous_unauthorized_does_not_attempt_a_refresh() {
    let server = MockServer::start_async().await;

    let rejected = server
        .mock_async(|when, then| {
            when.method(GET).path("/auth/me");
            then.status(401)
                .json_body(serde_json::json!({"error": "Authentication required", "code": "AUTHENTICATION_ERROR"}));
        })
        .await;

    let refresh = server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/refresh");
            then.status(200).json_body(serde_json::json!({}));
        })
        .await;

    let client = ApiClient::with_store(server.base_url(), Arc::new(TokenStore::new()));
    let err = client.me().await.unwrap_err();

    assert_eq!(
        err,
        ApiError::Authentication("Authentication required".to_string())
    );
    rejected.assert_hits_async(1).await;
    refresh.assert_hits_async(0).await;
}

#[tokio::test]
async fn failed_refresh_propagates_and_clears_the_session() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/auth/me");
            then.status(401)
                .json_body(serde_json::json!({"error": "Token expired", "code": "AUTHENTICATION_ERROR"}));
        })
        .await;

    let refresh = server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/refresh");
            then.status(401)
                .json_body(serde_json::json!({"error": "Invalid refresh token", "code": "AUTHENTICATION_ERROR"}));
        })
        .await;

    let client = client_with_token(&server, "stale");
    let err = client.me().await.unwrap_err();

    assert_eq!(
        err,
        ApiError::Authentication("Invalid refresh token".to_string())
    );
    refresh.assert_hits_async(1).await;
    assert!(!client.session().is_authenticated);
}

#[tokio::test]
async fn forbidden_passes_through_without_refresh() {
    let server = MockServer::start_async().await;

    let denied = server
        .mock_async(|when, then| {
            when.method(GET).path("/courses/c1/lessons/l1/ticket");
            then.status(403)
                .json_body(serde_json::json!({"error": "Enrollment required", "code": "AUTHORIZATION_ERROR"}));
        })
        .await;

    let refresh = server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/refresh");
            then.status(200).json_body(serde_json::json!({}));
        })
        .await;

    let client = client_with_token(&server, "valid");
    let err = client.playback_ticket("c1", "l1").await.unwrap_err();

    assert_eq!(err, ApiError::Forbidden("Enrollment required".to_string()));
    denied.assert_hits_async(1).await;
    refresh.assert_hits_async(0).await;
}

#[tokio::test]
async fn login_stores_the_token_and_ticket_requests_carry_it() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/auth/login")
                .json_body_partial(r#"{"email": "student@example.com"}"#);
            then.status(200).json_body(serde_json::json!({
                "access_token": "issued",
                "user": {
                    "id": "u1",
                    "email": "student@example.com",
                    "full_name": "Student",
                    "role": "STUDENT"
                }
            }));
        })
        .await;

    let ticket = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/courses/c1/lessons/l1/ticket")
                .header("authorization", "Bearer issued");
            then.status(200).json_body(
                serde_json::json!({"url": "https://cdn.example.com/m1/playlist.m3u8?token=t&expires=1"}),
            );
        })
        .await;

    let client = ApiClient::with_store(server.base_url(), Arc::new(TokenStore::new()));
    let login = client
        .login(LoginRequest {
            email: "student@example.com".to_string(),
            password: "secret-password".to_string(),
            remember: true,
        })
        .await
        .unwrap();

    assert_eq!(login.access_token, "issued");
    assert!(client.session().is_authenticated);
    assert!(client.session().remember);

    let response = client.playback_ticket("c1", "l1").await.unwrap();
    assert!(response.url.contains("playlist.m3u8"));
    ticket.assert_async().await;
}

#[tokio::test]
async fn logout_clears_the_local_session() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/logout");
            then.status(200)
                .json_body(serde_json::json!({"message": "Logged out"}));
        })
        .await;

    let client = client_with_token(&server, "valid");
    client.logout().await.unwrap();

    assert!(!client.session().is_authenticated);
}
