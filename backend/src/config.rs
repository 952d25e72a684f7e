use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_minutes: u64,
    pub refresh_token_expiration_days: u64,
    /// Refresh cookie lifetime when the client asks to be remembered.
    pub remember_refresh_expiration_days: u64,
    /// Shared secret for provider token-auth playback URLs.
    pub media_signing_key: String,
    /// Base URL of the video delivery host signed URLs point at.
    pub media_delivery_base_url: String,
    pub playback_ttl_seconds: u64,
    pub cookie_secure: bool,
}

impl Config {
    /// Refresh cookie lifetime for the caller's remember choice; rotation
    /// reuses this so a remembered session never shrinks to the short window.
    pub fn refresh_lifetime_days(&self, remember: bool) -> u64 {
        if remember {
            self.remember_refresh_expiration_days
        } else {
            self.refresh_token_expiration_days
        }
    }

    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/courseware".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .unwrap_or_else(|_| "your-secret-key-change-this-in-production".to_string());

        let jwt_expiration_minutes = env::var("JWT_EXPIRATION_MINUTES")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .unwrap_or(15);

        let refresh_token_expiration_days = env::var("REFRESH_TOKEN_EXPIRATION_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse()
            .unwrap_or(7);

        let remember_refresh_expiration_days = env::var("REMEMBER_REFRESH_EXPIRATION_DAYS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        let media_signing_key = env::var("MEDIA_SIGNING_KEY")
            .unwrap_or_else(|_| "media-signing-key-change-this".to_string());

        let media_delivery_base_url = env::var("MEDIA_DELIVERY_BASE_URL")
            .unwrap_or_else(|_| "https://video.courseware.example".to_string());

        let playback_ttl_seconds = env::var("PLAYBACK_TTL_SECONDS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .unwrap_or(300);

        let cookie_secure = env::var("COOKIE_SECURE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Ok(Config {
            database_url,
            jwt_secret,
            jwt_expiration_minutes,
            refresh_token_expiration_days,
            remember_refresh_expiration_days,
            media_signing_key,
            media_delivery_base_url,
            playback_ttl_seconds,
            cookie_secure,
        })
    }
}
