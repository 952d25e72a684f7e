use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub email: String,
    pub role: Role,
    pub exp: i64, // expiration time
    pub iat: i64, // issued at
    pub jti: String,
}

impl Claims {
    pub fn new(user_id: String, email: String, role: Role, expiration_minutes: u64) -> Self {
        let now = Utc::now();
        let exp = now + Duration::minutes(expiration_minutes as i64);

        Self {
            sub: user_id,
            email,
            role,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }
}

/// A rotation token as persisted. The raw `secret` is only handed to the
/// client inside the HTTP-only cookie; the database keeps its argon2 hash.
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshToken {
    pub id: String,
    pub user_id: String,
    #[serde(skip_serializing)]
    pub secret: String,
    pub token_hash: String,
    /// Carried through rotation so a remembered session keeps its longer
    /// cookie lifetime.
    pub remember: bool,
    pub expires_at: chrono::DateTime<Utc>,
}

impl RefreshToken {
    /// Cookie representation: the row id and the raw secret, dot-joined,
    /// so the server can look the row up without scanning hashes.
    pub fn encoded(&self) -> String {
        format!("{}.{}", self.id, self.secret)
    }
}

pub fn create_access_token(
    user_id: String,
    email: String,
    role: Role,
    secret: &str,
    expiration_minutes: u64,
) -> anyhow::Result<(String, Claims)> {
    let claims = Claims::new(user_id, email, role, expiration_minutes);
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;

    Ok((token, claims))
}

pub fn create_refresh_token(
    user_id: String,
    expiration_days: u64,
    remember: bool,
) -> anyhow::Result<RefreshToken> {
    let secret = Uuid::new_v4().to_string();
    let token_hash = hash_refresh_secret(&secret)?;
    let expires_at = Utc::now() + Duration::days(expiration_days as i64);

    Ok(RefreshToken {
        id: Uuid::new_v4().to_string(),
        user_id,
        secret,
        token_hash,
        remember,
        expires_at,
    })
}

pub fn decode_refresh_token(encoded: &str) -> anyhow::Result<(String, String)> {
    let (id, secret) = encoded
        .split_once('.')
        .ok_or_else(|| anyhow::anyhow!("Malformed refresh token"))?;
    if id.is_empty() || secret.is_empty() {
        anyhow::bail!("Malformed refresh token");
    }
    Ok((id.to_string(), secret.to_string()))
}

/// Verifies signature and expiry. A token whose `exp` equals the current
/// second is already expired; no leeway is granted at the boundary.
pub fn verify_access_token(token: &str, secret: &str) -> anyhow::Result<Claims> {
    let mut validation = Validation::default();
    validation.leeway = 0;
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )?;

    let claims = token_data.claims;
    if claims.exp <= Utc::now().timestamp() {
        anyhow::bail!("Access token expired");
    }

    Ok(claims)
}

pub fn hash_refresh_secret(secret: &str) -> anyhow::Result<String> {
    use argon2::password_hash::{rand_core::OsRng, SaltString};
    use argon2::{Argon2, PasswordHasher};

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let token_hash = argon2
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash refresh token: {}", e))?;

    Ok(token_hash.to_string())
}

pub fn verify_refresh_secret(secret: &str, hash: &str) -> anyhow::Result<bool> {
    use argon2::password_hash::PasswordHash;
    use argon2::{Argon2, PasswordVerifier};

    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Invalid refresh token hash: {}", e))?;

    let argon2 = Argon2::default();
    let result = argon2.verify_password(secret.as_bytes(), &parsed_hash);

    match result {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("Refresh token verification error: {}", e)),
    }
}
