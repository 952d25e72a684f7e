//! Models that represent accounts, authentication payloads, and role metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
/// Database representation of an account.
pub struct User {
    pub id: String,
    /// Immutable email used for login.
    pub email: String,
    /// Argon2 hash of the user's password.
    pub password_hash: String,
    pub full_name: String,
    /// Role describing the user's privileges.
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Closed set of role claim values. Route declarations name an allow-list
/// over this enum, so adding a variant forces every declaration to be
/// revisited at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Default)]
#[sqlx(type_name = "TEXT", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    Student,
    Instructor,
    Admin,
    SuperAdmin,
}

impl Role {
    /// Returns the canonical wire representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "STUDENT",
            Role::Instructor => "INSTRUCTOR",
            Role::Admin => "ADMIN",
            Role::SuperAdmin => "SUPER_ADMIN",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "STUDENT" => Some(Role::Student),
            "INSTRUCTOR" => Some(Role::Instructor),
            "ADMIN" => Some(Role::Admin),
            "SUPER_ADMIN" => Some(Role::SuperAdmin),
            _ => None,
        }
    }
}

impl Serialize for Role {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Role::parse(&s).ok_or_else(|| {
            serde::de::Error::unknown_variant(
                &s,
                &["STUDENT", "INSTRUCTOR", "ADMIN", "SUPER_ADMIN"],
            )
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
/// Credentials submitted by a user attempting to authenticate.
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
    /// Keep the session across browser/process restarts.
    #[serde(default)]
    pub remember: bool,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
/// Payload for creating a new student account.
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(min = 1))]
    pub full_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
/// Access token returned after a successful login, register, or refresh.
/// The rotation token never appears here; it travels only in the cookie.
pub struct LoginResponse {
    pub access_token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, Deserialize)]
/// Public-facing representation of a user returned by the API.
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
        }
    }
}

impl User {
    /// Constructs a new user with freshly generated identifiers.
    pub fn new(email: String, password_hash: String, full_name: String, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            email,
            password_hash,
            full_name,
            role,
            created_at: now,
            updated_at: now,
        }
    }
}
