//! API client for the courseware backend.
//!
//! The gateway attaches the current access token to every call and recovers
//! from a single authentication failure per call by coordinating one shared
//! token refresh; everything else is surfaced to the caller untouched.

pub mod gateway;
pub mod refresh;
pub mod token_store;
pub mod types;

pub use gateway::ApiClient;
pub use refresh::{RefreshCoordinator, RefreshTransport};
pub use token_store::{Session, TokenStore};
pub use types::ApiError;
