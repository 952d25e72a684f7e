pub mod auth;

pub use auth::{auth_gate, optional_auth_gate, AuthenticatedUser, Caller, RouteRoles};
