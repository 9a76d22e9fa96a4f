//! HTTP middleware

pub mod auth;

pub use auth::{auth_middleware, authorize_admin, decode_token, AuthUser, Claims, CurrentUser};
