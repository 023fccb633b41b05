pub mod auth;

pub use auth::{AuthUser, Claims, JwtAuthMiddleware, JwtVerifier};
