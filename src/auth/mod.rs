//! Authentication Module
//! Mission: Bearer-token login for users and vendors, stateless verification

pub mod api;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod user_store;

pub use api::AuthState;
pub use jwt::{TokenError, TokenService};
pub use middleware::auth_middleware;
pub use models::{Identity, Role, TokenClaims};
pub use user_store::UserStore;
