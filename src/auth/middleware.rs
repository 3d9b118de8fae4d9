//! Authentication Middleware
//! Mission: Protect API endpoints with bearer token validation

use crate::auth::{
    jwt::{TokenError, TokenService},
    models::{MessageResponse, TokenClaims},
};
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::warn;

/// Auth middleware that requires a valid bearer token
pub async fn auth_middleware(
    State(tokens): State<Arc<TokenService>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(req.headers()).ok_or(AuthError::MissingToken)?;

    let claims = tokens.verify(token).map_err(|e| {
        warn!(path = %req.uri().path(), reason = %e, "Rejected bearer token");
        AuthError::InvalidToken(e)
    })?;

    // Handlers read the verified identity from here
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Token from `Authorization: Bearer <token>`, if there is a non-empty one
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Extract claims from request (use after auth middleware)
pub fn extract_claims(req: &Request) -> Option<&TokenClaims> {
    req.extensions().get::<TokenClaims>()
}

/// Auth error types
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken(TokenError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // Expired and forged tokens get the same answer
        let (status, message) = match self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "No token provided"),
            AuthError::InvalidToken(_) => (StatusCode::FORBIDDEN, "Invalid token"),
        };

        (status, Json(MessageResponse::new(message))).into_response()
    }
}
