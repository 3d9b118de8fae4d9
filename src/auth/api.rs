//! Authentication API Endpoints
//! Mission: Signup, role-specific login, and identity echo

use crate::auth::{
    jwt::TokenService,
    middleware::extract_claims,
    models::{CredentialsRequest, Identity, LoginResponse, MessageResponse, Role},
    user_store::UserStore,
};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared auth state
#[derive(Clone)]
pub struct AuthState {
    pub user_store: Arc<UserStore>,
    pub tokens: Arc<TokenService>,
}

impl AuthState {
    pub fn new(user_store: Arc<UserStore>, tokens: Arc<TokenService>) -> Self {
        Self { user_store, tokens }
    }
}

/// Signup endpoint - POST /api/signup
pub async fn signup(
    State(state): State<AuthState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<MessageResponse>, AuthApiError> {
    let (email, password) = payload.required().ok_or(AuthApiError::MissingCredentials)?;
    let email = email.trim();

    let created = state
        .user_store
        .insert_if_absent(Role::User, email, password, None)
        .map_err(|e| {
            error!("Signup failed: {:#}", e);
            AuthApiError::InternalError
        })?;

    if created.is_none() {
        return Err(AuthApiError::EmailTaken);
    }

    info!("Registered user {}", email);
    Ok(Json(MessageResponse::new("User registered successfully!")))
}

/// User login endpoint - POST /api/login/user
pub async fn login_user(
    State(state): State<AuthState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<LoginResponse>, AuthApiError> {
    login(&state, Role::User, &payload)
}

/// Vendor login endpoint - POST /api/login/vendor
pub async fn login_vendor(
    State(state): State<AuthState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<LoginResponse>, AuthApiError> {
    login(&state, Role::Vendor, &payload)
}

fn login(
    state: &AuthState,
    role: Role,
    payload: &CredentialsRequest,
) -> Result<Json<LoginResponse>, AuthApiError> {
    let (email, password) = payload.required().ok_or(AuthApiError::MissingCredentials)?;

    let account = state
        .user_store
        .authenticate(role, email, password)
        .map_err(|e| {
            error!("Credential check failed: {:#}", e);
            AuthApiError::InternalError
        })?
        .ok_or_else(|| {
            warn!("Failed {} login attempt: {}", role.as_str(), email);
            AuthApiError::InvalidCredentials
        })?;

    let identity = account.identity();
    let issued = state
        .tokens
        .issue(&identity, state.tokens.ttl())
        .map_err(|e| {
            error!("Token issuance failed: {:#}", e);
            AuthApiError::InternalError
        })?;

    info!("Login successful: {} ({})", account.email, role.as_str());

    Ok(Json(LoginResponse {
        message: "Login successful!".to_string(),
        token: issued.token,
        username: identity.username,
        role,
        expires_in: issued.expires_in,
    }))
}

/// Current identity - GET /api/auth/me (behind auth middleware)
pub async fn get_current_user(req: Request) -> Result<Json<Identity>, AuthApiError> {
    let claims = extract_claims(&req).ok_or(AuthApiError::Unauthorized)?;
    Ok(Json(claims.identity.clone()))
}

/// Auth API errors
#[derive(Debug)]
pub enum AuthApiError {
    MissingCredentials,
    InvalidCredentials,
    EmailTaken,
    Unauthorized,
    InternalError,
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthApiError::MissingCredentials => {
                (StatusCode::BAD_REQUEST, "Email and password are required.")
            }
            // Same answer for unknown email and wrong password
            AuthApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid email or password")
            }
            AuthApiError::EmailTaken => (StatusCode::BAD_REQUEST, "Email already exists."),
            AuthApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthApiError::InternalError => (StatusCode::INTERNAL_SERVER_ERROR, "Server error"),
        };

        (status, Json(MessageResponse::new(message))).into_response()
    }
}
