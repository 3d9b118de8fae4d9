//! Authentication Models
//! Mission: Accounts, roles, token claims and the login/signup wire types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored account (user or vendor)
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub password_hash: String, // bcrypt hash - never serialize
    pub role: Role,
    pub created_at: String,
}

impl Account {
    /// Identity embedded in tokens issued for this account.
    ///
    /// Vendor tokens never carried a display name, so only user accounts
    /// get one (falling back to the email).
    pub fn identity(&self) -> Identity {
        let username = match self.role {
            Role::User => Some(
                self.username
                    .clone()
                    .unwrap_or_else(|| self.email.clone()),
            ),
            Role::Vendor => None,
        };

        Identity {
            id: self.id,
            email: self.email.clone(),
            username,
            role: Some(self.role),
        }
    }
}

/// Account roles; each has its own login endpoint and dashboard
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "vendor")]
    Vendor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Vendor => "vendor",
        }
    }

    /// Exact match only; anything else is an unknown role.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "vendor" => Some(Role::Vendor),
            _ => None,
        }
    }
}

/// Identity claims carried by a token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// Full JWT payload: identity plus registered time claims
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    #[serde(flatten)]
    pub identity: Identity,
    pub iat: usize,
    pub exp: usize, // expiration timestamp (seconds)
}

/// Login / signup request body
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl CredentialsRequest {
    /// Both fields present and non-empty.
    pub fn required(&self) -> Option<(&str, &str)> {
        let email = self.email.as_deref().filter(|e| !e.trim().is_empty())?;
        let password = self.password.as_deref().filter(|p| !p.is_empty())?;
        Some((email, password))
    }
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub role: Role,
    pub expires_in: usize, // seconds until expiration
}

/// Plain `{ "message": ... }` body
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
