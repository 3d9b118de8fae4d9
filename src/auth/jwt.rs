//! JWT Token Service
//! Mission: Issue and verify signed, time-limited identity tokens

use crate::auth::models::{Identity, TokenClaims};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use tracing::debug;

/// Token lifetime used by the login endpoints.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// Signs and verifies HS256 tokens with a server-held secret.
///
/// The secret is never exposed: there is no accessor and no `Debug` impl.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

/// A freshly issued token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: usize, // seconds
}

/// Why a token was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// Signature does not match the payload under our secret.
    InvalidSignature,
    /// Signature is fine but `exp` has passed.
    Expired,
    /// Not a decodable token at all.
    Malformed,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::InvalidSignature => write!(f, "Invalid token signature"),
            TokenError::Expired => write!(f, "Token has expired"),
            TokenError::Malformed => write!(f, "Malformed token"),
        }
    }
}

impl std::error::Error for TokenError {}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}

impl TokenService {
    /// Create a token service with the default one-hour lifetime
    pub fn new(secret: &str) -> Self {
        Self::with_ttl(secret, Duration::seconds(DEFAULT_TOKEN_TTL_SECS))
    }

    pub fn with_ttl(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Configured lifetime for newly issued tokens
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `identity` that expires `ttl` from now
    pub fn issue(&self, identity: &Identity, ttl: Duration) -> Result<IssuedToken> {
        self.issue_at(identity, ttl, Utc::now())
    }

    /// Issue a token as if it were `issued_at`
    pub fn issue_at(
        &self,
        identity: &Identity,
        ttl: Duration,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken> {
        let expiration = issued_at
            .checked_add_signed(ttl)
            .context("Invalid token expiration")?;

        let claims = TokenClaims {
            identity: identity.clone(),
            iat: issued_at.timestamp().max(0) as usize,
            exp: expiration.timestamp().max(0) as usize,
        };

        debug!(
            "Issuing token for {} ({}), expires in {}s",
            identity.email,
            identity.id,
            ttl.num_seconds()
        );

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("Failed to sign token")?;

        Ok(IssuedToken {
            token,
            expires_in: ttl.num_seconds().max(0) as usize,
        })
    }

    /// Verify signature then expiry, and only then hand out the claims
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let decoded = decode::<TokenClaims>(token, &self.decoding_key, &validation)?;

        debug!("Verified token for {}", decoded.claims.identity.email);

        Ok(decoded.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Role;
    use uuid::Uuid;

    fn identity() -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            username: Some("a@x.com".to_string()),
            role: Some(Role::User),
        }
    }

    fn swap_char(s: &str, index: usize) -> String {
        let mut chars: Vec<char> = s.chars().collect();
        chars[index] = if chars[index] == 'A' { 'B' } else { 'A' };
        chars.into_iter().collect()
    }

    #[test]
    fn test_issue_then_verify_returns_same_identity() {
        let service = TokenService::new("test-secret-key-12345");
        let input = identity();

        let issued = service.issue(&input, service.ttl()).unwrap();
        assert_eq!(issued.expires_in, 3600);
        assert_eq!(issued.token.split('.').count(), 3);

        let claims = service.verify(&issued.token).unwrap();
        assert_eq!(claims.identity, input);
        assert!(claims.exp > Utc::now().timestamp() as usize);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_identity_without_optional_claims_round_trips() {
        let service = TokenService::new("test-secret-key-12345");
        let input = Identity {
            username: None,
            role: None,
            ..identity()
        };

        let issued = service.issue(&input, Duration::minutes(5)).unwrap();
        assert_eq!(service.verify(&issued.token).unwrap().identity, input);
    }

    #[test]
    fn test_token_past_ttl_is_expired() {
        let service = TokenService::new("test-secret-key-12345");
        let issued_at = Utc::now() - Duration::hours(2);

        let issued = service
            .issue_at(&identity(), Duration::hours(1), issued_at)
            .unwrap();

        assert_eq!(service.verify(&issued.token), Err(TokenError::Expired));
    }

    #[test]
    fn test_altered_signature_is_rejected() {
        let service = TokenService::new("test-secret-key-12345");
        let issued = service.issue(&identity(), service.ttl()).unwrap();
        let signature_start = issued.token.rfind('.').unwrap() + 1;

        for index in [signature_start, signature_start + 10, issued.token.len() - 1] {
            let tampered = swap_char(&issued.token, index);
            assert_eq!(
                service.verify(&tampered),
                Err(TokenError::InvalidSignature),
                "tampered at {}",
                index
            );
        }
    }

    #[test]
    fn test_altered_signature_on_expired_token_is_invalid_not_expired() {
        let service = TokenService::new("test-secret-key-12345");
        let issued = service
            .issue_at(&identity(), Duration::hours(1), Utc::now() - Duration::hours(3))
            .unwrap();

        let tampered = swap_char(&issued.token, issued.token.len() - 1);
        assert_eq!(service.verify(&tampered), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_forged_role_is_rejected() {
        let service = TokenService::new("test-secret-key-12345");
        let issued = service.issue(&identity(), service.ttl()).unwrap();
        let forged = service
            .issue(
                &Identity {
                    role: Some(Role::Vendor),
                    ..identity()
                },
                service.ttl(),
            )
            .unwrap();

        // Vendor payload spliced onto the user token's signature
        let mut parts: Vec<&str> = issued.token.split('.').collect();
        let forged_payload = forged.token.split('.').nth(1).unwrap();
        parts[1] = forged_payload;

        assert_eq!(
            service.verify(&parts.join(".")),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_different_secrets_reject() {
        let service1 = TokenService::new("secret1");
        let service2 = TokenService::new("secret2");

        let issued = service1.issue(&identity(), service1.ttl()).unwrap();
        assert_eq!(
            service2.verify(&issued.token),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_garbage_is_malformed() {
        let service = TokenService::new("test-secret-key-12345");
        assert_eq!(service.verify("a@x.com"), Err(TokenError::Malformed));
        assert_eq!(service.verify(""), Err(TokenError::Malformed));
    }
}
