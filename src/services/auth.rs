//! Authentication service for password hashing and JWT handling
//!
//! Provides:
//! - Password hashing with bcrypt
//! - Token issuing and decoding (HS256, `{ userId, iat, exp }` claims)

use anyhow::{Result, anyhow};
use bcrypt::{hash, verify};
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::Config;

// ============================================================================
// JWT Claims
// ============================================================================

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Caller identifier
    #[serde(rename = "userId")]
    pub user_id: i64,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

// ============================================================================
// Configuration
// ============================================================================

/// Auth service configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JWT signing secret
    pub jwt_secret: String,
    /// Token lifetime in seconds (default: 7 days)
    pub token_lifetime: i64,
    /// Bcrypt cost factor (default: 10)
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production".to_string(),
            token_lifetime: 7 * 24 * 60 * 60,
            bcrypt_cost: 10,
        }
    }
}

impl From<&Config> for AuthConfig {
    fn from(config: &Config) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
            token_lifetime: config.token_lifetime_secs,
            bcrypt_cost: config.bcrypt_cost,
        }
    }
}

// ============================================================================
// Auth Service
// ============================================================================

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    /// Create a new auth service
    pub fn new(config: AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Hash a password with bcrypt
    pub fn hash_password(&self, password: &str) -> Result<String> {
        hash(password, self.config.bcrypt_cost)
            .map_err(|e| anyhow!("Failed to hash password: {}", e))
    }

    /// Verify a password against a hash
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        verify(password, hash).map_err(|e| anyhow!("Failed to verify password: {}", e))
    }

    /// Issue a signed token for a user
    pub fn issue_token(&self, user_id: i64) -> Result<String> {
        let now = Utc::now();
        let expires_at = TimeDelta::try_seconds(self.config.token_lifetime)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                anyhow!("Token lifetime out of range: {}s", self.config.token_lifetime)
            })?;
        let claims = TokenClaims {
            user_id,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow!("Failed to create token: {}", e))
    }

    /// Verify signature and expiry, returning the claims
    pub fn decode_token(&self, token: &str) -> jsonwebtoken::errors::Result<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;

        decode::<TokenClaims>(token, &self.decoding_key, &validation).map(|data| data.claims)
    }
}

#[cfg(test)]
pub(crate) fn test_auth_service() -> AuthService {
    AuthService::new(AuthConfig {
        jwt_secret: "test-secret".to_string(),
        token_lifetime: 60,
        bcrypt_cost: 4,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_roundtrip() {
        let auth = test_auth_service();
        let hashed = auth.hash_password("hunter2").unwrap();
        assert_ne!(hashed, "hunter2");
        assert!(auth.verify_password("hunter2", &hashed).unwrap());
        assert!(!auth.verify_password("hunter3", &hashed).unwrap());
    }

    #[test]
    fn test_token_carries_user_id() {
        let auth = test_auth_service();
        let token = auth.issue_token(42).unwrap();
        let claims = auth.decode_token(&token).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let other = AuthService::new(AuthConfig {
            jwt_secret: "another-secret".to_string(),
            ..AuthConfig::default()
        });
        let token = other.issue_token(42).unwrap();
        assert!(test_auth_service().decode_token(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let auth = AuthService::new(AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_lifetime: -3600,
            bcrypt_cost: 4,
        });
        let token = auth.issue_token(42).unwrap();
        assert!(auth.decode_token(&token).is_err());
    }

    #[test]
    fn test_out_of_range_lifetime_is_an_error() {
        let auth = AuthService::new(AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_lifetime: 1_000_000_000_000_000,
            bcrypt_cost: 4,
        });
        assert!(auth.issue_token(1).is_err());
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(test_auth_service().decode_token("garbage").is_err());
    }
}
