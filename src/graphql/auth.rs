//! GraphQL authentication
//!
//! Turns an `Authorization` header into a caller identifier and exposes that identifier to
//! resolvers.
//!
//! ## Guards
//!
//! Use `AuthGuard` to require authentication on any GraphQL operation:
//!
//! ```ignore
//! #[graphql(guard = "AuthGuard")]
//! async fn post(&self, ctx: &Context<'_>, url: String) -> Result<Link> { ... }
//! ```

use async_graphql::{Context, ErrorExtensions, Result};
use thiserror::Error;

use crate::services::AuthService;

use super::context::RequestContextExt;

/// Why a presented credential could not be turned into a caller identifier
#[derive(Debug, Error)]
pub enum InvalidCredential {
    #[error("authorization header is not valid text")]
    NotText,
    #[error("no token found")]
    MissingToken,
    #[error("invalid token: {0}")]
    Malformed(#[from] jsonwebtoken::errors::Error),
}

/// Derives a caller identifier from an `Authorization` header value.
///
/// Only called when the header is present; an absent header means an anonymous caller.
pub trait CredentialExtractor: Send + Sync {
    fn extract(&self, authorization: &str) -> Result<i64, InvalidCredential>;
}

impl CredentialExtractor for AuthService {
    fn extract(&self, authorization: &str) -> Result<i64, InvalidCredential> {
        let token = bearer_token(authorization)?;
        let claims = self.decode_token(token).inspect_err(|e| {
            tracing::debug!(error = %e, "Token verification failed");
        })?;
        Ok(claims.user_id)
    }
}

/// The token part of `Bearer <token>`. A value without the scheme is taken as the token.
pub fn bearer_token(authorization: &str) -> Result<&str, InvalidCredential> {
    let token = authorization
        .trim()
        .strip_prefix("Bearer ")
        .unwrap_or(authorization)
        .trim();
    if token.is_empty() || token == "Bearer" {
        return Err(InvalidCredential::MissingToken);
    }
    Ok(token)
}

/// Error returned to clients whose credential was rejected
pub fn unauthenticated(message: impl Into<String>) -> async_graphql::Error {
    async_graphql::Error::new(message).extend_with(|_, e| e.set("code", "UNAUTHENTICATED"))
}

/// Extension trait to get the authenticated caller from GraphQL context
pub trait AuthExt {
    /// Get the caller identifier, or return an error if the caller is anonymous
    fn caller_id(&self) -> Result<i64>;
}

impl<'a> AuthExt for Context<'a> {
    fn caller_id(&self) -> Result<i64> {
        self.request_context()?
            .caller_id
            .ok_or_else(|| unauthenticated("Not authenticated"))
    }
}

/// Guard that requires authentication for GraphQL operations.
pub struct AuthGuard;

impl async_graphql::Guard for AuthGuard {
    fn check(&self, ctx: &Context<'_>) -> impl std::future::Future<Output = Result<()>> + Send {
        let result = ctx.caller_id().map(|_| ());
        async move { result }
    }
}
