//! GraphQL authentication mutations
//!
//! Neither mutation requires authentication; both answer with a fresh token.

use async_graphql::{Context, ErrorExtensions, Object, Result};

use crate::db::CreateUser;
use crate::graphql::auth::unauthenticated;
use crate::graphql::context::RequestContextExt;
use crate::graphql::types::{AuthPayload, User, internal_error};
use crate::services::AuthService;

#[derive(Default)]
pub struct AuthMutations;

#[Object]
impl AuthMutations {
    /// Register a new user account
    async fn signup(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
        name: String,
    ) -> Result<Option<AuthPayload>> {
        let auth = ctx.data::<AuthService>()?;
        let db = &ctx.request_context()?.db;

        let password_hash = auth.hash_password(&password).map_err(internal_error)?;
        let user = db
            .users()
            .create(CreateUser {
                name,
                email,
                password_hash,
            })
            .await
            .map_err(internal_error)?
            .ok_or_else(|| {
                async_graphql::Error::new("Email already registered")
                    .extend_with(|_, e| e.set("code", "CONFLICT"))
            })?;

        let token = auth.issue_token(user.id).map_err(internal_error)?;
        tracing::info!(user_id = user.id, "User signed up");

        Ok(Some(AuthPayload {
            token: Some(token),
            user: Some(User(user)),
        }))
    }

    /// Authenticate with email and password
    async fn login(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
    ) -> Result<Option<AuthPayload>> {
        let auth = ctx.data::<AuthService>()?;
        let db = &ctx.request_context()?.db;

        let user = db
            .users()
            .get_by_email(&email)
            .await
            .map_err(internal_error)?
            .ok_or_else(|| unauthenticated("No such user found"))?;

        if !auth
            .verify_password(&password, &user.password)
            .map_err(internal_error)?
        {
            tracing::info!(user_id = user.id, "Login rejected");
            return Err(unauthenticated("Invalid password"));
        }

        let token = auth.issue_token(user.id).map_err(internal_error)?;

        Ok(Some(AuthPayload {
            token: Some(token),
            user: Some(User(user)),
        }))
    }
}
