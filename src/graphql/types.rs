//! GraphQL type definitions
//!
//! Object types wrap database records and resolve their relations through the
//! [RequestContext](super::context::RequestContext) database handle.

use async_graphql::{Context, Enum, ErrorExtensions, ID, InputObject, Object, Result, SimpleObject};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::{LinkOrder, LinkRecord, SortDirection, UserRecord, VoteRecord};

use super::context::RequestContextExt;

/// Error for unexpected persistence failures
pub(crate) fn internal_error(e: impl std::fmt::Display) -> async_graphql::Error {
    tracing::error!(error = %e, "Resolver failed");
    async_graphql::Error::new(e.to_string()).extend_with(|_, e| e.set("code", "INTERNAL"))
}

/// Parse a GraphQL ID into a numeric database ID
pub(crate) fn parse_id(id: &ID) -> Result<i64> {
    id.parse::<i64>().map_err(|_| {
        async_graphql::Error::new(format!("Invalid ID: {}", id.as_str()))
            .extend_with(|_, e| e.set("code", "BAD_USER_INPUT"))
    })
}

// ============================================================================
// Ordering
// ============================================================================

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum, Serialize)]
#[graphql(rename_items = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Sort {
    Asc,
    Desc,
}

impl From<Sort> for SortDirection {
    fn from(sort: Sort) -> Self {
        match sort {
            Sort::Asc => SortDirection::Asc,
            Sort::Desc => SortDirection::Desc,
        }
    }
}

/// Feed ordering; set fields apply in the order description, url, createdAt
#[derive(Debug, Clone, Copy, Default, InputObject, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkOrderByInput {
    pub description: Option<Sort>,
    pub url: Option<Sort>,
    pub created_at: Option<Sort>,
}

impl From<LinkOrderByInput> for LinkOrder {
    fn from(input: LinkOrderByInput) -> Self {
        Self {
            description: input.description.map(Into::into),
            url: input.url.map(Into::into),
            created_at: input.created_at.map(Into::into),
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A registered user
#[derive(Debug, Clone)]
pub struct User(pub UserRecord);

#[Object]
impl User {
    async fn id(&self) -> ID {
        ID(self.0.id.to_string())
    }

    async fn name(&self) -> &str {
        &self.0.name
    }

    async fn email(&self) -> &str {
        &self.0.email
    }

    /// Links posted by this user
    async fn links(&self, ctx: &Context<'_>) -> Result<Vec<Link>> {
        let db = &ctx.request_context()?.db;
        let records = db
            .links()
            .list_by_user(self.0.id)
            .await
            .map_err(internal_error)?;
        Ok(records.into_iter().map(Link).collect())
    }
}

/// A posted link
#[derive(Debug, Clone)]
pub struct Link(pub LinkRecord);

#[Object]
impl Link {
    async fn id(&self) -> ID {
        ID(self.0.id.to_string())
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.0.created_at
    }

    async fn description(&self) -> &str {
        &self.0.description
    }

    async fn url(&self) -> &str {
        &self.0.url
    }

    /// The user who posted the link, if it was posted by a signed-in user
    async fn posted_by(&self, ctx: &Context<'_>) -> Result<Option<User>> {
        let Some(user_id) = self.0.posted_by_id else {
            return Ok(None);
        };
        let db = &ctx.request_context()?.db;
        let record = db.users().get_by_id(user_id).await.map_err(internal_error)?;
        Ok(record.map(User))
    }

    async fn votes(&self, ctx: &Context<'_>) -> Result<Vec<Vote>> {
        let db = &ctx.request_context()?.db;
        let records = db
            .votes()
            .list_by_link(self.0.id)
            .await
            .map_err(internal_error)?;
        Ok(records.into_iter().map(Vote).collect())
    }
}

/// One user's vote for one link
#[derive(Debug, Clone)]
pub struct Vote(pub VoteRecord);

#[Object]
impl Vote {
    async fn id(&self) -> ID {
        ID(self.0.id.to_string())
    }

    async fn link(&self, ctx: &Context<'_>) -> Result<Link> {
        let db = &ctx.request_context()?.db;
        db.links()
            .get_by_id(self.0.link_id)
            .await
            .map_err(internal_error)?
            .map(Link)
            .ok_or_else(|| internal_error(format!("Link {} missing", self.0.link_id)))
    }

    async fn user(&self, ctx: &Context<'_>) -> Result<User> {
        let db = &ctx.request_context()?.db;
        db.users()
            .get_by_id(self.0.user_id)
            .await
            .map_err(internal_error)?
            .map(User)
            .ok_or_else(|| internal_error(format!("User {} missing", self.0.user_id)))
    }
}

/// One page of links plus the total number of matches
#[derive(Debug, Clone, SimpleObject)]
pub struct Feed {
    pub id: ID,
    pub links: Vec<Link>,
    pub count: i32,
}

/// Result of signup or login
#[derive(Debug, Clone, SimpleObject)]
pub struct AuthPayload {
    pub token: Option<String>,
    pub user: Option<User>,
}
