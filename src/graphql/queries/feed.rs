use async_graphql::{Context, ErrorExtensions, ID, Object, Result};
use serde_json::json;

use crate::db::FeedQuery;
use crate::graphql::context::RequestContextExt;
use crate::graphql::types::{Feed, Link, LinkOrderByInput, internal_error};

/// Largest page the feed hands out
const MAX_TAKE: i32 = 100;

#[derive(Default)]
pub struct FeedQueries;

#[Object]
impl FeedQueries {
    async fn info(&self) -> &'static str {
        "This is the API of a Hackernews Clone"
    }

    /// Links matching `filter` in description or url, paged with `skip`/`take`
    async fn feed(
        &self,
        ctx: &Context<'_>,
        filter: Option<String>,
        skip: Option<i32>,
        take: Option<i32>,
        order_by: Option<LinkOrderByInput>,
    ) -> Result<Feed> {
        if skip.is_some_and(|s| s < 0) || take.is_some_and(|t| t < 0) {
            return Err(async_graphql::Error::new("skip and take must not be negative")
                .extend_with(|_, e| e.set("code", "BAD_USER_INPUT")));
        }

        let id = format!(
            "main-feed:{}",
            json!({ "filter": filter, "skip": skip, "take": take, "orderBy": order_by })
        );

        let db = &ctx.request_context()?.db;
        let query = FeedQuery {
            filter: filter.clone(),
            skip: skip.unwrap_or(0).into(),
            take: Some(take.unwrap_or(MAX_TAKE).min(MAX_TAKE).into()),
            order: order_by.unwrap_or_default().into(),
        };

        let links = db.links().feed(&query).await.map_err(internal_error)?;
        let count = db
            .links()
            .count(filter.as_deref())
            .await
            .map_err(internal_error)?;

        Ok(Feed {
            id: ID(id),
            links: links.into_iter().map(Link).collect(),
            count: i32::try_from(count).map_err(internal_error)?,
        })
    }
}
