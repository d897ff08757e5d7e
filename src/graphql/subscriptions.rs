//! GraphQL subscriptions for real-time updates
//!
//! Subscriptions allow clients to receive push updates over WebSocket. Each stream
//! starts at the moment of subscription; earlier events are not replayed.

use async_graphql::{Context, Result, Subscription};
use futures::Stream;
use tokio_stream::StreamExt;

use crate::services::{HubEvent, Topic};

use super::context::RequestContextExt;
use super::types::{Link, Vote};

#[derive(Default)]
pub struct SubscriptionRoot;

#[Subscription(name = "Subscription")]
impl SubscriptionRoot {
    /// Links posted after the subscription started
    async fn new_link(&self, ctx: &Context<'_>) -> Result<impl Stream<Item = Link>> {
        let pubsub = &ctx.request_context()?.pubsub;

        Ok(pubsub
            .subscribe(Topic::NewLink)
            .filter_map(|event| match event {
                HubEvent::NewLink(link) => Some(Link(link)),
                _ => None,
            }))
    }

    /// Votes cast after the subscription started
    async fn new_vote(&self, ctx: &Context<'_>) -> Result<impl Stream<Item = Vote>> {
        let pubsub = &ctx.request_context()?.pubsub;

        Ok(pubsub
            .subscribe(Topic::NewVote)
            .filter_map(|event| match event {
                HubEvent::NewVote(vote) => Some(Vote(vote)),
                _ => None,
            }))
    }
}
