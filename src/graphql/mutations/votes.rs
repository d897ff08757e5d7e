use async_graphql::{Context, ErrorExtensions, ID, Object, Result};

use crate::graphql::auth::{AuthExt, AuthGuard};
use crate::graphql::context::RequestContextExt;
use crate::graphql::types::{Vote, internal_error, parse_id};
use crate::services::HubEvent;

fn already_voted(link_id: i64) -> async_graphql::Error {
    async_graphql::Error::new(format!("Already voted for link: {}", link_id))
        .extend_with(|_, e| e.set("code", "CONFLICT"))
}

#[derive(Default)]
pub struct VoteMutations;

#[Object]
impl VoteMutations {
    /// Vote for a link as the signed-in user and announce it to `newVote` subscribers
    #[graphql(guard = "AuthGuard")]
    async fn vote(&self, ctx: &Context<'_>, link_id: ID) -> Result<Option<Vote>> {
        let caller_id = ctx.caller_id()?;
        let link_id = parse_id(&link_id)?;
        let context = ctx.request_context()?;
        let db = &context.db;

        if db
            .links()
            .get_by_id(link_id)
            .await
            .map_err(internal_error)?
            .is_none()
        {
            return Err(async_graphql::Error::new(format!("No such link: {}", link_id))
                .extend_with(|_, e| e.set("code", "NOT_FOUND")));
        }

        if db
            .votes()
            .find(link_id, caller_id)
            .await
            .map_err(internal_error)?
            .is_some()
        {
            return Err(already_voted(link_id));
        }

        // A concurrent vote can still win the race; the unique constraint catches it
        let vote = db
            .votes()
            .create(link_id, caller_id)
            .await
            .map_err(internal_error)?
            .ok_or_else(|| already_voted(link_id))?;

        context.pubsub.publish(HubEvent::NewVote(vote));
        Ok(Some(Vote(vote)))
    }
}
