use async_graphql::{Context, Object, Result};

use crate::db::CreateLink;
use crate::graphql::auth::{AuthExt, AuthGuard};
use crate::graphql::context::RequestContextExt;
use crate::graphql::types::{Link, internal_error};
use crate::services::HubEvent;

#[derive(Default)]
pub struct LinkMutations;

#[Object]
impl LinkMutations {
    /// Post a new link as the signed-in user and announce it to `newLink` subscribers
    #[graphql(guard = "AuthGuard")]
    async fn post(&self, ctx: &Context<'_>, url: String, description: String) -> Result<Link> {
        let caller_id = ctx.caller_id()?;
        let context = ctx.request_context()?;

        let link = context
            .db
            .links()
            .create(CreateLink {
                description,
                url,
                posted_by_id: Some(caller_id),
            })
            .await
            .map_err(internal_error)?;

        context.pubsub.publish(HubEvent::NewLink(link.clone()));
        Ok(Link(link))
    }
}
