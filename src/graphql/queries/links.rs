use async_graphql::{Context, ID, Object, Result};

use crate::graphql::context::RequestContextExt;
use crate::graphql::types::{Link, internal_error, parse_id};

#[derive(Default)]
pub struct LinkQueries;

#[Object]
impl LinkQueries {
    /// A single link by ID
    async fn link(&self, ctx: &Context<'_>, id: ID) -> Result<Option<Link>> {
        let id = parse_id(&id)?;
        let db = &ctx.request_context()?.db;
        let record = db.links().get_by_id(id).await.map_err(internal_error)?;
        Ok(record.map(Link))
    }
}
