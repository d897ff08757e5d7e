//! GraphQL schema assembly
//!
//! Resolvers find per-request state ([RequestContext](super::context::RequestContext)) in
//! the request data and process-wide services in the schema data.

use async_graphql::Schema;
use async_graphql::extensions::Tracing;

use crate::services::AuthService;

use super::mutations::MutationRoot;
use super::operation_log::ConnectionOperationLog;
use super::queries::QueryRoot;
use super::subscriptions::SubscriptionRoot;

/// The GraphQL schema type
pub type HackerNewsSchema = Schema<QueryRoot, MutationRoot, SubscriptionRoot>;

/// Build the GraphQL schema with all resolvers
pub fn build_schema(auth: AuthService) -> HackerNewsSchema {
    Schema::build(
        QueryRoot::default(),
        MutationRoot::default(),
        SubscriptionRoot,
    )
    .data(auth)
    .extension(Tracing)
    .extension(ConnectionOperationLog)
    .finish()
}
