//! GraphQL API: schema, resolvers, per-request context and transport routes

pub mod auth;
pub mod context;
pub mod document;
pub mod mutations;
pub mod operation_log;
pub mod queries;
pub mod routes;
pub mod schema;
pub mod subscriptions;
pub mod types;

pub use auth::{CredentialExtractor, InvalidCredential};
pub use context::{ContextFactory, InboundRequest, RequestContext};
pub use document::{SchemaDocument, SchemaLoadError};
pub use operation_log::OperationLogConfig;
pub use schema::{HackerNewsSchema, build_schema};
