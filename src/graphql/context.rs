//! Per-request execution context.
//!
//! A [RequestContext] is assembled once for every inbound operation (or WebSocket
//! connection) by the [ContextFactory] and handed to every resolver through the
//! `async_graphql` request data.

use std::sync::Arc;

use async_graphql::{Context, ErrorExtensions, Result};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use serde_json::Value as JsonValue;

use crate::db::Database;
use crate::services::PubSub;

use super::auth::{CredentialExtractor, InvalidCredential};
use super::operation_log::{OperationLogConfig, log_operation};

/// The raw fields of an inbound GraphQL request
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    pub headers: HeaderMap,
    pub query: String,
    pub operation_name: Option<String>,
    pub variables: JsonValue,
}

impl InboundRequest {
    /// Capture headers and body of an HTTP GraphQL request
    pub fn from_graphql(headers: HeaderMap, request: &async_graphql::Request) -> Self {
        Self {
            headers,
            query: request.query.clone(),
            operation_name: request.operation_name.clone(),
            variables: serde_json::to_value(&request.variables).unwrap_or_default(),
        }
    }

    /// Non-empty `Authorization` header value, if any
    fn authorization(&self) -> Option<Result<&str, InvalidCredential>> {
        let value = self.headers.get(AUTHORIZATION)?;
        if value.is_empty() {
            return None;
        }
        Some(value.to_str().map_err(|_| InvalidCredential::NotText))
    }
}

/// Everything a resolver may need for one request
#[derive(Clone)]
pub struct RequestContext {
    pub request: InboundRequest,
    pub db: Database,
    pub pubsub: PubSub,
    /// `None` for anonymous callers
    pub caller_id: Option<i64>,
}

/// Builds a [RequestContext] for each request from the process-wide handles
#[derive(Clone)]
pub struct ContextFactory {
    db: Database,
    pubsub: PubSub,
    credentials: Arc<dyn CredentialExtractor>,
    log: OperationLogConfig,
}

impl ContextFactory {
    pub fn new(
        db: Database,
        pubsub: PubSub,
        credentials: Arc<dyn CredentialExtractor>,
        log: OperationLogConfig,
    ) -> Self {
        Self {
            db,
            pubsub,
            credentials,
            log,
        }
    }

    /// Assemble the context for one operation.
    ///
    /// The caller is anonymous when no `Authorization` header is present. A header that is
    /// present but does not decode fails the whole request. The operation is logged only
    /// after the credential has been accepted.
    pub fn build(&self, request: InboundRequest) -> Result<RequestContext, InvalidCredential> {
        let caller_id = self.resolve_caller(&request)?;
        log_operation(
            self.log,
            request.operation_name.as_deref(),
            &request.query,
            &request.variables,
        );

        Ok(RequestContext {
            request,
            db: self.db.clone(),
            pubsub: self.pubsub.clone(),
            caller_id,
        })
    }

    /// Assemble the context for a WebSocket connection. Operations arrive later over the
    /// socket and are logged as they arrive, so nothing is logged here.
    pub fn build_for_connection(
        &self,
        headers: HeaderMap,
    ) -> Result<RequestContext, InvalidCredential> {
        let request = InboundRequest {
            headers,
            ..Default::default()
        };
        let caller_id = self.resolve_caller(&request)?;

        Ok(RequestContext {
            request,
            db: self.db.clone(),
            pubsub: self.pubsub.clone(),
            caller_id,
        })
    }

    pub fn log_config(&self) -> OperationLogConfig {
        self.log
    }

    fn resolve_caller(&self, request: &InboundRequest) -> Result<Option<i64>, InvalidCredential> {
        match request.authorization() {
            Some(authorization) => self.credentials.extract(authorization?).map(Some),
            None => Ok(None),
        }
    }
}

/// Extension trait to get the [RequestContext] from GraphQL context
pub trait RequestContextExt {
    fn request_context(&self) -> Result<&RequestContext>;
}

impl<'a> RequestContextExt for Context<'a> {
    fn request_context(&self) -> Result<&RequestContext> {
        self.data_opt::<RequestContext>().ok_or_else(|| {
            async_graphql::Error::new("Request context missing")
                .extend_with(|_, e| e.set("code", "INTERNAL"))
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use assert_matches::assert_matches;
    use axum::http::HeaderValue;
    use serde_json::json;

    use super::*;
    use crate::graphql::operation_log::tests::CapturedLogs;

    /// Accepts `tok123` as caller 42 and rejects everything else
    pub(crate) struct FixedCredentials;

    impl CredentialExtractor for FixedCredentials {
        fn extract(&self, authorization: &str) -> Result<i64, InvalidCredential> {
            match authorization {
                "Bearer tok123" => Ok(42),
                _ => Err(InvalidCredential::MissingToken),
            }
        }
    }

    async fn factory() -> ContextFactory {
        ContextFactory::new(
            Database::in_memory().await,
            PubSub::new(8),
            Arc::new(FixedCredentials),
            OperationLogConfig::default(),
        )
    }

    fn feed_request(authorization: Option<&'static str>) -> InboundRequest {
        let mut headers = HeaderMap::new();
        if let Some(value) = authorization {
            headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        }
        InboundRequest {
            headers,
            query: "{ feed { id } }".to_string(),
            operation_name: None,
            variables: json!({}),
        }
    }

    #[tokio::test]
    async fn test_valid_credential_sets_caller() {
        let factory = factory().await;
        let logs = CapturedLogs::default();

        let context = logs
            .capture(|| factory.build(feed_request(Some("Bearer tok123"))))
            .unwrap();

        assert_eq!(context.caller_id, Some(42));
        assert_eq!(context.request.query, "{ feed { id } }");
        let lines = logs.operation_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("{ feed { id } }"));
        assert!(lines[1].contains("{}"));
    }

    #[tokio::test]
    async fn test_missing_header_is_anonymous() {
        let factory = factory().await;
        let logs = CapturedLogs::default();

        let context = logs.capture(|| factory.build(feed_request(None))).unwrap();

        assert_eq!(context.caller_id, None);
        assert_eq!(logs.operation_lines().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_header_is_anonymous() {
        let factory = factory().await;
        let context = factory.build(feed_request(Some(""))).unwrap();
        assert_eq!(context.caller_id, None);
    }

    #[tokio::test]
    async fn test_invalid_credential_fails_before_logging() {
        let factory = factory().await;
        let logs = CapturedLogs::default();

        let result = logs.capture(|| factory.build(feed_request(Some("Bearer garbage"))));

        assert_matches!(
            result.map(|context| context.caller_id),
            Err(InvalidCredential::MissingToken)
        );
        assert!(logs.operation_lines().is_empty());
    }

    #[tokio::test]
    async fn test_non_text_header_is_invalid() {
        let factory = factory().await;
        let mut request = feed_request(None);
        request
            .headers
            .insert(AUTHORIZATION, HeaderValue::from_bytes(b"Bearer \xff").unwrap());

        assert_matches!(
            factory.build(request).map(|context| context.caller_id),
            Err(InvalidCredential::NotText)
        );
    }

    #[tokio::test]
    async fn test_introspection_is_not_logged() {
        let factory = factory().await;
        let logs = CapturedLogs::default();
        let mut request = feed_request(None);
        request.query = "query IntrospectionQuery { __schema { types { name } } }".to_string();

        logs.capture(|| factory.build(request)).unwrap();

        assert!(logs.operation_lines().is_empty());
    }

    #[tokio::test]
    async fn test_build_is_repeatable() {
        let factory = factory().await;

        let first = factory.build(feed_request(Some("Bearer tok123"))).unwrap();
        let second = factory.build(feed_request(Some("Bearer tok123"))).unwrap();

        assert_eq!(first.caller_id, second.caller_id);
        assert_eq!(first.request.query, second.request.query);
        assert_eq!(first.request.variables, second.request.variables);
        assert_eq!(first.request.headers, second.request.headers);
    }

    #[tokio::test]
    async fn test_connection_context_is_not_logged() {
        let factory = factory().await;
        let logs = CapturedLogs::default();
        let headers = feed_request(Some("Bearer tok123")).headers;

        let context = logs
            .capture(|| factory.build_for_connection(headers))
            .unwrap();

        assert_eq!(context.caller_id, Some(42));
        assert!(logs.operation_lines().is_empty());
    }
}
