//! Application state and HTTP router construction.

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api;
use crate::db::Database;
use crate::graphql::{ContextFactory, HackerNewsSchema, routes};
use crate::services::PubSub;

/// Shared state for HTTP handlers. Every field is a cheap handle onto process-wide state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub pubsub: PubSub,
    pub schema: HackerNewsSchema,
    pub contexts: ContextFactory,
}

/// Build the full Axum router: health checks, /graphql, /graphql/ws and layers.
/// Returns Router<()> (state fully applied) for use with axum::serve.
pub fn build_app(state: AppState) -> Router<()> {
    Router::new()
        .merge(api::health::router())
        .merge(routes::router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value as JsonValue, json};
    use tower::ServiceExt;

    use super::*;
    use crate::graphql::{OperationLogConfig, build_schema};
    use crate::services::auth::test_auth_service;

    async fn test_app() -> Router<()> {
        let db = Database::in_memory().await;
        let pubsub = PubSub::new(16);
        let auth = test_auth_service();
        let contexts = ContextFactory::new(
            db.clone(),
            pubsub.clone(),
            Arc::new(auth.clone()),
            OperationLogConfig::default(),
        );

        build_app(AppState {
            db,
            pubsub,
            schema: build_schema(auth),
            contexts,
        })
    }

    async fn post_graphql(
        app: Router<()>,
        body: JsonValue,
        authorization: Option<&str>,
    ) -> (StatusCode, JsonValue) {
        let mut request = Request::post("/graphql").header(CONTENT_TYPE, "application/json");
        if let Some(authorization) = authorization {
            request = request.header(AUTHORIZATION, authorization);
        }
        let response = app
            .oneshot(request.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_anonymous_query() {
        let app = test_app().await;
        let (status, body) = post_graphql(
            app,
            json!({ "query": "{ feed { count links { id } } }", "variables": {} }),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "data": { "feed": { "count": 0, "links": [] } } }));
    }

    #[tokio::test]
    async fn test_token_from_signup_authorizes_post() {
        let app = test_app().await;
        let (_, body) = post_graphql(
            app.clone(),
            json!({
                "query": "mutation { signup(email: \"ada@example.com\", password: \"pw\", name: \"Ada\") { token } }"
            }),
            None,
        )
        .await;
        let token = body["data"]["signup"]["token"].as_str().unwrap().to_string();

        let (status, body) = post_graphql(
            app,
            json!({ "query": "mutation { post(url: \"a.com\", description: \"A\") { postedBy { email } } }" }),
            Some(&format!("Bearer {}", token)),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["post"]["postedBy"]["email"], "ada@example.com");
    }

    #[tokio::test]
    async fn test_invalid_credential_is_unauthorized() {
        let app = test_app().await;
        let (status, body) = post_graphql(
            app,
            json!({ "query": "{ feed { id } }", "variables": {} }),
            Some("Bearer garbage"),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["errors"][0]["extensions"]["code"], "UNAUTHENTICATED");
        assert!(body.get("data").is_none_or(JsonValue::is_null));
    }

    #[tokio::test]
    async fn test_get_graphql_serves_graphiql_to_browsers() {
        let app = test_app().await;

        let response = app
            .clone()
            .oneshot(
                Request::get("/graphql")
                    .header(ACCEPT, "text/html")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/graphql").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = test_app().await;

        let response = app
            .clone()
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: JsonValue = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["ready"], true);
        assert_eq!(body["database"], true);
    }
}
