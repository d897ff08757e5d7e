//! HTTP and WebSocket routes for `/graphql` and `/graphql/ws`

use async_graphql::Pos;
use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLProtocol, GraphQLRequest, GraphQLResponse, GraphQLWebSocket};
use axum::Router;
use axum::extract::{State, WebSocketUpgrade};
use axum::http::header::{ACCEPT, AUTHORIZATION};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use serde_json::Value as JsonValue;

use crate::app::AppState;

use super::auth::{InvalidCredential, unauthenticated};
use super::context::InboundRequest;
use super::operation_log::ConnectionLog;

/// `connection_init` payload keys that may carry the credential
const INIT_PAYLOAD_CREDENTIAL_KEYS: &[&str] = &["Authorization", "authorization", "authToken"];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/graphql", get(graphiql).post(graphql_handler))
        .route("/graphql/ws", get(graphql_ws_handler))
}

/// GraphQL query/mutation handler
async fn graphql_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    req: GraphQLRequest,
) -> Response {
    let request = req.into_inner();
    let inbound = InboundRequest::from_graphql(headers, &request);

    match state.contexts.build(inbound) {
        Ok(context) => GraphQLResponse::from(state.schema.execute(request.data(context)).await)
            .into_response(),
        Err(e) => {
            tracing::info!(error = %e, "Rejected request with invalid credential");
            let error = unauthenticated(format!("Invalid credential: {}", e))
                .into_server_error(Pos::default());
            (
                StatusCode::UNAUTHORIZED,
                GraphQLResponse::from(async_graphql::Response::from_errors(vec![error])),
            )
                .into_response()
        }
    }
}

/// GraphiQL interactive playground (only for browsers)
async fn graphiql(headers: HeaderMap) -> impl IntoResponse {
    let accepts_html = headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("text/html"))
        .unwrap_or(false);

    if accepts_html {
        Html(
            GraphiQLSource::build()
                .endpoint("/graphql")
                .subscription_endpoint("/graphql/ws")
                .finish(),
        )
        .into_response()
    } else {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            axum::Json(serde_json::json!({
                "error": "GET requests are not supported for GraphQL queries. Use POST with Content-Type: application/json"
            })),
        )
            .into_response()
    }
}

/// GraphQL WebSocket handler for subscriptions.
///
/// The credential comes from the upgrade request, or failing that from the
/// `connection_init` payload. An invalid credential closes the connection.
async fn graphql_ws_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    protocol: GraphQLProtocol,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.protocols(["graphql-transport-ws", "graphql-ws"])
        .on_upgrade(move |socket| {
            let contexts = state.contexts.clone();

            GraphQLWebSocket::new(socket, state.schema.clone(), protocol)
                .on_connection_init(move |params| async move {
                    let context = connection_headers(headers, &params)
                        .and_then(|headers| contexts.build_for_connection(headers))
                        .map_err(|e| {
                            tracing::info!(error = %e, "Rejected subscription connection");
                            unauthenticated(format!("Invalid credential: {}", e))
                        })?;

                    let mut data = async_graphql::Data::default();
                    data.insert(ConnectionLog(contexts.log_config()));
                    data.insert(context);
                    Ok(data)
                })
                .serve()
        })
}

/// Upgrade request headers, with the init payload credential filled in when the
/// request carried none
fn connection_headers(
    mut headers: HeaderMap,
    params: &JsonValue,
) -> Result<HeaderMap, InvalidCredential> {
    let has_header = headers
        .get(AUTHORIZATION)
        .is_some_and(|value| !value.is_empty());
    if has_header {
        return Ok(headers);
    }

    let credential = INIT_PAYLOAD_CREDENTIAL_KEYS
        .iter()
        .find_map(|key| params.get(*key).and_then(JsonValue::as_str));
    if let Some(credential) = credential {
        let value = HeaderValue::from_str(credential).map_err(|_| InvalidCredential::NotText)?;
        headers.insert(AUTHORIZATION, value);
    }
    Ok(headers)
}
