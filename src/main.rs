//! Hacker News clone backend
//!
//! This is the main entry point for the Hacker News GraphQL API.
//! All operations are exposed via GraphQL at /graphql, subscriptions at /graphql/ws.

mod api;
mod app;
mod config;
mod db;
mod graphql;
mod services;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::{AppState, build_app};
use crate::config::Config;
use crate::db::Database;
use crate::graphql::{ContextFactory, OperationLogConfig, SchemaDocument, build_schema};
use crate::services::{AuthConfig, AuthService, PubSub};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hackernews=debug,tower_http=debug,sqlx=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!("Starting Hacker News backend");

    let document = match &config.schema_path {
        Some(path) => SchemaDocument::load(path)?,
        None => SchemaDocument::packaged()?,
    };
    tracing::info!(path = %document.path().display(), "Schema document loaded");

    let db = Database::connect(
        &config.database_url,
        config.database_max_connections,
        config.log_sql_queries,
    )
    .await?;
    db.migrate().await?;
    tracing::info!("Database connected");

    let pubsub = PubSub::new(config.pubsub_capacity);
    let auth = AuthService::new(AuthConfig::from(&config));

    let schema = build_schema(auth.clone());
    document.verify_served_by(&schema.sdl())?;
    tracing::info!("GraphQL schema built");

    let contexts = ContextFactory::new(
        db.clone(),
        pubsub.clone(),
        Arc::new(auth),
        OperationLogConfig {
            enabled: config.log_graphql_operations,
            redact_variables: config.redact_variables,
        },
    );

    let app = build_app(AppState {
        db,
        pubsub,
        schema,
        contexts,
    });

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.host, config.port))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server is running on http://{}/graphql", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
