//! Application configuration management

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};

/// Longest accepted token lifetime (one year)
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 365 * 24 * 60 * 60;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address
    pub host: String,

    /// Server port
    pub port: u16,

    /// SQLite database URL
    pub database_url: String,

    /// Maximum pooled database connections
    pub database_max_connections: u32,

    /// Let the database client log every statement it runs
    pub log_sql_queries: bool,

    /// GraphQL schema document; `None` uses the copy built into the binary
    pub schema_path: Option<PathBuf>,

    /// JWT secret for signing and verifying tokens
    pub jwt_secret: String,

    /// Lifetime of issued tokens in seconds
    pub token_lifetime_secs: i64,

    /// Bcrypt cost factor
    pub bcrypt_cost: u32,

    /// Buffered events per pub/sub subscriber
    pub pubsub_capacity: usize,

    /// Log the query text and variables of every non-introspection operation
    pub log_graphql_operations: bool,

    /// Redact sensitive variable values in the operation log
    pub redact_variables: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            // Development only; tokens stop verifying after a restart
            use std::collections::hash_map::DefaultHasher;
            use std::hash::{Hash, Hasher};
            let mut hasher = DefaultHasher::new();
            std::time::SystemTime::now().hash(&mut hasher);
            format!("dev-secret-{}", hasher.finish())
        });

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),

            port: parse_or(&lookup, "PORT", 4000)?,

            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://./data/hackernews.db".to_string()),

            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,

            log_sql_queries: flag_or(&lookup, "LOG_SQL_QUERIES", true)?,

            schema_path: lookup("SCHEMA_PATH").map(PathBuf::from),

            jwt_secret: jwt_secret.trim().to_string(),

            token_lifetime_secs: token_lifetime(&lookup)?,

            bcrypt_cost: parse_or(&lookup, "BCRYPT_COST", 10)?,

            pubsub_capacity: parse_or(&lookup, "PUBSUB_CAPACITY", 256)?,

            log_graphql_operations: flag_or(&lookup, "LOG_GRAPHQL_OPERATIONS", true)?,

            redact_variables: flag_or(&lookup, "REDACT_VARIABLES", true)?,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

fn token_lifetime(lookup: &impl Fn(&str) -> Option<String>) -> Result<i64> {
    let secs = parse_or(lookup, "TOKEN_LIFETIME_SECS", 7 * 24 * 60 * 60)?;
    if !(1..=MAX_TOKEN_LIFETIME_SECS).contains(&secs) {
        return Err(anyhow!(
            "Invalid TOKEN_LIFETIME_SECS: {} (must be between 1 and {})",
            secs,
            MAX_TOKEN_LIFETIME_SECS
        ));
    }
    Ok(secs)
}

fn flag_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> Result<bool> {
    match lookup(key).as_deref().map(str::trim) {
        None => Ok(default),
        Some("1") | Some("true") | Some("yes") => Ok(true),
        Some("0") | Some("false") | Some("no") => Ok(false),
        Some(other) => Err(anyhow!("Invalid {}: {:?}", key, other)),
    }
}
