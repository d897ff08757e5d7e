//! Database connection and operations

pub mod links;
pub mod sqlite_helpers;
pub mod users;
pub mod votes;

use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::ConnectOptions;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub use links::{CreateLink, FeedQuery, LinkOrder, LinkRecord, LinkRepository, SortDirection};
pub use users::{CreateUser, UserRecord, UsersRepository};
pub use votes::{VoteRecord, VotesRepository};

/// Database wrapper providing connection pool access.
///
/// Cloning is cheap; all clones share one pool for the lifetime of the process.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection pool, creating the database file if needed
    pub async fn connect(url: &str, max_connections: u32, log_statements: bool) -> Result<Self> {
        let mut options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid database URL: {}", url))?
            .create_if_missing(true);
        if !log_statements {
            options = options.disable_statement_logging();
        }

        if let Some(parent) = options.get_filename().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Private in-memory database with migrations applied
    #[cfg(test)]
    pub async fn in_memory() -> Self {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        let db = Self { pool };
        db.migrate().await.expect("migrations");
        db
    }

    /// Get a users repository
    pub fn users(&self) -> UsersRepository {
        UsersRepository::new(self.pool.clone())
    }

    /// Get a links repository
    pub fn links(&self) -> LinkRepository {
        LinkRepository::new(self.pool.clone())
    }

    /// Get a votes repository
    pub fn votes(&self) -> VotesRepository {
        VotesRepository::new(self.pool.clone())
    }

    /// Check that the database answers queries
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}
