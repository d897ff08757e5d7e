//! Votes repository. A user votes on a link at most once.

use anyhow::Result;
use sqlx::{FromRow, SqlitePool};

use super::sqlite_helpers::is_unique_violation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct VoteRecord {
    pub id: i64,
    pub link_id: i64,
    pub user_id: i64,
}

pub struct VotesRepository {
    pool: SqlitePool,
}

impl VotesRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a vote. Returns `None` when the user already voted for the link.
    pub async fn create(&self, link_id: i64, user_id: i64) -> Result<Option<VoteRecord>> {
        let result = sqlx::query_as::<_, VoteRecord>(
            "INSERT INTO votes (link_id, user_id) VALUES (?, ?) RETURNING id, link_id, user_id",
        )
        .bind(link_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(record) => Ok(Some(record)),
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// The vote a user cast for a link, if any
    pub async fn find(&self, link_id: i64, user_id: i64) -> Result<Option<VoteRecord>> {
        let record = sqlx::query_as::<_, VoteRecord>(
            "SELECT id, link_id, user_id FROM votes WHERE link_id = ? AND user_id = ?",
        )
        .bind(link_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// All votes on a link
    pub async fn list_by_link(&self, link_id: i64) -> Result<Vec<VoteRecord>> {
        let records = sqlx::query_as::<_, VoteRecord>(
            "SELECT id, link_id, user_id FROM votes WHERE link_id = ? ORDER BY id",
        )
        .bind(link_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
