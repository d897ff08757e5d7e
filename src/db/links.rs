//! Links repository: posting, lookups and the filtered, ordered feed

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use super::sqlite_helpers::{like_pattern, now_iso8601, str_to_datetime};

const LINK_COLUMNS: &str = "id, created_at, description, url, posted_by_id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub description: String,
    pub url: String,
    pub posted_by_id: Option<i64>,
}

#[derive(FromRow)]
struct LinkRow {
    id: i64,
    created_at: String,
    description: String,
    url: String,
    posted_by_id: Option<i64>,
}

impl TryFrom<LinkRow> for LinkRecord {
    type Error = anyhow::Error;

    fn try_from(row: LinkRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            created_at: str_to_datetime(&row.created_at)?,
            description: row.description,
            url: row.url,
            posted_by_id: row.posted_by_id,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CreateLink {
    pub description: String,
    pub url: String,
    pub posted_by_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Feed ordering; keys apply in declaration order, ties fall back to `id`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkOrder {
    pub description: Option<SortDirection>,
    pub url: Option<SortDirection>,
    pub created_at: Option<SortDirection>,
}

impl LinkOrder {
    fn order_by_sql(&self) -> String {
        let mut keys: Vec<String> = [
            ("description", self.description),
            ("url", self.url),
            ("created_at", self.created_at),
        ]
        .into_iter()
        .filter_map(|(column, dir)| dir.map(|d| format!("{} {}", column, d.as_sql())))
        .collect();
        keys.push("id ASC".to_string());
        keys.join(", ")
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeedQuery {
    /// Substring matched against description or url
    pub filter: Option<String>,
    pub skip: i64,
    /// `None` returns every remaining link
    pub take: Option<i64>,
    pub order: LinkOrder,
}

pub struct LinkRepository {
    pool: SqlitePool,
}

impl LinkRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new link stamped with the current time
    pub async fn create(&self, link: CreateLink) -> Result<LinkRecord> {
        let row = sqlx::query_as::<_, LinkRow>(&format!(
            "INSERT INTO links (created_at, description, url, posted_by_id) VALUES (?, ?, ?, ?) RETURNING {}",
            LINK_COLUMNS
        ))
        .bind(now_iso8601())
        .bind(&link.description)
        .bind(&link.url)
        .bind(link.posted_by_id)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    /// Get link by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<LinkRecord>> {
        let row = sqlx::query_as::<_, LinkRow>(&format!(
            "SELECT {} FROM links WHERE id = ?",
            LINK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(LinkRecord::try_from).transpose()
    }

    /// One page of the feed
    pub async fn feed(&self, feed: &FeedQuery) -> Result<Vec<LinkRecord>> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM links", LINK_COLUMNS));
        push_filter(&mut query, feed.filter.as_deref());
        query.push(" ORDER BY ");
        query.push(feed.order.order_by_sql());
        // SQLite needs a LIMIT before OFFSET; -1 means unbounded
        query.push(" LIMIT ");
        query.push_bind(feed.take.unwrap_or(-1));
        query.push(" OFFSET ");
        query.push_bind(feed.skip.max(0));

        let rows = query
            .build_query_as::<LinkRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(LinkRecord::try_from).collect()
    }

    /// Number of links matching the filter, ignoring paging
    pub async fn count(&self, filter: Option<&str>) -> Result<i64> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM links");
        push_filter(&mut query, filter);

        let (count,) = query
            .build_query_as::<(i64,)>()
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Links posted by a user, oldest first
    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<LinkRecord>> {
        let rows = sqlx::query_as::<_, LinkRow>(&format!(
            "SELECT {} FROM links WHERE posted_by_id = ? ORDER BY id",
            LINK_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LinkRecord::try_from).collect()
    }
}

fn push_filter(query: &mut QueryBuilder<'_, Sqlite>, filter: Option<&str>) {
    let Some(filter) = filter.filter(|f| !f.is_empty()) else {
        return;
    };
    let pattern = like_pattern(filter);
    query.push(" WHERE (description LIKE ");
    query.push_bind(pattern.clone());
    query.push(" ESCAPE '\\' OR url LIKE ");
    query.push_bind(pattern);
    query.push(" ESCAPE '\\')");
}
