//! # SQLite event log
//!
//! Append-only record of dispense attempts.
//!
//! ## Schema
//!
//! - One `events` table; rows are inserted and never updated or deleted
//! - `timestamp` is UTC RFC 3339 with fixed microsecond precision, so text
//!   order is time order for years 0000 through 9999; later years widen the
//!   field and break the ordering
//! - Reads are newest first, `id` breaking ties between equal timestamps
pub mod error;

pub use error::{Result, StoreError};

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use pour_traits::{BoxError, DispenseEvent, EventLog, EventStatus};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

type EventRow = (i64, String, String, i64, String, Option<String>);

#[derive(Debug, Clone)]
pub struct SqliteEventLog {
    pool: SqlitePool,
}

impl SqliteEventLog {
    /// Open (creating if missing) the database at `url`, e.g. `sqlite://dispenser.db`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;
        tracing::debug!(url, max_connections, "event log connected");
        Ok(Self { pool })
    }

    /// A private in-memory database; gone when the log is dropped.
    pub async fn in_memory() -> Result<Self> {
        // every connection to :memory: is its own database, so keep exactly one
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the table and index if they don't exist yet.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                user_token TEXT NOT NULL,
                amount_ml INTEGER NOT NULL,
                status TEXT NOT NULL,
                reason TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS events_timestamp ON events (timestamp)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn append(&self, event: &DispenseEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO events (timestamp, user_token, amount_ml, status, reason)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(encode_timestamp(&event.timestamp))
        .bind(&event.user_token)
        .bind(event.amount_ml)
        .bind(event.status.as_str())
        .bind(event.reason.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn fetch_recent(&self, limit: u32) -> Result<Vec<DispenseEvent>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, timestamp, user_token, amount_ml, status, reason
            FROM events
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_event).collect()
    }

    pub async fn count(&self) -> Result<i64> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn encode_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn row_to_event(row: EventRow) -> Result<DispenseEvent> {
    let (id, timestamp, user_token, amount_ml, status, reason) = row;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp)
        .map_err(|e| StoreError::Corrupt {
            id,
            detail: format!("timestamp {timestamp:?}: {e}"),
        })?
        .with_timezone(&Utc);
    let status = EventStatus::from_str(&status).map_err(|e| StoreError::Corrupt {
        id,
        detail: e.to_string(),
    })?;
    Ok(DispenseEvent {
        timestamp,
        user_token,
        amount_ml,
        status,
        reason,
    })
}

#[async_trait]
impl EventLog for SqliteEventLog {
    async fn record(&self, event: &DispenseEvent) -> std::result::Result<(), BoxError> {
        Ok(self.append(event).await?)
    }

    async fn recent(&self, limit: u32) -> std::result::Result<Vec<DispenseEvent>, BoxError> {
        Ok(self.fetch_recent(limit).await?)
    }
}
