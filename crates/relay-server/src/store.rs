//! SQLite-backed message store.
//!
//! Every relayed message becomes one row of `messages`. The dispatcher
//! only sees `append_message`; the read helpers are for tests and tools.

use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay_core::{ChatMessage, MessageStore, StoreError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    text TEXT NOT NULL,
    datetime TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_user ON messages(user_id);
"#;

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url` and make sure the
    /// schema exists.
    pub async fn open(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("parsing database URL {:?}", url))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("connecting to message store {:?}", url))?;

        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .context("initializing message store schema")?;

        Ok(SqliteStore { pool })
    }

    pub async fn count_messages(&self) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await
            .context("counting messages")
    }

    /// The last `limit` messages, oldest first.
    pub async fn recent_messages(&self, limit: i64) -> Result<Vec<ChatMessage>> {
        let rows = sqlx::query_as::<_, (i64, String, DateTime<Utc>)>(
            "SELECT user_id, text, datetime FROM messages ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("fetching recent messages")?;

        Ok(rows
            .into_iter()
            .rev()
            .map(|(user_id, text, time)| ChatMessage::new(user_id, text, time))
            .collect())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn append_message(&self, msg: &ChatMessage) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO messages (user_id, text, datetime) VALUES (?, ?, ?)")
            .bind(msg.user_id())
            .bind(msg.content())
            .bind(msg.time())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }
}
