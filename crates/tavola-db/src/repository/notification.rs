//! # Notification Outbox Repository
//!
//! Durable queue between the billing engine and the notification worker.
//!
//! ## Entry Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  enqueue()  ──► pending (next_attempt_at = now)                         │
//! │                    │                                                    │
//! │                    ▼  worker: fetch_due(now)                            │
//! │               ┌────┴─────────────────┬────────────────────────┐         │
//! │               │ ok                   │ retryable error        │ skip /  │
//! │               ▼                      ▼                        │ budget  │
//! │         mark_processed()       reschedule()                   │ spent   │
//! │         processed_at = now     attempts += 1                  ▼         │
//! │                                next_attempt_at += delay   mark_dead()   │
//! │                                                           dead_at = now │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// A row of `notification_outbox`.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct OutboxEntry {
    pub id: String,
    /// Task kind, e.g. `task:item_added`.
    pub kind: String,
    /// JSON payload as text.
    pub payload: String,
    /// Failed attempts so far.
    pub attempts: i64,
    pub max_retries: i64,
    pub retry_delay_ms: i64,
    pub last_error: Option<String>,
    /// Unix epoch milliseconds.
    pub next_attempt_at: i64,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub dead_at: Option<DateTime<Utc>>,
}

impl OutboxEntry {
    /// Whether a failure now may still be retried.
    ///
    /// `max_retries` counts retries after the first try, so an entry gets
    /// `max_retries + 1` attempts in total.
    pub fn can_retry(&self) -> bool {
        self.attempts < self.max_retries
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms.max(0) as u64)
    }
}

macro_rules! outbox_columns {
    () => {
        "id, kind, payload, attempts, max_retries, retry_delay_ms, last_error, \
         next_attempt_at, created_at, processed_at, dead_at"
    };
}

/// Repository for outbox operations.
#[derive(Debug, Clone)]
pub struct NotificationOutboxRepository {
    pool: SqlitePool,
}

impl NotificationOutboxRepository {
    pub fn new(pool: SqlitePool) -> Self {
        NotificationOutboxRepository { pool }
    }

    /// Queues a task, due immediately.
    pub async fn enqueue(
        &self,
        kind: &str,
        payload: &serde_json::Value,
        max_retries: u32,
        retry_delay: Duration,
    ) -> DbResult<OutboxEntry> {
        let now = Utc::now();
        let entry = OutboxEntry {
            id: Uuid::new_v4().to_string(),
            kind: kind.to_string(),
            payload: serde_json::to_string(payload)?,
            attempts: 0,
            max_retries: i64::from(max_retries),
            retry_delay_ms: retry_delay.as_millis() as i64,
            last_error: None,
            next_attempt_at: now.timestamp_millis(),
            created_at: now,
            processed_at: None,
            dead_at: None,
        };

        debug!(id = %entry.id, kind = %kind, "Queuing notification");

        sqlx::query(
            r#"
            INSERT INTO notification_outbox (
                id, kind, payload, attempts, max_retries, retry_delay_ms,
                last_error, next_attempt_at, created_at, processed_at, dead_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.kind)
        .bind(&entry.payload)
        .bind(entry.attempts)
        .bind(entry.max_retries)
        .bind(entry.retry_delay_ms)
        .bind(&entry.last_error)
        .bind(entry.next_attempt_at)
        .bind(entry.created_at)
        .bind(entry.processed_at)
        .bind(entry.dead_at)
        .execute(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Pending entries whose `next_attempt_at <= now_ms`, oldest first.
    pub async fn fetch_due(&self, now_ms: i64, limit: u32) -> DbResult<Vec<OutboxEntry>> {
        let entries = sqlx::query_as::<_, OutboxEntry>(concat!(
            "SELECT ",
            outbox_columns!(),
            " FROM notification_outbox",
            " WHERE processed_at IS NULL AND dead_at IS NULL AND next_attempt_at <= ?1",
            " ORDER BY next_attempt_at ASC, created_at ASC LIMIT ?2"
        ))
        .bind(now_ms)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<OutboxEntry>> {
        let entry = sqlx::query_as::<_, OutboxEntry>(concat!(
            "SELECT ",
            outbox_columns!(),
            " FROM notification_outbox WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Marks an entry as delivered.
    pub async fn mark_processed(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE notification_outbox SET processed_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("OutboxEntry", id));
        }
        Ok(())
    }

    /// Records a failed attempt and pushes the entry back to `next_attempt_at`.
    pub async fn reschedule(&self, id: &str, error: &str, next_attempt_at: i64) -> DbResult<()> {
        debug!(id = %id, next_attempt_at, "Rescheduling notification");

        let result = sqlx::query(
            r#"
            UPDATE notification_outbox SET
                attempts = attempts + 1,
                last_error = ?2,
                next_attempt_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(next_attempt_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("OutboxEntry", id));
        }
        Ok(())
    }

    /// Records a final failure. The entry is never picked up again.
    pub async fn mark_dead(&self, id: &str, error: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE notification_outbox SET
                attempts = attempts + 1,
                last_error = ?2,
                dead_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("OutboxEntry", id));
        }
        Ok(())
    }

    /// Counts entries still waiting for delivery.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notification_outbox \
             WHERE processed_at IS NULL AND dead_at IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Deletes delivered entries processed before `before`. Returns how many.
    pub async fn purge_processed(&self, before: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query(
            "DELETE FROM notification_outbox WHERE processed_at IS NOT NULL AND processed_at < ?1",
        )
        .bind(before)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
