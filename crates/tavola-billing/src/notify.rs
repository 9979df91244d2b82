//! # Task Distribution
//!
//! The seam between committed engine state and asynchronous notifications.
//!
//! ```text
//!   engine op ──► tx.commit() ──► TaskDistributor::enqueue(task, policy)
//!                                        │
//!                     ┌──────────────────┴──────────────────┐
//!                     ▼                                     ▼
//!             OutboxDistributor                     DisabledDistributor
//!             notification_outbox row               dropped (debug log)
//!                     │
//!                     ▼
//!             tavola-notify worker
//! ```
//!
//! Enqueue happens strictly after commit, so a rolled-back operation never
//! produces a notification. An enqueue failure is the caller's to log; it
//! never undoes the committed change.

use async_trait::async_trait;
use std::time::Duration;
use tavola_core::NotificationTask;
use tavola_db::{Database, DbError};
use thiserror::Error;
use tracing::debug;

/// How many times a failed task is retried after its first attempt, and how
/// long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 10,
            retry_delay: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Error)]
pub enum DistributeError {
    #[error("Failed to store task: {0}")]
    Storage(#[from] DbError),
}

/// Hands a task to whatever delivers notifications.
#[async_trait]
pub trait TaskDistributor: Send + Sync {
    async fn enqueue(&self, task: NotificationTask, policy: RetryPolicy)
        -> Result<(), DistributeError>;
}

/// Persists tasks to the `notification_outbox` table.
#[derive(Debug, Clone)]
pub struct OutboxDistributor {
    db: Database,
}

impl OutboxDistributor {
    pub fn new(db: Database) -> Self {
        OutboxDistributor { db }
    }
}

#[async_trait]
impl TaskDistributor for OutboxDistributor {
    async fn enqueue(
        &self,
        task: NotificationTask,
        policy: RetryPolicy,
    ) -> Result<(), DistributeError> {
        self.db
            .outbox()
            .enqueue(
                task.kind.as_str(),
                &task.payload,
                policy.max_retries,
                policy.retry_delay,
            )
            .await?;
        Ok(())
    }
}

/// Used when `[notifications] enabled = false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledDistributor;

#[async_trait]
impl TaskDistributor for DisabledDistributor {
    async fn enqueue(
        &self,
        task: NotificationTask,
        _policy: RetryPolicy,
    ) -> Result<(), DistributeError> {
        debug!(kind = %task.kind, "Notifications disabled, dropping task");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records every task instead of delivering it.
    #[derive(Debug, Default)]
    pub struct RecordingDistributor {
        pub tasks: Mutex<Vec<(NotificationTask, RetryPolicy)>>,
        pub fail: bool,
    }

    impl RecordingDistributor {
        pub fn failing() -> Self {
            RecordingDistributor {
                tasks: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub fn kinds(&self) -> Vec<String> {
            self.tasks
                .lock()
                .unwrap()
                .iter()
                .map(|(t, _)| t.kind.to_string())
                .collect()
        }
    }

    #[async_trait]
    impl TaskDistributor for RecordingDistributor {
        async fn enqueue(
            &self,
            task: NotificationTask,
            policy: RetryPolicy,
        ) -> Result<(), DistributeError> {
            if self.fail {
                return Err(DbError::Busy("database is locked".into()).into());
            }
            self.tasks.lock().unwrap().push((task, policy));
            Ok(())
        }
    }
}
