//! # Notification Worker
//!
//! Polls the outbox and feeds due tasks to a [`TaskProcessor`].
//!
//! ## Processing Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  every poll_interval:                                                   │
//! │                                                                         │
//! │   fetch_due(now, batch_size)                                           │
//! │        │                                                                │
//! │        ▼  per entry, oldest first                                       │
//! │   kind + payload parse ── fails ──────────────────────► mark_dead       │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   processor.process(task)                                               │
//! │        ├── Ok ────────────────────────────────────────► mark_processed  │
//! │        ├── Retry, budget left ────────────────────────► reschedule      │
//! │        ├── Retry, budget spent ───────────────────────► mark_dead       │
//! │        └── SkipRetry ─────────────────────────────────► mark_dead       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Retry budget and delay come from each entry, as set by whoever enqueued it.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tavola_core::{NotificationKind, NotificationTask};
use tavola_db::{Database, OutboxEntry};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::{NotifyError, NotifyResult, ProcessError};
use crate::processor::TaskProcessor;

/// Polling settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    pub poll_interval: Duration,
    pub batch_size: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            poll_interval: Duration::from_secs(1),
            batch_size: 50,
        }
    }
}

/// What one pass over the outbox did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub processed: usize,
    pub retried: usize,
    pub dead: usize,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.processed + self.retried + self.dead
    }
}

enum Outcome {
    Processed,
    Retried,
    Dead,
}

/// Background worker draining `notification_outbox`.
pub struct NotificationWorker {
    db: Database,
    processor: Arc<dyn TaskProcessor>,
    config: WorkerConfig,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for stopping a running worker.
#[derive(Clone)]
pub struct NotificationWorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl NotificationWorkerHandle {
    /// Asks the worker to stop after its current batch.
    pub async fn shutdown(&self) -> NotifyResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| NotifyError::ChannelError("Shutdown channel closed".into()))
    }
}

impl NotificationWorker {
    pub fn new(
        db: Database,
        processor: Arc<dyn TaskProcessor>,
        config: WorkerConfig,
    ) -> (Self, NotificationWorkerHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let worker = NotificationWorker {
            db,
            processor,
            config,
            shutdown_rx,
        };

        (worker, NotificationWorkerHandle { shutdown_tx })
    }

    /// Runs until shut down. Spawn this as a background task.
    pub async fn run(mut self) {
        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            batch_size = self.config.batch_size,
            "Notification worker starting"
        );

        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.process_due().await {
                        Ok(report) if report.total() > 0 => {
                            info!(
                                processed = report.processed,
                                retried = report.retried,
                                dead = report.dead,
                                "Notification batch done"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => error!(error = %e, "Failed to process notification batch"),
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Notification worker shutting down");
                    break;
                }
            }
        }

        info!("Notification worker stopped");
    }

    /// Processes every entry due now, up to `batch_size`.
    pub async fn process_due(&self) -> NotifyResult<BatchReport> {
        let now_ms = Utc::now().timestamp_millis();
        let entries = self
            .db
            .outbox()
            .fetch_due(now_ms, self.config.batch_size)
            .await?;

        if entries.is_empty() {
            debug!("No due notifications");
            return Ok(BatchReport::default());
        }

        let mut report = BatchReport::default();
        for entry in entries {
            match self.handle(&entry).await? {
                Outcome::Processed => report.processed += 1,
                Outcome::Retried => report.retried += 1,
                Outcome::Dead => report.dead += 1,
            }
        }

        Ok(report)
    }

    async fn handle(&self, entry: &OutboxEntry) -> NotifyResult<Outcome> {
        let outbox = self.db.outbox();

        let result = match decode(entry) {
            Ok(task) => self.processor.process(&task).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                outbox.mark_processed(&entry.id).await?;
                debug!(id = %entry.id, kind = %entry.kind, "Notification delivered");
                Ok(Outcome::Processed)
            }
            Err(ProcessError::Retry(reason)) if entry.can_retry() => {
                let next = Utc::now().timestamp_millis() + entry.retry_delay().as_millis() as i64;
                outbox.reschedule(&entry.id, &reason, next).await?;
                warn!(
                    id = %entry.id,
                    kind = %entry.kind,
                    attempt = entry.attempts + 1,
                    max_retries = entry.max_retries,
                    error = %reason,
                    "Notification failed, will retry"
                );
                Ok(Outcome::Retried)
            }
            Err(e) => {
                outbox.mark_dead(&entry.id, &e.to_string()).await?;
                error!(
                    id = %entry.id,
                    kind = %entry.kind,
                    attempts = entry.attempts + 1,
                    error = %e,
                    "Notification dead-lettered"
                );
                Ok(Outcome::Dead)
            }
        }
    }
}

fn decode(entry: &OutboxEntry) -> Result<NotificationTask, ProcessError> {
    let kind: NotificationKind = entry
        .kind
        .parse()
        .map_err(|_| ProcessError::skip(format!("Unknown task kind '{}'", entry.kind)))?;
    let payload = serde_json::from_str(&entry.payload)?;
    Ok(NotificationTask { kind, payload })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tavola_db::DbConfig;

    /// Fails with the given error for the first `failures` calls.
    struct Flaky {
        failures: usize,
        error: ProcessError,
        calls: AtomicUsize,
    }

    impl Flaky {
        fn new(failures: usize, error: ProcessError) -> Arc<Self> {
            Arc::new(Flaky {
                failures,
                error,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TaskProcessor for Flaky {
        async fn process(&self, _task: &NotificationTask) -> Result<(), ProcessError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(self.error.clone())
            } else {
                Ok(())
            }
        }
    }

    async fn setup(processor: Arc<dyn TaskProcessor>) -> (Database, NotificationWorker) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (worker, _handle) =
            NotificationWorker::new(db.clone(), processor, WorkerConfig::default());
        (db, worker)
    }

    async fn enqueue(db: &Database, kind: &str, max_retries: u32) -> String {
        db.outbox()
            .enqueue(kind, &serde_json::json!({}), max_retries, Duration::ZERO)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_success_marks_processed() {
        let flaky = Flaky::new(0, ProcessError::retry("x"));
        let (db, worker) = setup(flaky.clone()).await;
        enqueue(&db, "task:item_added", 10).await;

        let report = worker.process_due().await.unwrap();
        assert_eq!(report, BatchReport { processed: 1, retried: 0, dead: 0 });
        assert_eq!(db.outbox().count_pending().await.unwrap(), 0);
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_until_budget_spent() {
        let flaky = Flaky::new(usize::MAX, ProcessError::retry("kitchen offline"));
        let (db, worker) = setup(flaky).await;
        let id = enqueue(&db, "task:order_status_changed", 3).await;

        // first try plus three retries
        for _ in 0..3 {
            assert_eq!(worker.process_due().await.unwrap().retried, 1);
        }
        assert_eq!(worker.process_due().await.unwrap().dead, 1);

        let entry = db.outbox().get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(entry.attempts, 4);
        assert!(entry.dead_at.is_some());
        assert_eq!(entry.last_error.as_deref(), Some("kitchen offline"));
        assert_eq!(worker.process_due().await.unwrap().total(), 0);
    }

    #[tokio::test]
    async fn test_default_budget_allows_ten_retries() {
        let flaky = Flaky::new(usize::MAX, ProcessError::retry("printer jammed"));
        let (db, worker) = setup(flaky.clone()).await;
        let id = enqueue(&db, "task:order_status_changed", 10).await;

        for _ in 0..20 {
            worker.process_due().await.unwrap();
        }

        let entry = db.outbox().get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(entry.attempts, 11);
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 11);
        assert!(entry.dead_at.is_some());
    }

    #[tokio::test]
    async fn test_transient_failure_then_success() {
        let (db, worker) = setup(Flaky::new(1, ProcessError::retry("timeout"))).await;
        let id = enqueue(&db, "task:item_voided", 10).await;

        assert_eq!(worker.process_due().await.unwrap().retried, 1);
        assert_eq!(worker.process_due().await.unwrap().processed, 1);

        let entry = db.outbox().get_by_id(&id).await.unwrap().unwrap();
        assert!(entry.processed_at.is_some());
        assert_eq!(entry.attempts, 1);
    }

    #[tokio::test]
    async fn test_skip_retry_and_unknown_kind_are_dead() {
        let (db, worker) = setup(Flaky::new(1, ProcessError::skip("bad"))).await;
        enqueue(&db, "task:payment_status_changed", 10).await;
        enqueue(&db, "task:unheard_of", 10).await;

        let report = worker.process_due().await.unwrap();
        assert_eq!(report.dead, 2);
        assert_eq!(db.outbox().count_pending().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_retry_waits_for_delay() {
        let (db, worker) = setup(Flaky::new(usize::MAX, ProcessError::retry("later"))).await;
        db.outbox()
            .enqueue("task:item_added", &serde_json::json!({}), 10, Duration::from_secs(3600))
            .await
            .unwrap();

        assert_eq!(worker.process_due().await.unwrap().retried, 1);
        // not due again for an hour
        assert_eq!(worker.process_due().await.unwrap().total(), 0);
        assert_eq!(db.outbox().count_pending().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (worker, handle) = NotificationWorker::new(
            db.clone(),
            Flaky::new(0, ProcessError::retry("x")),
            WorkerConfig {
                poll_interval: Duration::from_millis(10),
                batch_size: 10,
            },
        );
        enqueue(&db, "task:item_added", 10).await;

        let running = tokio::spawn(worker.run());
        for _ in 0..100 {
            if db.outbox().count_pending().await.unwrap() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(db.outbox().count_pending().await.unwrap(), 0);

        handle.shutdown().await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .unwrap()
            .unwrap();
    }
}
