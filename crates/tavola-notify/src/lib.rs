//! # tavola-notify: Notification Worker
//!
//! Delivers the tasks the billing engine queues after each committed change.
//!
//! ## Module Organization
//! - [`worker`] - `NotificationWorker` poll loop and its shutdown handle
//! - [`processor`] - `TaskProcessor` trait and the logging processor
//! - [`error`] - Worker and per-task error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tavola_notify::{LogTaskProcessor, NotificationWorker, WorkerConfig};
//!
//! let (worker, handle) = NotificationWorker::new(db, Arc::new(LogTaskProcessor), WorkerConfig::default());
//! tokio::spawn(worker.run());
//! // ...
//! handle.shutdown().await?;
//! ```

pub mod error;
pub mod processor;
pub mod worker;

pub use error::{NotifyError, NotifyResult, ProcessError};
pub use processor::{LogTaskProcessor, TaskProcessor};
pub use worker::{BatchReport, NotificationWorker, NotificationWorkerHandle, WorkerConfig};
