//! # Notify Error Types
//!
//! Two layers: [`NotifyError`] is what the worker itself can fail with,
//! [`ProcessError`] is what a [`TaskProcessor`](crate::TaskProcessor)
//! reports for a single task and decides that task's fate.

use tavola_db::DbError;
use thiserror::Error;

/// Worker-level failures.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The outbox could not be read or updated.
    #[error("Outbox storage error: {0}")]
    Storage(#[from] DbError),

    /// The worker is gone.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl NotifyError {
    pub fn is_retryable(&self) -> bool {
        match self {
            NotifyError::Storage(e) => e.is_retryable(),
            NotifyError::ChannelError(_) => false,
        }
    }
}

pub type NotifyResult<T> = Result<T, NotifyError>;

/// Outcome of a failed task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    /// Transient; try again after the entry's retry delay.
    #[error("{0}")]
    Retry(String),

    /// Permanent; retrying cannot help (malformed payload, unknown kind).
    #[error("{0}")]
    SkipRetry(String),
}

impl ProcessError {
    pub fn retry(message: impl Into<String>) -> Self {
        ProcessError::Retry(message.into())
    }

    pub fn skip(message: impl Into<String>) -> Self {
        ProcessError::SkipRetry(message.into())
    }
}

impl From<serde_json::Error> for ProcessError {
    fn from(err: serde_json::Error) -> Self {
        ProcessError::SkipRetry(format!("Malformed payload: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_json_is_permanent() {
        let err: ProcessError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, ProcessError::SkipRetry(_)));
    }

    #[test]
    fn test_busy_storage_is_retryable() {
        assert!(NotifyError::from(DbError::Busy("locked".into())).is_retryable());
        assert!(!NotifyError::ChannelError("closed".into()).is_retryable());
    }
}
