//! # Billing Error Type
//!
//! The single error type every engine operation returns.
//!
//! ## Error Kinds
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    What the caller sees                                 │
//! │                                                                         │
//! │  ValidationError ───────────────────────────► INVALID_ARGUMENT          │
//! │                                                                         │
//! │  CoreError::InvalidTransition ─┐                                        │
//! │  CoreError::OrderClosed ───────┤                                        │
//! │  CoreError::ItemVoided ────────┼────────────► INVALID_STATE             │
//! │  duplicate active payment ─────┘                                        │
//! │                                                                         │
//! │  DbError::NotFound ─────────────────────────► NOT_FOUND                 │
//! │  DbError::Busy / PoolExhausted ─────────────► CONFLICT  (retryable)     │
//! │  anything else from storage ────────────────► INTERNAL  (logged)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A transport layer maps `ErrorKind` onto its own status codes; the engine
//! never knows about HTTP or gRPC.

use serde::Serialize;
use tavola_core::{CoreError, ValidationError};
use tavola_db::DbError;
use thiserror::Error;

/// Classification of a [`BillingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// The referenced entity does not exist.
    NotFound,

    /// Malformed input, independent of current state.
    InvalidArgument,

    /// Well-formed input that the current state forbids.
    InvalidState,

    /// Lost a race for the write lock. Safe to retry.
    Conflict,

    /// Storage failure. Details are logged, not returned.
    Internal,
}

/// Engine operation errors.
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BillingError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        BillingError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        BillingError::InvalidState(message.into())
    }

    /// The order already has a pending or completed payment.
    pub fn duplicate_payment(order_id: &str) -> Self {
        BillingError::InvalidState(format!(
            "Order {} already has an active payment",
            order_id
        ))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BillingError::NotFound { .. } => ErrorKind::NotFound,
            BillingError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            BillingError::InvalidState(_) => ErrorKind::InvalidState,
            BillingError::Conflict(_) => ErrorKind::Conflict,
            BillingError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Only lock contention is worth repeating unchanged.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

impl From<ValidationError> for BillingError {
    fn from(err: ValidationError) -> Self {
        BillingError::InvalidArgument(err.to_string())
    }
}

impl From<CoreError> for BillingError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => e.into(),
            e @ (CoreError::InvalidTransition { .. }
            | CoreError::OrderClosed { .. }
            | CoreError::ItemVoided { .. }) => {
                BillingError::InvalidState(e.to_string())
            }
        }
    }
}

/// Converts storage errors.
///
/// Unique violations reaching this point mean a concurrent writer got there
/// first; the payment path intercepts its own before calling `?`.
impl From<DbError> for BillingError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => BillingError::NotFound { entity, id },
            e @ (DbError::Busy(_) | DbError::PoolExhausted | DbError::UniqueViolation { .. }) => {
                tracing::debug!(error = %e, "Write conflict");
                BillingError::Conflict(e.to_string())
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                BillingError::InvalidArgument("Invalid reference".to_string())
            }
            e => {
                // Log the actual error but return a generic message
                tracing::error!(error = %e, "Storage failure");
                BillingError::Internal("Database operation failed".to_string())
            }
        }
    }
}

impl From<sqlx::Error> for BillingError {
    fn from(err: sqlx::Error) -> Self {
        DbError::from(err).into()
    }
}

/// Result type for engine operations.
pub type BillingResult<T> = Result<T, BillingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_errors_classified() {
        let cases = [
            (DbError::not_found("Order", "o-1"), ErrorKind::NotFound),
            (DbError::Busy("database is locked".into()), ErrorKind::Conflict),
            (DbError::PoolExhausted, ErrorKind::Conflict),
            (DbError::duplicate("dining_tables.number", "3"), ErrorKind::Conflict),
            (DbError::QueryFailed("syntax".into()), ErrorKind::Internal),
            (
                DbError::ForeignKeyViolation { message: "order_id".into() },
                ErrorKind::InvalidArgument,
            ),
        ];

        for (db, kind) in cases {
            assert_eq!(BillingError::from(db).kind(), kind);
        }
    }

    #[test]
    fn test_internal_hides_details() {
        let err = BillingError::from(DbError::QueryFailed("no such column: secret".into()));
        assert!(!err.to_string().contains("secret"));
    }

    #[test]
    fn test_core_errors_classified() {
        let transition: BillingError = CoreError::transition("Order", "completed", "open").into();
        assert_eq!(transition.kind(), ErrorKind::InvalidState);
        assert_eq!(transition.to_string(), "Order cannot transition from completed to open");

        let frozen: BillingError = CoreError::ItemVoided { item_id: "i-1".into() }.into();
        assert_eq!(frozen.kind(), ErrorKind::InvalidState);

        let invalid: BillingError =
            CoreError::Validation(ValidationError::Required { field: "staff_id".into() }).into();
        assert_eq!(invalid.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_only_conflict_is_retryable() {
        assert!(BillingError::Conflict("busy".into()).is_retryable());
        assert!(!BillingError::duplicate_payment("o-1").is_retryable());
        assert!(!BillingError::not_found("Order", "o-1").is_retryable());
    }

    #[test]
    fn test_kind_serializes_screaming() {
        let json = serde_json::to_string(&ErrorKind::InvalidState).unwrap();
        assert_eq!(json, "\"INVALID_STATE\"");
    }
}
