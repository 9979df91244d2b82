//! # Validation Module
//!
//! Input checks that run before the engine opens a transaction.
//!
//! ## Where Validation Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Engine entry point                                            │
//! │  ├── THIS MODULE: ids, quantity, note, pagination                      │
//! │  └── Failure → InvalidArgument, no transaction opened                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Inside the transaction                                        │
//! │  ├── Existence (NotFound)                                              │
//! │  └── Status tables (InvalidState)                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                        │
//! │  ├── CHECK constraints on status / quantity                            │
//! │  └── Partial UNIQUE index: one active payment per order                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use uuid::Uuid;

use crate::error::ValidationError;
use crate::{MAX_ITEM_QUANTITY, MAX_NOTE_LENGTH, MAX_PAGE_SIZE, MIN_PAGE_SIZE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identifiers
// =============================================================================

/// Validates that `value` is a UUID.
///
/// ## Example
/// ```rust
/// use tavola_core::validation::validate_uuid;
///
/// assert!(validate_uuid("order_id", "4f0c6a52-9d3e-4c1b-8a57-0b9a1c2d3e4f").is_ok());
/// assert!(validate_uuid("order_id", "").is_err());
/// assert!(validate_uuid("order_id", "42").is_err());
/// ```
pub fn validate_uuid(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    Uuid::parse_str(value).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

/// Like [`validate_uuid`] but `None` passes.
pub fn validate_optional_uuid(field: &str, value: Option<&str>) -> ValidationResult<()> {
    match value {
        Some(v) => validate_uuid(field, v),
        None => Ok(()),
    }
}

// =============================================================================
// Line Items
// =============================================================================

/// Validates a line-item quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a kitchen note. Empty is fine.
pub fn validate_note(note: &str) -> ValidationResult<()> {
    if note.chars().count() > MAX_NOTE_LENGTH {
        return Err(ValidationError::TooLong {
            field: "note".to_string(),
            max: MAX_NOTE_LENGTH,
        });
    }
    Ok(())
}

/// Validates a price in cents. Zero is allowed (complimentary dishes).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::InvalidFormat {
            field: "price".to_string(),
            reason: "cannot be negative".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Pagination
// =============================================================================

/// Validates list pagination: `page_id >= 1` and `5 <= page_size <= 10`.
pub fn validate_page(page_id: i64, page_size: i64) -> ValidationResult<()> {
    if page_id < 1 {
        return Err(ValidationError::MustBePositive {
            field: "page_id".to_string(),
        });
    }

    if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(ValidationError::OutOfRange {
            field: "page_size".to_string(),
            min: MIN_PAGE_SIZE,
            max: MAX_PAGE_SIZE,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
