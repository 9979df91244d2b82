//! # tavola-core: Pure Domain Logic for Tavola POS
//!
//! Everything the billing engine knows about orders, line items, payments
//! and tables that does not need a database: money arithmetic, entity
//! snapshots, the closed status enumerations with their transition tables,
//! and input validation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tavola POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Transport (not part of this workspace)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tavola-billing (engine)                      │   │
//! │  │   ledger • line items • lifecycle • payments • tables           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tavola-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  status   │  │ validation│  │   │
//! │  │   │  Order    │  │   Money   │  │ tables of │  │   rules   │  │   │
//! │  │   │  Payment  │  │  parsing  │  │transitions│  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                   tavola-db (Database Layer)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entity snapshots (Order, OrderItem, Payment, Table, MenuItem)
//! - [`status`] - Status enums and their transition tables
//! - [`money`] - Integer-cents money with decimal parsing
//! - [`notification`] - Background task kinds and payloads
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use tavola_core::{Money, OrderStatus};
//!
//! let price: Money = "9.50".parse().unwrap();
//! assert_eq!(price.multiply_quantity(2).to_string(), "19.00");
//!
//! assert!(OrderStatus::Open.transition_to(OrderStatus::InProgress).is_ok());
//! assert!(OrderStatus::Cancelled.transition_to(OrderStatus::Open).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod notification;
pub mod status;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use notification::{
    ItemEvent, NotificationKind, NotificationTask, OrderStatusEvent, PaymentStatusEvent,
};
pub use status::{OrderItemStatus, OrderStatus, PaymentMethod, PaymentStatus, TableStatus};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity on a single line item.
///
/// Catches fat-finger input (1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum length of a kitchen note, in characters.
pub const MAX_NOTE_LENGTH: usize = 500;

/// Smallest page a list operation will serve.
pub const MIN_PAGE_SIZE: i64 = 5;

/// Largest page a list operation will serve.
pub const MAX_PAGE_SIZE: i64 = 10;
