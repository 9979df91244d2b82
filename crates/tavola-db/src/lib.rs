//! # tavola-db: Database Layer for Tavola POS
//!
//! SQLite storage for orders, line items, payments, tables, the menu and
//! the notification outbox, accessed through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tavola POS Data Flow                             │
//! │                                                                         │
//! │  BillingEngine::add_item(...)                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tavola-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  order, item  │    │  (embedded)  │  │   │
//! │  │   │               │    │  payment,     │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│  table, menu, │    │ 001_init.sql │  │   │
//! │  │   │ begin() → tx  │    │  outbox       │    │ 002_outbox   │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation, configuration and transactions
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repositories and transaction-scoped queries
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tavola_db::{Database, DbConfig};
//! use tavola_db::repository::order;
//!
//! let db = Database::new(DbConfig::new("tavola.db")).await?;
//!
//! let mut tx = db.begin().await?;
//! let order = order::lock(&mut tx, &order_id, Utc::now()).await?;
//! let total = order::recompute_total(&mut tx, &order.id, Utc::now()).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::menu::MenuRepository;
pub use repository::notification::{NotificationOutboxRepository, OutboxEntry};
pub use repository::order::OrderRepository;
pub use repository::order_item::OrderItemRepository;
pub use repository::payment::PaymentRepository;
pub use repository::table::TableRepository;

/// Re-exported so callers can name the transaction type without a direct sqlx dependency.
pub type DbTransaction = sqlx::Transaction<'static, sqlx::Sqlite>;
