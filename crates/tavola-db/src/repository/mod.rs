//! # Repository Module
//!
//! Database access for Tavola POS.
//!
//! ## Two Kinds of Access
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  POOL REPOSITORIES (structs)         TRANSACTION FUNCTIONS (free fns)   │
//! │  ───────────────────────────         ───────────────────────────────    │
//! │  db.orders().get_by_id(id)           order::lock(&mut tx, id, now)      │
//! │  db.order_items().list_for_order()   order_item::insert(&mut tx, item)  │
//! │  db.payments().list_for_order()      order::recompute_total(&mut tx..)  │
//! │                                                                         │
//! │  Standalone reads, each on its own   Run inside an engine transaction,  │
//! │  pooled connection.                  all on the same connection, so     │
//! │                                      they commit or roll back together. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`OrderRepository`](order::OrderRepository) - Orders, locking, total recomputation
//! - [`OrderItemRepository`](order_item::OrderItemRepository) - Line items
//! - [`PaymentRepository`](payment::PaymentRepository) - Payments
//! - [`TableRepository`](table::TableRepository) - Dining tables
//! - [`MenuRepository`](menu::MenuRepository) - Menu price lookups
//! - [`NotificationOutboxRepository`](notification::NotificationOutboxRepository) - Task queue

pub mod menu;
pub mod notification;
pub mod order;
pub mod order_item;
pub mod payment;
pub mod table;
