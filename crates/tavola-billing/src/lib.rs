//! # tavola-billing: Order Billing & Status Consistency Engine
//!
//! Keeps every order's bill, line items, payments and status consistent
//! under concurrent requests.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          BillingEngine                                  │
//! │                                                                         │
//! │   transport (excluded) ──► engine op ──► one SQLite transaction        │
//! │                                             │                           │
//! │         ┌───────────────────┬───────────────┼──────────────────┐        │
//! │         ▼                   ▼               ▼                  ▼        │
//! │  ┌──────────────┐  ┌────────────────┐  ┌───────────────┐  ┌──────────┐  │
//! │  │ LineItem     │  │ OrderLifecycle │  │ Payment       │  │ Table    │  │
//! │  │ Manager      │  │                │  │ Reconciler    │  │ Occupancy│  │
//! │  └──────┬───────┘  └────────────────┘  └───────────────┘  └──────────┘  │
//! │         ▼                                                               │
//! │  ┌──────────────┐                                                       │
//! │  │ PriceLedger  │  total = Σ price × quantity over active items        │
//! │  └──────────────┘                                                       │
//! │                                             │ commit                    │
//! │                                             ▼                           │
//! │                                   TaskDistributor::enqueue              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`engine`] - `BillingEngine`, the component accessors
//! - [`ledger`] - Order total recomputation and audit
//! - [`line_items`] - Add / update / void / delete lines
//! - [`lifecycle`] - Order creation, reads, status machine
//! - [`payments`] - Payment creation and settlement
//! - [`tables`] - Dining tables
//! - [`notify`] - `TaskDistributor` seam and the outbox implementation
//! - [`config`] - `TavolaConfig` loading
//! - [`error`] - `BillingError` and its five kinds
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tavola_billing::{BillingEngine, OutboxDistributor, TavolaConfig};
//! use tavola_db::Database;
//!
//! let config = TavolaConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//! let engine = BillingEngine::new(db.clone(), &config, Arc::new(OutboxDistributor::new(db)));
//!
//! let change = engine.line_items().add_item(new_item).await?;
//! println!("Order total is now {}", change.order_total());
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod line_items;
pub mod notify;
pub mod payments;
pub mod tables;

pub use config::{ConfigError, ConfigResult, TavolaConfig};
pub use engine::BillingEngine;
pub use error::{BillingError, BillingResult, ErrorKind};
pub use ledger::{PriceLedger, TotalAudit};
pub use lifecycle::OrderLifecycle;
pub use line_items::LineItemManager;
pub use notify::{
    DisabledDistributor, DistributeError, OutboxDistributor, RetryPolicy, TaskDistributor,
};
pub use payments::PaymentReconciler;
pub use tables::TableOccupancy;
