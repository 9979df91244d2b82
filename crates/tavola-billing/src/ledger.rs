//! # Price Ledger
//!
//! Sole writer of `orders.total_price_cents`.
//!
//! ```text
//!   total_price = Σ price × quantity   over items with status = active
//! ```
//!
//! The sum is always taken from persisted rows inside the transaction that
//! changed them, never kept as a running delta, so there is no read-modify-
//! write window for a concurrent writer to slip into.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqliteConnection;
use tavola_core::validation::validate_uuid;
use tavola_core::Money;
use tavola_db::repository::{order, order_item};
use tracing::{info, warn};

use crate::engine::BillingEngine;
use crate::error::BillingResult;

/// Stored total next to the total the items add up to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TotalAudit {
    pub stored: Money,
    pub computed: Money,
}

impl TotalAudit {
    pub fn is_consistent(&self) -> bool {
        self.stored == self.computed
    }
}

/// Recomputes the total inside the caller's transaction.
///
/// The order row must already be locked by that transaction.
pub(crate) async fn recompute_within(
    conn: &mut SqliteConnection,
    order_id: &str,
    now: DateTime<Utc>,
) -> BillingResult<Money> {
    let cents = order::recompute_total(conn, order_id, now).await?;
    Ok(Money::from_cents(cents))
}

pub struct PriceLedger<'a> {
    engine: &'a BillingEngine,
}

impl<'a> PriceLedger<'a> {
    pub(crate) fn new(engine: &'a BillingEngine) -> Self {
        PriceLedger { engine }
    }

    /// Locks the order and rewrites its total from its items.
    pub async fn recompute_total(&self, order_id: &str) -> BillingResult<Money> {
        validate_uuid("order_id", order_id)?;

        let now = Utc::now();
        let mut tx = self.engine.db().begin().await?;

        let before = order::lock(&mut tx, order_id, now).await?;
        let total = recompute_within(&mut tx, order_id, now).await?;
        tx.commit().await?;

        if before.total_price() != total {
            warn!(
                order_id = %order_id,
                stored = %before.total_price(),
                computed = %total,
                "Repaired drifted order total"
            );
        } else {
            info!(order_id = %order_id, total = %total, "Order total recomputed");
        }

        Ok(total)
    }

    /// Compares the stored total with its items without writing anything.
    pub async fn audit(&self, order_id: &str) -> BillingResult<TotalAudit> {
        validate_uuid("order_id", order_id)?;

        // One read transaction so both reads see the same snapshot.
        let mut tx = self.engine.db().begin().await?;
        let order = order::get(&mut tx, order_id).await?;
        let items = order_item::list_for_order(&mut tx, order_id).await?;
        tx.rollback().await?;

        Ok(TotalAudit {
            stored: order.total_price(),
            computed: items.iter().map(|i| i.contribution()).sum(),
        })
    }
}
