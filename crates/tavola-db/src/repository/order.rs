//! # Order Repository
//!
//! Orders, the order-row lock, and the aggregate total.
//!
//! ## Locking
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    UPDATE orders SET updated_at = now WHERE id = ? RETURNING ...        │
//! │      ↑ first statement is a write: SQLite hands out the single write    │
//! │        lock here, a concurrent writer waits (busy_timeout) until COMMIT │
//! │    ... item / payment writes ...                                        │
//! │    UPDATE orders SET total_price_cents = (SELECT SUM(...)) ...          │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The total is never computed in Rust from a previously read value; it is
//! always rewritten from the persisted active items by one statement.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tavola_core::{Order, OrderStatus};

macro_rules! order_columns {
    () => {
        "id, customer_id, staff_id, table_id, total_price_cents, status, created_at, updated_at"
    };
}

/// Repository for standalone order reads.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Lists orders in creation order.
    pub async fn list(&self, limit: i64, offset: i64) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders ORDER BY created_at ASC, rowid ASC LIMIT ?1 OFFSET ?2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Lists the orders seated at a table, newest first.
    pub async fn list_for_table(&self, table_id: &str) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE table_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(table_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }
}

// =============================================================================
// Transaction-scoped operations
// =============================================================================

/// Inserts a new order row.
pub async fn insert(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    debug!(order_id = %order.id, table_id = %order.table_id, "Inserting order");

    sqlx::query(
        r#"
        INSERT INTO orders (
            id, customer_id, staff_id, table_id,
            total_price_cents, status, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&order.id)
    .bind(&order.customer_id)
    .bind(&order.staff_id)
    .bind(&order.table_id)
    .bind(order.total_price_cents)
    .bind(order.status)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Reads an order on the transaction's connection, without locking.
pub async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Order> {
    sqlx::query_as::<_, Order>(concat!(
        "SELECT ",
        order_columns!(),
        " FROM orders WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Order", id))
}

/// Takes the order-row lock and returns the order as of that instant.
///
/// Must be the first statement of the transaction.
pub async fn lock(conn: &mut SqliteConnection, id: &str, now: DateTime<Utc>) -> DbResult<Order> {
    debug!(order_id = %id, "Locking order");

    sqlx::query_as::<_, Order>(concat!(
        "UPDATE orders SET updated_at = ?2 WHERE id = ?1 RETURNING ",
        order_columns!()
    ))
    .bind(id)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Order", id))
}

/// Locks the order that owns the given line item.
///
/// `NotFound` names the item, since that is what the caller asked about.
pub async fn lock_by_item(
    conn: &mut SqliteConnection,
    item_id: &str,
    now: DateTime<Utc>,
) -> DbResult<Order> {
    debug!(item_id = %item_id, "Locking order by item");

    sqlx::query_as::<_, Order>(concat!(
        "UPDATE orders SET updated_at = ?2 ",
        "WHERE id = (SELECT order_id FROM order_items WHERE id = ?1) RETURNING ",
        order_columns!()
    ))
    .bind(item_id)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("OrderItem", item_id))
}

/// Locks the order that owns the given payment.
pub async fn lock_by_payment(
    conn: &mut SqliteConnection,
    payment_id: &str,
    now: DateTime<Utc>,
) -> DbResult<Order> {
    debug!(payment_id = %payment_id, "Locking order by payment");

    sqlx::query_as::<_, Order>(concat!(
        "UPDATE orders SET updated_at = ?2 ",
        "WHERE id = (SELECT order_id FROM payments WHERE id = ?1) RETURNING ",
        order_columns!()
    ))
    .bind(payment_id)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Payment", payment_id))
}

/// Writes a new status. The caller has already validated the transition.
pub async fn set_status(
    conn: &mut SqliteConnection,
    id: &str,
    status: OrderStatus,
    now: DateTime<Utc>,
) -> DbResult<Order> {
    debug!(order_id = %id, status = %status, "Updating order status");

    sqlx::query_as::<_, Order>(concat!(
        "UPDATE orders SET status = ?2, updated_at = ?3 WHERE id = ?1 RETURNING ",
        order_columns!()
    ))
    .bind(id)
    .bind(status)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Order", id))
}

/// Rewrites `total_price_cents` from the persisted active items and returns it.
///
/// One statement: the sum is evaluated and stored by SQLite under the write
/// lock the transaction already holds.
pub async fn recompute_total(
    conn: &mut SqliteConnection,
    id: &str,
    now: DateTime<Utc>,
) -> DbResult<i64> {
    let total: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE orders SET
            total_price_cents = (
                SELECT COALESCE(SUM(price_cents * quantity), 0)
                FROM order_items
                WHERE order_id = ?1 AND status = 'active'
            ),
            updated_at = ?2
        WHERE id = ?1
        RETURNING total_price_cents
        "#,
    )
    .bind(id)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    let total = total.ok_or_else(|| DbError::not_found("Order", id))?;
    debug!(order_id = %id, total_price_cents = total, "Recomputed order total");
    Ok(total)
}

/// Counts orders at a table that are still open or in progress.
pub async fn count_live_for_table(conn: &mut SqliteConnection, table_id: &str) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM orders WHERE table_id = ?1 AND status IN ('open', 'in_progress')",
    )
    .bind(table_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(count)
}

// =============================================================================
// Unit Tests
// =============================================================================
