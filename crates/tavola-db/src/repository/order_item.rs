//! # Order Item Repository
//!
//! Line items. Every write here happens inside a transaction that already
//! holds the parent order's lock; the caller recomputes the total afterwards.
//!
//! ## Snapshot Pattern
//! `price_cents` is copied from the menu on insert. `update` deliberately
//! has no way to change it.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tavola_core::{OrderItem, OrderItemStatus};

macro_rules! item_columns {
    () => {
        "id, order_id, menu_id, quantity, price_cents, note, status, created_at, updated_at"
    };
}

/// Repository for standalone line-item reads.
#[derive(Debug, Clone)]
pub struct OrderItemRepository {
    pool: SqlitePool,
}

impl OrderItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderItemRepository { pool }
    }

    /// Gets a line item by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<OrderItem>> {
        let item = sqlx::query_as::<_, OrderItem>(concat!(
            "SELECT ",
            item_columns!(),
            " FROM order_items WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// All items of an order (active and voided) in the order they were added.
    pub async fn list_for_order(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let mut conn = self.pool.acquire().await?;
        list_for_order(&mut conn, order_id).await
    }
}

// =============================================================================
// Transaction-scoped operations
// =============================================================================

/// Inserts a line item.
pub async fn insert(conn: &mut SqliteConnection, item: &OrderItem) -> DbResult<()> {
    debug!(
        order_id = %item.order_id,
        item_id = %item.id,
        menu_id = %item.menu_id,
        quantity = item.quantity,
        price_cents = item.price_cents,
        "Inserting order item"
    );

    sqlx::query(
        r#"
        INSERT INTO order_items (
            id, order_id, menu_id, quantity, price_cents,
            note, status, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&item.id)
    .bind(&item.order_id)
    .bind(&item.menu_id)
    .bind(item.quantity)
    .bind(item.price_cents)
    .bind(&item.note)
    .bind(item.status)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Reads a line item on the transaction's connection.
pub async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<OrderItem> {
    sqlx::query_as::<_, OrderItem>(concat!(
        "SELECT ",
        item_columns!(),
        " FROM order_items WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("OrderItem", id))
}

/// Writes the mutable fields (quantity, note, status) of a line item.
pub async fn update(
    conn: &mut SqliteConnection,
    id: &str,
    quantity: i64,
    note: &str,
    status: OrderItemStatus,
    now: DateTime<Utc>,
) -> DbResult<OrderItem> {
    debug!(item_id = %id, quantity, status = %status, "Updating order item");

    sqlx::query_as::<_, OrderItem>(concat!(
        "UPDATE order_items SET quantity = ?2, note = ?3, status = ?4, updated_at = ?5 ",
        "WHERE id = ?1 RETURNING ",
        item_columns!()
    ))
    .bind(id)
    .bind(quantity)
    .bind(note)
    .bind(status)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("OrderItem", id))
}

/// Hard-deletes a line item.
pub async fn delete(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    debug!(item_id = %id, "Deleting order item");

    let result = sqlx::query("DELETE FROM order_items WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("OrderItem", id));
    }

    Ok(())
}

/// All items of an order in insertion order.
pub async fn list_for_order(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> DbResult<Vec<OrderItem>> {
    let items = sqlx::query_as::<_, OrderItem>(concat!(
        "SELECT ",
        item_columns!(),
        " FROM order_items WHERE order_id = ?1 ORDER BY rowid ASC"
    ))
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::order;
    use crate::testing::{line, seeded};

    #[tokio::test]
    async fn test_insert_get_update() {
        let (db, o, risotto) = seeded().await;
        let item = line(&o, &risotto, 2, OrderItemStatus::Active);

        let mut tx = db.begin().await.unwrap();
        order::lock(&mut tx, &o.id, Utc::now()).await.unwrap();
        insert(&mut tx, &item).await.unwrap();

        let updated = update(&mut tx, &item.id, 3, "no cheese", OrderItemStatus::Voided, Utc::now())
            .await
            .unwrap();
        assert_eq!(updated.quantity, 3);
        assert_eq!(updated.note, "no cheese");
        assert_eq!(updated.status, OrderItemStatus::Voided);
        assert_eq!(updated.price_cents, 950);
        tx.commit().await.unwrap();

        let stored = db.order_items().get_by_id(&item.id).await.unwrap().unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn test_delete_and_list() {
        let (db, o, risotto) = seeded().await;
        let first = line(&o, &risotto, 1, OrderItemStatus::Active);
        let second = line(&o, &risotto, 4, OrderItemStatus::Active);

        let mut tx = db.begin().await.unwrap();
        insert(&mut tx, &first).await.unwrap();
        insert(&mut tx, &second).await.unwrap();
        delete(&mut tx, &first.id).await.unwrap();
        assert!(delete(&mut tx, &first.id).await.unwrap_err().is_not_found());
        assert!(get(&mut tx, &first.id).await.is_err());
        tx.commit().await.unwrap();

        let items = db.order_items().list_for_order(&o.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, second.id);
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected_by_schema() {
        let (db, o, risotto) = seeded().await;
        let item = line(&o, &risotto, 0, OrderItemStatus::Active);

        let mut tx = db.begin().await.unwrap();
        assert!(insert(&mut tx, &item).await.is_err());
    }
}
