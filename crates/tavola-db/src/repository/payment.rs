//! # Payment Repository
//!
//! Payments against orders.
//!
//! ```text
//!   payments(order_id) UNIQUE WHERE status IN ('pending', 'completed')
//!       └── backs the engine's own check; a violation that still reaches
//!           the database comes back as DbError::UniqueViolation
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tavola_core::{Payment, PaymentStatus};

macro_rules! payment_columns {
    () => {
        "id, order_id, method, amount_cents, status, created_at, updated_at"
    };
}

/// Repository for standalone payment reads.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Gets a payment by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(concat!(
            "SELECT ",
            payment_columns!(),
            " FROM payments WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    /// Every payment attempt for an order, oldest first.
    pub async fn list_for_order(&self, order_id: &str) -> DbResult<Vec<Payment>> {
        let mut conn = self.pool.acquire().await?;
        list_for_order(&mut conn, order_id).await
    }
}

// =============================================================================
// Transaction-scoped operations
// =============================================================================

/// Inserts a payment row.
pub async fn insert(conn: &mut SqliteConnection, payment: &Payment) -> DbResult<()> {
    debug!(
        payment_id = %payment.id,
        order_id = %payment.order_id,
        method = %payment.method,
        amount_cents = payment.amount_cents,
        "Inserting payment"
    );

    sqlx::query(
        r#"
        INSERT INTO payments (
            id, order_id, method, amount_cents, status, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.order_id)
    .bind(payment.method)
    .bind(payment.amount_cents)
    .bind(payment.status)
    .bind(payment.created_at)
    .bind(payment.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Reads a payment on the transaction's connection.
pub async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Payment> {
    sqlx::query_as::<_, Payment>(concat!(
        "SELECT ",
        payment_columns!(),
        " FROM payments WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Payment", id))
}

/// The pending or completed payment of an order, if there is one.
pub async fn find_active_for_order(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> DbResult<Option<Payment>> {
    let payment = sqlx::query_as::<_, Payment>(concat!(
        "SELECT ",
        payment_columns!(),
        " FROM payments WHERE order_id = ?1 AND status IN ('pending', 'completed') LIMIT 1"
    ))
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(payment)
}

/// Whether the order has a completed payment.
pub async fn has_completed(conn: &mut SqliteConnection, order_id: &str) -> DbResult<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM payments WHERE order_id = ?1 AND status = 'completed')",
    )
    .bind(order_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(exists)
}

/// Writes a new status. The caller has already validated the transition.
pub async fn set_status(
    conn: &mut SqliteConnection,
    id: &str,
    status: PaymentStatus,
    now: DateTime<Utc>,
) -> DbResult<Payment> {
    debug!(payment_id = %id, status = %status, "Updating payment status");

    sqlx::query_as::<_, Payment>(concat!(
        "UPDATE payments SET status = ?2, updated_at = ?3 WHERE id = ?1 RETURNING ",
        payment_columns!()
    ))
    .bind(id)
    .bind(status)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Payment", id))
}

/// Marks every pending payment of an order as failed and returns them.
pub async fn fail_pending_for_order(
    conn: &mut SqliteConnection,
    order_id: &str,
    now: DateTime<Utc>,
) -> DbResult<Vec<Payment>> {
    let failed = sqlx::query_as::<_, Payment>(concat!(
        "UPDATE payments SET status = 'failed', updated_at = ?2 ",
        "WHERE order_id = ?1 AND status = 'pending' RETURNING ",
        payment_columns!()
    ))
    .bind(order_id)
    .bind(now)
    .fetch_all(&mut *conn)
    .await?;

    if !failed.is_empty() {
        debug!(order_id = %order_id, count = failed.len(), "Failed pending payments");
    }

    Ok(failed)
}

/// Every payment of an order, oldest first.
pub async fn list_for_order(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<Payment>> {
    let payments = sqlx::query_as::<_, Payment>(concat!(
        "SELECT ",
        payment_columns!(),
        " FROM payments WHERE order_id = ?1 ORDER BY rowid ASC"
    ))
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(payments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::seeded;
    use tavola_core::{Order, PaymentMethod};
    use uuid::Uuid;

    fn payment_for(order: &Order, status: PaymentStatus) -> Payment {
        let now = Utc::now();
        Payment {
            id: Uuid::new_v4().to_string(),
            order_id: order.id.clone(),
            method: PaymentMethod::Card,
            amount_cents: 400,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_second_active_payment_hits_unique_index() {
        let (db, o, _) = seeded().await;
        let mut tx = db.begin().await.unwrap();

        insert(&mut tx, &payment_for(&o, PaymentStatus::Pending)).await.unwrap();
        let err = insert(&mut tx, &payment_for(&o, PaymentStatus::Pending))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_failed_payments_do_not_block() {
        let (db, o, _) = seeded().await;
        let mut tx = db.begin().await.unwrap();

        insert(&mut tx, &payment_for(&o, PaymentStatus::Failed)).await.unwrap();
        insert(&mut tx, &payment_for(&o, PaymentStatus::Failed)).await.unwrap();
        assert!(find_active_for_order(&mut tx, &o.id).await.unwrap().is_none());

        let pending = payment_for(&o, PaymentStatus::Pending);
        insert(&mut tx, &pending).await.unwrap();
        let active = find_active_for_order(&mut tx, &o.id).await.unwrap().unwrap();
        assert_eq!(active.id, pending.id);
        tx.commit().await.unwrap();

        assert_eq!(db.payments().list_for_order(&o.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_status_updates() {
        let (db, o, _) = seeded().await;
        let first = payment_for(&o, PaymentStatus::Pending);

        let mut tx = db.begin().await.unwrap();
        insert(&mut tx, &first).await.unwrap();
        assert!(!has_completed(&mut tx, &o.id).await.unwrap());

        let failed = fail_pending_for_order(&mut tx, &o.id, Utc::now()).await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(get(&mut tx, &first.id).await.unwrap().status, PaymentStatus::Failed);

        let second = payment_for(&o, PaymentStatus::Pending);
        insert(&mut tx, &second).await.unwrap();
        let done = set_status(&mut tx, &second.id, PaymentStatus::Completed, Utc::now())
            .await
            .unwrap();
        assert_eq!(done.status, PaymentStatus::Completed);
        assert!(has_completed(&mut tx, &o.id).await.unwrap());
        tx.commit().await.unwrap();

        let stored = db.payments().get_by_id(&second.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Completed);
    }
}
