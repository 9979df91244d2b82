//! # Payment Reconciler
//!
//! Ties payments to the order total and drives order completion.
//!
//! ## Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  createPayment                                                          │
//! │    • order must be in_progress                                          │
//! │    • at most one pending/completed payment per order                   │
//! │    • amount = order total at this instant (snapshot, never re-read)    │
//! │                                                                         │
//! │  updatePaymentStatus                                                    │
//! │    pending ──► completed   order in_progress → completed (same tx)     │
//! │    pending ──► failed      order untouched; a new payment may follow   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use tavola_core::validation::validate_uuid;
use tavola_core::{
    NotificationTask, OrderStatus, OrderStatusEvent, Payment, PaymentChange, PaymentMethod,
    PaymentStatus, PaymentStatusEvent,
};
use tavola_db::repository::{order, payment};
use tavola_db::DbError;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::BillingEngine;
use crate::error::{BillingError, BillingResult};

pub struct PaymentReconciler<'a> {
    engine: &'a BillingEngine,
}

impl<'a> PaymentReconciler<'a> {
    pub(crate) fn new(engine: &'a BillingEngine) -> Self {
        PaymentReconciler { engine }
    }

    /// Opens a pending payment for the order's current total.
    pub async fn create_payment(
        &self,
        order_id: &str,
        method: PaymentMethod,
    ) -> BillingResult<Payment> {
        validate_uuid("order_id", order_id)?;

        let now = Utc::now();
        let mut tx = self.engine.db().begin().await?;

        let locked = order::lock(&mut tx, order_id, now).await?;
        if locked.status != OrderStatus::InProgress {
            return Err(BillingError::invalid_state(format!(
                "Order {} is {}, only in_progress orders can be paid",
                order_id, locked.status
            )));
        }
        if payment::find_active_for_order(&mut tx, order_id).await?.is_some() {
            return Err(BillingError::duplicate_payment(order_id));
        }

        let created = Payment {
            id: Uuid::new_v4().to_string(),
            order_id: locked.id.clone(),
            method,
            amount_cents: locked.total_price_cents,
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        match payment::insert(&mut tx, &created).await {
            Ok(()) => {}
            Err(DbError::UniqueViolation { .. }) => {
                return Err(BillingError::duplicate_payment(order_id));
            }
            Err(e) => return Err(e.into()),
        }
        tx.commit().await?;

        info!(
            payment_id = %created.id,
            order_id = %order_id,
            method = %method,
            amount = %created.amount(),
            "Payment created"
        );
        Ok(created)
    }

    /// Settles or fails a pending payment.
    ///
    /// Completing a payment completes its order in the same transaction.
    pub async fn update_payment_status(
        &self,
        payment_id: &str,
        target: PaymentStatus,
    ) -> BillingResult<PaymentChange> {
        validate_uuid("payment_id", payment_id)?;

        let now = Utc::now();
        let mut tx = self.engine.db().begin().await?;

        let locked = order::lock_by_payment(&mut tx, payment_id, now).await?;
        let current = payment::get(&mut tx, payment_id).await?;
        let next = current.status.transition_to(target)?;

        let updated = payment::set_status(&mut tx, payment_id, next, now).await?;

        let order = if next == PaymentStatus::Completed {
            let order_next = locked.status.transition_to(OrderStatus::Completed)?;
            if updated.amount_cents != locked.total_price_cents {
                warn!(
                    payment_id = %payment_id,
                    order_id = %locked.id,
                    paid_cents = updated.amount_cents,
                    total_cents = locked.total_price_cents,
                    "Payment amount differs from order total"
                );
            }
            order::set_status(&mut tx, &locked.id, order_next, now).await?
        } else {
            locked.clone()
        };
        tx.commit().await?;

        info!(
            payment_id = %payment_id,
            order_id = %order.id,
            from = %current.status,
            to = %updated.status,
            order_status = %order.status,
            "Payment status changed"
        );

        self.engine
            .dispatch(NotificationTask::payment_status_changed(&PaymentStatusEvent {
                payment_id: updated.id.clone(),
                order_id: updated.order_id.clone(),
                from: current.status,
                to: updated.status,
                amount_cents: updated.amount_cents,
            }))
            .await;
        if order.status != locked.status {
            self.engine
                .dispatch(NotificationTask::order_status_changed(&OrderStatusEvent {
                    order_id: order.id.clone(),
                    table_id: order.table_id.clone(),
                    from: locked.status,
                    to: order.status,
                }))
                .await;
        }

        Ok(PaymentChange {
            payment: updated,
            order,
        })
    }

    pub async fn get_payment(&self, payment_id: &str) -> BillingResult<Payment> {
        validate_uuid("payment_id", payment_id)?;

        self.engine
            .db()
            .payments()
            .get_by_id(payment_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Payment", payment_id))
    }

    /// Every payment attempt for an order, failed ones included.
    pub async fn list_payments(&self, order_id: &str) -> BillingResult<Vec<Payment>> {
        validate_uuid("order_id", order_id)?;

        let db = self.engine.db();
        if db.orders().get_by_id(order_id).await?.is_none() {
            return Err(BillingError::not_found("Order", order_id));
        }
        Ok(db.payments().list_for_order(order_id).await?)
    }
}
