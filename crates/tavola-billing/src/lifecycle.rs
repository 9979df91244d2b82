//! # Order Lifecycle
//!
//! Opening orders, reading them back, and moving them through their states.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │     open ──────────► in_progress ──────────► completed                 │
//! │       │   first item      │        completed payment                    │
//! │       │                   │                                             │
//! │       └─────────┬─────────┘                                             │
//! │                 ▼                                                       │
//! │             cancelled        pending payments become failed             │
//! │                                                                         │
//! │  completed and cancelled are terminal; nothing leaves them.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Status is only ever changed through [`OrderLifecycle::set_order_status`]
//! (or as a side effect of adding the first item / completing a payment);
//! there is no raw overwrite.

use chrono::Utc;
use tavola_core::validation::{validate_optional_uuid, validate_uuid};
use tavola_core::{
    NewOrder, NotificationTask, Order, OrderDetail, OrderStatus, OrderStatusEvent, Page,
    PaymentStatus, PaymentStatusEvent,
};
use tavola_db::repository::{order, order_item, payment, table};
use tracing::info;
use uuid::Uuid;

use crate::engine::BillingEngine;
use crate::error::{BillingError, BillingResult};

pub struct OrderLifecycle<'a> {
    engine: &'a BillingEngine,
}

impl<'a> OrderLifecycle<'a> {
    pub(crate) fn new(engine: &'a BillingEngine) -> Self {
        OrderLifecycle { engine }
    }

    /// Opens an empty order at a table.
    pub async fn create_order(&self, input: NewOrder) -> BillingResult<Order> {
        validate_uuid("staff_id", &input.staff_id)?;
        validate_uuid("table_id", &input.table_id)?;
        validate_optional_uuid("customer_id", input.customer_id.as_deref())?;

        let now = Utc::now();
        let mut tx = self.engine.db().begin().await?;

        // Write-first on the table row: it must exist and must not be
        // deleted underneath us.
        table::lock(&mut tx, &input.table_id, now).await?;

        let created = Order {
            id: Uuid::new_v4().to_string(),
            customer_id: input.customer_id,
            staff_id: input.staff_id,
            table_id: input.table_id,
            total_price_cents: 0,
            status: OrderStatus::Open,
            created_at: now,
            updated_at: now,
        };
        order::insert(&mut tx, &created).await?;
        tx.commit().await?;

        info!(order_id = %created.id, table_id = %created.table_id, "Order opened");
        Ok(created)
    }

    pub async fn get_order(&self, order_id: &str) -> BillingResult<Order> {
        validate_uuid("order_id", order_id)?;

        self.engine
            .db()
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Order", order_id))
    }

    /// Oldest first.
    pub async fn list_orders(&self, page: Page) -> BillingResult<Vec<Order>> {
        page.validate()?;
        Ok(self
            .engine
            .db()
            .orders()
            .list(page.limit(), page.offset())
            .await?)
    }

    /// Order, items and payments read from one snapshot.
    pub async fn get_order_detail(&self, order_id: &str) -> BillingResult<OrderDetail> {
        validate_uuid("order_id", order_id)?;

        let mut tx = self.engine.db().begin().await?;
        let order = order::get(&mut tx, order_id).await?;
        let items = order_item::list_for_order(&mut tx, order_id).await?;
        let payments = payment::list_for_order(&mut tx, order_id).await?;
        tx.rollback().await?;

        Ok(OrderDetail {
            order,
            items,
            payments,
        })
    }

    /// Moves an order to `target` if the transition table allows it.
    ///
    /// Completing requires a completed payment. Cancelling fails any pending
    /// payment in the same transaction.
    pub async fn set_order_status(
        &self,
        order_id: &str,
        target: OrderStatus,
    ) -> BillingResult<Order> {
        validate_uuid("order_id", order_id)?;

        let now = Utc::now();
        let mut tx = self.engine.db().begin().await?;

        let locked = order::lock(&mut tx, order_id, now).await?;
        let next = locked.status.transition_to(target)?;

        if next == OrderStatus::Completed && !payment::has_completed(&mut tx, order_id).await? {
            return Err(BillingError::invalid_state(format!(
                "Order {} has no completed payment",
                order_id
            )));
        }

        let failed = if next == OrderStatus::Cancelled {
            payment::fail_pending_for_order(&mut tx, order_id, now).await?
        } else {
            Vec::new()
        };

        let updated = order::set_status(&mut tx, order_id, next, now).await?;
        tx.commit().await?;

        info!(
            order_id = %order_id,
            from = %locked.status,
            to = %updated.status,
            failed_payments = failed.len(),
            "Order status changed"
        );

        self.engine
            .dispatch(NotificationTask::order_status_changed(&OrderStatusEvent {
                order_id: updated.id.clone(),
                table_id: updated.table_id.clone(),
                from: locked.status,
                to: updated.status,
            }))
            .await;
        for p in &failed {
            self.engine
                .dispatch(NotificationTask::payment_status_changed(&PaymentStatusEvent {
                    payment_id: p.id.clone(),
                    order_id: p.order_id.clone(),
                    from: PaymentStatus::Pending,
                    to: p.status,
                    amount_cents: p.amount_cents,
                }))
                .await;
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{missing_id, Harness};
    use crate::error::ErrorKind;
    use tavola_core::{NewOrderItem, NotificationKind, PaymentMethod};

    #[tokio::test]
    async fn test_create_order_starts_open_and_empty() {
        let h = Harness::new().await;
        let order = h.open_order().await;

        assert_eq!(order.status, OrderStatus::Open);
        assert_eq!(order.total_price_cents, 0);
        assert_eq!(order.table_id, h.table.id);
        let stored = h.engine.orders().get_order(&order.id).await.unwrap();
        assert_eq!(stored.id, order.id);
        assert_eq!(stored.staff_id, order.staff_id);
    }

    #[tokio::test]
    async fn test_create_order_validates_references() {
        let h = Harness::new().await;
        let lifecycle = h.engine.orders();

        let err = lifecycle
            .create_order(NewOrder {
                customer_id: None,
                staff_id: Uuid::new_v4().to_string(),
                table_id: missing_id(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = lifecycle
            .create_order(NewOrder {
                customer_id: Some("bob".into()),
                staff_id: Uuid::new_v4().to_string(),
                table_id: h.table.id.clone(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_transition_table_enforced() {
        let h = Harness::new().await;
        let lifecycle = h.engine.orders();
        let order = h.open_order().await;

        // same state is not a transition
        let err = lifecycle.set_order_status(&order.id, OrderStatus::Open).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        // open cannot skip to completed
        let err = lifecycle
            .set_order_status(&order.id, OrderStatus::Completed)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let progressed = lifecycle
            .set_order_status(&order.id, OrderStatus::InProgress)
            .await
            .unwrap();
        assert_eq!(progressed.status, OrderStatus::InProgress);

        let err = lifecycle.set_order_status(&order.id, OrderStatus::Open).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        lifecycle
            .set_order_status(&order.id, OrderStatus::Cancelled)
            .await
            .unwrap();
        for target in OrderStatus::ALL {
            let err = lifecycle.set_order_status(&order.id, target).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidState, "cancelled → {}", target);
        }
    }

    #[tokio::test]
    async fn test_completion_needs_completed_payment() {
        let h = Harness::new().await;
        let dish = h.dish("Bruschetta", 650).await;
        let order = h.open_order().await;
        h.engine
            .line_items()
            .add_item(NewOrderItem {
                order_id: order.id.clone(),
                menu_id: dish.id.clone(),
                quantity: 1,
                note: String::new(),
            })
            .await
            .unwrap();

        let err = h
            .engine
            .orders()
            .set_order_status(&order.id, OrderStatus::Completed)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let pay = h.engine.payments().create_payment(&order.id, PaymentMethod::Cash).await.unwrap();
        let err = h
            .engine
            .orders()
            .set_order_status(&order.id, OrderStatus::Completed)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState, "pending is not enough");

        let settled = h
            .engine
            .payments()
            .update_payment_status(&pay.id, PaymentStatus::Completed)
            .await
            .unwrap();
        assert_eq!(settled.order.status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn test_cancel_fails_pending_payment() {
        let h = Harness::new().await;
        let dish = h.dish("Arancini", 700).await;
        let order = h.open_order().await;
        h.engine
            .line_items()
            .add_item(NewOrderItem {
                order_id: order.id.clone(),
                menu_id: dish.id.clone(),
                quantity: 1,
                note: String::new(),
            })
            .await
            .unwrap();
        let pay = h.engine.payments().create_payment(&order.id, PaymentMethod::Card).await.unwrap();
        h.clear_tasks();

        h.engine
            .orders()
            .set_order_status(&order.id, OrderStatus::Cancelled)
            .await
            .unwrap();

        let detail = h.engine.orders().get_order_detail(&order.id).await.unwrap();
        assert_eq!(detail.order.status, OrderStatus::Cancelled);
        assert_eq!(detail.payments.len(), 1);
        assert_eq!(detail.payments[0].id, pay.id);
        assert_eq!(detail.payments[0].status, PaymentStatus::Failed);
        assert!(detail.active_payment().is_none());

        assert_eq!(
            h.recorder.kinds(),
            vec![
                NotificationKind::OrderStatusChanged.to_string(),
                NotificationKind::PaymentStatusChanged.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_orders_paginates() {
        let h = Harness::new().await;
        for _ in 0..7 {
            h.open_order().await;
        }

        let first = h.engine.orders().list_orders(Page::new(1, 5).unwrap()).await.unwrap();
        let second = h.engine.orders().list_orders(Page::new(2, 5).unwrap()).await.unwrap();
        assert_eq!(first.len(), 5);
        assert_eq!(second.len(), 2);

        let err = h
            .engine
            .orders()
            .list_orders(Page { page_id: 0, page_size: 5 })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_unknown_order_detail() {
        let h = Harness::new().await;
        let err = h.engine.orders().get_order_detail(&missing_id()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
