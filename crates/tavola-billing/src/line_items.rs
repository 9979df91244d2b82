//! # Line-Item Manager
//!
//! Adds, edits, voids and removes order lines, keeping the order total in
//! step within the same transaction.
//!
//! ## Transaction Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  (pool)  menu lookup, price snapshot          addItem only             │
//! │  BEGIN                                                                  │
//! │    1. lock order row            ← concurrent writers queue here        │
//! │    2. status check              ← completed / cancelled → InvalidState │
//! │    3. write the line                                                   │
//! │    4. open → in_progress        ← first item only                      │
//! │    5. recompute total           ← Σ active lines                       │
//! │  COMMIT                                                                 │
//! │  enqueue notification           ← only after commit                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The unit price is read from the menu once, when the line is created, and
//! is never re-read: a later menu change leaves existing bills alone.

use chrono::Utc;
use tavola_core::validation::{validate_note, validate_quantity, validate_uuid};
use tavola_core::{
    CoreError, ItemChange, ItemEvent, NewOrderItem, NotificationTask, Order, OrderItem,
    OrderItemStatus, OrderItemUpdate, OrderStatus, OrderStatusEvent, ValidationError,
};
use tavola_db::repository::{order, order_item};
use tracing::info;
use uuid::Uuid;

use crate::engine::BillingEngine;
use crate::error::{BillingError, BillingResult};
use crate::ledger::recompute_within;

/// Items of a terminal order are frozen.
pub(crate) fn ensure_accepts_items(order: &Order) -> Result<(), CoreError> {
    if order.status.accepts_item_changes() {
        Ok(())
    } else {
        Err(CoreError::OrderClosed {
            order_id: order.id.clone(),
            status: order.status.to_string(),
        })
    }
}

fn item_event(item: &OrderItem, order_total_cents: i64) -> ItemEvent {
    ItemEvent {
        order_id: item.order_id.clone(),
        item_id: item.id.clone(),
        menu_id: item.menu_id.clone(),
        quantity: item.quantity,
        order_total_cents,
    }
}

pub struct LineItemManager<'a> {
    engine: &'a BillingEngine,
}

impl<'a> LineItemManager<'a> {
    pub(crate) fn new(engine: &'a BillingEngine) -> Self {
        LineItemManager { engine }
    }

    /// Adds a line at the menu's current price.
    ///
    /// The first line on an `open` order moves it to `in_progress`.
    pub async fn add_item(&self, input: NewOrderItem) -> BillingResult<ItemChange> {
        validate_uuid("order_id", &input.order_id)?;
        validate_uuid("menu_id", &input.menu_id)?;
        validate_quantity(input.quantity)?;
        validate_note(&input.note)?;

        let dish = self
            .engine
            .db()
            .menu()
            .get_by_id(&input.menu_id)
            .await?
            .ok_or_else(|| BillingError::not_found("MenuItem", &input.menu_id))?;
        if !dish.is_available {
            return Err(BillingError::invalid_state(format!(
                "Menu item {} is not available",
                dish.name
            )));
        }

        let now = Utc::now();
        let mut tx = self.engine.db().begin().await?;

        let locked = order::lock(&mut tx, &input.order_id, now).await?;
        ensure_accepts_items(&locked)?;

        let item = OrderItem {
            id: Uuid::new_v4().to_string(),
            order_id: locked.id.clone(),
            menu_id: dish.id.clone(),
            quantity: input.quantity,
            price_cents: dish.price_cents,
            note: input.note,
            status: OrderItemStatus::Active,
            created_at: now,
            updated_at: now,
        };
        order_item::insert(&mut tx, &item).await?;

        let advanced = if locked.status == OrderStatus::Open {
            let next = locked.status.transition_to(OrderStatus::InProgress)?;
            Some(order::set_status(&mut tx, &locked.id, next, now).await?)
        } else {
            None
        };

        let total = recompute_within(&mut tx, &locked.id, now).await?;
        tx.commit().await?;

        info!(
            order_id = %item.order_id,
            item_id = %item.id,
            quantity = item.quantity,
            total = %total,
            "Item added"
        );

        self.engine
            .dispatch(NotificationTask::item_added(&item_event(&item, total.cents())))
            .await;
        if let Some(order) = advanced {
            self.engine
                .dispatch(NotificationTask::order_status_changed(&OrderStatusEvent {
                    order_id: order.id,
                    table_id: order.table_id,
                    from: locked.status,
                    to: order.status,
                }))
                .await;
        }

        Ok(ItemChange {
            item,
            order_total_cents: total.cents(),
        })
    }

    /// Applies a partial update. Only `active → voided` is accepted as a
    /// status change; repeating the current status is a no-op. Voided lines
    /// are frozen.
    pub async fn update_item(
        &self,
        item_id: &str,
        update: OrderItemUpdate,
    ) -> BillingResult<ItemChange> {
        validate_uuid("item_id", item_id)?;
        if update.is_empty() {
            return Err(ValidationError::Required {
                field: "quantity, note or status".to_string(),
            }
            .into());
        }
        if let Some(quantity) = update.quantity {
            validate_quantity(quantity)?;
        }
        if let Some(ref note) = update.note {
            validate_note(note)?;
        }

        let affects_total = update.affects_total();
        self.mutate(item_id, affects_total, |item| {
            if item.status == OrderItemStatus::Voided {
                return Err(CoreError::ItemVoided {
                    item_id: item.id.clone(),
                });
            }
            let status = match update.status {
                Some(target) if target != item.status => item.status.transition_to(target)?,
                _ => item.status,
            };
            Ok((
                update.quantity.unwrap_or(item.quantity),
                update.note.unwrap_or_else(|| item.note.clone()),
                status,
            ))
        })
        .await
    }

    /// Voids a line. Voiding an already voided line is an error.
    pub async fn void_item(&self, item_id: &str) -> BillingResult<ItemChange> {
        validate_uuid("item_id", item_id)?;

        self.mutate(item_id, true, |item| {
            let status = item.status.transition_to(OrderItemStatus::Voided)?;
            Ok((item.quantity, item.note.clone(), status))
        })
        .await
    }

    /// Removes a line outright. Returns the new order total.
    pub async fn delete_item(&self, item_id: &str) -> BillingResult<ItemChange> {
        validate_uuid("item_id", item_id)?;

        let now = Utc::now();
        let mut tx = self.engine.db().begin().await?;

        let locked = order::lock_by_item(&mut tx, item_id, now).await?;
        ensure_accepts_items(&locked)?;

        let item = order_item::get(&mut tx, item_id).await?;
        order_item::delete(&mut tx, item_id).await?;
        let total = recompute_within(&mut tx, &locked.id, now).await?;
        tx.commit().await?;

        info!(order_id = %locked.id, item_id = %item_id, total = %total, "Item deleted");

        if item.status == OrderItemStatus::Active {
            self.engine
                .dispatch(NotificationTask::item_voided(&item_event(&item, total.cents())))
                .await;
        }

        Ok(ItemChange {
            item,
            order_total_cents: total.cents(),
        })
    }

    pub async fn get_item(&self, item_id: &str) -> BillingResult<OrderItem> {
        validate_uuid("item_id", item_id)?;

        self.engine
            .db()
            .order_items()
            .get_by_id(item_id)
            .await?
            .ok_or_else(|| BillingError::not_found("OrderItem", item_id))
    }

    /// Every line of an order, voided ones included, in the order added.
    pub async fn list_items(&self, order_id: &str) -> BillingResult<Vec<OrderItem>> {
        validate_uuid("order_id", order_id)?;

        let db = self.engine.db();
        if db.orders().get_by_id(order_id).await?.is_none() {
            return Err(BillingError::not_found("Order", order_id));
        }
        Ok(db.order_items().list_for_order(order_id).await?)
    }

    /// Shared body of update and void: lock, check, rewrite, recompute.
    ///
    /// `apply` computes the new (quantity, note, status) from the current row.
    async fn mutate<F>(
        &self,
        item_id: &str,
        affects_total: bool,
        apply: F,
    ) -> BillingResult<ItemChange>
    where
        F: FnOnce(&OrderItem) -> Result<(i64, String, OrderItemStatus), CoreError>,
    {
        let now = Utc::now();
        let mut tx = self.engine.db().begin().await?;

        let locked = order::lock_by_item(&mut tx, item_id, now).await?;
        ensure_accepts_items(&locked)?;

        let before = order_item::get(&mut tx, item_id).await?;
        let (quantity, note, status) = apply(&before)?;
        let item = order_item::update(&mut tx, item_id, quantity, &note, status, now).await?;

        let total_cents = if affects_total {
            recompute_within(&mut tx, &locked.id, now).await?.cents()
        } else {
            locked.total_price_cents
        };
        tx.commit().await?;

        info!(
            order_id = %locked.id,
            item_id = %item_id,
            quantity = item.quantity,
            status = %item.status,
            total_cents,
            "Item updated"
        );

        if before.status == OrderItemStatus::Active && item.status == OrderItemStatus::Voided {
            self.engine
                .dispatch(NotificationTask::item_voided(&item_event(&item, total_cents)))
                .await;
        }

        Ok(ItemChange {
            item,
            order_total_cents: total_cents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{missing_id, Harness};
    use crate::error::ErrorKind;
    use std::sync::Arc;
    use tavola_core::{Money, NotificationKind};
    use tavola_db::{Database, DbConfig};

    fn line(order: &Order, menu_id: &str, quantity: i64) -> NewOrderItem {
        NewOrderItem {
            order_id: order.id.clone(),
            menu_id: menu_id.to_string(),
            quantity,
            note: String::new(),
        }
    }

    #[tokio::test]
    async fn test_add_update_void_keeps_total() {
        let h = Harness::new().await;
        let risotto = h.dish("Risotto", 950).await;
        let soup = h.dish("Minestrone", 400).await;
        let order = h.open_order().await;
        let items = h.engine.line_items();

        let first = items.add_item(line(&order, &risotto.id, 2)).await.unwrap();
        assert_eq!(first.order_total().to_decimal_string(), "19.00");
        assert_eq!(first.item.price_cents, 950);

        let second = items.add_item(line(&order, &soup.id, 1)).await.unwrap();
        assert_eq!(second.order_total().to_decimal_string(), "23.00");

        let voided = items.void_item(&first.item.id).await.unwrap();
        assert_eq!(voided.item.status, OrderItemStatus::Voided);
        assert_eq!(voided.order_total().to_decimal_string(), "4.00");

        let stored = h.engine.orders().get_order(&order.id).await.unwrap();
        assert_eq!(stored.total_price(), Money::from_cents(400));
        assert_eq!(stored.status, OrderStatus::InProgress);

        assert_eq!(
            h.recorder.kinds(),
            vec![
                NotificationKind::ItemAdded.to_string(),
                NotificationKind::OrderStatusChanged.to_string(),
                NotificationKind::ItemAdded.to_string(),
                NotificationKind::ItemVoided.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_quantity_change_recomputes_note_does_not() {
        let h = Harness::new().await;
        let dish = h.dish("Carbonara", 1100).await;
        let order = h.open_order().await;
        let items = h.engine.line_items();
        let added = items.add_item(line(&order, &dish.id, 1)).await.unwrap();

        let bumped = items
            .update_item(
                &added.item.id,
                OrderItemUpdate {
                    quantity: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(bumped.order_total_cents, 3300);

        let noted = items
            .update_item(
                &added.item.id,
                OrderItemUpdate {
                    note: Some("no pepper".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(noted.item.note, "no pepper");
        assert_eq!(noted.item.quantity, 3);
        assert_eq!(noted.order_total_cents, 3300);
    }

    #[tokio::test]
    async fn test_voided_line_cannot_come_back() {
        let h = Harness::new().await;
        let dish = h.dish("Tiramisu", 550).await;
        let order = h.open_order().await;
        let items = h.engine.line_items();
        let added = items.add_item(line(&order, &dish.id, 1)).await.unwrap();

        items.void_item(&added.item.id).await.unwrap();

        let again = items.void_item(&added.item.id).await.unwrap_err();
        assert_eq!(again.kind(), ErrorKind::InvalidState);

        let revive = items
            .update_item(
                &added.item.id,
                OrderItemUpdate {
                    status: Some(OrderItemStatus::Active),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(revive.kind(), ErrorKind::InvalidState);

        // the voided record is frozen
        for update in [
            OrderItemUpdate {
                quantity: Some(5),
                ..Default::default()
            },
            OrderItemUpdate {
                note: Some("actually two".into()),
                ..Default::default()
            },
        ] {
            let err = items.update_item(&added.item.id, update).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidState);
        }

        let kept = items.get_item(&added.item.id).await.unwrap();
        assert_eq!(kept.quantity, 1);
        assert_eq!(kept.note, "");
        assert_eq!(kept.status, OrderItemStatus::Voided);
        assert_eq!(h.engine.orders().get_order(&order.id).await.unwrap().total_price_cents, 0);
    }

    #[tokio::test]
    async fn test_terminal_order_freezes_items() {
        let h = Harness::new().await;
        let dish = h.dish("Espresso", 180).await;
        let order = h.open_order().await;
        let items = h.engine.line_items();
        let added = items.add_item(line(&order, &dish.id, 1)).await.unwrap();

        h.engine
            .orders()
            .set_order_status(&order.id, OrderStatus::Cancelled)
            .await
            .unwrap();

        let add = items.add_item(line(&order, &dish.id, 1)).await.unwrap_err();
        assert_eq!(add.kind(), ErrorKind::InvalidState);

        let void = items.void_item(&added.item.id).await.unwrap_err();
        assert_eq!(void.kind(), ErrorKind::InvalidState);

        let delete = items.delete_item(&added.item.id).await.unwrap_err();
        assert_eq!(delete.kind(), ErrorKind::InvalidState);

        let stored = h.engine.orders().get_order(&order.id).await.unwrap();
        assert_eq!(stored.total_price_cents, 180);
        assert_eq!(items.list_items(&order.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_rejects_bad_input() {
        let h = Harness::new().await;
        let dish = h.dish("Arancini", 700).await;
        let order = h.open_order().await;
        let items = h.engine.line_items();

        for qty in [0, -1, 1000] {
            let err = items.add_item(line(&order, &dish.id, qty)).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "qty {}", qty);
        }

        let err = items.add_item(line(&order, &missing_id(), 1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let mut ghost = order.clone();
        ghost.id = missing_id();
        let err = items.add_item(line(&ghost, &dish.id, 1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        h.engine.db().menu().set_available(&dish.id, false).await.unwrap();
        let err = items.add_item(line(&order, &dish.id, 1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        // nothing was written
        let stored = h.engine.orders().get_order(&order.id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Open);
        assert!(h.recorder.kinds().is_empty());
    }

    #[tokio::test]
    async fn test_menu_price_change_leaves_bill_alone() {
        let h = Harness::new().await;
        let dish = h.dish("Saltimbocca", 1575).await;
        let order = h.open_order().await;
        h.engine.line_items().add_item(line(&order, &dish.id, 1)).await.unwrap();

        sqlx::query("UPDATE menu_items SET price_cents = 9999 WHERE id = ?1")
            .bind(&dish.id)
            .execute(h.engine.db().pool())
            .await
            .unwrap();

        let total = h.engine.ledger().recompute_total(&order.id).await.unwrap();
        assert_eq!(total.cents(), 1575);
    }

    #[tokio::test]
    async fn test_delete_item_recomputes() {
        let h = Harness::new().await;
        let dish = h.dish("Panna Cotta", 500).await;
        let order = h.open_order().await;
        let items = h.engine.line_items();
        let a = items.add_item(line(&order, &dish.id, 1)).await.unwrap();
        items.add_item(line(&order, &dish.id, 2)).await.unwrap();

        let removed = items.delete_item(&a.item.id).await.unwrap();
        assert_eq!(removed.order_total_cents, 1000);
        assert_eq!(items.list_items(&order.id).await.unwrap().len(), 1);

        let err = items.get_item(&a.item.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = items.delete_item(&a.item.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_lose_nothing() {
        const WRITERS: i64 = 16;

        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("race.db")).max_connections(8))
            .await
            .unwrap();
        let h = Arc::new(Harness::with_db(db).await);
        let dish = h.dish("Margherita", 850).await;
        let order = h.open_order().await;

        let mut handles = Vec::new();
        for _ in 0..WRITERS {
            let h = h.clone();
            let input = line(&order, &dish.id, 1);
            handles.push(tokio::spawn(async move {
                h.engine.line_items().add_item(input).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = h.engine.orders().get_order(&order.id).await.unwrap();
        assert_eq!(stored.total_price_cents, WRITERS * 850);
        assert_eq!(stored.status, OrderStatus::InProgress);
        assert_eq!(
            h.engine.line_items().list_items(&order.id).await.unwrap().len() as i64,
            WRITERS
        );
        assert!(h.engine.ledger().audit(&order.id).await.unwrap().is_consistent());
    }
}
