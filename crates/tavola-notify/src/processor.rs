//! # Task Processors
//!
//! What happens to a task once the worker picks it up.

use async_trait::async_trait;
use tavola_core::{
    ItemEvent, NotificationKind, NotificationTask, OrderStatusEvent, PaymentStatusEvent,
};
use tracing::info;

use crate::error::ProcessError;

/// Handles one notification task.
///
/// Implementations must be idempotent: a task can be delivered again if the
/// worker stops between processing and recording the result.
#[async_trait]
pub trait TaskProcessor: Send + Sync {
    async fn process(&self, task: &NotificationTask) -> Result<(), ProcessError>;
}

/// Decodes each task and writes it to the log.
///
/// Stand-in for a real delivery channel (kitchen display, customer app).
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTaskProcessor;

#[async_trait]
impl TaskProcessor for LogTaskProcessor {
    async fn process(&self, task: &NotificationTask) -> Result<(), ProcessError> {
        match task.kind {
            NotificationKind::ItemAdded | NotificationKind::ItemVoided => {
                let event: ItemEvent = task.decode()?;
                info!(
                    kind = %task.kind,
                    order_id = %event.order_id,
                    item_id = %event.item_id,
                    quantity = event.quantity,
                    order_total_cents = event.order_total_cents,
                    "Delivered item notification"
                );
            }
            NotificationKind::OrderStatusChanged => {
                let event: OrderStatusEvent = task.decode()?;
                info!(
                    order_id = %event.order_id,
                    table_id = %event.table_id,
                    from = %event.from,
                    to = %event.to,
                    "Delivered order status notification"
                );
            }
            NotificationKind::PaymentStatusChanged => {
                let event: PaymentStatusEvent = task.decode()?;
                info!(
                    payment_id = %event.payment_id,
                    order_id = %event.order_id,
                    from = %event.from,
                    to = %event.to,
                    amount_cents = event.amount_cents,
                    "Delivered payment status notification"
                );
            }
        }
        Ok(())
    }
}
