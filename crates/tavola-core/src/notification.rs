//! # Notification Tasks
//!
//! The messages the engine hands to the background worker after a commit.
//! A task is a kind (the queue routing key) plus a JSON payload.
//!
//! ```text
//!   engine tx ──commit──► enqueue(NotificationTask) ──► outbox ──► worker
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::status::{OrderStatus, PaymentStatus};

/// Routing key of a notification task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum NotificationKind {
    #[serde(rename = "task:item_added")]
    ItemAdded,
    #[serde(rename = "task:item_voided")]
    ItemVoided,
    #[serde(rename = "task:order_status_changed")]
    OrderStatusChanged,
    #[serde(rename = "task:payment_status_changed")]
    PaymentStatusChanged,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 4] = [
        NotificationKind::ItemAdded,
        NotificationKind::ItemVoided,
        NotificationKind::OrderStatusChanged,
        NotificationKind::PaymentStatusChanged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::ItemAdded => "task:item_added",
            NotificationKind::ItemVoided => "task:item_voided",
            NotificationKind::OrderStatusChanged => "task:order_status_changed",
            NotificationKind::PaymentStatusChanged => "task:payment_status_changed",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                let allowed: Vec<&str> = NotificationKind::ALL.iter().map(|k| k.as_str()).collect();
                ValidationError::not_allowed("task_kind", &allowed)
            })
    }
}

// =============================================================================
// Payloads
// =============================================================================

/// Payload of `task:item_added` and `task:item_voided`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ItemEvent {
    pub order_id: String,
    pub item_id: String,
    pub menu_id: String,
    pub quantity: i64,
    pub order_total_cents: i64,
}

/// Payload of `task:order_status_changed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderStatusEvent {
    pub order_id: String,
    pub table_id: String,
    pub from: OrderStatus,
    pub to: OrderStatus,
}

/// Payload of `task:payment_status_changed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentStatusEvent {
    pub payment_id: String,
    pub order_id: String,
    pub from: PaymentStatus,
    pub to: PaymentStatus,
    pub amount_cents: i64,
}

/// A unit of background work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationTask {
    pub kind: NotificationKind,
    pub payload: serde_json::Value,
}

impl NotificationTask {
    /// Serializes `payload` into a task of the given kind.
    pub fn new<T: Serialize>(
        kind: NotificationKind,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(NotificationTask {
            kind,
            payload: serde_json::to_value(payload)?,
        })
    }

    pub fn item_added(event: &ItemEvent) -> Result<Self, serde_json::Error> {
        Self::new(NotificationKind::ItemAdded, event)
    }

    pub fn item_voided(event: &ItemEvent) -> Result<Self, serde_json::Error> {
        Self::new(NotificationKind::ItemVoided, event)
    }

    pub fn order_status_changed(event: &OrderStatusEvent) -> Result<Self, serde_json::Error> {
        Self::new(NotificationKind::OrderStatusChanged, event)
    }

    pub fn payment_status_changed(event: &PaymentStatusEvent) -> Result<Self, serde_json::Error> {
        Self::new(NotificationKind::PaymentStatusChanged, event)
    }

    /// Decodes the payload back into its typed event.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(NotificationKind::ItemAdded.to_string(), "task:item_added");
        assert_eq!(
            "task:payment_status_changed".parse::<NotificationKind>().unwrap(),
            NotificationKind::PaymentStatusChanged
        );
        assert!("task:send_verify_email".parse::<NotificationKind>().is_err());

        let json = serde_json::to_string(&NotificationKind::OrderStatusChanged).unwrap();
        assert_eq!(json, "\"task:order_status_changed\"");
    }

    #[test]
    fn test_task_payload_decodes() {
        let event = OrderStatusEvent {
            order_id: "o-1".to_string(),
            table_id: "t-1".to_string(),
            from: OrderStatus::InProgress,
            to: OrderStatus::Completed,
        };
        let task = NotificationTask::order_status_changed(&event).unwrap();
        assert_eq!(task.kind, NotificationKind::OrderStatusChanged);
        assert_eq!(task.payload["to"], "completed");

        let decoded: OrderStatusEvent = task.decode().unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_wrong_payload_shape_fails_decode() {
        let task = NotificationTask {
            kind: NotificationKind::ItemAdded,
            payload: serde_json::json!({"unexpected": true}),
        };
        assert!(task.decode::<ItemEvent>().is_err());
    }
}
