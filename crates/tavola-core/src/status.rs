//! # Status Enumerations & Transition Tables
//!
//! Every status field in the system is a closed enumeration. Strings coming
//! from the outside are parsed with `FromStr` (unknown value → validation
//! error) and every change goes through an explicit transition table.
//!
//! ## Order State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │     ┌──────┐  first item / staff   ┌─────────────┐  completed payment   │
//! │     │ open │──────────────────────►│ in_progress │──────────────┐      │
//! │     └──┬───┘                       └──────┬──────┘              ▼      │
//! │        │                                  │              ┌───────────┐ │
//! │        │                                  │              │ completed │ │
//! │        │         ┌───────────┐            │              └───────────┘ │
//! │        └────────►│ cancelled │◄───────────┘                 terminal   │
//! │                  └───────────┘                                          │
//! │                     terminal                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Payment State Machine
//! ```text
//!   pending ──► completed   (terminal)
//!      │
//!      └──────► failed      (terminal, retries create a new payment)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};

// =============================================================================
// Order Status
// =============================================================================

/// The lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, no items yet.
    Open,
    /// Items are being served.
    InProgress,
    /// Settled by a completed payment.
    Completed,
    /// Abandoned.
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Open,
        OrderStatus::InProgress,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Returns true for `completed` and `cancelled`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Line items may only be created, modified or voided while this holds.
    pub fn accepts_item_changes(&self) -> bool {
        !self.is_terminal()
    }

    /// The transition table. Same-state "transitions" are not transitions.
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, target),
            (Open, InProgress)
                | (Open, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
        )
    }

    /// Validates `self → target` against the table.
    ///
    /// ## Example
    /// ```rust
    /// use tavola_core::OrderStatus;
    ///
    /// assert!(OrderStatus::Open.transition_to(OrderStatus::InProgress).is_ok());
    /// assert!(OrderStatus::Completed.transition_to(OrderStatus::Open).is_err());
    /// ```
    pub fn transition_to(&self, target: OrderStatus) -> CoreResult<OrderStatus> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(CoreError::transition("Order", self, target))
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Open
    }
}

// =============================================================================
// Order Item Status
// =============================================================================

/// Whether a line item counts towards the order total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderItemStatus {
    /// Counted in the total.
    Active,
    /// Excluded from the total, kept for audit.
    Voided,
}

impl OrderItemStatus {
    pub const ALL: [OrderItemStatus; 2] = [OrderItemStatus::Active, OrderItemStatus::Voided];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderItemStatus::Active => "active",
            OrderItemStatus::Voided => "voided",
        }
    }

    /// A voided item stays voided; staff re-add the dish instead.
    pub fn transition_to(&self, target: OrderItemStatus) -> CoreResult<OrderItemStatus> {
        match (self, target) {
            (OrderItemStatus::Active, OrderItemStatus::Voided) => Ok(target),
            (from, to) => Err(CoreError::transition("Order item", from, to)),
        }
    }
}

impl Default for OrderItemStatus {
    fn default() -> Self {
        OrderItemStatus::Active
    }
}

// =============================================================================
// Payment Status
// =============================================================================

/// The settlement status of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 3] = [
        PaymentStatus::Pending,
        PaymentStatus::Completed,
        PaymentStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }

    /// `pending` and `completed` payments block a second payment on the order.
    pub fn is_active(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Completed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Failed)
    }

    pub fn can_transition_to(&self, target: PaymentStatus) -> bool {
        matches!(
            (self, target),
            (PaymentStatus::Pending, PaymentStatus::Completed)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
        )
    }

    pub fn transition_to(&self, target: PaymentStatus) -> CoreResult<PaymentStatus> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(CoreError::transition("Payment", self, target))
        }
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash at the counter.
    Cash,
    /// Card on the restaurant terminal.
    Card,
    /// Paid online from the table QR page.
    Online,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] =
        [PaymentMethod::Cash, PaymentMethod::Card, PaymentMethod::Online];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Online => "online",
        }
    }
}

// =============================================================================
// Table Status
// =============================================================================

/// Occupancy of a dining table. No transition table: any state may follow any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Available,
    Occupied,
    Reserved,
}

impl TableStatus {
    pub const ALL: [TableStatus; 3] =
        [TableStatus::Available, TableStatus::Occupied, TableStatus::Reserved];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableStatus::Available => "available",
            TableStatus::Occupied => "occupied",
            TableStatus::Reserved => "reserved",
        }
    }
}

impl Default for TableStatus {
    fn default() -> Self {
        TableStatus::Available
    }
}

// =============================================================================
// Display / FromStr
// =============================================================================

/// Implements `Display` via `as_str` and a case-insensitive `FromStr` that
/// rejects unknown values with `ValidationError::NotAllowed`.
macro_rules! string_enum {
    ($ty:ident, $field:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_lowercase();
                $ty::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| {
                        let allowed: Vec<&str> = $ty::ALL.iter().map(|v| v.as_str()).collect();
                        ValidationError::not_allowed($field, &allowed)
                    })
            }
        }
    };
}

string_enum!(OrderStatus, "status");
string_enum!(OrderItemStatus, "status");
string_enum!(PaymentStatus, "status");
string_enum!(PaymentMethod, "payment_method");
string_enum!(TableStatus, "status");

// =============================================================================
// Unit Tests
// =============================================================================
