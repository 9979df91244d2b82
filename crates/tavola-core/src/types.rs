//! # Domain Types
//!
//! Entity snapshots and request inputs used throughout Tavola POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Table       │   │     Order       │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  table_id (FK)  │◄──│  order_id (FK)  │       │
//! │  │  number         │   │  status         │   │  method         │       │
//! │  │  name, qr_text  │   │  total_price    │   │  amount (snap)  │       │
//! │  └─────────────────┘   └────────▲────────┘   └─────────────────┘       │
//! │                                 │                                       │
//! │  ┌─────────────────┐   ┌────────┴────────┐                              │
//! │  │    MenuItem     │   │   OrderItem     │                              │
//! │  │  ─────────────  │   │  ─────────────  │                              │
//! │  │  price_cents    │──►│  price (snap)   │                              │
//! │  │  is_available   │   │  quantity       │                              │
//! │  └─────────────────┘   └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Snapshots are what the engine hands back after every committed operation.
//! They derive `sqlx::FromRow` when the `sqlx` feature is enabled so the
//! database layer can map rows straight into them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::status::{OrderItemStatus, OrderStatus, PaymentMethod, PaymentStatus, TableStatus};
use crate::validation::{validate_page, ValidationResult};

// =============================================================================
// Order
// =============================================================================

/// A customer's tab at a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Customer the order is for, if known.
    pub customer_id: Option<String>,

    /// Staff member who opened the order.
    pub staff_id: String,

    /// Table the order is served at.
    pub table_id: String,

    /// Derived total in cents. Only the price ledger writes this.
    pub total_price_cents: i64,

    pub status: OrderStatus,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }
}

/// Input for opening a new order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewOrder {
    pub customer_id: Option<String>,
    pub staff_id: String,
    pub table_id: String,
}

// =============================================================================
// Order Item
// =============================================================================

/// One line on an order.
///
/// `price_cents` is copied from the menu when the line is created and never
/// re-read afterwards, so later menu price changes leave the bill alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub menu_id: String,
    pub quantity: i64,

    /// Unit price snapshot in cents.
    pub price_cents: i64,

    /// Free-text kitchen note ("no onions").
    pub note: String,

    pub status: OrderItemStatus,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl OrderItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// `price × quantity`, regardless of status.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }

    /// What this line contributes to the order total.
    pub fn contribution(&self) -> Money {
        match self.status {
            OrderItemStatus::Active => self.line_total(),
            OrderItemStatus::Voided => Money::zero(),
        }
    }
}

/// Input for adding a line item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewOrderItem {
    pub order_id: String,
    pub menu_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub note: String,
}

/// Partial update of a line item. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderItemUpdate {
    pub quantity: Option<i64>,
    pub note: Option<String>,
    pub status: Option<OrderItemStatus>,
}

impl OrderItemUpdate {
    pub fn is_empty(&self) -> bool {
        self.quantity.is_none() && self.note.is_none() && self.status.is_none()
    }

    /// Quantity and status changes move the order total; notes do not.
    pub fn affects_total(&self) -> bool {
        self.quantity.is_some() || self.status.is_some()
    }
}

/// A line item together with the order total committed alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ItemChange {
    pub item: OrderItem,
    pub order_total_cents: i64,
}

impl ItemChange {
    pub fn order_total(&self) -> Money {
        Money::from_cents(self.order_total_cents)
    }
}

// =============================================================================
// Payment
// =============================================================================

/// A settlement attempt against an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    pub method: PaymentMethod,

    /// Order total at the instant the payment was created.
    pub amount_cents: i64,

    pub status: PaymentStatus,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// A payment together with its order, both as committed.
///
/// Completing a payment may complete the order in the same transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentChange {
    pub payment: Payment,
    pub order: Order,
}

// =============================================================================
// Table
// =============================================================================

/// A dining table. Its QR code points guests at the table's ordering page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Table {
    pub id: String,

    /// Sequential table number, unique.
    pub number: i64,

    /// Display name, `Table-<number>`.
    pub name: String,

    /// Text encoded in the QR code.
    pub qr_text: String,

    /// Rendered QR image, once the upload collaborator has produced one.
    pub qr_image_url: Option<String>,

    pub status: TableStatus,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Table {
    pub fn display_name(number: i64) -> String {
        format!("Table-{}", number)
    }

    pub fn qr_text_for(base_url: &str, number: i64) -> String {
        format!("{}/table/{}", base_url.trim_end_matches('/'), number)
    }
}

// =============================================================================
// Menu Item
// =============================================================================

/// A dish on the menu. Read-only to the billing engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    pub category: Option<String>,
    pub is_available: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl MenuItem {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Aggregates
// =============================================================================

/// An order with everything hanging off it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payments: Vec<Payment>,
}

impl OrderDetail {
    /// Total recomputed in memory from the loaded items.
    pub fn items_total(&self) -> Money {
        self.items.iter().map(OrderItem::contribution).sum()
    }

    /// The pending or completed payment, if any.
    pub fn active_payment(&self) -> Option<&Payment> {
        self.payments.iter().find(|p| p.status.is_active())
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// A page request for list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Page {
    /// 1-based page number.
    pub page_id: i64,
    pub page_size: i64,
}

impl Page {
    /// Builds a validated page (`page_id >= 1`, `5 <= page_size <= 10`).
    pub fn new(page_id: i64, page_size: i64) -> ValidationResult<Self> {
        validate_page(page_id, page_size)?;
        Ok(Page { page_id, page_size })
    }

    #[inline]
    pub fn limit(&self) -> i64 {
        self.page_size
    }

    #[inline]
    pub fn offset(&self) -> i64 {
        (self.page_id - 1) * self.page_size
    }

    /// Re-checks a page that arrived through deserialization.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_page(self.page_id, self.page_size)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
