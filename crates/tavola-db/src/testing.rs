//! Fixtures shared by the repository tests.

use chrono::Utc;
use tavola_core::{MenuItem, Order, OrderItem, OrderItemStatus, OrderStatus, Table, TableStatus};
use uuid::Uuid;

use crate::repository::{menu, order, table};
use crate::{Database, DbConfig};

pub fn table_row(number: i64) -> Table {
    let now = Utc::now();
    Table {
        id: Uuid::new_v4().to_string(),
        number,
        name: Table::display_name(number),
        qr_text: Table::qr_text_for("http://localhost:8080", number),
        qr_image_url: None,
        status: TableStatus::Available,
        created_at: now,
        updated_at: now,
    }
}

pub fn dish(name: &str, price_cents: i64) -> MenuItem {
    MenuItem {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        price_cents,
        category: Some("mains".to_string()),
        is_available: true,
        created_at: Utc::now(),
    }
}

pub fn line(order: &Order, dish: &MenuItem, quantity: i64, status: OrderItemStatus) -> OrderItem {
    let now = Utc::now();
    OrderItem {
        id: Uuid::new_v4().to_string(),
        order_id: order.id.clone(),
        menu_id: dish.id.clone(),
        quantity,
        price_cents: dish.price_cents,
        note: String::new(),
        status,
        created_at: now,
        updated_at: now,
    }
}

/// In-memory database with one table, one 9.50 dish and one open order.
pub async fn seeded() -> (Database, Order, MenuItem) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let now = Utc::now();

    let t = table_row(1);
    let risotto = dish("Risotto", 950);
    let o = Order {
        id: Uuid::new_v4().to_string(),
        customer_id: None,
        staff_id: Uuid::new_v4().to_string(),
        table_id: t.id.clone(),
        total_price_cents: 0,
        status: OrderStatus::Open,
        created_at: now,
        updated_at: now,
    };

    let mut conn = db.pool().acquire().await.unwrap();
    table::insert(&mut conn, &t).await.unwrap();
    menu::insert(&mut conn, &risotto).await.unwrap();
    order::insert(&mut conn, &o).await.unwrap();
    drop(conn);

    (db, o, risotto)
}
