//! # Menu Repository
//!
//! Price lookups for the billing engine. Menu CRUD belongs to another
//! service; the writes here exist for seeding and tests.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tavola_core::MenuItem;

macro_rules! menu_columns {
    () => {
        "id, name, price_cents, category, is_available, created_at"
    };
}

/// Repository for menu items.
#[derive(Debug, Clone)]
pub struct MenuRepository {
    pool: SqlitePool,
}

impl MenuRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MenuRepository { pool }
    }

    /// Gets a menu item by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<MenuItem>> {
        let item = sqlx::query_as::<_, MenuItem>(concat!(
            "SELECT ",
            menu_columns!(),
            " FROM menu_items WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Lists the whole menu, by category then name.
    pub async fn list(&self) -> DbResult<Vec<MenuItem>> {
        let items = sqlx::query_as::<_, MenuItem>(concat!(
            "SELECT ",
            menu_columns!(),
            " FROM menu_items ORDER BY category ASC, name ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Inserts a menu item.
    pub async fn insert(&self, item: &MenuItem) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert(&mut conn, item).await
    }

    /// Marks a dish as (un)available, e.g. when the kitchen runs out.
    pub async fn set_available(&self, id: &str, available: bool) -> DbResult<()> {
        debug!(menu_id = %id, available, "Updating menu availability");

        let result = sqlx::query("UPDATE menu_items SET is_available = ?2 WHERE id = ?1")
            .bind(id)
            .bind(available)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("MenuItem", id));
        }

        Ok(())
    }

    /// Counts menu items.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM menu_items")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Inserts a menu item on an existing connection.
pub async fn insert(conn: &mut SqliteConnection, item: &MenuItem) -> DbResult<()> {
    debug!(menu_id = %item.id, name = %item.name, "Inserting menu item");

    sqlx::query(
        r#"
        INSERT INTO menu_items (id, name, price_cents, category, is_available, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&item.id)
    .bind(&item.name)
    .bind(item.price_cents)
    .bind(&item.category)
    .bind(item.is_available)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Builds a fresh menu item with a new ID.
pub fn new_item(name: &str, price_cents: i64, category: Option<&str>) -> MenuItem {
    MenuItem {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        price_cents,
        category: category.map(str::to_string),
        is_available: true,
        created_at: Utc::now(),
    }
}
