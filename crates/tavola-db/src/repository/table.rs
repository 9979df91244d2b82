//! # Table Repository
//!
//! Dining tables. Numbers are sequential and unique; name and QR text are
//! derived from the number when the table is created.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tavola_core::{Table, TableStatus};

macro_rules! table_columns {
    () => {
        "id, number, name, qr_text, qr_image_url, status, created_at, updated_at"
    };
}

/// Repository for standalone table reads.
#[derive(Debug, Clone)]
pub struct TableRepository {
    pool: SqlitePool,
}

impl TableRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TableRepository { pool }
    }

    /// Gets a table by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Table>> {
        let table = sqlx::query_as::<_, Table>(concat!(
            "SELECT ",
            table_columns!(),
            " FROM dining_tables WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(table)
    }

    /// Lists tables by number.
    pub async fn list(&self, limit: i64, offset: i64) -> DbResult<Vec<Table>> {
        let tables = sqlx::query_as::<_, Table>(concat!(
            "SELECT ",
            table_columns!(),
            " FROM dining_tables ORDER BY number ASC LIMIT ?1 OFFSET ?2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(tables)
    }
}

// =============================================================================
// Transaction-scoped operations
// =============================================================================

/// The number the next created table gets.
pub async fn next_number(conn: &mut SqliteConnection) -> DbResult<i64> {
    let next: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(number), 0) + 1 FROM dining_tables")
        .fetch_one(&mut *conn)
        .await?;

    Ok(next)
}

/// Inserts a table row.
pub async fn insert(conn: &mut SqliteConnection, table: &Table) -> DbResult<()> {
    debug!(table_id = %table.id, number = table.number, "Inserting table");

    sqlx::query(
        r#"
        INSERT INTO dining_tables (
            id, number, name, qr_text, qr_image_url, status, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&table.id)
    .bind(table.number)
    .bind(&table.name)
    .bind(&table.qr_text)
    .bind(&table.qr_image_url)
    .bind(table.status)
    .bind(table.created_at)
    .bind(table.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Reads a table on the transaction's connection.
pub async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Table> {
    sqlx::query_as::<_, Table>(concat!(
        "SELECT ",
        table_columns!(),
        " FROM dining_tables WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Table", id))
}

/// Writes a table status.
pub async fn set_status(
    conn: &mut SqliteConnection,
    id: &str,
    status: TableStatus,
    now: DateTime<Utc>,
) -> DbResult<Table> {
    debug!(table_id = %id, status = %status, "Updating table status");

    sqlx::query_as::<_, Table>(concat!(
        "UPDATE dining_tables SET status = ?2, updated_at = ?3 WHERE id = ?1 RETURNING ",
        table_columns!()
    ))
    .bind(id)
    .bind(status)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Table", id))
}

/// Takes the write lock via the table row and returns it.
pub async fn lock(conn: &mut SqliteConnection, id: &str, now: DateTime<Utc>) -> DbResult<Table> {
    sqlx::query_as::<_, Table>(concat!(
        "UPDATE dining_tables SET updated_at = ?2 WHERE id = ?1 RETURNING ",
        table_columns!()
    ))
    .bind(id)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Table", id))
}

/// Hard-deletes a table.
pub async fn delete(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    debug!(table_id = %id, "Deleting table");

    let result = sqlx::query("DELETE FROM dining_tables WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Table", id));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seeded, table_row};

    #[tokio::test]
    async fn test_next_number_follows_max() {
        let (db, _, _) = seeded().await;
        let mut tx = db.begin().await.unwrap();

        assert_eq!(next_number(&mut tx).await.unwrap(), 2);
        insert(&mut tx, &table_row(7)).await.unwrap();
        assert_eq!(next_number(&mut tx).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_duplicate_number_rejected() {
        let (db, _, _) = seeded().await;
        let mut tx = db.begin().await.unwrap();

        let err = insert(&mut tx, &table_row(1)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_status_delete_and_list() {
        let (db, _, _) = seeded().await;
        let spare = table_row(2);

        let mut tx = db.begin().await.unwrap();
        insert(&mut tx, &spare).await.unwrap();
        let reserved = set_status(&mut tx, &spare.id, TableStatus::Reserved, Utc::now())
            .await
            .unwrap();
        assert_eq!(reserved.status, TableStatus::Reserved);
        tx.commit().await.unwrap();

        assert_eq!(db.tables().list(10, 0).await.unwrap().len(), 2);

        let mut tx = db.begin().await.unwrap();
        lock(&mut tx, &spare.id, Utc::now()).await.unwrap();
        delete(&mut tx, &spare.id).await.unwrap();
        assert!(get(&mut tx, &spare.id).await.unwrap_err().is_not_found());
        tx.commit().await.unwrap();

        let remaining = db.tables().list(10, 0).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "Table-1");
        assert!(db.tables().get_by_id(&spare.id).await.unwrap().is_none());
    }
}
