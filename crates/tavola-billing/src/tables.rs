//! # Table Occupancy
//!
//! Dining tables and their availability flag.
//!
//! A table's status is managed by staff and is deliberately independent of
//! the orders served at it: opening or closing an order never flips it.
//! Any of the three states may be set from any other, including itself.

use chrono::Utc;
use tavola_core::validation::validate_uuid;
use tavola_core::{Page, Table, TableStatus};
use tavola_db::repository::{order, table};
use tracing::info;
use uuid::Uuid;

use crate::engine::BillingEngine;
use crate::error::{BillingError, BillingResult};

pub struct TableOccupancy<'a> {
    engine: &'a BillingEngine,
}

impl<'a> TableOccupancy<'a> {
    pub(crate) fn new(engine: &'a BillingEngine) -> Self {
        TableOccupancy { engine }
    }

    /// Creates the next table in sequence with its generated name and QR text.
    ///
    /// Two concurrent creations can race for the same number; the loser gets
    /// a retryable conflict.
    pub async fn create_table(&self) -> BillingResult<Table> {
        let now = Utc::now();
        let mut tx = self.engine.db().begin().await?;

        let number = table::next_number(&mut tx).await?;
        let created = Table {
            id: Uuid::new_v4().to_string(),
            number,
            name: Table::display_name(number),
            qr_text: Table::qr_text_for(self.engine.qr_base_url(), number),
            qr_image_url: None,
            status: TableStatus::Available,
            created_at: now,
            updated_at: now,
        };
        table::insert(&mut tx, &created).await?;
        tx.commit().await?;

        info!(table_id = %created.id, number, "Table created");
        Ok(created)
    }

    pub async fn get_table(&self, table_id: &str) -> BillingResult<Table> {
        validate_uuid("table_id", table_id)?;

        self.engine
            .db()
            .tables()
            .get_by_id(table_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Table", table_id))
    }

    /// Ordered by table number.
    pub async fn list_tables(&self, page: Page) -> BillingResult<Vec<Table>> {
        page.validate()?;
        Ok(self
            .engine
            .db()
            .tables()
            .list(page.limit(), page.offset())
            .await?)
    }

    pub async fn set_table_status(
        &self,
        table_id: &str,
        status: TableStatus,
    ) -> BillingResult<Table> {
        validate_uuid("table_id", table_id)?;

        let mut tx = self.engine.db().begin().await?;
        let updated = table::set_status(&mut tx, table_id, status, Utc::now()).await?;
        tx.commit().await?;

        info!(table_id = %table_id, status = %status, "Table status changed");
        Ok(updated)
    }

    /// Removes a table that no open or in-progress order is using.
    pub async fn delete_table(&self, table_id: &str) -> BillingResult<()> {
        validate_uuid("table_id", table_id)?;

        let mut tx = self.engine.db().begin().await?;
        table::lock(&mut tx, table_id, Utc::now()).await?;

        let live = order::count_live_for_table(&mut tx, table_id).await?;
        if live > 0 {
            return Err(BillingError::invalid_state(format!(
                "Table {} still has {} open order(s)",
                table_id, live
            )));
        }

        table::delete(&mut tx, table_id).await?;
        tx.commit().await?;

        info!(table_id = %table_id, "Table deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{missing_id, Harness};
    use crate::error::ErrorKind;
    use tavola_core::OrderStatus;

    #[tokio::test]
    async fn test_tables_are_numbered_in_sequence() {
        let h = Harness::new().await;
        let second = h.engine.tables().create_table().await.unwrap();

        assert_eq!(h.table.number, 1);
        assert_eq!(second.number, 2);
        assert_eq!(second.name, "Table-2");
        assert_eq!(second.qr_text, "http://localhost:8080/table/2");
        assert_eq!(second.status, TableStatus::Available);

        let listed = h.engine.tables().list_tables(Page::new(1, 5).unwrap()).await.unwrap();
        let numbers: Vec<i64> = listed.iter().map(|t| t.number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_any_status_accepted() {
        let h = Harness::new().await;
        let tables = h.engine.tables();

        for status in [
            TableStatus::Occupied,
            TableStatus::Occupied,
            TableStatus::Reserved,
            TableStatus::Available,
        ] {
            let t = tables.set_table_status(&h.table.id, status).await.unwrap();
            assert_eq!(t.status, status);
        }

        let err = tables
            .set_table_status(&missing_id(), TableStatus::Reserved)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_table_status_independent_of_orders() {
        let h = Harness::new().await;
        let order = h.open_order().await;
        h.engine
            .orders()
            .set_order_status(&order.id, OrderStatus::Cancelled)
            .await
            .unwrap();

        let t = h.engine.tables().get_table(&h.table.id).await.unwrap();
        assert_eq!(t.status, TableStatus::Available);
    }

    #[tokio::test]
    async fn test_delete_refused_while_order_live() {
        let h = Harness::new().await;
        let order = h.open_order().await;

        let err = h.engine.tables().delete_table(&h.table.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        h.engine
            .orders()
            .set_order_status(&order.id, OrderStatus::Cancelled)
            .await
            .unwrap();
        h.engine.tables().delete_table(&h.table.id).await.unwrap();

        let err = h.engine.tables().get_table(&h.table.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        // the cancelled order survives as a record
        let kept = h.engine.orders().get_order(&order.id).await.unwrap();
        assert_eq!(kept.table_id, h.table.id);
    }
}
