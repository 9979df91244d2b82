//! # Billing Engine
//!
//! Entry point that wires storage, configuration and the task distributor
//! together and hands out the five components.
//!
//! ```text
//!   BillingEngine
//!     ├── ledger()      → PriceLedger       recompute / audit totals
//!     ├── line_items()  → LineItemManager   add, update, void, delete
//!     ├── orders()      → OrderLifecycle    create, read, status
//!     ├── payments()    → PaymentReconciler create, settle
//!     └── tables()      → TableOccupancy    create, status, delete
//! ```
//!
//! Components borrow the engine; they are cheap to create per call.
//! Every mutating operation runs in one database transaction whose first
//! statement is a write on the affected order row, so concurrent operations
//! on the same order queue behind each other instead of interleaving.

use std::sync::Arc;
use tavola_core::NotificationTask;
use tavola_db::Database;
use tracing::warn;

use crate::config::TavolaConfig;
use crate::ledger::PriceLedger;
use crate::lifecycle::OrderLifecycle;
use crate::line_items::LineItemManager;
use crate::notify::{RetryPolicy, TaskDistributor};
use crate::payments::PaymentReconciler;
use crate::tables::TableOccupancy;

/// The order billing and status consistency engine.
#[derive(Clone)]
pub struct BillingEngine {
    db: Database,
    distributor: Arc<dyn TaskDistributor>,
    retry_policy: RetryPolicy,
    qr_base_url: String,
}

impl BillingEngine {
    pub fn new(db: Database, config: &TavolaConfig, distributor: Arc<dyn TaskDistributor>) -> Self {
        BillingEngine {
            db,
            distributor,
            retry_policy: config.notifications.retry_policy(),
            qr_base_url: config.tables.qr_base_url.clone(),
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn ledger(&self) -> PriceLedger<'_> {
        PriceLedger::new(self)
    }

    pub fn line_items(&self) -> LineItemManager<'_> {
        LineItemManager::new(self)
    }

    pub fn orders(&self) -> OrderLifecycle<'_> {
        OrderLifecycle::new(self)
    }

    pub fn payments(&self) -> PaymentReconciler<'_> {
        PaymentReconciler::new(self)
    }

    pub fn tables(&self) -> TableOccupancy<'_> {
        TableOccupancy::new(self)
    }

    pub(crate) fn qr_base_url(&self) -> &str {
        &self.qr_base_url
    }

    /// Enqueues a task after the caller's transaction has committed.
    ///
    /// Never fails: the change is already durable, so a lost notification is
    /// only logged.
    pub(crate) async fn dispatch(&self, task: Result<NotificationTask, serde_json::Error>) {
        let task = match task {
            Ok(task) => task,
            Err(e) => {
                warn!(error = %e, "Failed to build notification payload");
                return;
            }
        };

        let kind = task.kind;
        if let Err(e) = self.distributor.enqueue(task, self.retry_policy).await {
            warn!(kind = %kind, error = %e, "Failed to enqueue notification");
        }
    }
}

impl std::fmt::Debug for BillingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillingEngine")
            .field("retry_policy", &self.retry_policy)
            .field("qr_base_url", &self.qr_base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures shared by the component tests.

    use super::*;
    use crate::notify::testing::RecordingDistributor;
    use tavola_core::{MenuItem, NewOrder, Order, Table};
    use tavola_db::repository::menu;
    use tavola_db::DbConfig;
    use uuid::Uuid;

    pub struct Harness {
        pub engine: BillingEngine,
        pub recorder: Arc<RecordingDistributor>,
        pub table: Table,
    }

    impl Harness {
        pub async fn new() -> Self {
            let db = Database::new(DbConfig::in_memory()).await.unwrap();
            Self::with_db(db).await
        }

        pub async fn with_db(db: Database) -> Self {
            let recorder = Arc::new(RecordingDistributor::default());
            let engine = BillingEngine::new(db, &TavolaConfig::default(), recorder.clone());
            let table = engine.tables().create_table().await.unwrap();
            Harness { engine, recorder, table }
        }

        pub async fn dish(&self, name: &str, price_cents: i64) -> MenuItem {
            let item = menu::new_item(name, price_cents, Some("mains"));
            self.engine.db().menu().insert(&item).await.unwrap();
            item
        }

        pub async fn open_order(&self) -> Order {
            self.engine
                .orders()
                .create_order(NewOrder {
                    customer_id: None,
                    staff_id: Uuid::new_v4().to_string(),
                    table_id: self.table.id.clone(),
                })
                .await
                .unwrap()
        }

        pub fn clear_tasks(&self) {
            self.recorder.tasks.lock().unwrap().clear();
        }
    }

    /// A syntactically valid id that names nothing.
    pub fn missing_id() -> String {
        Uuid::new_v4().to_string()
    }
}
