//! # Tavola Server
//!
//! Hosts the billing engine and the notification worker.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. TavolaConfig::load(--config)   defaults → tavola.toml → TAVOLA_*   │
//! │  2. tracing                        RUST_LOG, else [logging] level      │
//! │  3. Database::new                  WAL, busy timeout, migrations       │
//! │  4. BillingEngine::new             outbox or disabled distributor      │
//! │  5. NotificationWorker::run        spawned, polls the outbox           │
//! │  6. Ctrl-C                         worker shutdown, pool close         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```bash
//! tavola-server --config ./tavola.toml
//! TAVOLA_CONFIG=/etc/tavola.toml tavola-server
//! RUST_LOG=tavola=debug,sqlx=warn tavola-server
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tavola_billing::{
    BillingEngine, DisabledDistributor, OutboxDistributor, TaskDistributor, TavolaConfig,
};
use tavola_db::Database;
use tavola_notify::{LogTaskProcessor, NotificationWorker, WorkerConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Delivered outbox entries older than this are purged at startup.
const OUTBOX_RETENTION_DAYS: i64 = 7;

/// Tavola POS server
#[derive(Debug, Parser)]
#[command(name = "tavola-server")]
#[command(about = "Order billing engine and notification worker", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path; defaults to the platform config directory
    #[arg(short, long, env = "TAVOLA_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = TavolaConfig::load(cli.config).context("Failed to load configuration")?;
    init_tracing(&config.logging.level);

    info!(
        database = %config.database.path.display(),
        notifications = config.notifications.enabled,
        "Starting Tavola server"
    );

    let db = Database::new(config.db_config())
        .await
        .context("Failed to open database")?;
    info!("Database ready");

    let distributor: Arc<dyn TaskDistributor> = if config.notifications.enabled {
        Arc::new(OutboxDistributor::new(db.clone()))
    } else {
        warn!("Notifications disabled; state changes will not be announced");
        Arc::new(DisabledDistributor)
    };
    let engine = BillingEngine::new(db.clone(), &config, distributor);
    info!(?engine, "Billing engine ready");

    let cutoff = chrono::Utc::now() - chrono::Duration::days(OUTBOX_RETENTION_DAYS);
    match db.outbox().purge_processed(cutoff).await {
        Ok(0) => {}
        Ok(purged) => info!(purged, "Purged delivered notifications"),
        Err(e) => warn!(error = %e, "Failed to purge notification outbox"),
    }

    let worker = if config.notifications.enabled {
        let (worker, handle) = NotificationWorker::new(
            db.clone(),
            Arc::new(LogTaskProcessor),
            WorkerConfig {
                poll_interval: config.notifications.poll_interval(),
                batch_size: config.notifications.batch_size,
            },
        );
        Some((tokio::spawn(worker.run()), handle))
    } else {
        None
    };

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    if let Some((task, handle)) = worker {
        if let Err(e) = handle.shutdown().await {
            warn!(error = %e, "Worker already stopped");
        }
        if let Err(e) = task.await {
            warn!(error = %e, "Worker task ended abnormally");
        }
    }

    db.close().await;
    info!("Tavola server stopped");
    Ok(())
}

/// `RUST_LOG` wins; otherwise the configured level for our crates.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},sqlx=warn")));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_flag_forms() {
        for args in [
            &["tavola-server", "--config", "./tavola.toml"][..],
            &["tavola-server", "--config=./tavola.toml"][..],
            &["tavola-server", "-c", "./tavola.toml"][..],
        ] {
            let cli = Cli::try_parse_from(args).unwrap();
            assert_eq!(cli.config, Some(PathBuf::from("./tavola.toml")));
        }
    }

    #[test]
    fn test_bad_arguments_rejected() {
        assert!(Cli::try_parse_from(["tavola-server", "--config"]).is_err());
        assert!(Cli::try_parse_from(["tavola-server", "--verbose"]).is_err());
    }
}
