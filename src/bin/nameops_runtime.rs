//! Name-ops runtime
//!
//! - Opens the document backend and the name-ops store
//! - Spawns the scan scheduler (mock scanner → store ingest)
//! - On SIGINT/SIGTERM: stops the scheduler, closes the store, exits
//!
//! Usage:
//!   cargo run --release --bin nameops_runtime
//!
//! Environment variables:
//!   NAMEOPS_DB_PATH - SQLite database path (default: data/nameops.db)
//!   NAMEOPS_BACKEND - sqlite | memory (default: sqlite)
//!   NAMEOPS_DOC_ID_SCHEME - date | date-height (default: date)
//!   SCAN_INTERVAL_MS - Target time between scans (default: 10000)
//!   SCAN_MAX_RETRIES - Retries per scan/ingest (default: 0)

use dotenv::dotenv;
use log::{error, info};
use nameops::{open_backend, MockScanner, RuntimeConfig, Scheduler, StoreSlot};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    info!("🚀 Name-ops runtime");

    let config = RuntimeConfig::from_env()?;

    info!("   ├─ Backend: {:?}", config.backend);
    info!("   ├─ Database: {}", config.db_path);
    info!("   ├─ Collection: {}", config.collection);
    info!("   ├─ Writer: {}", config.writer_id);
    info!("   ├─ Doc ids: {:?}", config.doc_id_scheme);
    info!("   ├─ Scan interval: {}ms", config.scan_interval_ms);
    info!("   └─ Backend timeout: {}ms", config.backend_timeout_ms);

    let backend = open_backend(&config)?;
    let slot = StoreSlot::new();
    let store = slot.get_or_open(backend, config.store_options()).await?;

    match store.stats().await {
        Ok(stats) => info!(
            "📊 Store holds {} documents, {} name ops",
            stats.documents, stats.name_ops
        ),
        Err(e) => error!("❌ Could not read store totals: {}", e),
    }

    let scanner = Arc::new(MockScanner::new(config.mock_min_ops, config.mock_max_ops));
    let cancel = CancellationToken::new();
    let scheduler =
        Scheduler::new(scanner, store, config.scheduler_config()).spawn(cancel.clone());

    info!("🔄 Press CTRL+C to shutdown gracefully");
    nameops::shutdown::wait_for_signal().await;

    let errors = nameops::shutdown::teardown(&cancel, scheduler, &slot).await;
    if !errors.is_empty() {
        error!("❌ Teardown finished with {} error(s)", errors.len());
    }

    info!("✅ Name-ops runtime stopped");
    Ok(())
}
