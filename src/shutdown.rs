//! Signal handling and the teardown sequence
//!
//! Teardown order:
//! 1. Cancel the scheduler and wait for the in-flight cycle to finish
//! 2. Close the store (and with it the backend connection)
//!
//! A failing step is logged and the next one still runs.

use crate::scheduler::SchedulerStats;
use crate::store::StoreSlot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct ShutdownError {
    step: &'static str,
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl ShutdownError {
    pub fn new(step: &'static str, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            step,
            source: Box::new(source),
        }
    }
}

impl std::fmt::Display for ShutdownError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Shutdown step '{}' failed: {}", self.step, self.source)
    }
}

impl std::error::Error for ShutdownError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Resolve on SIGINT (CTRL+C) or, on unix, SIGTERM
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            log::error!("❌ Failed to listen for CTRL+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                log::error!("❌ Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("⚠️  Received SIGINT, shutting down..."),
        _ = terminate => log::info!("⚠️  Received SIGTERM, shutting down..."),
    }
}

/// Stop the scheduler, then close the store. Returns every step that failed.
pub async fn teardown(
    cancel: &CancellationToken,
    scheduler: JoinHandle<SchedulerStats>,
    slot: &StoreSlot,
) -> Vec<ShutdownError> {
    let mut errors = Vec::new();

    cancel.cancel();
    match scheduler.await {
        Ok(stats) => log::info!(
            "✅ Scheduler stopped ({} cycles, {} failed, {} name ops ingested)",
            stats.cycles,
            stats.failed_cycles,
            stats.name_ops_ingested
        ),
        Err(e) => {
            let err = ShutdownError::new("stop scheduler", e);
            log::error!("❌ {}", err);
            errors.push(err);
        }
    }

    if let Err(err) = slot.shutdown().await {
        log::error!("❌ {}", err);
        errors.push(err);
    }

    if errors.is_empty() {
        log::info!("✅ Cleanup completed");
    }
    errors
}
