//! Periodic scan → ingest loop
//!
//! One cycle: `Scanner::scan()` → `NameOpsStore::ingest(date, height, batch)`.
//! Cycles never overlap; the next one starts `max(0, interval - elapsed)` after
//! the previous one started. A failed cycle is logged and the loop carries on.
//! Cancellation is checked between cycles, so an in-flight ingest always completes.

use crate::model::DocId;
use crate::retry::RetryPolicy;
use crate::scanner::{ScanError, Scanner};
use crate::store::{NameOpsStore, StoreError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Target time between cycle starts
    pub interval: Duration,
    /// Retries applied separately to the scan and to the ingest of a cycle
    pub retry: RetryPolicy,
}

#[derive(Debug)]
pub enum CycleError {
    Scan(ScanError),
    Store(StoreError),
}

impl std::fmt::Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleError::Scan(e) => write!(f, "Scan failure: {}", e),
            CycleError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CycleError::Scan(e) => Some(e),
            CycleError::Store(e) => Some(e),
        }
    }
}

impl From<ScanError> for CycleError {
    fn from(err: ScanError) -> Self {
        CycleError::Scan(err)
    }
}

impl From<StoreError> for CycleError {
    fn from(err: StoreError) -> Self {
        CycleError::Store(err)
    }
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub doc_id: DocId,
    pub height: u64,
    pub name_ops: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub cycles: u64,
    pub successful_cycles: u64,
    pub failed_cycles: u64,
    pub name_ops_ingested: u64,
}

pub struct Scheduler {
    scanner: Arc<dyn Scanner>,
    store: Arc<NameOpsStore>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(scanner: Arc<dyn Scanner>, store: Arc<NameOpsStore>, config: SchedulerConfig) -> Self {
        Self {
            scanner,
            store,
            config,
        }
    }

    /// Run the loop on a background task
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<SchedulerStats> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    /// Run until `cancel` fires; returns the counters at exit
    pub async fn run(&self, cancel: CancellationToken) -> SchedulerStats {
        log::info!(
            "⏰ Starting scan scheduler (scanner: {}, interval: {}ms, retries: {})",
            self.scanner.name(),
            self.config.interval.as_millis(),
            self.config.retry.max_retries
        );

        let mut stats = SchedulerStats::default();
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            stats.cycles += 1;
            match self.run_cycle(&cancel).await {
                Ok(report) => {
                    stats.successful_cycles += 1;
                    stats.name_ops_ingested += report.name_ops as u64;
                    log::info!(
                        "✅ Cycle {}: {} name ops → {} (height {}) in {}ms",
                        stats.cycles,
                        report.name_ops,
                        report.doc_id,
                        report.height,
                        report.elapsed.as_millis()
                    );
                    match self.store.stats().await {
                        Ok(s) => log::info!(
                            "📊 Store totals: {} documents, {} name ops",
                            s.documents,
                            s.name_ops
                        ),
                        Err(e) => log::warn!("⚠️  Store totals unavailable: {}", e),
                    }
                }
                Err(e) => {
                    stats.failed_cycles += 1;
                    log::error!("❌ Cycle {} failed: {}", stats.cycles, e);
                }
            }
        }

        log::info!("🛑 Scan scheduler stopped after {} cycles", stats.cycles);
        stats
    }

    /// One scan + ingest, each with its own retry budget
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> Result<CycleReport, CycleError> {
        let started = Instant::now();

        let mut backoff = self.config.retry.backoff();
        let scan = loop {
            match self.scanner.scan().await {
                Ok(scan) => break scan,
                Err(e) => {
                    log::warn!("⚠️  Scan failed: {}", e);
                    if backoff.sleep(cancel).await.is_err() {
                        return Err(e.into());
                    }
                }
            }
        };

        let name_ops = scan.batch.len();
        let mut backoff = self.config.retry.backoff();
        let doc_id = loop {
            match self.store.ingest(scan.date, scan.height, scan.batch.clone()).await {
                Ok(doc_id) => break doc_id,
                Err(e) => {
                    log::warn!("⚠️  Ingest failed: {}", e);
                    if backoff.sleep(cancel).await.is_err() {
                        return Err(e.into());
                    }
                }
            }
        };

        Ok(CycleReport {
            doc_id,
            height: scan.height,
            name_ops,
            elapsed: started.elapsed(),
        })
    }
}
