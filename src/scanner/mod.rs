//! Scanner contract: where each cycle's batch of name operations comes from
//!
//! Real chain scanning lives outside this crate; anything implementing
//! `Scanner` can drive the scheduler. `MockScanner` generates synthetic
//! batches for local runs.

pub mod mock;

use crate::model::NameOp;
use async_trait::async_trait;
use chrono::NaiveDate;

pub use mock::MockScanner;

/// One scan result: a batch tagged with the chain height and calendar date it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct ScanBatch {
    pub height: u64,
    pub date: NaiveDate,
    pub batch: Vec<NameOp>,
}

#[derive(Debug)]
pub enum ScanError {
    /// The chain source could not be reached or answered with an error
    Source(String),
    /// The source answered with data that could not be turned into name operations
    InvalidData(String),
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanError::Source(e) => write!(f, "Scan source error: {}", e),
            ScanError::InvalidData(e) => write!(f, "Invalid scan data: {}", e),
        }
    }
}

impl std::error::Error for ScanError {}

#[async_trait]
pub trait Scanner: Send + Sync {
    async fn scan(&self) -> Result<ScanBatch, ScanError>;

    /// Get scanner name for logging
    fn name(&self) -> &'static str;
}
