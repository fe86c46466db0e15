//! Synthetic name-operation source
//!
//! Produces what a chain scan of the current day would look like:
//! - height: current unix time in seconds
//! - date: today (UTC)
//! - `min_ops..=max_ops` operations spread through the day at 1s steps
//! - namespace prefixes `""`, `e/`, `pe/`, `poe/`, `nft/`, `bp/`
//! - ~30% empty name values

use super::{ScanBatch, ScanError, Scanner};
use crate::model::NameOp;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rand::Rng;

const PREFIXES: [&str; 6] = ["", "e/", "pe/", "poe/", "nft/", "bp/"];

pub struct MockScanner {
    min_ops: usize,
    max_ops: usize,
}

impl MockScanner {
    pub fn new(min_ops: usize, max_ops: usize) -> Self {
        Self {
            min_ops: min_ops.min(max_ops),
            max_ops: max_ops.max(min_ops),
        }
    }

    /// Build `count` operations for `date`
    pub fn generate(&self, date: NaiveDate, count: usize) -> Result<Vec<NameOp>, ScanError> {
        let day_start = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| ScanError::InvalidData(format!("no midnight for {}", date)))?
            .and_utc()
            .timestamp_millis();
        let stamp = Utc::now().timestamp_millis();
        let mut rng = rand::thread_rng();

        Ok((0..count)
            .map(|i| {
                let prefix = PREFIXES[rng.gen_range(0..PREFIXES.len())];
                let name_value = if rng.gen_bool(0.7) {
                    format!("value{}", i)
                } else {
                    String::new()
                };
                NameOp {
                    name_id: format!("{}test{}", prefix, i),
                    name_value,
                    blocktime: day_start + (i as i64) * 1000,
                    txid: format!("tx{}{}", stamp, i),
                    address: format!("addr{}", i),
                    vout: (i % 3) as u32,
                    op_type: "name_op".to_string(),
                }
            })
            .collect())
    }
}

impl Default for MockScanner {
    fn default() -> Self {
        Self::new(50, 150)
    }
}

#[async_trait]
impl Scanner for MockScanner {
    async fn scan(&self) -> Result<ScanBatch, ScanError> {
        let now = Utc::now();
        let height = u64::try_from(now.timestamp())
            .map_err(|_| ScanError::Source("clock is before the unix epoch".to_string()))?;
        let date = now.date_naive();

        let count = rand::thread_rng().gen_range(self.min_ops..=self.max_ops);
        let batch = self.generate(date, count)?;

        log::debug!("🎲 Generated {} mock name operations", batch.len());

        Ok(ScanBatch { height, date, batch })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ops_shape() {
        let scanner = MockScanner::default();
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let ops = scanner.generate(date, 5).unwrap();

        let midnight = 1_704_153_600_000i64; // 2024-01-02T00:00:00Z
        for (i, op) in ops.iter().enumerate() {
            assert!(op.name_id.ends_with(&format!("test{}", i)));
            assert!(PREFIXES.iter().any(|p| op.name_id == format!("{}test{}", p, i)));
            assert_eq!(op.blocktime, midnight + i as i64 * 1000);
            assert_eq!(op.vout, (i % 3) as u32);
            assert_eq!(op.op_type, "name_op");
            assert!(op.name_value.is_empty() || op.name_value == format!("value{}", i));
        }
    }

    #[tokio::test]
    async fn test_scan_batch_size_within_bounds() {
        let scanner = MockScanner::new(3, 7);
        for _ in 0..20 {
            let scan = scanner.scan().await.unwrap();
            assert!((3..=7).contains(&scan.batch.len()));
            assert!(scan.height > 0);
        }
    }

    #[test]
    fn test_swapped_bounds_are_normalized() {
        let scanner = MockScanner::new(9, 2);
        assert_eq!((scanner.min_ops, scanner.max_ops), (2, 9));
    }
}
