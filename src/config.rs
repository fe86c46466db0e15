//! Runtime configuration from environment variables

use crate::model::DocIdScheme;
use crate::retry::RetryPolicy;
use crate::scheduler::SchedulerConfig;
use crate::store::StoreOptions;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    Sqlite,
    Memory,
}

impl BackendType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "sqlite" => Some(BackendType::Sqlite),
            "memory" => Some(BackendType::Memory),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration for the name-ops runtime
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Path to SQLite database file
    pub db_path: String,

    /// Collection holding the day documents
    pub collection: String,

    /// Writer identity; a newly created collection only accepts writes from it
    pub writer_id: String,

    pub backend: BackendType,

    pub doc_id_scheme: DocIdScheme,

    /// Target time between scan cycles in milliseconds
    pub scan_interval_ms: u64,

    /// Upper bound for a single backend call in milliseconds
    pub backend_timeout_ms: u64,

    /// Retries per scan and per ingest within one cycle (0 = fail the cycle at once)
    pub scan_max_retries: u32,

    pub retry_initial_delay_ms: u64,
    pub retry_max_delay_ms: u64,

    /// Batch size bounds for the mock scanner
    pub mock_min_ops: usize,
    pub mock_max_ops: usize,
}

impl RuntimeConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `NAMEOPS_DB_PATH` (default: data/nameops.db)
    /// - `NAMEOPS_COLLECTION` (default: nameops)
    /// - `NAMEOPS_WRITER_ID` (default: nameops-relay)
    /// - `NAMEOPS_BACKEND` (default: sqlite; or memory)
    /// - `NAMEOPS_DOC_ID_SCHEME` (default: date; or date-height)
    /// - `SCAN_INTERVAL_MS` (default: 10000)
    /// - `BACKEND_TIMEOUT_MS` (default: 5000)
    /// - `SCAN_MAX_RETRIES` (default: 0)
    /// - `RETRY_INITIAL_DELAY_MS` (default: 250)
    /// - `RETRY_MAX_DELAY_MS` (default: 5000)
    /// - `MOCK_MIN_OPS` / `MOCK_MAX_OPS` (default: 50 / 150)
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend = match env::var("NAMEOPS_BACKEND") {
            Ok(v) => BackendType::parse(&v).ok_or_else(|| {
                ConfigError::InvalidValue(format!("NAMEOPS_BACKEND must be sqlite or memory, got '{}'", v))
            })?,
            Err(_) => BackendType::Sqlite,
        };

        let doc_id_scheme = match env::var("NAMEOPS_DOC_ID_SCHEME") {
            Ok(v) => DocIdScheme::parse(&v).ok_or_else(|| {
                ConfigError::InvalidValue(format!(
                    "NAMEOPS_DOC_ID_SCHEME must be date or date-height, got '{}'",
                    v
                ))
            })?,
            Err(_) => DocIdScheme::Date,
        };

        let scan_interval_ms: u64 = parse_or("SCAN_INTERVAL_MS", 10_000);
        if scan_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "SCAN_INTERVAL_MS must be greater than 0".to_string(),
            ));
        }

        let backend_timeout_ms: u64 = parse_or("BACKEND_TIMEOUT_MS", 5_000);
        if backend_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "BACKEND_TIMEOUT_MS must be greater than 0".to_string(),
            ));
        }

        let writer_id = env::var("NAMEOPS_WRITER_ID").unwrap_or_else(|_| "nameops-relay".to_string());
        if writer_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "NAMEOPS_WRITER_ID cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            db_path: env::var("NAMEOPS_DB_PATH").unwrap_or_else(|_| "data/nameops.db".to_string()),
            collection: env::var("NAMEOPS_COLLECTION").unwrap_or_else(|_| "nameops".to_string()),
            writer_id,
            backend,
            doc_id_scheme,
            scan_interval_ms,
            backend_timeout_ms,
            scan_max_retries: parse_or("SCAN_MAX_RETRIES", 0),
            retry_initial_delay_ms: parse_or("RETRY_INITIAL_DELAY_MS", 250),
            retry_max_delay_ms: parse_or("RETRY_MAX_DELAY_MS", 5_000),
            mock_min_ops: parse_or("MOCK_MIN_OPS", 50),
            mock_max_ops: parse_or("MOCK_MAX_OPS", 150),
        })
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            name: self.collection.clone(),
            identity: self.writer_id.clone(),
            doc_id_scheme: self.doc_id_scheme,
            backend_timeout: Duration::from_millis(self.backend_timeout_ms),
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval: Duration::from_millis(self.scan_interval_ms),
            retry: RetryPolicy {
                max_retries: self.scan_max_retries,
                initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
                max_delay: Duration::from_millis(self.retry_max_delay_ms),
            },
        }
    }
}

fn parse_or<T: std::str::FromStr>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
