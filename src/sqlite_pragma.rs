//! Shared SQLite connection tuning

use rusqlite::Connection;
use std::time::Duration;

/// Apply the PRAGMAs every connection to the documents database uses:
/// WAL journal, NORMAL sync, in-memory temp store and a 16MB page cache.
pub fn apply_optimized_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    // journal_mode answers with the mode actually in effect
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    if !mode.eq_ignore_ascii_case("wal") {
        log::warn!("⚠️  SQLite journal_mode is '{}' (WAL not available)", mode);
    }

    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    conn.pragma_update(None, "cache_size", -16_000)?;
    conn.busy_timeout(Duration::from_secs(5))?;

    Ok(())
}
