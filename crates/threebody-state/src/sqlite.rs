use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension};
use threebody_models::DashboardRecord;
use tracing::debug;

use crate::error::StateError;
use crate::StateStore;

pub const STATE_TABLE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS dashboard_state (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    record_json TEXT NOT NULL,
    updated_at TEXT NOT NULL
);";

/// Dashboard record kept as a single row in SQLite.
///
/// Uses WAL so a dashboard can read while the agent writes. Each save
/// replaces row 1 inside a transaction.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the state database at `path`.
    pub fn open(path: &str) -> Result<Self, StateError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(STATE_TABLE_DDL)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database for testing.
    pub fn open_in_memory() -> Result<Self, StateError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(STATE_TABLE_DDL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Number of stored rows. Never more than one.
    pub fn count(&self) -> Result<usize, StateError> {
        let conn = self.conn.lock().map_err(|_| StateError::Poisoned)?;
        let count: usize =
            conn.query_row("SELECT COUNT(*) FROM dashboard_state", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl StateStore for SqliteStore {
    fn save(&self, record: &DashboardRecord) -> Result<(), StateError> {
        let record_json = serde_json::to_string(record)?;
        let mut conn = self.conn.lock().map_err(|_| StateError::Poisoned)?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO dashboard_state (id, record_json, updated_at) \
             VALUES (1, ?1, ?2)",
            rusqlite::params![record_json, record.timestamp.to_rfc3339()],
        )?;
        tx.commit()?;
        debug!(cycle_id = %record.cycle_id, "Dashboard state row replaced");
        Ok(())
    }

    fn load(&self) -> Result<Option<DashboardRecord>, StateError> {
        let conn = self.conn.lock().map_err(|_| StateError::Poisoned)?;
        let json: Option<String> = conn
            .query_row(
                "SELECT record_json FROM dashboard_state WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_file::tests::sample_record;
    use threebody_models::TradeAction;

    #[test]
    fn load_empty_is_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.load().unwrap().is_none());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn save_replaces_single_row() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.save(&sample_record(TradeAction::Hold, None)).unwrap();
        let latest = sample_record(TradeAction::Buy, Some("0xbeef"));
        store.save(&latest).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.load().unwrap(), Some(latest));
    }

    #[test]
    fn save_twice_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        let record = sample_record(TradeAction::Sell, Some("0x02"));
        store.save(&record).unwrap();
        store.save(&record).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.load().unwrap(), Some(record));
    }

    #[test]
    fn wal_mode_on_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.db");
        let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
        store.save(&sample_record(TradeAction::Hold, None)).unwrap();

        let reopened = SqliteStore::open(path.to_str().unwrap()).unwrap();
        assert!(reopened.load().unwrap().is_some());
    }
}
