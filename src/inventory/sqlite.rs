//! SQLite-backed inventory store.

use crate::base::ScanError;
use crate::inventory::{InventoryEntry, InventoryStore};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use time::OffsetDateTime;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS cookie_inventory (
    id              INTEGER PRIMARY KEY,
    name            TEXT NOT NULL,
    domain          TEXT NOT NULL,
    active          INTEGER NOT NULL DEFAULT 1,
    provider        TEXT NOT NULL,
    category        TEXT NOT NULL,
    purpose         TEXT,
    duration_days   INTEGER,
    vendor_verified INTEGER NOT NULL DEFAULT 0,
    updated_at      INTEGER NOT NULL,
    UNIQUE(name, domain, active)
);
CREATE INDEX IF NOT EXISTS idx_inventory_lookup ON cookie_inventory(name, domain, active);
";

/// Durable inventory storage. The connection is serialized behind a
/// mutex; concurrency control above row level lives in the reconciler.
pub struct SqliteInventoryStore {
    conn: Mutex<Connection>,
}

impl SqliteInventoryStore {
    /// Open (and create if needed) the inventory database at `path`.
    pub fn open(path: &Path) -> Result<Self, ScanError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// A throwaway in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self, ScanError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, ScanError> {
        self.conn
            .lock()
            .map_err(|_| ScanError::persistence("inventory connection poisoned"))
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<InventoryEntry> {
    let updated_unix: i64 = row.get(7)?;
    Ok(InventoryEntry {
        name: row.get(0)?,
        domain: row.get(1)?,
        active: row.get::<_, i64>(2)? != 0,
        provider: row.get(3)?,
        category: row.get(4)?,
        purpose: row.get(5)?,
        duration_days: row.get(6)?,
        updated_at: OffsetDateTime::from_unix_timestamp(updated_unix)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH),
        vendor_verified: row.get::<_, i64>(8)? != 0,
    })
}

impl InventoryStore for SqliteInventoryStore {
    fn get(&self, name: &str, domain: &str) -> Result<Option<InventoryEntry>, ScanError> {
        let conn = self.lock()?;
        let entry = conn
            .query_row(
                "SELECT name, domain, active, provider, category, purpose, duration_days,
                        updated_at, vendor_verified
                 FROM cookie_inventory
                 WHERE name = ?1 AND domain = ?2 AND active = 1",
                params![name, domain],
                row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    fn insert(&self, entry: &InventoryEntry) -> Result<(), ScanError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO cookie_inventory
                 (name, domain, active, provider, category, purpose, duration_days,
                  vendor_verified, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entry.name,
                entry.domain,
                entry.active as i64,
                entry.provider,
                entry.category,
                entry.purpose,
                entry.duration_days,
                entry.vendor_verified as i64,
                entry.updated_at.unix_timestamp(),
            ],
        )?;
        Ok(())
    }

    fn update(&self, entry: &InventoryEntry) -> Result<(), ScanError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE cookie_inventory
             SET provider = ?3, category = ?4, purpose = ?5, duration_days = ?6,
                 vendor_verified = ?7, updated_at = ?8
             WHERE name = ?1 AND domain = ?2 AND active = 1",
            params![
                entry.name,
                entry.domain,
                entry.provider,
                entry.category,
                entry.purpose,
                entry.duration_days,
                entry.vendor_verified as i64,
                entry.updated_at.unix_timestamp(),
            ],
        )?;
        if changed == 0 {
            return Err(ScanError::persistence(format!(
                "no active inventory row for {}@{}",
                entry.name, entry.domain
            )));
        }
        Ok(())
    }
}
