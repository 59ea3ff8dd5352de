//! Long-lived cookie inventory and scan reconciliation.
//!
//! The inventory is the engine's only write surface: upsert-by-key
//! semantics over `(name, domain, active)`. Stores implement
//! [`InventoryStore`]; an in-memory store serves tests and ephemeral runs,
//! a SQLite store provides durability.

pub mod reconcile;
pub mod sqlite;

use crate::base::ScanError;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub use reconcile::{ReconcileSummary, Reconciler};
pub use sqlite::SqliteInventoryStore;

/// Provider strings that carry no real attribution.
pub const PLACEHOLDER_PROVIDERS: &[&str] = &["", "unknown", "generic", "n/a"];

/// One inventory row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub name: String,
    pub domain: String,
    pub active: bool,
    /// Attributed organization, or a placeholder.
    pub provider: String,
    /// Category slug (`analytics`, `marketing`, ... or `unknown`/`other`).
    pub category: String,
    pub purpose: Option<String>,
    pub duration_days: Option<i64>,
    /// Whether the attribution was made by a high-confidence method.
    pub vendor_verified: bool,
    pub updated_at: OffsetDateTime,
}

impl InventoryEntry {
    pub fn has_placeholder_provider(&self) -> bool {
        PLACEHOLDER_PROVIDERS
            .iter()
            .any(|p| self.provider.eq_ignore_ascii_case(p))
    }

    pub fn has_unresolved_category(&self) -> bool {
        self.category.eq_ignore_ascii_case("unknown") || self.category.eq_ignore_ascii_case("other")
    }
}

/// Upsert-by-key inventory storage. Implementations must be safe to share
/// across threads; per-key write ordering is the reconciler's job.
pub trait InventoryStore: Send + Sync {
    /// Fetch the active entry for (name, domain), if any.
    fn get(&self, name: &str, domain: &str) -> Result<Option<InventoryEntry>, ScanError>;

    fn insert(&self, entry: &InventoryEntry) -> Result<(), ScanError>;

    /// Replace the active entry for (entry.name, entry.domain).
    fn update(&self, entry: &InventoryEntry) -> Result<(), ScanError>;
}

/// In-memory store keyed by (name, domain).
#[derive(Default)]
pub struct MemoryInventoryStore {
    entries: DashMap<(String, String), InventoryEntry>,
}

impl MemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl InventoryStore for MemoryInventoryStore {
    fn get(&self, name: &str, domain: &str) -> Result<Option<InventoryEntry>, ScanError> {
        Ok(self
            .entries
            .get(&(name.to_string(), domain.to_string()))
            .filter(|e| e.active)
            .map(|e| e.clone()))
    }

    fn insert(&self, entry: &InventoryEntry) -> Result<(), ScanError> {
        self.entries
            .insert((entry.name.clone(), entry.domain.clone()), entry.clone());
        Ok(())
    }

    fn update(&self, entry: &InventoryEntry) -> Result<(), ScanError> {
        self.entries
            .insert((entry.name.clone(), entry.domain.clone()), entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, provider: &str) -> InventoryEntry {
        InventoryEntry {
            name: name.to_string(),
            domain: "example.com".to_string(),
            active: true,
            provider: provider.to_string(),
            category: "analytics".to_string(),
            purpose: None,
            duration_days: Some(30),
            vendor_verified: false,
            updated_at: OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
        }
    }

    #[test]
    fn placeholder_detection() {
        assert!(entry("a", "Unknown").has_placeholder_provider());
        assert!(entry("a", "").has_placeholder_provider());
        assert!(!entry("a", "Google Analytics").has_placeholder_provider());
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryInventoryStore::new();
        assert!(store.get("_ga", "example.com").unwrap().is_none());
        store.insert(&entry("_ga", "Google Analytics")).unwrap();
        let fetched = store.get("_ga", "example.com").unwrap().unwrap();
        assert_eq!(fetched.provider, "Google Analytics");
    }
}
