//! Merging a finished scan into the inventory.
//!
//! Each record is looked up by (name, domain, active): absent means
//! insert, present means update only when the scan genuinely improved on
//! what is stored (or the stored entry has gone stale). Writes to the
//! same key are serialized with advisory per-key locks; persistence
//! failures are recorded per record and never abort the run.

use crate::base::ScanError;
use crate::classify::Category;
use crate::inventory::{InventoryEntry, InventoryStore};
use crate::merge::CookieRecord;
use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;

/// Entries older than this are refreshed even without an improvement.
pub const FRESHNESS_THRESHOLD: time::Duration = time::Duration::hours(1);

/// Attribution confidence at which a vendor counts as verified.
pub const VERIFIED_CONFIDENCE: f64 = 0.9;

/// Outcome of one reconciliation run.
#[derive(Debug, Default, Clone)]
pub struct ReconcileSummary {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    /// Per-record persistence failures; the affected records were
    /// recorded in the summary but not durably stored.
    pub errors: Vec<String>,
}

/// Reconciles scan results into an inventory store.
#[derive(Default)]
pub struct Reconciler {
    key_locks: DashMap<(String, String), Arc<Mutex<()>>>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `records` into `store`. Always runs to completion.
    pub fn reconcile(
        &self,
        records: &[CookieRecord],
        store: &dyn InventoryStore,
    ) -> ReconcileSummary {
        let now = OffsetDateTime::now_utc();
        let mut summary = ReconcileSummary::default();

        for record in records {
            let key = (record.name.clone(), record.domain.clone());
            let lock = self
                .key_locks
                .entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone();
            // Advisory: serializes writers of this (name, domain) only.
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

            let candidate = entry_from_record(record, now);
            match store.get(&record.name, &record.domain) {
                Ok(None) => match store.insert(&candidate) {
                    Ok(()) => summary.inserted += 1,
                    Err(e) => {
                        summary.errors.push(format!(
                            "{}@{}: insert failed: {}",
                            record.name, record.domain, e
                        ));
                    }
                },
                Ok(Some(existing)) => match update_reason(&existing, &candidate, now) {
                    Some(reason) => {
                        tracing::debug!(
                            cookie = %record.name,
                            domain = %record.domain,
                            reason,
                            "updating inventory entry"
                        );
                        match store.update(&candidate) {
                            Ok(()) => summary.updated += 1,
                            Err(e) => {
                                summary.errors.push(format!(
                                    "{}@{}: update failed: {}",
                                    record.name, record.domain, e
                                ));
                            }
                        }
                    }
                    None => summary.skipped += 1,
                },
                Err(e) => {
                    summary.errors.push(format!(
                        "{}@{}: lookup failed: {}",
                        record.name, record.domain, e
                    ));
                }
            }
        }

        tracing::debug!(
            inserted = summary.inserted,
            updated = summary.updated,
            skipped = summary.skipped,
            errors = summary.errors.len(),
            "reconciliation complete"
        );
        summary
    }
}

/// Project a scan record onto the inventory schema.
pub fn entry_from_record(record: &CookieRecord, now: OffsetDateTime) -> InventoryEntry {
    let (provider, vendor_verified) = match &record.vendor {
        Some(v) => (v.vendor_name.clone(), v.confidence >= VERIFIED_CONFIDENCE),
        None => ("unknown".to_string(), false),
    };

    InventoryEntry {
        name: record.name.clone(),
        domain: record.domain.clone(),
        active: true,
        provider,
        category: record.category.as_str().to_string(),
        purpose: record.description.clone(),
        duration_days: record.retention().map(|d| d.whole_days()),
        vendor_verified,
        updated_at: now,
    }
}

/// Why an existing entry should be replaced, or `None` to skip.
fn update_reason(
    existing: &InventoryEntry,
    candidate: &InventoryEntry,
    now: OffsetDateTime,
) -> Option<&'static str> {
    if existing.has_placeholder_provider() && !candidate.has_placeholder_provider() {
        return Some("provider resolved");
    }
    if existing.has_unresolved_category()
        && !candidate.has_unresolved_category()
        && candidate.category != Category::Unknown.as_str()
    {
        return Some("category resolved");
    }
    if candidate.purpose.is_some() && candidate.purpose != existing.purpose {
        return Some("purpose changed");
    }
    if candidate.duration_days != existing.duration_days {
        return Some("duration changed");
    }
    if candidate.vendor_verified && !existing.vendor_verified {
        return Some("verification improved");
    }
    if now - existing.updated_at > FRESHNESS_THRESHOLD {
        return Some("entry stale");
    }
    None
}
