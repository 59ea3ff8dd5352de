//! Scan orchestration.
//!
//! Wires the pipeline end to end: evidence collection, observation merge,
//! per-record classification and vendor attribution (fanned out across
//! records, since both are pure functions), and report aggregation.
//! Reconciliation into a long-lived inventory is exposed separately so a
//! caller can inspect the report before committing it.

use crate::base::ScanError;
use crate::classify::Classifier;
use crate::collector::{
    ChannelFailure, CollectorOptions, EvidenceCollector, Harvest, ScanSession,
};
use crate::inventory::{InventoryStore, ReconcileSummary, Reconciler};
use crate::merge::{merge_observations, CookieRecord};
use crate::report::ScanReport;
use crate::session::context::ScanContext;
use crate::session::SessionProvider;
use crate::vendor::{resolver, VendorDirectory};
use futures::StreamExt;
use std::sync::Arc;

/// Scan configuration: collector behavior plus pipeline fan-out width.
/// Validated once at scan start.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub collector: CollectorOptions,
    /// Records classified/attributed concurrently.
    pub record_concurrency: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            collector: CollectorOptions::default(),
            record_concurrency: 8,
        }
    }
}

impl ScanOptions {
    pub fn validate(&self) -> Result<(), ScanError> {
        self.collector.validate()?;
        if self.record_concurrency == 0 {
            return Err(ScanError::InvalidOptions {
                reason: "record concurrency must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Everything one scan produced.
#[derive(Debug)]
pub struct ScanOutcome {
    pub session: ScanSession,
    pub records: Vec<CookieRecord>,
    pub context: ScanContext,
    pub channel_failures: Vec<ChannelFailure>,
    /// Session-level failure, when the scan ended `Failed`.
    pub failure: Option<ScanError>,
    pub report: ScanReport,
}

/// The scanning engine. Holds the compiled classifier and the injected
/// vendor directory; both are shared read-only across a scan's record
/// fan-out.
pub struct Scanner {
    options: ScanOptions,
    collector: EvidenceCollector,
    classifier: Arc<Classifier>,
    directory: Arc<VendorDirectory>,
    reconciler: Reconciler,
}

impl Scanner {
    pub fn new(options: ScanOptions, directory: VendorDirectory) -> Result<Self, ScanError> {
        options.validate()?;
        let collector = EvidenceCollector::new(options.collector.clone())?;
        Ok(Self {
            options,
            collector,
            classifier: Arc::new(Classifier::new()),
            directory: Arc::new(directory),
            reconciler: Reconciler::new(),
        })
    }

    /// A scanner with default options and the compiled-in directory.
    pub fn with_defaults() -> Result<Self, ScanError> {
        Self::new(ScanOptions::default(), VendorDirectory::builtin())
    }

    pub fn directory(&self) -> &VendorDirectory {
        &self.directory
    }

    /// Run one full scan. `Err` only for invalid targets and sessions
    /// that could not be created; everything else yields a report, with
    /// failures recorded in it.
    pub async fn run(
        &self,
        provider: &dyn SessionProvider,
        target: &str,
    ) -> Result<ScanOutcome, ScanError> {
        let harvest = self.collector.collect(provider, target).await?;
        let Harvest {
            session,
            observations,
            trace: _,
            context,
            channel_failures,
            channel_timings: _,
            failure,
        } = harvest;

        let records = merge_observations(observations, &session.target_domain);
        let records = self.annotate(records, &context).await;

        let report = ScanReport::build(
            &session,
            &records,
            &context,
            &channel_failures,
            self.directory.version(),
        );

        tracing::debug!(
            scan = %session.id,
            cookies = records.len(),
            risk = report.risk.score,
            "scan complete"
        );

        Ok(ScanOutcome {
            session,
            records,
            context,
            channel_failures,
            failure,
            report,
        })
    }

    /// Classify and attribute every record. Records are independent, so
    /// this fans out across them; within one record classification runs
    /// first because attribution's purpose-overlap scoring reads the
    /// category.
    async fn annotate(
        &self,
        records: Vec<CookieRecord>,
        context: &ScanContext,
    ) -> Vec<CookieRecord> {
        let ctx = Arc::new(context.clone());

        let tasks = records.into_iter().map(|mut record| {
            let classifier = self.classifier.clone();
            let directory = self.directory.clone();
            let ctx = ctx.clone();
            async move {
                let handle = tokio::task::spawn_blocking(move || {
                    let classification = classifier.classify(&record, &ctx, &directory);
                    record.category = classification.category;
                    record.category_confidence = classification.confidence;
                    record.vendor = resolver::resolve(&record, &ctx, &directory);
                    record
                });
                handle.await
            }
        });

        let mut annotated: Vec<CookieRecord> = futures::stream::iter(tasks)
            .buffer_unordered(self.options.record_concurrency)
            .filter_map(|result| async move {
                match result {
                    Ok(record) => Some(record),
                    Err(e) => {
                        tracing::warn!(error = %e, "record annotation task failed");
                        None
                    }
                }
            })
            .collect()
            .await;

        // The fan-in scrambles completion order; restore key order so the
        // record set is deterministic.
        annotated.sort_by(|a, b| a.key().cmp(&b.key()));
        annotated
    }

    /// Merge a finished scan's records into an inventory.
    pub fn reconcile(
        &self,
        records: &[CookieRecord],
        store: &dyn InventoryStore,
    ) -> ReconcileSummary {
        self.reconciler.reconcile(records, store)
    }
}
