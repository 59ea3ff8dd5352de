//! # consentscan
//!
//! A multi-strategy cookie detection, classification, and
//! vendor-attribution engine for consent-management compliance scanning.
//!
//! `consentscan` drives an isolated browser session against a target
//! site, harvests cookie and storage evidence through independent
//! detection channels, deduplicates and enriches the sightings into
//! canonical records, assigns each record a privacy category and a source
//! vendor with calibrated confidence, and aggregates the result into a
//! legal-compliance and privacy-risk report.
//!
//! ## Pipeline
//!
//! Collector → Merge → {Classifier, Vendor Resolver} → Aggregator →
//! Reconciler. Classification and attribution are pure functions of a
//! record plus session context and fan out across records; the report is
//! deterministic and auditable for identical inputs.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use consentscan::scan::Scanner;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), consentscan::base::ScanError> {
//!     let scanner = Scanner::with_defaults()?;
//!     let outcome = scanner.run(&my_session_provider, "https://example.com").await?;
//!     println!("{}", outcome.report.to_json()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error taxonomy and domain utilities
//! - [`session`] - Browser automation capability contract
//! - [`collector`] - Multi-channel evidence collection
//! - [`merge`] - Observation dedup and enrichment
//! - [`classify`] - Three-stage category classification
//! - [`vendor`] - Vendor directory and trust-ordered attribution
//! - [`report`] - Compliance, privacy, and risk aggregation
//! - [`inventory`] - Long-lived inventory and reconciliation
//! - [`scan`] - End-to-end orchestration
//!
//! ## Failure model
//!
//! Only invalid targets and unopenable sessions abort a scan. Individual
//! evidence channels fail in isolation, deadline expiry returns partial
//! evidence, and inventory write failures are recorded per record - a
//! partially failed scan still yields a report that flags its reduced
//! completeness.

pub mod base;
pub mod classify;
pub mod collector;
pub mod inventory;
pub mod merge;
pub mod report;
pub mod scan;
pub mod session;
pub mod vendor;

pub use base::ScanError;
pub use classify::{Category, Classifier};
pub use collector::{CollectorOptions, EvidenceCollector, ScanSession, ScanStatus};
pub use inventory::{InventoryStore, ReconcileSummary, Reconciler};
pub use merge::{merge_observations, CookieRecord};
pub use report::ScanReport;
pub use scan::{ScanOptions, ScanOutcome, Scanner};
pub use session::{BrowserSession, SessionOptions, SessionProvider};
pub use vendor::{VendorDirectory, VendorMatch};
