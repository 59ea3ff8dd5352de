//! Report aggregation.
//!
//! The report is the sole externally consumed artifact of the engine: one
//! stable, serializable document carrying metadata, summary counts, the
//! four regulation assessments, the privacy profile, the risk score,
//! per-cookie detail, and recommendations. It is recomputed fresh from
//! the record set every time; nothing here is incremental.

pub mod compliance;
pub mod privacy;
pub mod recommend;
pub mod risk;

use crate::base::ScanError;
use crate::classify::Category;
use crate::collector::{ChannelFailure, ScanSession, ScanStatus};
use crate::merge::CookieRecord;
use crate::session::context::ScanContext;
use crate::vendor::VendorMatch;
use compliance::ComplianceAssessment;
use privacy::PrivacyProfile;
use recommend::Recommendation;
use risk::RiskAssessment;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub scan_id: Uuid,
    pub target_url: String,
    pub target_domain: String,
    pub status: ScanStatus,
    pub started_at: OffsetDateTime,
    pub finished_at: Option<OffsetDateTime>,
    pub engine_version: String,
    pub directory_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_cookies: usize,
    /// Counts keyed by category slug, stable order.
    pub by_category: BTreeMap<String, usize>,
    /// Counts keyed by evidence source (channel category).
    pub by_source: BTreeMap<String, usize>,
    pub third_party_cookies: usize,
    pub persistent_cookies: usize,
    pub attributed_cookies: usize,
    pub distinct_vendors: usize,
    pub failed_channels: usize,
}

/// Per-cookie detail row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieDetail {
    pub name: String,
    pub domain: String,
    pub path: String,
    pub category: Category,
    pub category_confidence: f64,
    pub vendor: Option<VendorMatch>,
    pub channels: Vec<String>,
    pub first_seen: OffsetDateTime,
    pub expires: Option<OffsetDateTime>,
    pub is_third_party: bool,
    pub is_persistent: bool,
    pub secure: bool,
    pub http_only: bool,
    pub size_bytes: usize,
}

/// The complete scan report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub metadata: ReportMetadata,
    pub summary: ReportSummary,
    pub compliance: Vec<ComplianceAssessment>,
    pub overall_compliance_score: f64,
    pub privacy: PrivacyProfile,
    pub risk: RiskAssessment,
    pub cookies: Vec<CookieDetail>,
    pub recommendations: Vec<Recommendation>,
    /// Channel-level failures, so reduced completeness is visible rather
    /// than silent.
    pub errors: Vec<String>,
}

impl ScanReport {
    /// Assemble the report from a finished scan.
    pub fn build(
        session: &ScanSession,
        records: &[CookieRecord],
        ctx: &ScanContext,
        channel_failures: &[ChannelFailure],
        directory_version: &str,
    ) -> Self {
        let assessments = compliance::assess_all(records);
        let overall = compliance::overall_score(&assessments);
        let profile = privacy::profile(records, ctx);
        let risk_assessment = risk::assess(records);
        let recommendations = recommend::build(&assessments, &profile, &risk_assessment);

        let mut by_category: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_source: BTreeMap<String, usize> = BTreeMap::new();
        for record in records {
            *by_category
                .entry(record.category.as_str().to_string())
                .or_insert(0) += 1;
            *by_source
                .entry(record.channel_category.as_str().to_string())
                .or_insert(0) += 1;
        }

        let vendors: HashSet<&str> = records
            .iter()
            .filter_map(|r| r.vendor.as_ref().map(|v| v.vendor_id.as_str()))
            .collect();

        let summary = ReportSummary {
            total_cookies: records.len(),
            by_category,
            by_source,
            third_party_cookies: records.iter().filter(|r| r.is_third_party).count(),
            persistent_cookies: records.iter().filter(|r| r.is_persistent).count(),
            attributed_cookies: records.iter().filter(|r| r.vendor.is_some()).count(),
            distinct_vendors: vendors.len(),
            failed_channels: channel_failures.len(),
        };

        let cookies = records
            .iter()
            .map(|r| CookieDetail {
                name: r.name.clone(),
                domain: r.domain.clone(),
                path: r.path.clone(),
                category: r.category,
                category_confidence: r.category_confidence,
                vendor: r.vendor.clone(),
                channels: r
                    .channels
                    .iter()
                    .map(|c| c.as_str().to_string())
                    .collect(),
                first_seen: r.first_seen,
                expires: r.expires,
                is_third_party: r.is_third_party,
                is_persistent: r.is_persistent,
                secure: r.secure,
                http_only: r.http_only,
                size_bytes: r.size_bytes,
            })
            .collect();

        let errors = channel_failures
            .iter()
            .map(|f| format!("{}: {}", f.channel.as_str(), f.error))
            .collect();

        Self {
            metadata: ReportMetadata {
                scan_id: session.id,
                target_url: session.target_url.to_string(),
                target_domain: session.target_domain.clone(),
                status: session.status,
                started_at: session.started_at,
                finished_at: session.finished_at,
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                directory_version: directory_version.to_string(),
            },
            summary,
            compliance: assessments,
            overall_compliance_score: overall,
            privacy: profile,
            risk: risk_assessment,
            cookies,
            recommendations,
            errors,
        }
    }

    /// Pretty-printed JSON for downstream dashboards.
    pub fn to_json(&self) -> Result<String, ScanError> {
        serde_json::to_string_pretty(self).map_err(|e| ScanError::Directory {
            message: e.to_string(),
        })
    }
}
