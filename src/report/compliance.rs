//! Per-regulation compliance assessment.
//!
//! Each regulation starts at 100 and subtracts fixed penalties per
//! triggered rule, floored at zero. The penalty magnitudes are empirically
//! chosen constants carried over from the source system; they are named
//! and overridable here, not re-derived.

use crate::classify::Category;
use crate::merge::CookieRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regulation {
    Gdpr,
    Ccpa,
    Pecr,
    Lgpd,
}

impl Regulation {
    pub const ALL: [Regulation; 4] = [
        Regulation::Gdpr,
        Regulation::Ccpa,
        Regulation::Pecr,
        Regulation::Lgpd,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Regulation::Gdpr => "GDPR",
            Regulation::Ccpa => "CCPA",
            Regulation::Pecr => "PECR",
            Regulation::Lgpd => "LGPD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// One triggered compliance rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceIssue {
    pub severity: Severity,
    pub code: String,
    pub description: String,
    pub affected_cookies: Vec<String>,
    pub recommendation: String,
}

/// Scored evaluation against one regulation. Recomputed fresh per report,
/// never partially mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceAssessment {
    pub regulation: Regulation,
    pub compliant: bool,
    pub score: u8,
    pub issues: Vec<ComplianceIssue>,
}

// GDPR penalties.
pub const GDPR_MISSING_CONSENT: u8 = 30;
pub const GDPR_MISSING_DESCRIPTION: u8 = 15;
pub const GDPR_LONG_RETENTION: u8 = 10;
pub const GDPR_INTERNATIONAL_TRANSFER: u8 = 20;

// CCPA penalties.
pub const CCPA_SALE_WITHOUT_OPT_OUT: u8 = 25;
pub const CCPA_UNDISCLOSED_COLLECTION: u8 = 10;
pub const CCPA_LONG_RETENTION: u8 = 10;

// PECR penalties.
pub const PECR_NON_ESSENTIAL_WITHOUT_CONSENT: u8 = 35;
pub const PECR_ANALYTICS_WITHOUT_CONSENT: u8 = 15;

// LGPD penalties.
pub const LGPD_MISSING_CONSENT: u8 = 25;
pub const LGPD_MISSING_PURPOSE: u8 = 15;
pub const LGPD_INTERNATIONAL_TRANSFER: u8 = 15;

/// Retention beyond which storage counts as excessive.
pub const LONG_RETENTION_DAYS: i64 = 365;

/// Vendors whose infrastructure implies data leaving the user's
/// jurisdiction.
const MULTINATIONAL_VENDORS: &[&str] = &[
    "google-analytics",
    "google-ads",
    "meta",
    "microsoft-advertising",
    "tiktok",
    "twitter",
    "linkedin",
    "youtube",
];

fn names(records: &[&CookieRecord]) -> Vec<String> {
    records.iter().map(|r| r.name.clone()).collect()
}

fn long_retention(record: &CookieRecord) -> bool {
    record
        .retention()
        .map(|d| d.whole_days() > LONG_RETENTION_DAYS)
        .unwrap_or(false)
}

fn international_transfer(record: &CookieRecord) -> bool {
    record
        .vendor
        .as_ref()
        .map(|v| MULTINATIONAL_VENDORS.contains(&v.vendor_id.as_str()))
        .unwrap_or(false)
}

/// Assess all four regulations. Order is fixed.
pub fn assess_all(records: &[CookieRecord]) -> Vec<ComplianceAssessment> {
    Regulation::ALL
        .iter()
        .map(|r| assess(*r, records))
        .collect()
}

/// Mean of the per-regulation scores.
pub fn overall_score(assessments: &[ComplianceAssessment]) -> f64 {
    if assessments.is_empty() {
        return 0.0;
    }
    assessments.iter().map(|a| a.score as f64).sum::<f64>() / assessments.len() as f64
}

pub fn assess(regulation: Regulation, records: &[CookieRecord]) -> ComplianceAssessment {
    let mut issues = Vec::new();

    let non_necessary: Vec<&CookieRecord> = records
        .iter()
        .filter(|r| r.category.requires_consent())
        .collect();
    let without_consent: Vec<&CookieRecord> = non_necessary
        .iter()
        .copied()
        .filter(|r| !r.consent_recorded)
        .collect();
    let without_description: Vec<&CookieRecord> = non_necessary
        .iter()
        .copied()
        .filter(|r| r.description.is_none())
        .collect();
    let long_lived: Vec<&CookieRecord> =
        records.iter().filter(|r| long_retention(r)).collect();
    let transfers: Vec<&CookieRecord> = records
        .iter()
        .filter(|r| international_transfer(r))
        .collect();

    match regulation {
        Regulation::Gdpr => {
            if !without_consent.is_empty() {
                issues.push(ComplianceIssue {
                    severity: Severity::High,
                    code: "GDPR_001".to_string(),
                    description: format!(
                        "{} non-necessary cookie(s) set without recorded consent",
                        without_consent.len()
                    ),
                    affected_cookies: names(&without_consent),
                    recommendation:
                        "Obtain and record user consent before setting non-essential cookies"
                            .to_string(),
                });
            }
            if !without_description.is_empty() {
                issues.push(ComplianceIssue {
                    severity: Severity::Medium,
                    code: "GDPR_002".to_string(),
                    description: format!(
                        "{} non-necessary cookie(s) lack a purpose description",
                        without_description.len()
                    ),
                    affected_cookies: names(&without_description),
                    recommendation: "Document the purpose of every declared cookie".to_string(),
                });
            }
            if !long_lived.is_empty() {
                issues.push(ComplianceIssue {
                    severity: Severity::Medium,
                    code: "GDPR_003".to_string(),
                    description: format!(
                        "{} cookie(s) retained beyond {} days",
                        long_lived.len(),
                        LONG_RETENTION_DAYS
                    ),
                    affected_cookies: names(&long_lived),
                    recommendation: "Shorten cookie lifetimes to the minimum necessary"
                        .to_string(),
                });
            }
            if !transfers.is_empty() {
                issues.push(ComplianceIssue {
                    severity: Severity::Medium,
                    code: "GDPR_004".to_string(),
                    description: format!(
                        "{} cookie(s) attributed to multinational vendors suggest international data transfer",
                        transfers.len()
                    ),
                    affected_cookies: names(&transfers),
                    recommendation:
                        "Verify adequacy decisions or standard contractual clauses for cross-border transfers"
                            .to_string(),
                });
            }
        }
        Regulation::Ccpa => {
            let sold: Vec<&CookieRecord> = records
                .iter()
                .filter(|r| r.is_third_party && r.category.is_high_risk())
                .collect();
            if !sold.is_empty() {
                issues.push(ComplianceIssue {
                    severity: Severity::High,
                    code: "CCPA_001".to_string(),
                    description: format!(
                        "{} third-party marketing/social cookie(s) may constitute sale of personal information",
                        sold.len()
                    ),
                    affected_cookies: names(&sold),
                    recommendation: "Provide a 'Do Not Sell My Personal Information' opt-out"
                        .to_string(),
                });
            }
            let unknown: Vec<&CookieRecord> = records
                .iter()
                .filter(|r| r.category == Category::Unknown)
                .collect();
            if !unknown.is_empty() {
                issues.push(ComplianceIssue {
                    severity: Severity::Medium,
                    code: "CCPA_002".to_string(),
                    description: format!(
                        "{} cookie(s) with unknown purpose cannot be disclosed accurately",
                        unknown.len()
                    ),
                    affected_cookies: names(&unknown),
                    recommendation: "Identify and disclose the purpose of every cookie collected"
                        .to_string(),
                });
            }
            if !long_lived.is_empty() {
                issues.push(ComplianceIssue {
                    severity: Severity::Low,
                    code: "CCPA_003".to_string(),
                    description: format!("{} cookie(s) with excessive retention", long_lived.len()),
                    affected_cookies: names(&long_lived),
                    recommendation: "Align retention with the disclosed collection purpose"
                        .to_string(),
                });
            }
        }
        Regulation::Pecr => {
            if !without_consent.is_empty() {
                issues.push(ComplianceIssue {
                    severity: Severity::High,
                    code: "PECR_001".to_string(),
                    description: format!(
                        "{} non-essential cookie(s) stored without prior consent",
                        without_consent.len()
                    ),
                    affected_cookies: names(&without_consent),
                    recommendation:
                        "Block non-essential storage until the user opts in".to_string(),
                });
            }
            let analytics_no_consent: Vec<&CookieRecord> = without_consent
                .iter()
                .copied()
                .filter(|r| r.category == Category::Analytics)
                .collect();
            if !analytics_no_consent.is_empty() {
                issues.push(ComplianceIssue {
                    severity: Severity::Medium,
                    code: "PECR_002".to_string(),
                    description: format!(
                        "{} analytics cookie(s) active before consent; PECR has no analytics exemption",
                        analytics_no_consent.len()
                    ),
                    affected_cookies: names(&analytics_no_consent),
                    recommendation: "Gate analytics behind the consent banner".to_string(),
                });
            }
        }
        Regulation::Lgpd => {
            if !without_consent.is_empty() {
                issues.push(ComplianceIssue {
                    severity: Severity::High,
                    code: "LGPD_001".to_string(),
                    description: format!(
                        "{} cookie(s) processing personal data without a recorded legal basis",
                        without_consent.len()
                    ),
                    affected_cookies: names(&without_consent),
                    recommendation: "Record a legal basis (consent or legitimate interest) per cookie"
                        .to_string(),
                });
            }
            if !without_description.is_empty() {
                issues.push(ComplianceIssue {
                    severity: Severity::Medium,
                    code: "LGPD_002".to_string(),
                    description: format!(
                        "{} cookie(s) lack the declared purpose LGPD requires",
                        without_description.len()
                    ),
                    affected_cookies: names(&without_description),
                    recommendation: "Publish purpose descriptions in the privacy notice"
                        .to_string(),
                });
            }
            if !transfers.is_empty() {
                issues.push(ComplianceIssue {
                    severity: Severity::Medium,
                    code: "LGPD_003".to_string(),
                    description: format!(
                        "{} cookie(s) imply transfer outside Brazil",
                        transfers.len()
                    ),
                    affected_cookies: names(&transfers),
                    recommendation: "Confirm the transfer mechanism under LGPD art. 33"
                        .to_string(),
                });
            }
        }
    }

    let penalty: u32 = issues
        .iter()
        .map(|issue| penalty_for(regulation, &issue.code) as u32)
        .sum();
    let score = 100u32.saturating_sub(penalty) as u8;
    let compliant = !issues.iter().any(|i| i.severity == Severity::High);

    ComplianceAssessment {
        regulation,
        compliant,
        score,
        issues,
    }
}

fn penalty_for(regulation: Regulation, code: &str) -> u8 {
    match (regulation, code) {
        (Regulation::Gdpr, "GDPR_001") => GDPR_MISSING_CONSENT,
        (Regulation::Gdpr, "GDPR_002") => GDPR_MISSING_DESCRIPTION,
        (Regulation::Gdpr, "GDPR_003") => GDPR_LONG_RETENTION,
        (Regulation::Gdpr, "GDPR_004") => GDPR_INTERNATIONAL_TRANSFER,
        (Regulation::Ccpa, "CCPA_001") => CCPA_SALE_WITHOUT_OPT_OUT,
        (Regulation::Ccpa, "CCPA_002") => CCPA_UNDISCLOSED_COLLECTION,
        (Regulation::Ccpa, "CCPA_003") => CCPA_LONG_RETENTION,
        (Regulation::Pecr, "PECR_001") => PECR_NON_ESSENTIAL_WITHOUT_CONSENT,
        (Regulation::Pecr, "PECR_002") => PECR_ANALYTICS_WITHOUT_CONSENT,
        (Regulation::Lgpd, "LGPD_001") => LGPD_MISSING_CONSENT,
        (Regulation::Lgpd, "LGPD_002") => LGPD_MISSING_PURPOSE,
        (Regulation::Lgpd, "LGPD_003") => LGPD_INTERNATIONAL_TRANSFER,
        _ => 0,
    }
}
