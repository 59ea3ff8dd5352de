//! Human-readable recommendations derived from the assessments.

use super::compliance::{ComplianceAssessment, Severity};
use super::privacy::{PrivacyProfile, TrackingLevel};
use super::risk::{RiskAssessment, RiskLevel};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Severity,
    pub action: String,
}

/// Build the recommendation list: every distinct compliance-issue
/// recommendation, plus profile- and risk-driven guidance. Ordered by
/// priority, highest first.
pub fn build(
    assessments: &[ComplianceAssessment],
    profile: &PrivacyProfile,
    risk: &RiskAssessment,
) -> Vec<Recommendation> {
    let mut out: Vec<Recommendation> = Vec::new();

    for assessment in assessments {
        for issue in &assessment.issues {
            if !out.iter().any(|r| r.action == issue.recommendation) {
                out.push(Recommendation {
                    priority: issue.severity,
                    action: issue.recommendation.clone(),
                });
            }
        }
    }

    if matches!(
        profile.tracking_level,
        TrackingLevel::Extensive | TrackingLevel::Invasive
    ) {
        out.push(Recommendation {
            priority: Severity::High,
            action: format!(
                "Reduce the {} third-party tracking cookies currently set",
                profile.third_party_tracking_cookies
            ),
        });
    }

    if profile.fingerprinting_detected {
        out.push(Recommendation {
            priority: Severity::High,
            action: "Audit scripts using canvas/WebGL/audio APIs for fingerprinting".to_string(),
        });
    }

    if matches!(risk.level, RiskLevel::High | RiskLevel::Critical) {
        out.push(Recommendation {
            priority: Severity::High,
            action: "Review the full cookie inventory; overall privacy risk is elevated"
                .to_string(),
        });
    }

    out.sort_by(|a, b| b.priority.cmp(&a.priority));
    out
}
