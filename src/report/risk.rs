//! Numeric privacy-risk scoring.

use crate::classify::Category;
use crate::merge::CookieRecord;
use serde::{Deserialize, Serialize};

/// Risk weights. Carried over from the source system as named constants.
pub const HIGH_RISK_CATEGORY_POINTS: u32 = 10;
pub const THIRD_PARTY_POINTS: u32 = 2;
pub const THIRD_PARTY_CAP: u32 = 30;
pub const UNKNOWN_CATEGORY_POINTS: u32 = 3;
pub const LONG_RETENTION_POINTS: u32 = 5;
pub const LONG_RETENTION_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    fn from_score(score: u8) -> Self {
        match score {
            75..=100 => RiskLevel::Critical,
            50..=74 => RiskLevel::High,
            25..=49 => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }
}

/// One contributing factor, kept for the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFactor {
    pub description: String,
    pub contribution: u32,
}

/// Purely a function of the record set at report time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u8,
    pub level: RiskLevel,
    pub factors: Vec<RiskFactor>,
}

pub fn assess(records: &[CookieRecord]) -> RiskAssessment {
    let mut factors = Vec::new();

    let high_risk = records
        .iter()
        .filter(|r| r.category.is_high_risk())
        .count() as u32;
    if high_risk > 0 {
        factors.push(RiskFactor {
            description: format!("{} marketing/social cookie(s)", high_risk),
            contribution: high_risk * HIGH_RISK_CATEGORY_POINTS,
        });
    }

    let third_party = records.iter().filter(|r| r.is_third_party).count() as u32;
    if third_party > 0 {
        factors.push(RiskFactor {
            description: format!("{} third-party cookie(s)", third_party),
            contribution: (third_party * THIRD_PARTY_POINTS).min(THIRD_PARTY_CAP),
        });
    }

    let unknown = records
        .iter()
        .filter(|r| r.category == Category::Unknown)
        .count() as u32;
    if unknown > 0 {
        factors.push(RiskFactor {
            description: format!("{} cookie(s) of unknown purpose", unknown),
            contribution: unknown * UNKNOWN_CATEGORY_POINTS,
        });
    }

    let long_lived = records
        .iter()
        .filter(|r| {
            r.retention()
                .map(|d| d.whole_days() > LONG_RETENTION_DAYS)
                .unwrap_or(false)
        })
        .count() as u32;
    if long_lived > 0 {
        factors.push(RiskFactor {
            description: format!("{} cookie(s) retained beyond a year", long_lived),
            contribution: long_lived * LONG_RETENTION_POINTS,
        });
    }

    let score = factors
        .iter()
        .map(|f| f.contribution)
        .sum::<u32>()
        .min(100) as u8;

    RiskAssessment {
        score,
        level: RiskLevel::from_score(score),
        factors,
    }
}
