//! Privacy profile: tracking level, data sharing, cross-site tracking,
//! and fingerprinting.

use crate::classify::Category;
use crate::merge::CookieRecord;
use crate::session::context::ScanContext;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Stepped tracking level thresholds on third-party tracking-category
/// cookie counts.
pub const INVASIVE_THRESHOLD: usize = 10;
pub const EXTENSIVE_THRESHOLD: usize = 5;
pub const MODERATE_THRESHOLD: usize = 3;

/// Linear degradation per distinct third-party vendor / domain.
pub const DATA_SHARING_STEP: u8 = 10;
pub const CROSS_SITE_STEP: u8 = 8;
/// Cost of each fingerprinting technique found.
pub const FINGERPRINT_TECHNIQUE_COST: u8 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingLevel {
    Minimal,
    Moderate,
    Extensive,
    Invasive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivacyProfile {
    pub tracking_level: TrackingLevel,
    /// 100 = no sharing observed; degrades with distinct third-party
    /// vendors.
    pub data_sharing_score: u8,
    /// 100 = no cross-site tracking; degrades with distinct third-party
    /// domains.
    pub cross_site_tracking_score: u8,
    /// 100 = no fingerprinting APIs observed.
    pub fingerprinting_score: u8,
    pub fingerprinting_detected: bool,
    pub third_party_tracking_cookies: usize,
    pub distinct_third_party_vendors: usize,
    pub distinct_third_party_domains: usize,
}

fn is_tracking_category(category: Category) -> bool {
    matches!(
        category,
        Category::Marketing | Category::Social | Category::Analytics
    )
}

/// Pure function of the record set and session context.
pub fn profile(records: &[CookieRecord], ctx: &ScanContext) -> PrivacyProfile {
    let third_party_tracking = records
        .iter()
        .filter(|r| r.is_third_party && is_tracking_category(r.category))
        .count();

    let tracking_level = if third_party_tracking > INVASIVE_THRESHOLD {
        TrackingLevel::Invasive
    } else if third_party_tracking > EXTENSIVE_THRESHOLD {
        TrackingLevel::Extensive
    } else if third_party_tracking > MODERATE_THRESHOLD {
        TrackingLevel::Moderate
    } else {
        TrackingLevel::Minimal
    };

    let vendors: HashSet<&str> = records
        .iter()
        .filter(|r| r.is_third_party)
        .filter_map(|r| r.vendor.as_ref().map(|v| v.vendor_id.as_str()))
        .collect();
    let domains: HashSet<&str> = records
        .iter()
        .filter(|r| r.is_third_party)
        .map(|r| r.domain.as_str())
        .collect();

    let data_sharing_score =
        100u8.saturating_sub(DATA_SHARING_STEP.saturating_mul(vendors.len().min(255) as u8));
    let cross_site_tracking_score =
        100u8.saturating_sub(CROSS_SITE_STEP.saturating_mul(domains.len().min(255) as u8));

    let techniques = ctx.fingerprinting.technique_count() as u8;
    let fingerprinting_score =
        100u8.saturating_sub(FINGERPRINT_TECHNIQUE_COST.saturating_mul(techniques));

    PrivacyProfile {
        tracking_level,
        data_sharing_score,
        cross_site_tracking_score,
        fingerprinting_score,
        fingerprinting_detected: techniques > 0,
        third_party_tracking_cookies: third_party_tracking,
        distinct_third_party_vendors: vendors.len(),
        distinct_third_party_domains: domains.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::observation::{CookieObservation, DetectionChannel};
    use crate::merge::merge_observations;
    use crate::session::context::FingerprintSignals;
    use time::OffsetDateTime;

    fn tracker(name: &str, domain: &str) -> CookieRecord {
        let obs = CookieObservation::bare(
            name,
            "v",
            domain,
            DetectionChannel::CookieJar,
            OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
        );
        let mut r = merge_observations(vec![obs], "example.com").remove(0);
        r.category = Category::Marketing;
        r
    }

    fn trackers(n: usize) -> Vec<CookieRecord> {
        (0..n)
            .map(|i| tracker(&format!("t{}", i), &format!("tracker{}.net", i)))
            .collect()
    }

    #[test]
    fn tracking_level_steps() {
        let ctx = ScanContext::default();
        assert_eq!(profile(&trackers(0), &ctx).tracking_level, TrackingLevel::Minimal);
        assert_eq!(profile(&trackers(3), &ctx).tracking_level, TrackingLevel::Minimal);
        assert_eq!(profile(&trackers(4), &ctx).tracking_level, TrackingLevel::Moderate);
        assert_eq!(profile(&trackers(6), &ctx).tracking_level, TrackingLevel::Extensive);
        assert_eq!(profile(&trackers(11), &ctx).tracking_level, TrackingLevel::Invasive);
    }

    #[test]
    fn cross_site_score_degrades_with_domains() {
        let ctx = ScanContext::default();
        let p = profile(&trackers(5), &ctx);
        assert_eq!(p.distinct_third_party_domains, 5);
        assert_eq!(p.cross_site_tracking_score, 100 - 5 * CROSS_SITE_STEP);
    }

    #[test]
    fn fingerprinting_costs_per_technique() {
        let records = trackers(0);
        let ctx = ScanContext {
            fingerprinting: FingerprintSignals {
                canvas: true,
                webgl: true,
                audio: false,
            },
            ..Default::default()
        };
        let p = profile(&records, &ctx);
        assert!(p.fingerprinting_detected);
        assert_eq!(p.fingerprinting_score, 40);

        let all = ScanContext {
            fingerprinting: FingerprintSignals {
                canvas: true,
                webgl: true,
                audio: true,
            },
            ..Default::default()
        };
        assert_eq!(profile(&records, &all).fingerprinting_score, 10);
    }

    #[test]
    fn scores_clamp_at_zero() {
        let ctx = ScanContext::default();
        let p = profile(&trackers(20), &ctx);
        assert_eq!(p.cross_site_tracking_score, 0);
    }

    #[test]
    fn first_party_cookies_do_not_count() {
        let obs = CookieObservation::bare(
            "_ga",
            "v",
            "example.com",
            DetectionChannel::CookieJar,
            OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
        );
        let mut r = merge_observations(vec![obs], "example.com").remove(0);
        r.category = Category::Analytics;
        let p = profile(&[r], &ScanContext::default());
        assert_eq!(p.third_party_tracking_cookies, 0);
        assert_eq!(p.data_sharing_score, 100);
    }
}
