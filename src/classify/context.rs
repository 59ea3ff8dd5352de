//! Context-stage classification: signals drawn from the record's
//! attributes, its detection channel, and what the session saw on the
//! page.

use super::{Category, StageScores};
use crate::collector::observation::ChannelCategory;
use crate::merge::CookieRecord;
use crate::session::context::ScanContext;

/// Signal strengths. The stage output is capped at
/// [`super::CONTEXT_CAP`].
const HTTPONLY_SESSION_NAME: f64 = 0.75;
const STORAGE_CHANNEL: f64 = 0.4;
const TECHNOLOGY_CORRELATION: f64 = 0.75;
const THIRD_PARTY_LEAN: f64 = 0.35;
const LONG_LIVED_THIRD_PARTY: f64 = 0.3;

/// Retention beyond which a third-party cookie reads as marketing.
const LONG_LIVED_DAYS: i64 = 180;

/// Technology/name-fragment correlations: the library was detected on the
/// page AND the cookie name carries its fragment.
const TECH_COOKIE_CORRELATIONS: &[(&str, &str, Category)] = &[
    ("google-analytics", "_ga", Category::Analytics),
    ("google-tag-manager", "_gcl", Category::Marketing),
    ("hotjar", "_hj", Category::Analytics),
    ("facebook-pixel", "_fb", Category::Marketing),
    ("matomo", "_pk_", Category::Analytics),
    ("mixpanel", "mixpanel", Category::Analytics),
    ("hubspot", "__hs", Category::Marketing),
    ("hubspot", "hubspotutk", Category::Marketing),
    ("linkedin-insight", "li_", Category::Social),
    ("microsoft-advertising", "_uet", Category::Marketing),
    ("tiktok-pixel", "_tt", Category::Marketing),
];

/// Name fragments that mark a session-management cookie.
const SESSION_NAME_FRAGMENTS: &[&str] = &["sess", "sid", "auth", "csrf", "xsrf", "token"];

/// Stage 2 scoring.
pub fn score(record: &CookieRecord, ctx: &ScanContext) -> (StageScores, Vec<String>) {
    let mut scores = StageScores::new();
    let mut evidence = Vec::new();
    let name_lower = record.name.to_lowercase();

    if record.http_only
        && SESSION_NAME_FRAGMENTS
            .iter()
            .any(|f| name_lower.contains(f))
    {
        scores.add(Category::Necessary, HTTPONLY_SESSION_NAME);
        evidence.push("context: httpOnly with session-style name".to_string());
    }

    if record.channel_category == ChannelCategory::Storage {
        scores.add(Category::Functional, STORAGE_CHANNEL);
        evidence.push("context: web-storage artifact".to_string());
    }

    for (tech, fragment, category) in TECH_COOKIE_CORRELATIONS {
        if ctx.has_technology(tech) && name_lower.contains(fragment) {
            scores.add(*category, TECHNOLOGY_CORRELATION);
            evidence.push(format!(
                "context: {} detected on page, name carries '{}'",
                tech, fragment
            ));
            break;
        }
    }

    if record.is_third_party {
        scores.add(Category::Marketing, THIRD_PARTY_LEAN);
        evidence.push("context: third-party cookie".to_string());

        let long_lived = record
            .retention()
            .map(|d| d.whole_days() > LONG_LIVED_DAYS)
            .unwrap_or(false);
        if long_lived {
            scores.add(Category::Marketing, LONG_LIVED_THIRD_PARTY);
            evidence.push("context: long-lived third-party cookie".to_string());
        }
    }

    scores.cap(super::CONTEXT_CAP);
    (scores, evidence)
}
