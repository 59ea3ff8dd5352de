//! Rule-stage classification tables.
//!
//! Each category carries name patterns, containment keywords, and known
//! serving domains. Scoring is additive per rule class with a per-class
//! cap, normalized against the theoretical maximum, so one strong pattern
//! hit is enough to clear the early-return threshold while keyword-only
//! evidence is not.

use super::{Category, StageScores};
use crate::merge::CookieRecord;
use crate::vendor::VendorDirectory;
use regex::Regex;

/// Points per rule class. A class scores at most once per category.
pub const PATTERN_POINTS: f64 = 9.0;
pub const KEYWORD_POINTS: f64 = 2.0;
pub const DOMAIN_POINTS: f64 = 6.0;
pub const DIRECTORY_BONUS_POINTS: f64 = 3.0;
/// Theoretical maximum; accumulated points are capped here before
/// normalization.
pub const MAX_POINTS: f64 = 10.0;

struct CategoryRules {
    category: Category,
    patterns: Vec<Regex>,
    keywords: &'static [&'static str],
    domains: &'static [&'static str],
}

/// Compiled rule tables, built once and reused across records.
pub struct RuleSet {
    rules: Vec<CategoryRules>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleSet {
    pub fn new() -> Self {
        let compile = |patterns: &[&str]| -> Vec<Regex> {
            patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
        };

        let rules = vec![
            CategoryRules {
                category: Category::Necessary,
                patterns: compile(&[
                    r"^PHPSESSID$",
                    r"^JSESSIONID$",
                    r"^ASP\.NET_SessionId$",
                    r"^connect\.sid$",
                    r"^_?csrf",
                    r"(?i)^xsrf-token$",
                    r"^__Host-",
                    r"^__Secure-",
                    r"_session$",
                ]),
                keywords: &["session", "csrf", "auth", "login", "token"],
                domains: &[],
            },
            CategoryRules {
                category: Category::Analytics,
                patterns: compile(&[
                    r"^_ga",
                    r"^_gid$",
                    r"^_gat",
                    r"^__utm[a-z]$",
                    r"^_pk_(id|ses)",
                    r"^_hj[A-Za-z]",
                    r"^amplitude_",
                    r"^mp_[a-f0-9]+_mixpanel$",
                    r"^ajs_(user|anonymous)_id$",
                    r"^_cfuvid$",
                ]),
                keywords: &["analytics", "statistics", "measure", "telemetry"],
                domains: &[
                    "google-analytics.com",
                    "analytics.google.com",
                    "mixpanel.com",
                    "amplitude.com",
                    "hotjar.com",
                    "matomo.cloud",
                    "segment.io",
                ],
            },
            CategoryRules {
                category: Category::Marketing,
                patterns: compile(&[
                    r"^_fbp$",
                    r"^_fbc$",
                    r"^fr$",
                    r"^IDE$",
                    r"^test_cookie$",
                    r"^_gcl_",
                    r"^MUID$",
                    r"^uuid2$",
                    r"^anj$",
                    r"^_ttp$",
                    r"^_uetsid$",
                    r"^cto_bundle$",
                ]),
                keywords: &["advert", "marketing", "campaign", "retarget", "doubleclick"],
                domains: &[
                    "doubleclick.net",
                    "googlesyndication.com",
                    "googleadservices.com",
                    "adnxs.com",
                    "criteo.com",
                    "bat.bing.com",
                    "ads-twitter.com",
                    "tiktok.com",
                ],
            },
            CategoryRules {
                category: Category::Functional,
                patterns: compile(&[
                    r"^OptanonConsent$",
                    r"^OptanonAlertBoxClosed$",
                    r"^CookieConsent$",
                    r"^cookieconsent_status$",
                    r"^euconsent(-v2)?$",
                    r"^wp-settings-",
                    r"(?i)^(lang|locale)$",
                ]),
                keywords: &[
                    "consent", "preference", "settings", "currency", "timezone", "theme",
                ],
                domains: &["cookielaw.org", "cookiebot.com", "usercentrics.eu"],
            },
            CategoryRules {
                category: Category::Social,
                patterns: compile(&[
                    r"^guest_id",
                    r"^personalization_id$",
                    r"^li_at$",
                    r"^bcookie$",
                    r"^lidc$",
                    r"^datr$",
                    r"^c_user$",
                    r"^_pinterest_",
                ]),
                keywords: &["share", "social", "embed"],
                domains: &[
                    "twitter.com",
                    "linkedin.com",
                    "pinterest.com",
                    "instagram.com",
                ],
            },
        ];

        Self { rules }
    }

    /// Stage 1: pattern / keyword / domain-list scoring plus a bonus when
    /// the vendor directory independently knows the record's domain to
    /// serve the candidate category.
    pub fn score(
        &self,
        record: &CookieRecord,
        directory: &VendorDirectory,
    ) -> (StageScores, Vec<String>) {
        let mut scores = StageScores::new();
        let mut evidence = Vec::new();
        let name_lower = record.name.to_lowercase();

        for rules in &self.rules {
            let mut points = 0.0;

            if let Some(pattern) = rules.patterns.iter().find(|p| p.is_match(&record.name)) {
                points += PATTERN_POINTS;
                evidence.push(format!(
                    "rule: name matches {} ({})",
                    pattern.as_str(),
                    rules.category.as_str()
                ));
            }
            if let Some(keyword) = rules.keywords.iter().find(|k| name_lower.contains(*k)) {
                points += KEYWORD_POINTS;
                evidence.push(format!(
                    "rule: name contains '{}' ({})",
                    keyword,
                    rules.category.as_str()
                ));
            }
            if rules
                .domains
                .iter()
                .any(|d| record.domain == *d || record.domain.ends_with(&format!(".{}", d)))
            {
                points += DOMAIN_POINTS;
                evidence.push(format!(
                    "rule: domain {} known for {}",
                    record.domain,
                    rules.category.as_str()
                ));
            }
            if points > 0.0
                && directory
                    .vendors_for_domain(&record.domain)
                    .iter()
                    .any(|v| v.categories.contains(&rules.category))
            {
                points += DIRECTORY_BONUS_POINTS;
                evidence.push(format!(
                    "rule: directory vendor on {} serves {}",
                    record.domain,
                    rules.category.as_str()
                ));
            }

            if points > 0.0 {
                scores.add(rules.category, points.min(MAX_POINTS) / MAX_POINTS);
            }
        }

        (scores, evidence)
    }
}
