//! Heuristic-stage classification: statistical features of the name and
//! value, with no reference data at all.

use super::{Category, StageScores};
use crate::merge::CookieRecord;
use base64::Engine;
use regex::Regex;
use std::sync::OnceLock;

/// Per-feature score increments. The stage output is capped at
/// [`super::HEURISTIC_CAP`].
const HIGH_ENTROPY_VALUE: f64 = 0.2;
const UUID_SHAPED_VALUE: f64 = 0.3;
const BASE64_SHAPED_VALUE: f64 = 0.15;
const HEX_SHAPED_VALUE: f64 = 0.15;
const SESSION_DURATION: f64 = 0.3;
const SHORT_DURATION: f64 = 0.15;
const MEDIUM_DURATION: f64 = 0.2;
const LONG_DURATION: f64 = 0.3;
const RANDOM_SHORT_NAME: f64 = 0.15;
const UNDERSCORE_PREFIX: f64 = 0.1;

const ENTROPY_THRESHOLD: f64 = 3.5;

fn uuid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
            .unwrap()
    })
}

fn hex_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9a-fA-F]{16,}$").unwrap())
}

/// Shannon entropy in bits per byte.
pub fn shannon_entropy(value: &str) -> f64 {
    if value.is_empty() {
        return 0.0;
    }
    let mut counts = [0usize; 256];
    for b in value.bytes() {
        counts[b as usize] += 1;
    }
    let len = value.len() as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// A value that decodes as base64 and is long enough to be an encoded
/// identifier rather than a short flag.
fn is_base64_shaped(value: &str) -> bool {
    value.len() >= 16
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'=')
        && base64::engine::general_purpose::STANDARD.decode(value).is_ok()
}

/// Stage 3 scoring.
pub fn score(record: &CookieRecord) -> (StageScores, Vec<String>) {
    let mut scores = StageScores::new();
    let mut evidence = Vec::new();

    let value_entropy = shannon_entropy(&record.value);
    if record.value.len() >= 16 && value_entropy > ENTROPY_THRESHOLD {
        scores.add(Category::Analytics, HIGH_ENTROPY_VALUE);
        scores.add(Category::Marketing, HIGH_ENTROPY_VALUE);
        evidence.push(format!(
            "heuristic: high-entropy value ({:.2} bits/byte)",
            value_entropy
        ));
    }

    if uuid_re().is_match(&record.value) {
        scores.add(Category::Analytics, UUID_SHAPED_VALUE);
        scores.add(Category::Marketing, UUID_SHAPED_VALUE / 2.0);
        evidence.push("heuristic: uuid-shaped value".to_string());
    } else if hex_re().is_match(&record.value) {
        scores.add(Category::Analytics, HEX_SHAPED_VALUE);
        scores.add(Category::Marketing, HEX_SHAPED_VALUE);
        evidence.push("heuristic: long hex value".to_string());
    } else if is_base64_shaped(&record.value) {
        scores.add(Category::Marketing, BASE64_SHAPED_VALUE);
        scores.add(Category::Analytics, BASE64_SHAPED_VALUE / 1.5);
        evidence.push("heuristic: base64-shaped value".to_string());
    }

    match record.retention().map(|d| d.whole_days()) {
        None => {
            scores.add(Category::Necessary, SESSION_DURATION);
            evidence.push("heuristic: session-scoped lifetime".to_string());
        }
        Some(days) if days <= 1 => {
            scores.add(Category::Necessary, SHORT_DURATION);
            evidence.push("heuristic: sub-day lifetime".to_string());
        }
        // Lifetimes between a day and a month say nothing by themselves.
        Some(days) if days <= 30 => {}
        Some(days) if days <= 365 => {
            scores.add(Category::Analytics, MEDIUM_DURATION);
            scores.add(Category::Marketing, MEDIUM_DURATION / 2.0);
        }
        Some(_) => {
            scores.add(Category::Marketing, LONG_DURATION);
            evidence.push("heuristic: multi-year lifetime".to_string());
        }
    }

    let name_entropy = shannon_entropy(&record.name);
    if record.name.len() <= 6 && name_entropy > 2.2 && !record.name.contains('_') {
        scores.add(Category::Marketing, RANDOM_SHORT_NAME);
        evidence.push("heuristic: short random-looking name".to_string());
    }
    if record.name.starts_with('_') {
        scores.add(Category::Analytics, UNDERSCORE_PREFIX);
    }

    scores.cap(super::HEURISTIC_CAP);
    (scores, evidence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::observation::{CookieObservation, DetectionChannel};
    use crate::merge::merge_observations;
    use time::OffsetDateTime;

    fn ts() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()
    }

    fn record(name: &str, value: &str, days: Option<i64>) -> CookieRecord {
        let mut obs =
            CookieObservation::bare(name, value, "example.com", DetectionChannel::CookieJar, ts());
        obs.expires = days.map(|d| ts() + time::Duration::days(d));
        merge_observations(vec![obs], "example.com").remove(0)
    }

    #[test]
    fn entropy_of_uniform_string_is_zero() {
        assert_eq!(shannon_entropy("aaaaaaaa"), 0.0);
    }

    #[test]
    fn entropy_grows_with_variety() {
        let low = shannon_entropy("abababab");
        let high = shannon_entropy("a8Xp2!qZ0vR4mN7c");
        assert!(high > low);
        assert!(high > ENTROPY_THRESHOLD);
    }

    #[test]
    fn uuid_value_scores_identifier_categories() {
        let r = record("x", "123e4567-e89b-42d3-a456-426614174000", Some(400));
        let (scores, evidence) = score(&r);
        assert_eq!(scores.best().unwrap().0, Category::Marketing);
        assert!(evidence.iter().any(|e| e.contains("uuid")));
        // Long duration pushed marketing past analytics; both scored.
        assert!(scores.get(Category::Analytics) > 0.0);
    }

    #[test]
    fn session_cookie_leans_necessary() {
        let r = record("sid", "ok", None);
        let (scores, _) = score(&r);
        assert_eq!(scores.best().unwrap().0, Category::Necessary);
    }

    #[test]
    fn stage_confidence_never_exceeds_cap() {
        let r = record(
            "xk92jd",
            "4fzyo82kwruza4x0cb72pqnsgabcdefghijk1234567890aa",
            Some(800),
        );
        let (scores, _) = score(&r);
        assert!(scores.best().unwrap().1 <= super::super::HEURISTIC_CAP);
    }
}
