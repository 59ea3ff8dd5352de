//! Deduplication and enrichment of raw observations into canonical
//! cookie records.
//!
//! The dedup key is `(name, domain-without-leading-dot, channel-category)`:
//! equivalent read techniques collapse into one record while genuinely
//! different evidence (a jar read vs. a `Set-Cookie` header) stays distinct
//! as corroboration. Merging keeps first-seen attribute values and
//! accumulates the full set of channels and timestamps.

use crate::base::domain::{self, normalize_domain};
use crate::classify::Category;
use crate::collector::observation::{ChannelCategory, CookieObservation, DetectionChannel};
use crate::session::SameSite;
use crate::vendor::VendorMatch;
use std::collections::HashMap;
use time::OffsetDateTime;

/// Stored values are truncated to this many bytes; `size_bytes` always
/// reflects the untruncated size.
pub const VALUE_STORAGE_CAP: usize = 512;

/// Canonical record identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub name: String,
    pub domain: String,
    pub channel_category: ChannelCategory,
}

/// Canonical, deduplicated cookie entity.
///
/// Mutated only by the merge below and by the classifier/resolver
/// annotations; treated as immutable once aggregation starts.
#[derive(Debug, Clone)]
pub struct CookieRecord {
    pub name: String,
    /// Normalized domain, leading dot stripped.
    pub domain: String,
    pub path: String,
    /// Possibly truncated to [`VALUE_STORAGE_CAP`].
    pub value: String,
    pub expires: Option<OffsetDateTime>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    /// The channel-category half of the dedup key.
    pub channel_category: ChannelCategory,
    /// Every distinct channel this cookie was seen through.
    pub channels: Vec<DetectionChannel>,
    /// Every sighting timestamp, in merge order.
    pub timestamps: Vec<OffsetDateTime>,
    pub first_seen: OffsetDateTime,
    pub is_third_party: bool,
    pub is_persistent: bool,
    /// Untruncated name + value size.
    pub size_bytes: usize,
    pub category: Category,
    pub category_confidence: f64,
    pub vendor: Option<VendorMatch>,
    /// Whether the site's consent configuration already covers this
    /// cookie. Enriched from the inventory; a fresh scan starts false.
    pub consent_recorded: bool,
    /// Declared purpose text, when the inventory documents one.
    pub description: Option<String>,
}

impl CookieRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey {
            name: self.name.clone(),
            domain: self.domain.clone(),
            channel_category: self.channel_category,
        }
    }

    /// Lifetime from first sighting to expiry, if persistent.
    pub fn retention(&self) -> Option<time::Duration> {
        self.expires.map(|e| e - self.first_seen)
    }

    fn from_observation(obs: &CookieObservation, target_domain: &str) -> Self {
        let domain = normalize_domain(&obs.domain);
        let size_bytes = obs.name.len() + obs.value.len();
        let is_third_party = domain::is_third_party(&domain, target_domain);
        let is_persistent = obs.expires.map(|e| e > obs.observed_at).unwrap_or(false);

        Self {
            name: obs.name.clone(),
            domain,
            path: obs.path.clone(),
            value: truncate_value(&obs.value),
            expires: obs.expires,
            secure: obs.secure,
            http_only: obs.http_only,
            same_site: obs.same_site,
            channel_category: obs.channel.category(),
            channels: vec![obs.channel],
            timestamps: vec![obs.observed_at],
            first_seen: obs.observed_at,
            is_third_party,
            is_persistent,
            size_bytes,
            category: Category::Unknown,
            category_confidence: 0.0,
            vendor: None,
            consent_recorded: false,
            description: None,
        }
    }

    /// Fold a later sighting of the same key into this record. Attribute
    /// values stay first-seen; channels and timestamps accumulate.
    fn absorb(&mut self, obs: &CookieObservation) {
        if !self.channels.contains(&obs.channel) {
            self.channels.push(obs.channel);
        }
        self.timestamps.push(obs.observed_at);
        if obs.observed_at < self.first_seen {
            self.first_seen = obs.observed_at;
        }
    }
}

fn truncate_value(value: &str) -> String {
    if value.len() <= VALUE_STORAGE_CAP {
        return value.to_string();
    }
    let mut end = VALUE_STORAGE_CAP;
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

/// Fold raw observations into canonical records.
///
/// Observations are ordered by (timestamp, channel) before folding so the
/// "first-seen" attribute values are deterministic regardless of channel
/// completion order. Output is sorted by record key.
pub fn merge_observations(
    mut observations: Vec<CookieObservation>,
    target_domain: &str,
) -> Vec<CookieRecord> {
    observations.sort_by(|a, b| {
        a.observed_at
            .cmp(&b.observed_at)
            .then_with(|| a.channel.as_str().cmp(b.channel.as_str()))
    });

    let mut records: HashMap<RecordKey, CookieRecord> = HashMap::new();

    for obs in &observations {
        let key = RecordKey {
            name: obs.name.clone(),
            domain: normalize_domain(&obs.domain),
            channel_category: obs.channel.category(),
        };
        match records.get_mut(&key) {
            Some(record) => record.absorb(obs),
            None => {
                records.insert(key, CookieRecord::from_observation(obs, target_domain));
            }
        }
    }

    let mut out: Vec<CookieRecord> = records.into_values().collect();
    out.sort_by(|a, b| a.key().cmp(&b.key()));

    tracing::debug!(
        observations = observations.len(),
        records = out.len(),
        "merged observations into records"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn at(secs: i64) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_700_000_000 + secs).unwrap()
    }

    fn obs(name: &str, domain: &str, channel: DetectionChannel, secs: i64) -> CookieObservation {
        CookieObservation::bare(name, "v", domain, channel, at(secs))
    }

    #[test]
    fn same_category_channels_merge_into_one_record() {
        let records = merge_observations(
            vec![
                obs("_ga", "example.com", DetectionChannel::CookieJar, 0),
                obs("_ga", "example.com", DetectionChannel::CookieString, 1),
            ],
            "example.com",
        );
        assert_eq!(records.len(), 1);
        let channels: HashSet<_> = records[0].channels.iter().copied().collect();
        assert!(channels.contains(&DetectionChannel::CookieJar));
        assert!(channels.contains(&DetectionChannel::CookieString));
        assert_eq!(records[0].timestamps.len(), 2);
    }

    #[test]
    fn different_categories_stay_distinct() {
        let records = merge_observations(
            vec![
                obs("_ga", "example.com", DetectionChannel::CookieJar, 0),
                obs("_ga", "example.com", DetectionChannel::ResponseHeader, 0),
            ],
            "example.com",
        );
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn dedup_key_is_unique_in_output() {
        let mut input = Vec::new();
        for i in 0..20 {
            input.push(obs("a", "example.com", DetectionChannel::CookieJar, i));
            input.push(obs("a", "example.com", DetectionChannel::CookieString, i));
            input.push(obs("b", "other.net", DetectionChannel::LocalStorage, i));
        }
        let records = merge_observations(input, "example.com");
        let keys: HashSet<_> = records.iter().map(|r| r.key()).collect();
        assert_eq!(keys.len(), records.len());
    }

    #[test]
    fn leading_dot_domains_fold_together() {
        let records = merge_observations(
            vec![
                obs("sid", ".example.com", DetectionChannel::CookieJar, 0),
                obs("sid", "example.com", DetectionChannel::CookieString, 1),
            ],
            "example.com",
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].domain, "example.com");
    }

    #[test]
    fn first_seen_attributes_win() {
        let mut early = obs("tok", "example.com", DetectionChannel::CookieJar, 0);
        early.secure = false;
        let mut late = obs("tok", "example.com", DetectionChannel::CookieString, 5);
        late.secure = true;
        late.expires = Some(at(100_000));

        let records = merge_observations(vec![late, early], "example.com");
        assert_eq!(records.len(), 1);
        // The t=0 sighting wins even though it arrived second.
        assert!(!records[0].secure);
        assert!(records[0].expires.is_none());
        assert!(!records[0].is_persistent);
    }

    #[test]
    fn third_party_and_persistence_flags() {
        let mut tp = obs("xk92jd", "doubleclick.net", DetectionChannel::CookieJar, 0);
        tp.expires = Some(at(63_072_000));
        let sp = obs("PHPSESSID", "www.example.com", DetectionChannel::CookieJar, 0);

        let records = merge_observations(vec![tp, sp], "example.com");
        let tp_rec = records.iter().find(|r| r.name == "xk92jd").unwrap();
        let sp_rec = records.iter().find(|r| r.name == "PHPSESSID").unwrap();

        assert!(tp_rec.is_third_party);
        assert!(tp_rec.is_persistent);
        assert!(!sp_rec.is_third_party);
        assert!(!sp_rec.is_persistent);
    }

    #[test]
    fn expired_cookie_is_not_persistent() {
        let mut gone = obs("old", "example.com", DetectionChannel::CookieJar, 0);
        gone.expires = Some(at(-100));
        let records = merge_observations(vec![gone], "example.com");
        assert!(!records[0].is_persistent);
    }

    #[test]
    fn oversized_values_truncate_but_size_is_untruncated() {
        let mut big = obs("blob", "example.com", DetectionChannel::LocalStorage, 0);
        big.value = "x".repeat(2000);
        let records = merge_observations(vec![big], "example.com");
        assert_eq!(records[0].value.len(), VALUE_STORAGE_CAP);
        assert_eq!(records[0].size_bytes, "blob".len() + 2000);
    }
}
