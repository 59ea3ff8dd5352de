//! Raw cookie sightings and the channels that produce them.

use crate::session::{RawCookie, SameSite};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A distinct technique for observing cookies or storage artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionChannel {
    /// Session cookie-jar snapshot.
    CookieJar,
    /// Main frame `document.cookie`.
    CookieString,
    LocalStorage,
    SessionStorage,
    /// `Cookie` header on an intercepted request.
    RequestHeader,
    /// `Set-Cookie` header on an intercepted response.
    ResponseHeader,
    /// `document.cookie` of a same-process sub-frame.
    SubFrame,
    /// Best-effort probe of a sibling subdomain.
    SubdomainProbe,
    /// Best-effort probe of a known third-party host.
    ThirdPartyProbe,
}

impl DetectionChannel {
    /// Dedup grouping: channels in the same category observe the same
    /// logical cookie and merge into one record; separate categories stay
    /// distinct as corroborating evidence.
    pub fn category(self) -> ChannelCategory {
        match self {
            DetectionChannel::CookieJar
            | DetectionChannel::CookieString
            | DetectionChannel::SubFrame => ChannelCategory::Jar,
            DetectionChannel::LocalStorage | DetectionChannel::SessionStorage => {
                ChannelCategory::Storage
            }
            DetectionChannel::RequestHeader => ChannelCategory::RequestHeader,
            DetectionChannel::ResponseHeader => ChannelCategory::ResponseHeader,
            DetectionChannel::SubdomainProbe | DetectionChannel::ThirdPartyProbe => {
                ChannelCategory::Probe
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DetectionChannel::CookieJar => "cookie-jar",
            DetectionChannel::CookieString => "cookie-string",
            DetectionChannel::LocalStorage => "local-storage",
            DetectionChannel::SessionStorage => "session-storage",
            DetectionChannel::RequestHeader => "request-header",
            DetectionChannel::ResponseHeader => "response-header",
            DetectionChannel::SubFrame => "sub-frame",
            DetectionChannel::SubdomainProbe => "subdomain-probe",
            DetectionChannel::ThirdPartyProbe => "third-party-probe",
        }
    }
}

/// Channel grouping used in the dedup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChannelCategory {
    Jar,
    Storage,
    RequestHeader,
    ResponseHeader,
    Probe,
}

impl ChannelCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelCategory::Jar => "jar",
            ChannelCategory::Storage => "storage",
            ChannelCategory::RequestHeader => "request-header",
            ChannelCategory::ResponseHeader => "response-header",
            ChannelCategory::Probe => "probe",
        }
    }
}

/// A single raw sighting of a cookie or storage artifact.
///
/// Observations are ephemeral: produced by the collector, folded into
/// canonical records by the deduplicator, never persisted.
#[derive(Debug, Clone)]
pub struct CookieObservation {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub expires: Option<OffsetDateTime>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    pub channel: DetectionChannel,
    pub observed_at: OffsetDateTime,
    /// URL of the sub-frame this was read from, if any.
    pub frame_url: Option<String>,
    /// Host this observation was probed from, if any.
    pub probed_host: Option<String>,
}

impl CookieObservation {
    pub fn from_raw(raw: RawCookie, channel: DetectionChannel, at: OffsetDateTime) -> Self {
        Self {
            name: raw.name,
            value: raw.value,
            domain: raw.domain,
            path: raw.path,
            expires: raw.expires,
            secure: raw.secure,
            http_only: raw.http_only,
            same_site: raw.same_site,
            channel,
            observed_at: at,
            frame_url: None,
            probed_host: None,
        }
    }

    /// A bare name/value pair with no attribute information (cookie
    /// strings, storage enumeration).
    pub fn bare(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
        channel: DetectionChannel,
        at: OffsetDateTime,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: "/".to_string(),
            expires: None,
            secure: false,
            http_only: false,
            same_site: SameSite::Unspecified,
            channel,
            observed_at: at,
            frame_url: None,
            probed_host: None,
        }
    }

    pub fn with_frame(mut self, frame_url: impl Into<String>) -> Self {
        self.frame_url = Some(frame_url.into());
        self
    }

    pub fn with_probed_host(mut self, host: impl Into<String>) -> Self {
        self.probed_host = Some(host.into());
        self
    }
}

/// Parse a `document.cookie`-style string (`a=1; b=2`) into observations
/// scoped to `host`.
pub fn parse_cookie_pairs(
    cookie_string: &str,
    host: &str,
    channel: DetectionChannel,
    at: OffsetDateTime,
) -> Vec<CookieObservation> {
    cookie_string
        .split(';')
        .filter_map(|pair| {
            let pair = pair.trim();
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(CookieObservation::bare(
                name,
                value.trim(),
                host,
                channel,
                at,
            ))
        })
        .collect()
}

/// Parse one `Set-Cookie` header value. Attributes present on the header
/// (Domain, Path, Expires, Max-Age, Secure, HttpOnly, SameSite) carry
/// through; an absent Domain attribute scopes the cookie to the
/// responding host.
pub fn parse_set_cookie(
    header_value: &str,
    response_host: &str,
    at: OffsetDateTime,
) -> Option<CookieObservation> {
    let parsed = cookie::Cookie::parse(header_value.to_string()).ok()?;

    let domain = parsed
        .domain()
        .map(|d| d.trim_start_matches('.').to_lowercase())
        .unwrap_or_else(|| response_host.to_lowercase());

    let expires = match parsed.max_age() {
        Some(max_age) => {
            let secs = max_age.whole_seconds();
            Some(at + time::Duration::seconds(secs))
        }
        None => parsed.expires().and_then(|e| e.datetime()),
    };

    let same_site = match parsed.same_site() {
        Some(cookie::SameSite::Lax) => SameSite::Lax,
        Some(cookie::SameSite::Strict) => SameSite::Strict,
        Some(cookie::SameSite::None) => SameSite::NoRestriction,
        None => SameSite::Unspecified,
    };

    Some(CookieObservation {
        name: parsed.name().to_string(),
        value: parsed.value().to_string(),
        domain,
        path: parsed.path().unwrap_or("/").to_string(),
        expires,
        secure: parsed.secure().unwrap_or(false),
        http_only: parsed.http_only().unwrap_or(false),
        same_site,
        channel: DetectionChannel::ResponseHeader,
        observed_at: at,
        frame_url: None,
        probed_host: None,
    })
}
