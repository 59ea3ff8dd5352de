//! Session-level context assembled after evidence collection.
//!
//! Classification and attribution are pure functions of a record plus this
//! context, so everything here is plain data captured once per scan.

use crate::session::NetworkTrace;
use serde::{Deserialize, Serialize};

/// Host fragments that identify a page technology. Matching is by
/// substring against script-serving hosts, which is enough to correlate
/// cookie names with the library that set them.
const TECHNOLOGY_SIGNATURES: &[(&str, &str)] = &[
    ("google-analytics.com", "google-analytics"),
    ("googletagmanager.com", "google-tag-manager"),
    ("doubleclick.net", "doubleclick"),
    ("googlesyndication.com", "google-ads"),
    ("connect.facebook.net", "facebook-pixel"),
    ("static.hotjar.com", "hotjar"),
    ("script.hotjar.com", "hotjar"),
    ("js.hs-scripts.com", "hubspot"),
    ("js.hsforms.net", "hubspot"),
    ("cdn.mxpnl.com", "mixpanel"),
    ("cdn.segment.com", "segment"),
    ("static.cloudflareinsights.com", "cloudflare-insights"),
    ("snap.licdn.com", "linkedin-insight"),
    ("bat.bing.com", "microsoft-advertising"),
    ("cdn.matomo.cloud", "matomo"),
    ("js.stripe.com", "stripe"),
    ("static.ads-twitter.com", "twitter-ads"),
    ("analytics.tiktok.com", "tiktok-pixel"),
];

/// Fingerprinting API usage observed by the instrumentation script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintSignals {
    pub canvas: bool,
    pub webgl: bool,
    pub audio: bool,
}

impl FingerprintSignals {
    /// Parse the JSON object the instrumentation script returns. Anything
    /// malformed reads as "no signal".
    pub fn from_instrumentation(value: &serde_json::Value) -> Self {
        let obj = match value {
            serde_json::Value::String(s) => match serde_json::from_str::<serde_json::Value>(s) {
                Ok(v) => v,
                Err(_) => return Self::default(),
            },
            other => other.clone(),
        };
        Self {
            canvas: obj.get("canvas").and_then(|v| v.as_bool()).unwrap_or(false),
            webgl: obj.get("webgl").and_then(|v| v.as_bool()).unwrap_or(false),
            audio: obj.get("audio").and_then(|v| v.as_bool()).unwrap_or(false),
        }
    }

    pub fn technique_count(&self) -> u32 {
        self.canvas as u32 + self.webgl as u32 + self.audio as u32
    }
}

/// Everything the classifier and resolver may consult beyond the record
/// itself: detected technologies, contacted hosts, fingerprinting signals.
#[derive(Debug, Clone, Default)]
pub struct ScanContext {
    /// Canonical technology slugs detected on the page.
    pub technologies: Vec<String>,
    /// Distinct hosts contacted by any intercepted request.
    pub request_hosts: Vec<String>,
    /// Distinct hosts that served script resources.
    pub script_hosts: Vec<String>,
    pub fingerprinting: FingerprintSignals,
}

impl ScanContext {
    pub fn from_trace(trace: &NetworkTrace, fingerprinting: FingerprintSignals) -> Self {
        let request_hosts = trace.request_hosts();
        let script_hosts = trace.script_hosts();

        let mut technologies = Vec::new();
        for host in request_hosts.iter().chain(script_hosts.iter()) {
            for (fragment, slug) in TECHNOLOGY_SIGNATURES {
                if host.contains(fragment) && !technologies.iter().any(|t| t == slug) {
                    technologies.push(slug.to_string());
                }
            }
        }
        technologies.sort();

        Self {
            technologies,
            request_hosts,
            script_hosts,
            fingerprinting,
        }
    }

    pub fn has_technology(&self, slug: &str) -> bool {
        self.technologies.iter().any(|t| t == slug)
    }
}
