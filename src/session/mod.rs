//! Browser automation capability contract.
//!
//! The engine never drives a devtools channel or HTTP proxy itself; it
//! consumes an already-opened [`BrowserSession`] through this interface.
//! Everything a session returns is structured data — raw cookies, storage
//! pairs, intercepted traffic, frames. Failures of individual calls surface
//! as channel-level errors in the collector and never abort the scan.

pub mod context;

use crate::base::ScanError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::OffsetDateTime;
use url::Url;

/// SameSite attribute of a cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Unspecified,
    NoRestriction,
    Lax,
    Strict,
}

/// A cookie as reported by the browser session, before any dedup or
/// enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub expires: Option<OffsetDateTime>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
}

impl RawCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: "/".to_string(),
            expires: None,
            secure: false,
            http_only: false,
            same_site: SameSite::Unspecified,
        }
    }
}

/// Which web storage bucket to enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Local,
    Session,
}

/// How long navigation should wait before the page counts as loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    DomContentLoaded,
    Load,
    NetworkIdle,
}

/// A same-process sub-frame discovered in the page.
#[derive(Debug, Clone)]
pub struct FrameInfo {
    pub url: String,
}

/// Coarse resource class of an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
    Document,
    Script,
    Image,
    Xhr,
    Other,
}

/// One intercepted outgoing request.
#[derive(Debug, Clone)]
pub struct RequestEvent {
    pub url: String,
    pub host: String,
    pub kind: ResourceKind,
    pub headers: Vec<(String, String)>,
}

/// One intercepted response.
#[derive(Debug, Clone)]
pub struct ResponseEvent {
    pub url: String,
    pub host: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

/// All traffic intercepted during a session, drained once per scan.
#[derive(Debug, Clone, Default)]
pub struct NetworkTrace {
    pub requests: Vec<RequestEvent>,
    pub responses: Vec<ResponseEvent>,
}

impl NetworkTrace {
    /// Distinct hosts contacted by any request.
    pub fn request_hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self.requests.iter().map(|r| r.host.clone()).collect();
        hosts.sort();
        hosts.dedup();
        hosts
    }

    /// Distinct hosts that served script resources.
    pub fn script_hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self
            .requests
            .iter()
            .filter(|r| r.kind == ResourceKind::Script)
            .map(|r| r.host.clone())
            .collect();
        hosts.sort();
        hosts.dedup();
        hosts
    }

    /// `Cookie` header values carried by intercepted requests, with the
    /// request host they were sent to.
    pub fn request_cookie_headers(&self) -> Vec<(String, String)> {
        self.requests
            .iter()
            .flat_map(|r| {
                r.headers
                    .iter()
                    .filter(|(k, _)| k.eq_ignore_ascii_case("cookie"))
                    .map(move |(_, v)| (r.host.clone(), v.clone()))
            })
            .collect()
    }

    /// `Set-Cookie` header values from intercepted responses, with the
    /// responding host.
    pub fn set_cookie_headers(&self) -> Vec<(String, String)> {
        self.responses
            .iter()
            .flat_map(|r| {
                r.headers
                    .iter()
                    .filter(|(k, _)| k.eq_ignore_ascii_case("set-cookie"))
                    .map(move |(_, v)| (r.host.clone(), v.clone()))
            })
            .collect()
    }
}

/// A single consent-interaction attempt: try `selector`, perform `action`.
///
/// The attempt list is data, not code, so interaction behavior is testable
/// without a real browser. Attempts in the same `group` stop at the first
/// success.
#[derive(Debug, Clone)]
pub struct InteractionAttempt {
    pub group: &'static str,
    pub selector: &'static str,
    pub action: InteractionAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionAction {
    Click,
    Scroll,
    DispatchEvents,
}

/// In-page instrumentation source handed verbatim to the session.
///
/// The engine never inspects or regenerates this string; it only consumes
/// the structured JSON object its evaluation returns (fingerprinting API
/// usage flags).
pub const INSTRUMENTATION_SCRIPT: &str = r#"(() => {
  const used = { canvas: false, webgl: false, audio: false };
  try {
    used.canvas = !!window.__cs_canvas_read;
    used.webgl = !!window.__cs_webgl_read;
    used.audio = !!window.__cs_audio_read;
  } catch (e) {}
  return JSON.stringify(used);
})()"#;

/// An isolated browser session bound to one scan.
///
/// Cookies and storage written inside the session are discarded when it is
/// dropped; the engine performs no cleanup of its own.
pub trait BrowserSession: Send + Sync + 'static {
    /// Navigate the main frame and block until the wait policy is
    /// satisfied. This is the one call whose failure is fatal to the scan.
    fn navigate(&self, url: &Url, wait: WaitPolicy) -> Result<(), ScanError>;

    /// Snapshot of the session cookie jar.
    fn read_cookies(&self) -> Result<Vec<RawCookie>, ScanError>;

    /// The main frame's `document.cookie` string.
    fn cookie_string(&self) -> Result<String, ScanError>;

    /// Enumerate one storage bucket of the main frame.
    fn read_storage(&self, kind: StorageKind) -> Result<Vec<(String, String)>, ScanError>;

    /// Drain all traffic intercepted so far.
    fn network_trace(&self) -> Result<NetworkTrace, ScanError>;

    /// Same-process sub-frames currently attached.
    fn enumerate_frames(&self) -> Result<Vec<FrameInfo>, ScanError>;

    /// The `document.cookie` string of one sub-frame.
    fn frame_cookie_string(&self, frame: &FrameInfo) -> Result<String, ScanError>;

    /// Evaluate a script in the main frame and return its result.
    fn evaluate(&self, script: &str) -> Result<serde_json::Value, ScanError>;

    /// Execute one consent-interaction attempt. Returns whether the
    /// selector matched and the action ran.
    fn dispatch(&self, attempt: &InteractionAttempt) -> Result<bool, ScanError>;

    /// Best-effort cookie probe of an auxiliary host (sibling subdomain or
    /// known third-party endpoint) without leaving the main page.
    fn probe_host(&self, host: &str) -> Result<Vec<RawCookie>, ScanError>;
}

/// Options handed to a [`SessionProvider`] when opening a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Per-capability-call timeout the transport should enforce. A call
    /// exceeding it must return a channel-level error, not hang.
    pub call_timeout: std::time::Duration,
    pub user_agent: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            call_timeout: std::time::Duration::from_secs(10),
            user_agent: None,
        }
    }
}

/// Opens isolated browser sessions. The engine treats this purely as an
/// external capability.
pub trait SessionProvider: Send + Sync {
    fn open(&self, options: &SessionOptions) -> Result<Arc<dyn BrowserSession>, ScanError>;
}
