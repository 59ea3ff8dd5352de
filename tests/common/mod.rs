//! Scripted browser-session double for end-to-end tests.

use consentscan::base::ScanError;
use consentscan::session::{
    BrowserSession, FrameInfo, InteractionAttempt, NetworkTrace, RawCookie, SessionOptions,
    SessionProvider, StorageKind, WaitPolicy,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use url::Url;

/// A fully scripted session: every channel serves fixed data, and any
/// channel can be told to fail.
#[derive(Default)]
pub struct FakeSession {
    pub jar: Vec<RawCookie>,
    pub cookie_string: String,
    pub local_storage: Vec<(String, String)>,
    pub session_storage: Vec<(String, String)>,
    pub frames: Vec<FrameInfo>,
    /// frame url -> that frame's cookie string
    pub frame_cookies: HashMap<String, String>,
    pub trace: NetworkTrace,
    /// host -> cookies a probe of that host reports
    pub probe_results: HashMap<String, Vec<RawCookie>>,
    pub matching_selectors: Vec<String>,
    pub instrumentation: Option<serde_json::Value>,
    /// Channels that fail: "navigate", "jar", "cookie-string", "storage",
    /// "frames", "trace", "probe".
    pub failing: HashSet<&'static str>,
}

impl FakeSession {
    fn fail_if(&self, what: &'static str) -> Result<(), ScanError> {
        if self.failing.contains(what) {
            return Err(ScanError::channel(format!("{} unavailable", what)));
        }
        Ok(())
    }
}

impl BrowserSession for FakeSession {
    fn navigate(&self, _url: &Url, _wait: WaitPolicy) -> Result<(), ScanError> {
        if self.failing.contains("navigate") {
            return Err(ScanError::scan_failed("net::ERR_CONNECTION_REFUSED"));
        }
        Ok(())
    }

    fn read_cookies(&self) -> Result<Vec<RawCookie>, ScanError> {
        self.fail_if("jar")?;
        Ok(self.jar.clone())
    }

    fn cookie_string(&self) -> Result<String, ScanError> {
        self.fail_if("cookie-string")?;
        Ok(self.cookie_string.clone())
    }

    fn read_storage(&self, kind: StorageKind) -> Result<Vec<(String, String)>, ScanError> {
        self.fail_if("storage")?;
        Ok(match kind {
            StorageKind::Local => self.local_storage.clone(),
            StorageKind::Session => self.session_storage.clone(),
        })
    }

    fn network_trace(&self) -> Result<NetworkTrace, ScanError> {
        self.fail_if("trace")?;
        Ok(self.trace.clone())
    }

    fn enumerate_frames(&self) -> Result<Vec<FrameInfo>, ScanError> {
        self.fail_if("frames")?;
        Ok(self.frames.clone())
    }

    fn frame_cookie_string(&self, frame: &FrameInfo) -> Result<String, ScanError> {
        Ok(self.frame_cookies.get(&frame.url).cloned().unwrap_or_default())
    }

    fn evaluate(&self, _script: &str) -> Result<serde_json::Value, ScanError> {
        Ok(self
            .instrumentation
            .clone()
            .unwrap_or(serde_json::Value::Null))
    }

    fn dispatch(&self, attempt: &InteractionAttempt) -> Result<bool, ScanError> {
        Ok(self
            .matching_selectors
            .iter()
            .any(|s| s == attempt.selector))
    }

    fn probe_host(&self, host: &str) -> Result<Vec<RawCookie>, ScanError> {
        self.fail_if("probe")?;
        Ok(self.probe_results.get(host).cloned().unwrap_or_default())
    }
}

pub struct FakeProvider {
    session: Arc<FakeSession>,
    pub fail_open: bool,
}

impl FakeProvider {
    pub fn new(session: FakeSession) -> Self {
        Self {
            session: Arc::new(session),
            fail_open: false,
        }
    }
}

impl SessionProvider for FakeProvider {
    fn open(&self, _options: &SessionOptions) -> Result<Arc<dyn BrowserSession>, ScanError> {
        if self.fail_open {
            return Err(ScanError::session_failed("no browser available"));
        }
        Ok(self.session.clone())
    }
}

/// Scan options tuned for tests: no settle wait, short timeout.
pub fn fast_options() -> consentscan::scan::ScanOptions {
    let mut options = consentscan::scan::ScanOptions::default();
    options.collector.settle_wait = std::time::Duration::ZERO;
    options.collector.timeout = std::time::Duration::from_secs(5);
    options
}
