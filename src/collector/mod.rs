//! Evidence collection.
//!
//! Drives one isolated browser session against a target URL: navigate,
//! trigger consent-likely interactions, then pull cookie and storage
//! evidence from every available channel. Channels are independent and
//! individually fallible; only target validation, session creation, and
//! navigation can fail the scan. The whole collection is bounded by one
//! deadline, and on expiry partial evidence is returned rather than
//! nothing.

pub mod interact;
pub mod observation;

use crate::base::domain::{normalize_domain, registrable_domain};
use crate::base::ScanError;
use crate::session::context::{FingerprintSignals, ScanContext};
use crate::session::{
    BrowserSession, NetworkTrace, SessionOptions, SessionProvider, StorageKind, WaitPolicy,
    INSTRUMENTATION_SCRIPT,
};
use futures::StreamExt;
use observation::{parse_cookie_pairs, parse_set_cookie, CookieObservation, DetectionChannel};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use url::Url;
use uuid::Uuid;

/// Lifecycle of one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ScanStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Identifies one crawl. Immutable once `Completed` or `Failed`.
#[derive(Debug, Clone)]
pub struct ScanSession {
    pub id: Uuid,
    pub target_url: Url,
    pub target_domain: String,
    pub started_at: OffsetDateTime,
    pub finished_at: Option<OffsetDateTime>,
    pub status: ScanStatus,
}

impl ScanSession {
    pub fn begin(target_url: Url) -> Self {
        let target_domain = target_url
            .host_str()
            .map(normalize_domain)
            .unwrap_or_default();
        Self {
            id: Uuid::new_v4(),
            target_url,
            target_domain,
            started_at: OffsetDateTime::now_utc(),
            finished_at: None,
            status: ScanStatus::Running,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, ScanStatus::Completed | ScanStatus::Failed)
    }

    /// Transition to a terminal status. No-op if already terminal.
    fn finish(&mut self, status: ScanStatus) {
        if self.is_terminal() {
            return;
        }
        self.status = status;
        self.finished_at = Some(OffsetDateTime::now_utc());
    }
}

/// A channel that failed during collection. Recorded, never fatal.
#[derive(Debug, Clone)]
pub struct ChannelFailure {
    pub channel: DetectionChannel,
    pub error: ScanError,
}

/// Wall-clock duration one channel took.
#[derive(Debug, Clone)]
pub struct ChannelTiming {
    pub channel: DetectionChannel,
    pub elapsed: Duration,
}

/// Collector configuration. Validated once at scan start.
#[derive(Debug, Clone)]
pub struct CollectorOptions {
    /// Whole-scan deadline. On expiry remaining channels are abandoned and
    /// partial evidence is returned.
    pub timeout: Duration,
    /// Navigation wait policy.
    pub wait_policy: WaitPolicy,
    /// Settle time after navigation and interactions, letting deferred
    /// scripts fire.
    pub settle_wait: Duration,
    /// How many interaction groups from the consent attempt table to run
    /// (0 disables interactions).
    pub interaction_depth: usize,
    /// Maximum evidence channels in flight at once.
    pub channel_concurrency: usize,
    /// Sibling subdomain labels to probe.
    pub probe_subdomains: Vec<String>,
    /// Known third-party hosts to probe.
    pub probe_third_party_hosts: Vec<String>,
    pub session: SessionOptions,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            wait_policy: WaitPolicy::Load,
            settle_wait: Duration::from_millis(1500),
            interaction_depth: 3,
            channel_concurrency: 4,
            probe_subdomains: ["www", "shop", "blog", "app", "api"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            probe_third_party_hosts: [
                "doubleclick.net",
                "www.google-analytics.com",
                "connect.facebook.net",
                "www.youtube.com",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            session: SessionOptions::default(),
        }
    }
}

impl CollectorOptions {
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.timeout.is_zero() {
            return Err(ScanError::InvalidOptions {
                reason: "scan timeout must be non-zero".to_string(),
            });
        }
        if self.channel_concurrency == 0 {
            return Err(ScanError::InvalidOptions {
                reason: "channel concurrency must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Everything collection produced, including what went wrong.
#[derive(Debug)]
pub struct Harvest {
    pub session: ScanSession,
    pub observations: Vec<CookieObservation>,
    pub trace: NetworkTrace,
    pub context: ScanContext,
    pub channel_failures: Vec<ChannelFailure>,
    pub channel_timings: Vec<ChannelTiming>,
    /// Session-level failure (navigation), if the scan ended `Failed`.
    pub failure: Option<ScanError>,
}

/// Parse and validate a scan target: absolute http(s) URL with a host.
pub fn validate_target(target: &str) -> Result<Url, ScanError> {
    let url = Url::parse(target)
        .map_err(|e| ScanError::invalid_target(format!("{}: {}", target, e)))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ScanError::invalid_target(format!(
            "unsupported scheme '{}'",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(ScanError::invalid_target("target URL has no host"));
    }
    Ok(url)
}

type ChannelResult = Result<Vec<CookieObservation>, ScanError>;

/// Multi-channel evidence collector bound to one browser session per scan.
pub struct EvidenceCollector {
    options: CollectorOptions,
}

impl EvidenceCollector {
    pub fn new(options: CollectorOptions) -> Result<Self, ScanError> {
        options.validate()?;
        Ok(Self { options })
    }

    /// Run a full collection against `target`.
    ///
    /// `Err` is returned only when no evidence can possibly exist: an
    /// invalid target or a session that could not be created. Navigation
    /// failure and deadline expiry produce an `Ok` harvest carrying
    /// whatever was gathered, with the failure recorded.
    pub async fn collect(
        &self,
        provider: &dyn SessionProvider,
        target: &str,
    ) -> Result<Harvest, ScanError> {
        let url = validate_target(target)?;
        let session = provider.open(&self.options.session)?;
        let mut scan = ScanSession::begin(url.clone());
        let deadline = tokio::time::Instant::now() + self.options.timeout;

        tracing::debug!(scan = %scan.id, target = %url, "starting evidence collection");

        // Navigation is the one hard ordering constraint: everything else
        // reads state navigation creates.
        if let Err(err) = self.navigate(&session, &url, deadline).await {
            scan.finish(ScanStatus::Failed);
            tracing::warn!(scan = %scan.id, error = %err, "navigation failed");
            return Ok(Harvest {
                session: scan,
                observations: Vec::new(),
                trace: NetworkTrace::default(),
                context: ScanContext::default(),
                channel_failures: Vec::new(),
                channel_timings: Vec::new(),
                failure: Some(err),
            });
        }

        self.interact_and_settle(&session, deadline).await;

        let (observations, trace, mut failures, timings) =
            self.run_channels(&session, &scan, deadline).await;

        // Instrumentation result feeds the fingerprinting profile; a
        // failure here reads as "no signal".
        let fingerprinting = {
            let s = session.clone();
            match tokio::task::spawn_blocking(move || s.evaluate(INSTRUMENTATION_SCRIPT)).await {
                Ok(Ok(value)) => FingerprintSignals::from_instrumentation(&value),
                Ok(Err(e)) => {
                    tracing::debug!(error = %e, "instrumentation evaluation failed");
                    FingerprintSignals::default()
                }
                Err(e) => {
                    tracing::debug!(error = %e, "instrumentation task failed");
                    FingerprintSignals::default()
                }
            }
        };

        let context = ScanContext::from_trace(&trace, fingerprinting);

        failures.sort_by_key(|f| f.channel.as_str());
        scan.finish(ScanStatus::Completed);
        tracing::debug!(
            scan = %scan.id,
            observations = observations.len(),
            failed_channels = failures.len(),
            "evidence collection complete"
        );

        Ok(Harvest {
            session: scan,
            observations,
            trace,
            context,
            channel_failures: failures,
            channel_timings: timings,
            failure: None,
        })
    }

    async fn navigate(
        &self,
        session: &Arc<dyn BrowserSession>,
        url: &Url,
        deadline: tokio::time::Instant,
    ) -> Result<(), ScanError> {
        let s = session.clone();
        let nav_url = url.clone();
        let wait = self.options.wait_policy;
        let handle = tokio::task::spawn_blocking(move || s.navigate(&nav_url, wait));
        match tokio::time::timeout_at(deadline, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(ScanError::scan_failed(format!(
                "navigation task failed: {join_err}"
            ))),
            Err(_) => Err(ScanError::ScanTimeout),
        }
    }

    /// Consent interactions plus a settle wait, both bounded by the scan
    /// deadline. Interaction failures never propagate.
    async fn interact_and_settle(
        &self,
        session: &Arc<dyn BrowserSession>,
        deadline: tokio::time::Instant,
    ) {
        if self.options.interaction_depth > 0 {
            let s = session.clone();
            let depth = self.options.interaction_depth;
            let handle = tokio::task::spawn_blocking(move || {
                interact::run_interactions(&s, interact::CONSENT_ATTEMPTS, depth)
            });
            match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok(succeeded)) => {
                    tracing::debug!(succeeded, "consent interactions done");
                }
                Ok(Err(e)) => tracing::debug!(error = %e, "interaction task failed"),
                Err(_) => tracing::debug!("deadline hit during interactions"),
            }
        }

        let settle = self.options.settle_wait.min(
            deadline
                .checked_duration_since(tokio::time::Instant::now())
                .unwrap_or_default(),
        );
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }
    }

    /// Run all evidence channels with bounded concurrency. Returns the
    /// merged observations, the drained network trace, per-channel
    /// failures, and per-channel timings.
    async fn run_channels(
        &self,
        session: &Arc<dyn BrowserSession>,
        scan: &ScanSession,
        deadline: tokio::time::Instant,
    ) -> (
        Vec<CookieObservation>,
        NetworkTrace,
        Vec<ChannelFailure>,
        Vec<ChannelTiming>,
    ) {
        let host = scan.target_domain.clone();
        let now = OffsetDateTime::now_utc();

        let mut jobs: Vec<(
            DetectionChannel,
            Box<dyn FnOnce(Arc<dyn BrowserSession>) -> ChannelResult + Send>,
        )> = Vec::new();

        // (a) cookie-jar snapshot
        jobs.push((
            DetectionChannel::CookieJar,
            Box::new(move |s| {
                Ok(s.read_cookies()?
                    .into_iter()
                    .map(|raw| CookieObservation::from_raw(raw, DetectionChannel::CookieJar, now))
                    .collect())
            }),
        ));

        // (b) direct in-page cookie string
        {
            let host = host.clone();
            jobs.push((
                DetectionChannel::CookieString,
                Box::new(move |s| {
                    let raw = s.cookie_string()?;
                    Ok(parse_cookie_pairs(
                        &raw,
                        &host,
                        DetectionChannel::CookieString,
                        now,
                    ))
                }),
            ));
        }

        // (c) local/session storage enumeration
        for (kind, channel) in [
            (StorageKind::Local, DetectionChannel::LocalStorage),
            (StorageKind::Session, DetectionChannel::SessionStorage),
        ] {
            let host = host.clone();
            jobs.push((
                channel,
                Box::new(move |s| {
                    Ok(s.read_storage(kind)?
                        .into_iter()
                        .map(|(key, value)| CookieObservation::bare(key, value, &host, channel, now))
                        .collect())
                }),
            ));
        }

        // (f) sub-frame cookie reads; per-frame failures are tolerated
        {
            let host = host.clone();
            jobs.push((
                DetectionChannel::SubFrame,
                Box::new(move |s| {
                    let mut out = Vec::new();
                    for frame in s.enumerate_frames()? {
                        let frame_host = Url::parse(&frame.url)
                            .ok()
                            .and_then(|u| u.host_str().map(normalize_domain))
                            .unwrap_or_else(|| host.clone());
                        match s.frame_cookie_string(&frame) {
                            Ok(raw) => {
                                for obs in parse_cookie_pairs(
                                    &raw,
                                    &frame_host,
                                    DetectionChannel::SubFrame,
                                    now,
                                ) {
                                    out.push(obs.with_frame(frame.url.clone()));
                                }
                            }
                            Err(e) => {
                                tracing::debug!(frame = %frame.url, error = %e, "frame read failed");
                            }
                        }
                    }
                    Ok(out)
                }),
            ));
        }

        // (g) sibling-subdomain probes, rooted at the registrable domain
        {
            let base = registrable_domain(&host).unwrap_or_else(|| host.clone());
            let target = host.clone();
            let labels = self.options.probe_subdomains.clone();
            jobs.push((
                DetectionChannel::SubdomainProbe,
                Box::new(move |s| {
                    let mut out = Vec::new();
                    for label in labels {
                        let candidate = format!("{}.{}", label, base);
                        if candidate == target {
                            continue;
                        }
                        match s.probe_host(&candidate) {
                            Ok(cookies) => {
                                for raw in cookies {
                                    out.push(
                                        CookieObservation::from_raw(
                                            raw,
                                            DetectionChannel::SubdomainProbe,
                                            now,
                                        )
                                        .with_probed_host(candidate.clone()),
                                    );
                                }
                            }
                            Err(e) => {
                                tracing::debug!(host = %candidate, error = %e, "subdomain probe failed");
                            }
                        }
                    }
                    Ok(out)
                }),
            ));
        }

        // (g) known third-party host probes
        {
            let hosts = self.options.probe_third_party_hosts.clone();
            jobs.push((
                DetectionChannel::ThirdPartyProbe,
                Box::new(move |s| {
                    let mut out = Vec::new();
                    for candidate in hosts {
                        match s.probe_host(&candidate) {
                            Ok(cookies) => {
                                for raw in cookies {
                                    out.push(
                                        CookieObservation::from_raw(
                                            raw,
                                            DetectionChannel::ThirdPartyProbe,
                                            now,
                                        )
                                        .with_probed_host(candidate.clone()),
                                    );
                                }
                            }
                            Err(e) => {
                                tracing::debug!(host = %candidate, error = %e, "third-party probe failed");
                            }
                        }
                    }
                    Ok(out)
                }),
            ));
        }

        let all_channels: Vec<DetectionChannel> =
            jobs.iter().map(|(channel, _)| *channel).collect();

        let mut observations = Vec::new();
        let mut failures = Vec::new();
        let mut timings = Vec::new();
        let mut finished: HashSet<DetectionChannel> = HashSet::new();

        {
            let futures_iter = jobs.into_iter().map(|(channel, job)| {
                let s = session.clone();
                async move {
                    let start = std::time::Instant::now();
                    let handle = tokio::task::spawn_blocking(move || job(s));
                    let result = match handle.await {
                        Ok(r) => r,
                        Err(join_err) => Err(ScanError::channel(format!(
                            "channel task failed: {join_err}"
                        ))),
                    };
                    (channel, start.elapsed(), result)
                }
            });
            let mut stream = futures::stream::iter(futures_iter)
                .buffer_unordered(self.options.channel_concurrency);

            loop {
                match tokio::time::timeout_at(deadline, stream.next()).await {
                    Ok(Some((channel, elapsed, result))) => {
                        finished.insert(channel);
                        timings.push(ChannelTiming { channel, elapsed });
                        match result {
                            Ok(mut obs) => {
                                tracing::debug!(
                                    channel = channel.as_str(),
                                    count = obs.len(),
                                    "channel complete"
                                );
                                observations.append(&mut obs);
                            }
                            Err(error) => {
                                tracing::debug!(
                                    channel = channel.as_str(),
                                    error = %error,
                                    "channel failed"
                                );
                                failures.push(ChannelFailure { channel, error });
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(_) => {
                        // Deadline hit: everything unfinished is abandoned
                        // and recorded, and partial evidence stands.
                        for channel in &all_channels {
                            if !finished.contains(channel) {
                                failures.push(ChannelFailure {
                                    channel: *channel,
                                    error: ScanError::ScanTimeout,
                                });
                            }
                        }
                        break;
                    }
                }
            }
        }

        // (d)/(e) header channels parse the drained trace; a drain failure
        // fails both.
        let trace = {
            let s = session.clone();
            match tokio::task::spawn_blocking(move || s.network_trace()).await {
                Ok(Ok(trace)) => trace,
                Ok(Err(error)) => {
                    for channel in [
                        DetectionChannel::RequestHeader,
                        DetectionChannel::ResponseHeader,
                    ] {
                        failures.push(ChannelFailure {
                            channel,
                            error: error.clone(),
                        });
                    }
                    NetworkTrace::default()
                }
                Err(join_err) => {
                    let error = ScanError::channel(format!("trace drain failed: {join_err}"));
                    for channel in [
                        DetectionChannel::RequestHeader,
                        DetectionChannel::ResponseHeader,
                    ] {
                        failures.push(ChannelFailure {
                            channel,
                            error: error.clone(),
                        });
                    }
                    NetworkTrace::default()
                }
            }
        };

        for (request_host, header) in trace.request_cookie_headers() {
            observations.extend(parse_cookie_pairs(
                &header,
                &normalize_domain(&request_host),
                DetectionChannel::RequestHeader,
                now,
            ));
        }
        for (response_host, header) in trace.set_cookie_headers() {
            if let Some(obs) = parse_set_cookie(&header, &normalize_domain(&response_host), now) {
                observations.push(obs);
            }
        }

        (observations, trace, failures, timings)
    }
}
