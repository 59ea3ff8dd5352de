mod common;

use common::{fast_options, FakeProvider, FakeSession};
use consentscan::base::ScanError;
use consentscan::classify::Category;
use consentscan::collector::observation::DetectionChannel;
use consentscan::collector::ScanStatus;
use consentscan::scan::Scanner;
use consentscan::session::{RawCookie, RequestEvent, ResourceKind, ResponseEvent, NetworkTrace};
use consentscan::vendor::VendorDirectory;
use time::OffsetDateTime;

fn ga_cookie() -> RawCookie {
    let mut c = RawCookie::new("_ga", "GA1.2.1234567890.1700000000", "example.com");
    c.expires = Some(OffsetDateTime::now_utc() + time::Duration::seconds(63_072_000));
    c
}

fn session_cookie() -> RawCookie {
    let mut c = RawCookie::new("PHPSESSID", "8f3b2c9d4e", "example.com");
    c.http_only = true;
    c
}

fn doubleclick_cookie() -> RawCookie {
    RawCookie::new("xk92jd", "AbC123xyz", "doubleclick.net")
}

fn scanner() -> Scanner {
    Scanner::new(fast_options(), VendorDirectory::builtin()).unwrap()
}

#[tokio::test]
async fn full_scan_classifies_and_attributes() {
    let session = FakeSession {
        jar: vec![ga_cookie(), session_cookie(), doubleclick_cookie()],
        cookie_string: "_ga=GA1.2.1234567890.1700000000".to_string(),
        ..Default::default()
    };
    let outcome = scanner()
        .run(&FakeProvider::new(session), "https://example.com/")
        .await
        .unwrap();

    assert_eq!(outcome.session.status, ScanStatus::Completed);
    assert!(outcome.failure.is_none());

    // _ga: analytics with high confidence, attributed to Google Analytics
    // in the calibrated band.
    let ga = outcome.records.iter().find(|r| r.name == "_ga").unwrap();
    assert_eq!(ga.category, Category::Analytics);
    assert!(ga.category_confidence > 0.8);
    assert!(ga.is_persistent);
    let vendor = ga.vendor.as_ref().unwrap();
    assert_eq!(vendor.vendor_name, "Google Analytics");
    assert!(vendor.confidence >= 0.85 && vendor.confidence <= 0.95);

    // PHPSESSID: necessary, session-scoped, no vendor.
    let sid = outcome
        .records
        .iter()
        .find(|r| r.name == "PHPSESSID")
        .unwrap();
    assert_eq!(sid.category, Category::Necessary);
    assert!(!sid.is_persistent);
    assert!(!sid.is_third_party);
    assert!(sid.vendor.is_none());

    // doubleclick: third-party, marketing, attributed by domain.
    let dc = outcome.records.iter().find(|r| r.name == "xk92jd").unwrap();
    assert!(dc.is_third_party);
    assert_eq!(dc.category, Category::Marketing);
    assert_eq!(dc.vendor.as_ref().unwrap().vendor_id, "google-ads");
}

#[tokio::test]
async fn equivalent_channels_merge_into_one_record() {
    // The same cookie visible in the jar and in document.cookie must
    // produce exactly one record carrying both channels.
    let session = FakeSession {
        jar: vec![session_cookie()],
        cookie_string: "PHPSESSID=8f3b2c9d4e".to_string(),
        ..Default::default()
    };
    let outcome = scanner()
        .run(&FakeProvider::new(session), "https://example.com/")
        .await
        .unwrap();

    let matching: Vec<_> = outcome
        .records
        .iter()
        .filter(|r| r.name == "PHPSESSID")
        .collect();
    assert_eq!(matching.len(), 1);
    assert!(matching[0].channels.contains(&DetectionChannel::CookieJar));
    assert!(matching[0]
        .channels
        .contains(&DetectionChannel::CookieString));
}

#[tokio::test]
async fn header_channels_coexist_with_jar_as_distinct_evidence() {
    let trace = NetworkTrace {
        requests: vec![RequestEvent {
            url: "https://example.com/api".to_string(),
            host: "example.com".to_string(),
            kind: ResourceKind::Xhr,
            headers: vec![("Cookie".to_string(), "PHPSESSID=8f3b2c9d4e".to_string())],
        }],
        responses: vec![ResponseEvent {
            url: "https://example.com/".to_string(),
            host: "example.com".to_string(),
            status: 200,
            headers: vec![(
                "Set-Cookie".to_string(),
                "PHPSESSID=8f3b2c9d4e; Path=/; HttpOnly".to_string(),
            )],
        }],
    };
    let session = FakeSession {
        jar: vec![session_cookie()],
        trace,
        ..Default::default()
    };
    let outcome = scanner()
        .run(&FakeProvider::new(session), "https://example.com/")
        .await
        .unwrap();

    // Three channel-categories: jar, request-header, response-header.
    let matching: Vec<_> = outcome
        .records
        .iter()
        .filter(|r| r.name == "PHPSESSID")
        .collect();
    assert_eq!(matching.len(), 3);

    // Dedup invariant: no two records share a key.
    let mut keys: Vec<_> = outcome.records.iter().map(|r| r.key()).collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), outcome.records.len());
}

#[tokio::test]
async fn channel_failure_is_isolated_and_reported() {
    let session = FakeSession {
        jar: vec![ga_cookie()],
        failing: ["storage"].into_iter().collect(),
        ..Default::default()
    };
    let outcome = scanner()
        .run(&FakeProvider::new(session), "https://example.com/")
        .await
        .unwrap();

    // The scan completed and still found the jar cookie.
    assert_eq!(outcome.session.status, ScanStatus::Completed);
    assert!(outcome.records.iter().any(|r| r.name == "_ga"));

    // Both storage channels are reported failed, visibly in the report.
    let failed: Vec<_> = outcome
        .channel_failures
        .iter()
        .map(|f| f.channel)
        .collect();
    assert!(failed.contains(&DetectionChannel::LocalStorage));
    assert!(failed.contains(&DetectionChannel::SessionStorage));
    assert!(!outcome.report.errors.is_empty());
}

#[tokio::test]
async fn navigation_failure_fails_scan_but_yields_report() {
    let session = FakeSession {
        jar: vec![ga_cookie()],
        failing: ["navigate"].into_iter().collect(),
        ..Default::default()
    };
    let outcome = scanner()
        .run(&FakeProvider::new(session), "https://example.com/")
        .await
        .unwrap();

    assert_eq!(outcome.session.status, ScanStatus::Failed);
    assert!(matches!(outcome.failure, Some(ScanError::ScanFailed { .. })));
    assert!(outcome.records.is_empty());
    assert_eq!(outcome.report.summary.total_cookies, 0);
    assert_eq!(outcome.report.metadata.status, ScanStatus::Failed);
}

#[tokio::test]
async fn invalid_target_aborts_without_scanning() {
    let err = scanner()
        .run(&FakeProvider::new(FakeSession::default()), "not a url")
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::InvalidTarget { .. }));

    let err = scanner()
        .run(
            &FakeProvider::new(FakeSession::default()),
            "ftp://example.com",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::InvalidTarget { .. }));
}

#[tokio::test]
async fn unopenable_session_aborts() {
    let mut provider = FakeProvider::new(FakeSession::default());
    provider.fail_open = true;
    let err = scanner()
        .run(&provider, "https://example.com/")
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::SessionFailed { .. }));
}

#[tokio::test]
async fn storage_artifacts_become_functional_leaning_records() {
    let session = FakeSession {
        local_storage: vec![("ui_prefs".to_string(), "dark".to_string())],
        ..Default::default()
    };
    let outcome = scanner()
        .run(&FakeProvider::new(session), "https://example.com/")
        .await
        .unwrap();

    let prefs = outcome
        .records
        .iter()
        .find(|r| r.name == "ui_prefs")
        .unwrap();
    assert!(prefs
        .channels
        .contains(&DetectionChannel::LocalStorage));
    assert_eq!(prefs.category, Category::Functional);
}

#[tokio::test]
async fn subdomain_probe_evidence_is_tagged() {
    let mut probe_results = std::collections::HashMap::new();
    probe_results.insert(
        "www.example.com".to_string(),
        vec![RawCookie::new("www_only", "1", "www.example.com")],
    );
    let session = FakeSession {
        probe_results,
        ..Default::default()
    };
    let outcome = scanner()
        .run(&FakeProvider::new(session), "https://example.com/")
        .await
        .unwrap();

    let probed = outcome
        .records
        .iter()
        .find(|r| r.name == "www_only")
        .unwrap();
    assert!(probed
        .channels
        .contains(&DetectionChannel::SubdomainProbe));
    assert!(!probed.is_third_party);
}

#[tokio::test]
async fn fingerprinting_signals_flow_into_the_report() {
    let session = FakeSession {
        instrumentation: Some(serde_json::Value::String(
            r#"{"canvas":true,"webgl":false,"audio":true}"#.to_string(),
        )),
        ..Default::default()
    };
    let outcome = scanner()
        .run(&FakeProvider::new(session), "https://example.com/")
        .await
        .unwrap();

    assert!(outcome.report.privacy.fingerprinting_detected);
    assert_eq!(outcome.report.privacy.fingerprinting_score, 40);
}

#[tokio::test]
async fn technology_detection_from_script_hosts() {
    let trace = NetworkTrace {
        requests: vec![RequestEvent {
            url: "https://www.google-analytics.com/analytics.js".to_string(),
            host: "www.google-analytics.com".to_string(),
            kind: ResourceKind::Script,
            headers: vec![],
        }],
        responses: vec![],
    };
    let session = FakeSession {
        trace,
        ..Default::default()
    };
    let outcome = scanner()
        .run(&FakeProvider::new(session), "https://example.com/")
        .await
        .unwrap();

    assert!(outcome
        .context
        .technologies
        .contains(&"google-analytics".to_string()));
}
