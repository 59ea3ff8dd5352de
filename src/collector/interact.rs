//! Consent-likely page interactions.
//!
//! Clicking an accept button, scrolling, and firing synthetic DOM events
//! all coax lazily-initialized analytics into setting their cookies before
//! evidence is pulled. The attempt list is data: each group runs in order
//! and stops at its first successful attempt.

use crate::session::{BrowserSession, InteractionAction, InteractionAttempt};
use std::sync::Arc;

/// Ordered attempt groups. Group order matters: consent acceptance first,
/// then scroll, then synthetic events.
pub const CONSENT_ATTEMPTS: &[InteractionAttempt] = &[
    // Common consent-manager accept buttons.
    InteractionAttempt {
        group: "accept",
        selector: "#onetrust-accept-btn-handler",
        action: InteractionAction::Click,
    },
    InteractionAttempt {
        group: "accept",
        selector: "#CybotCookiebotDialogBodyLevelButtonLevelOptinAllowAll",
        action: InteractionAction::Click,
    },
    InteractionAttempt {
        group: "accept",
        selector: ".cc-allow",
        action: InteractionAction::Click,
    },
    InteractionAttempt {
        group: "accept",
        selector: ".cookie-accept",
        action: InteractionAction::Click,
    },
    InteractionAttempt {
        group: "accept",
        selector: "[aria-label=\"Accept cookies\"]",
        action: InteractionAction::Click,
    },
    InteractionAttempt {
        group: "accept",
        selector: "button[id*=\"accept\"]",
        action: InteractionAction::Click,
    },
    InteractionAttempt {
        group: "scroll",
        selector: "body",
        action: InteractionAction::Scroll,
    },
    InteractionAttempt {
        group: "events",
        selector: "body",
        action: InteractionAction::DispatchEvents,
    },
];

/// Number of distinct attempt groups in [`CONSENT_ATTEMPTS`].
pub fn group_count(attempts: &[InteractionAttempt]) -> usize {
    let mut groups: Vec<&str> = attempts.iter().map(|a| a.group).collect();
    groups.dedup();
    groups.len()
}

/// Run up to `depth` attempt groups against the session. Dispatch failures
/// are logged and skipped; a group ends at its first successful attempt.
/// Returns the number of attempts that succeeded.
pub fn run_interactions(
    session: &Arc<dyn BrowserSession>,
    attempts: &[InteractionAttempt],
    depth: usize,
) -> usize {
    let mut succeeded = 0;
    let mut groups_run = 0;
    let mut current_group: Option<&str> = None;
    let mut group_done = false;

    for attempt in attempts {
        if current_group != Some(attempt.group) {
            current_group = Some(attempt.group);
            group_done = false;
            groups_run += 1;
            if groups_run > depth {
                break;
            }
        }
        if group_done {
            continue;
        }

        match session.dispatch(attempt) {
            Ok(true) => {
                tracing::debug!(
                    group = attempt.group,
                    selector = attempt.selector,
                    "interaction succeeded"
                );
                succeeded += 1;
                group_done = true;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::debug!(
                    group = attempt.group,
                    selector = attempt.selector,
                    error = %e,
                    "interaction attempt failed"
                );
            }
        }
    }

    succeeded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::ScanError;
    use crate::session::{
        FrameInfo, NetworkTrace, RawCookie, StorageKind, WaitPolicy,
    };
    use std::sync::Mutex;
    use url::Url;

    /// Session double that matches a fixed set of selectors and records
    /// every dispatch.
    struct SelectorSession {
        matching: Vec<&'static str>,
        dispatched: Mutex<Vec<&'static str>>,
    }

    impl BrowserSession for SelectorSession {
        fn navigate(&self, _url: &Url, _wait: WaitPolicy) -> Result<(), ScanError> {
            Ok(())
        }
        fn read_cookies(&self) -> Result<Vec<RawCookie>, ScanError> {
            Ok(vec![])
        }
        fn cookie_string(&self) -> Result<String, ScanError> {
            Ok(String::new())
        }
        fn read_storage(&self, _kind: StorageKind) -> Result<Vec<(String, String)>, ScanError> {
            Ok(vec![])
        }
        fn network_trace(&self) -> Result<NetworkTrace, ScanError> {
            Ok(NetworkTrace::default())
        }
        fn enumerate_frames(&self) -> Result<Vec<FrameInfo>, ScanError> {
            Ok(vec![])
        }
        fn frame_cookie_string(&self, _frame: &FrameInfo) -> Result<String, ScanError> {
            Ok(String::new())
        }
        fn evaluate(&self, _script: &str) -> Result<serde_json::Value, ScanError> {
            Ok(serde_json::Value::Null)
        }
        fn dispatch(&self, attempt: &InteractionAttempt) -> Result<bool, ScanError> {
            self.dispatched.lock().unwrap().push(attempt.selector);
            Ok(self.matching.contains(&attempt.selector))
        }
        fn probe_host(&self, _host: &str) -> Result<Vec<RawCookie>, ScanError> {
            Ok(vec![])
        }
    }

    #[test]
    fn first_success_stops_the_group() {
        let session: Arc<dyn BrowserSession> = Arc::new(SelectorSession {
            matching: vec!["#onetrust-accept-btn-handler"],
            dispatched: Mutex::new(vec![]),
        });
        let n = run_interactions(&session, CONSENT_ATTEMPTS, 3);
        // The accept group stops after its first matching selector; the
        // scroll and events selectors don't match this double.
        assert_eq!(n, 1);
    }

    #[test]
    fn depth_limits_groups() {
        let session = Arc::new(SelectorSession {
            matching: vec!["body"],
            dispatched: Mutex::new(vec![]),
        });
        let as_dyn: Arc<dyn BrowserSession> = session.clone();
        run_interactions(&as_dyn, CONSENT_ATTEMPTS, 1);
        // Only the accept group ran; "body" (scroll/events) never tried.
        assert!(!session.dispatched.lock().unwrap().contains(&"body"));
    }

    #[test]
    fn depth_zero_is_a_no_op() {
        let session = Arc::new(SelectorSession {
            matching: vec![],
            dispatched: Mutex::new(vec![]),
        });
        let as_dyn: Arc<dyn BrowserSession> = session.clone();
        assert_eq!(run_interactions(&as_dyn, CONSENT_ATTEMPTS, 0), 0);
        assert!(session.dispatched.lock().unwrap().is_empty());
    }

    #[test]
    fn attempt_table_has_three_groups() {
        assert_eq!(group_count(CONSENT_ATTEMPTS), 3);
    }
}
