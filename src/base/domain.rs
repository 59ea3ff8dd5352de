//! Domain normalization and ownership checks.
//!
//! Third-party determination and the resolver's parent-domain walk both
//! hinge on registrable domains (eTLD+1), so everything here goes through
//! Mozilla's Public Suffix List via the `psl` crate rather than naive
//! label counting.

use psl::{List, Psl};

/// Lowercase a domain and strip a leading dot (`.example.com` and
/// `example.com` are the same cookie domain).
pub fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_start_matches('.').to_lowercase()
}

/// Check if a domain is itself a public suffix (e.g., "com", "co.uk").
pub fn is_public_suffix(domain: &str) -> bool {
    let domain_lower = domain.to_lowercase();
    let domain_bytes = domain_lower.as_bytes();

    if let Some(suffix) = List.suffix(domain_bytes) {
        suffix.as_bytes() == domain_bytes
    } else {
        false
    }
}

/// Get the registrable domain (eTLD+1) for a domain.
/// For "sub.example.com", returns "example.com".
/// For "com" (public suffix), returns None.
pub fn registrable_domain(domain: &str) -> Option<String> {
    let domain_lower = normalize_domain(domain);
    psl::domain(domain_lower.as_bytes())
        .and_then(|d| std::str::from_utf8(d.as_bytes()).ok())
        .map(|s| s.to_string())
}

/// Decide whether `cookie_domain` is third-party relative to the scan
/// target's host.
///
/// Two domains are same-party when they share a registrable domain. When
/// the PSL gives no answer for either side (bare hostnames, unknown TLDs)
/// we fall back to suffix comparison: neither being a suffix of the other
/// means third-party.
pub fn is_third_party(cookie_domain: &str, target_host: &str) -> bool {
    let cookie = normalize_domain(cookie_domain);
    let target = normalize_domain(target_host);

    if cookie.is_empty() || target.is_empty() {
        return false;
    }

    match (registrable_domain(&cookie), registrable_domain(&target)) {
        (Some(a), Some(b)) => a != b,
        _ => !is_domain_suffix(&cookie, &target) && !is_domain_suffix(&target, &cookie),
    }
}

/// True if `suffix` equals `host` or `host` ends with `.suffix`.
fn is_domain_suffix(suffix: &str, host: &str) -> bool {
    if host == suffix {
        return true;
    }
    host.len() > suffix.len()
        && host.ends_with(suffix)
        && host.as_bytes()[host.len() - suffix.len() - 1] == b'.'
}

/// Iterate a host and its parent domains down to (and including) the
/// registrable domain: `a.b.example.com` yields `a.b.example.com`,
/// `b.example.com`, `example.com` and stops.
///
/// Public suffixes themselves are never yielded, so a directory lookup
/// driven by this walk cannot match an entry like "com" even if one were
/// present.
pub fn parent_domains(host: &str) -> Vec<String> {
    let host = normalize_domain(host);
    let boundary = registrable_domain(&host);

    let mut out = Vec::new();
    let mut current = host.as_str();

    loop {
        if is_public_suffix(current) {
            break;
        }
        out.push(current.to_string());

        if boundary.as_deref() == Some(current) {
            break;
        }
        match current.split_once('.') {
            Some((_, rest)) if !rest.is_empty() => current = rest,
            _ => break,
        }
    }

    out
}
