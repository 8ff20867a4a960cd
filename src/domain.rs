//! Canonical domain computation and RFC 6265 §5.1.3 domain matching.

use std::net::IpAddr;

use crate::pubsuffix;

/// Canonicalizes a host name: trims ASCII whitespace, strips a single
/// leading dot and any IPv6 brackets, lowercases, and punycode-encodes
/// names containing non-ASCII.
///
/// Returns `None` when nothing usable remains or IDN encoding fails.
pub fn canonical_domain(domain: &str) -> Option<String> {
    let mut domain = domain.trim();
    if let Some(stripped) = domain.strip_prefix('.') {
        domain = stripped;
    }
    // IPv6 literals may arrive bracketed from the URL layer.
    let domain = domain
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(domain);
    if domain.is_empty() {
        return None;
    }
    if domain.is_ascii() {
        Some(domain.to_ascii_lowercase())
    } else {
        idna::domain_to_ascii(domain)
            .ok()
            .map(|ascii| ascii.to_ascii_lowercase())
    }
}

/// RFC 6265 §5.1.3 domain matching.
///
/// `host` matches `domain` when they are equal, or when `domain` is a
/// suffix of `host`, the byte of `host` just before the suffix is `.`, and
/// `host` is not an IP literal. IP literals only ever match exactly.
pub fn domain_match(host: &str, domain: &str, canonicalize: bool) -> bool {
    if canonicalize {
        match (canonical_domain(host), canonical_domain(domain)) {
            (Some(host), Some(domain)) => domain_match_canonical(&host, &domain),
            _ => false,
        }
    } else {
        domain_match_canonical(host, domain)
    }
}

fn domain_match_canonical(host: &str, domain: &str) -> bool {
    if host == domain {
        return true;
    }
    if !host.ends_with(domain) || domain.is_empty() {
        return false;
    }
    let boundary = host.len() - domain.len();
    if host.as_bytes()[boundary - 1] != b'.' {
        return false;
    }
    !is_ip_literal(host)
}

/// Whether `host` parses as an IPv4 or IPv6 address (brackets tolerated).
fn is_ip_literal(host: &str) -> bool {
    let host = host
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(host);
    host.parse::<IpAddr>().is_ok()
}

/// Produces `domain` and each proper parent down to (and including) the
/// registrable domain the public-suffix oracle reports.
///
/// Returns `None` when the oracle does: the domain is itself a public
/// suffix, so nothing may be stored against it or its parents.
pub fn permute_domain(domain: &str) -> Option<Vec<String>> {
    let suffix = pubsuffix::public_suffix(domain)?;
    if suffix == domain {
        return Some(vec![domain.to_owned()]);
    }

    let prefix = &domain[..domain.len() - suffix.len() - 1];
    let mut current = suffix;
    let mut permutations = vec![current.clone()];
    for part in prefix.rsplit('.') {
        current = format!("{}.{}", part, current);
        permutations.push(current.clone());
    }
    Some(permutations)
}
