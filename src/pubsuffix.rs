//! Public-suffix oracle.
//!
//! Cookies may not be scoped at or above a public suffix (`com`, `co.uk`);
//! the jar consults this module to reject such "supercookies". Backed by
//! the publicsuffix.org dataset compiled into the `psl` crate, so lookups
//! are pure and thread-safe.

/// Returns the shortest domain at which cookies may be set for `host` —
/// the registrable domain (`example.com` for `a.b.example.com`) — or
/// `None` when `host` is itself a public suffix.
pub fn public_suffix(host: &str) -> Option<String> {
    let host = host.to_ascii_lowercase();
    psl::domain(host.as_bytes())
        .and_then(|domain| std::str::from_utf8(domain.as_bytes()).ok())
        .map(str::to_owned)
}
