//! The cookie jar: the RFC 6265 §5.3 / §5.4 state machine over a
//! pluggable [`CookieStore`].
//!
//! A jar binds cookies to a logical user-agent session. Accepting a cookie
//! resolves its scope (host-only inference, public-suffix rejection,
//! default path) before handing it to the store; retrieving cookies filters
//! and orders the store's candidates into the canonical send-order.
//!
//! # Typical usage
//! ```no_run
//! use crumble::{CookieJar, GetCookieOptions, SetCookieOptions};
//! use url::Url;
//!
//! let jar = CookieJar::new();
//! let url = Url::parse("https://example.com/app").unwrap();
//!
//! jar.set_cookie("sid=abc123; Path=/; Secure", &url, &SetCookieOptions::default())
//!     .unwrap();
//! let header = jar.get_cookie_string(&url, &GetCookieOptions::default()).unwrap();
//! assert_eq!(header, "sid=abc123");
//! ```
//!
//! # Concurrency
//! The jar itself is immutable configuration plus a
//! [`CookieStoreHandle`]; stores are internally synchronized, so a jar can
//! be shared freely across threads. Within one operation store calls are
//! sequential; across concurrent operations no atomicity is guaranteed
//! beyond the store's idempotent same-tuple replacement.

use std::sync::Arc;

use http::header::{HeaderMap, HeaderValue, SET_COOKIE};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use url::Url;

use crate::cookie::{cookie_compare, Cookie};
use crate::domain::{canonical_domain, domain_match};
use crate::errors::Error;
use crate::path::default_path;
use crate::pubsuffix;
use crate::store::{CookieStoreHandle, MemoryCookieStore};

/// Version token recorded in serialized jars; the snapshot format is
/// wire-compatible with tough-cookie's.
const SERIALIZATION_VERSION: &str = "tough-cookie@4.1.4";

/// Policy configuration for a jar.
#[derive(Debug, Clone)]
pub struct JarOptions {
    /// Reject cookies whose `Domain=` resolves to a public suffix.
    pub reject_public_suffixes: bool,
    /// Parse `Set-Cookie` strings leniently unless overridden per call.
    pub loose: bool,
}

impl Default for JarOptions {
    fn default() -> Self {
        Self {
            reject_public_suffixes: true,
            loose: false,
        }
    }
}

/// Per-call options for [`CookieJar::set_cookie`].
#[derive(Debug, Clone, Default)]
pub struct SetCookieOptions {
    /// Whether the caller is an HTTP API. Defaults to true; non-HTTP
    /// callers cannot set or overwrite HttpOnly cookies.
    pub http: Option<bool>,
    /// Wallclock override.
    pub now: Option<OffsetDateTime>,
    /// Swallow parse failures, returning `Ok(None)` instead. Policy
    /// rejections and store errors still surface.
    pub ignore_error: bool,
    /// Lenient-parse override for this call.
    pub loose: Option<bool>,
}

/// Per-call options for [`CookieJar::get_cookies`].
#[derive(Debug, Clone)]
pub struct GetCookieOptions {
    /// Whether the caller is an HTTP API. Defaults to true; non-HTTP
    /// callers do not see HttpOnly cookies.
    pub http: Option<bool>,
    /// Secure-channel override; defaults from the URL scheme
    /// (`https:` / `wss:`).
    pub secure: Option<bool>,
    /// Wallclock override.
    pub now: Option<OffsetDateTime>,
    /// Filter (and best-effort remove) expired cookies. Defaults to true.
    pub expire: bool,
    /// Ignore the request path and return cookies for every path.
    pub all_paths: bool,
}

impl Default for GetCookieOptions {
    fn default() -> Self {
        Self {
            http: None,
            secure: None,
            now: None,
            expire: true,
            all_paths: false,
        }
    }
}

/// Serialized form of a whole jar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedJar {
    pub version: String,
    pub store_type: Option<String>,
    pub reject_public_suffixes: bool,
    pub cookies: Vec<Value>,
}

/// A session-scoped cookie container.
pub struct CookieJar {
    store: CookieStoreHandle,
    options: JarOptions,
}

impl Default for CookieJar {
    fn default() -> Self {
        Self::new()
    }
}

impl CookieJar {
    /// Creates a jar backed by a fresh [`MemoryCookieStore`].
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryCookieStore::new()))
    }

    /// Creates a jar over an existing store with default policy.
    pub fn with_store(store: CookieStoreHandle) -> Self {
        Self::with_options(store, JarOptions::default())
    }

    /// Creates a jar over an existing store with explicit policy.
    pub fn with_options(store: CookieStoreHandle, options: JarOptions) -> Self {
        Self { store, options }
    }

    /// The backing store handle.
    pub fn store(&self) -> &CookieStoreHandle {
        &self.store
    }

    /// Parses `raw` as a `Set-Cookie` value and accepts it for `url`.
    ///
    /// Returns the accepted record, or `Ok(None)` when `ignore_error`
    /// swallowed a parse failure.
    pub fn set_cookie(
        &self,
        raw: &str,
        url: &Url,
        options: &SetCookieOptions,
    ) -> Result<Option<Cookie>, Error> {
        let loose = options.loose.unwrap_or(self.options.loose);
        let cookie = if loose {
            Cookie::parse_loose(raw)
        } else {
            Cookie::parse(raw)
        };
        let cookie = match cookie {
            Ok(cookie) => cookie,
            Err(_) if options.ignore_error => return Ok(None),
            Err(err) => return Err(Error::Parse(err)),
        };
        self.set_cookie_record(cookie, url, options).map(Some)
    }

    /// Accepts an already-constructed record for `url` (RFC 6265 §5.3).
    pub fn set_cookie_record(
        &self,
        mut cookie: Cookie,
        url: &Url,
        options: &SetCookieOptions,
    ) -> Result<Cookie, Error> {
        let host = url.host_str().ok_or(Error::InvalidUrl)?;
        let host = canonical_domain(host).ok_or(Error::InvalidUrl)?;
        let http = options.http.unwrap_or(true);
        let now = options.now.unwrap_or_else(OffsetDateTime::now_utc);

        match cookie.domain.as_deref() {
            Some(domain_attr) => {
                let domain = canonical_domain(domain_attr).ok_or(Error::DomainMismatch)?;
                if self.options.reject_public_suffixes
                    && pubsuffix::public_suffix(&domain).is_none()
                {
                    return Err(Error::PublicSuffix);
                }
                if !domain_match(&host, &domain, false) {
                    return Err(Error::DomainMismatch);
                }
                cookie.domain = Some(domain);
                cookie.host_only = Some(false);
            }
            None => {
                cookie.domain = Some(host.clone());
                cookie.host_only = Some(true);
            }
        }

        match cookie.path.as_deref() {
            Some(path) if path.starts_with('/') => {}
            _ => {
                cookie.path = Some(default_path(url.path()).to_owned());
                cookie.path_is_default = true;
            }
        }

        if !http && cookie.http_only {
            return Err(Error::HttpOnlyMismatch);
        }

        let domain = cookie.domain.clone().unwrap_or_default();
        let path = cookie.path.clone().unwrap_or_default();
        let existing = self
            .store
            .find_cookie(&domain, &path, &cookie.key)
            .map_err(Error::Store)?;

        cookie.last_accessed = Some(now);
        match existing {
            Some(old) => {
                // Updating an HttpOnly cookie is gated the same way as
                // setting one.
                if !http && old.http_only {
                    return Err(Error::HttpOnlyMismatch);
                }
                // Replacement keeps the original creation instant; the
                // creation index stays the new record's.
                cookie.creation = old.creation;
                self.store
                    .update_cookie(&old, cookie.clone())
                    .map_err(Error::Store)?;
            }
            None => {
                self.store.put_cookie(cookie.clone()).map_err(Error::Store)?;
            }
        }

        Ok(cookie)
    }

    /// Retrieves the cookies to send with a request to `url`
    /// (RFC 6265 §5.4), in canonical send-order.
    pub fn get_cookies(&self, url: &Url, options: &GetCookieOptions) -> Result<Vec<Cookie>, Error> {
        let host = url.host_str().ok_or(Error::InvalidUrl)?;
        let host = canonical_domain(host).ok_or(Error::InvalidUrl)?;
        let secure = options
            .secure
            .unwrap_or_else(|| matches!(url.scheme(), "https" | "wss"));
        let http = options.http.unwrap_or(true);
        let now = options.now.unwrap_or_else(OffsetDateTime::now_utc);

        let req_path = url.path();
        let path_probe = if options.all_paths {
            None
        } else {
            Some(req_path)
        };
        let found = self
            .store
            .find_cookies(&host, path_probe)
            .map_err(Error::Store)?;

        let mut cookies = Vec::with_capacity(found.len());
        for cookie in found {
            if cookie.host_only == Some(true) && cookie.domain.as_deref() != Some(host.as_str()) {
                continue;
            }
            if cookie.secure && !secure {
                continue;
            }
            if cookie.http_only && !http {
                continue;
            }
            if options.expire && cookie.is_expired_at(now) {
                debug!("dropping expired cookie {:?}", cookie.key);
                // Expired cookies are filtered, never errors; removal is
                // best-effort.
                let domain = cookie.domain.clone().unwrap_or_default();
                let path = cookie.path.clone().unwrap_or_default();
                if let Err(err) = self.store.remove_cookie(&domain, &path, &cookie.key) {
                    warn!("failed to remove expired cookie {:?}: {}", cookie.key, err);
                }
                continue;
            }
            cookies.push(cookie);
        }

        for cookie in &mut cookies {
            let old = cookie.clone();
            cookie.last_accessed = Some(now);
            self.store
                .update_cookie(&old, cookie.clone())
                .map_err(Error::Store)?;
        }

        cookies.sort_by(cookie_compare);
        Ok(cookies)
    }

    /// The `Cookie:` request header value for `url`:
    /// `k1=v1; k2=v2; ...` in canonical send-order.
    pub fn get_cookie_string(&self, url: &Url, options: &GetCookieOptions) -> Result<String, Error> {
        let cookies = self.get_cookies(url, options)?;
        Ok(cookies
            .iter()
            .map(Cookie::cookie_string)
            .collect::<Vec<_>>()
            .join("; "))
    }

    /// The `Set-Cookie` forms of every cookie that would be sent to `url`.
    pub fn get_set_cookie_strings(
        &self,
        url: &Url,
        options: &GetCookieOptions,
    ) -> Result<Vec<String>, Error> {
        let cookies = self.get_cookies(url, options)?;
        Ok(cookies.iter().map(Cookie::to_string).collect())
    }

    /// Stores every `Set-Cookie` header in `headers` against `url`.
    ///
    /// Mirrors browser ingestion: individual parse failures and policy
    /// rejections skip the offending header; store errors surface.
    pub fn store_response_cookies(&self, url: &Url, headers: &HeaderMap) -> Result<(), Error> {
        for header in headers.get_all(SET_COOKIE) {
            let raw = match header.to_str() {
                Ok(raw) => raw,
                Err(_) => {
                    warn!("skipping non-ASCII Set-Cookie header");
                    continue;
                }
            };
            let options = SetCookieOptions {
                ignore_error: true,
                ..Default::default()
            };
            match self.set_cookie(raw, url, &options) {
                Ok(_) => {}
                Err(Error::Store(err)) => return Err(Error::Store(err)),
                Err(err) => debug!("rejected response cookie: {}", err),
            }
        }
        Ok(())
    }

    /// The `Cookie:` header to attach to a request to `url`, if any
    /// cookies match.
    pub fn cookie_header_for(
        &self,
        url: &Url,
        options: &GetCookieOptions,
    ) -> Result<Option<HeaderValue>, Error> {
        let header = self.get_cookie_string(url, options)?;
        if header.is_empty() {
            return Ok(None);
        }
        Ok(HeaderValue::from_str(&header).ok())
    }

    /// Snapshots the jar: policy flags plus the whitelist JSON form of
    /// every stored cookie, in creation order.
    pub fn serialize(&self) -> Result<SerializedJar, Error> {
        let cookies = self.store.all_cookies().map_err(Error::Store)?;
        Ok(SerializedJar {
            version: SERIALIZATION_VERSION.to_owned(),
            store_type: Some(self.store.store_type().to_owned()),
            reject_public_suffixes: self.options.reject_public_suffixes,
            cookies: cookies.iter().map(Cookie::to_json).collect(),
        })
    }

    /// [`serialize`](Self::serialize) as a JSON string.
    pub fn to_json_string(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(&self.serialize()?)?)
    }

    /// Rebuilds a jar into `store`, reinserting cookies in array order.
    ///
    /// Malformed entries are skipped with a warning; a corrupt record must
    /// not poison the rest of the jar.
    pub fn deserialize(serialized: &SerializedJar, store: CookieStoreHandle) -> Result<Self, Error> {
        let jar = CookieJar::with_options(
            store,
            JarOptions {
                reject_public_suffixes: serialized.reject_public_suffixes,
                ..JarOptions::default()
            },
        );
        for value in &serialized.cookies {
            let cookie = match Cookie::from_json(value) {
                Ok(cookie) => cookie,
                Err(err) => {
                    warn!("skipping malformed stored cookie: {}", err);
                    continue;
                }
            };
            jar.store.put_cookie(cookie).map_err(Error::Store)?;
        }
        Ok(jar)
    }

    /// [`deserialize`](Self::deserialize) from a JSON string.
    pub fn from_json_string(input: &str, store: CookieStoreHandle) -> Result<Self, Error> {
        let serialized: SerializedJar = serde_json::from_str(input)?;
        Self::deserialize(&serialized, store)
    }

    /// Copies every cookie into `store` and returns a jar over it.
    pub fn clone_jar(&self, store: CookieStoreHandle) -> Result<Self, Error> {
        Self::deserialize(&self.serialize()?, store)
    }

    /// Drains the store.
    pub fn remove_all_cookies(&self) -> Result<(), Error> {
        let cookies = self.store.all_cookies().map_err(Error::Store)?;
        for cookie in cookies {
            let domain = cookie.domain.unwrap_or_default();
            let path = cookie.path.unwrap_or_default();
            self.store
                .remove_cookie(&domain, &path, &cookie.key)
                .map_err(Error::Store)?;
        }
        Ok(())
    }
}
