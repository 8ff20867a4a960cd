//! Cookie records and `Set-Cookie` parsing.
//!
//! [`Cookie`] is the typed form of one `Set-Cookie` header. Parsing follows
//! the lenient browser-realistic path of RFC 6265 §5.2: unknown attributes
//! are collected verbatim, malformed `Expires`/`Max-Age` values are ignored
//! rather than fatal, and the last occurrence of a recognized attribute
//! wins.
//!
//! A record carries more than the header does: the jar resolves `host_only`
//! and `path_is_default` on acceptance, and every record is stamped with a
//! creation instant plus a process-wide creation index that keeps the
//! canonical send-order stable beyond the clock's resolution.
//!
//! The JSON wire form is the [`SERIALIZABLE_PROPERTIES`] whitelist with
//! instants as RFC 3339 strings and the unbounded `Max-Age`/`Expires`
//! states as the literal tokens `"Infinity"` / `"-Infinity"`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::macros::datetime;
use time::OffsetDateTime;

use crate::date::{format_date, format_iso_date, parse_cookie_date, parse_iso_date};
use crate::errors::ParseError;

/// Largest expiry instant the library reports; unbounded expiry clamps here.
pub const MAX_DATE: OffsetDateTime = datetime!(2038-01-19 03:14:07 UTC);

/// `MAX_DATE` in epoch milliseconds.
pub const MAX_TIME_MS: i64 = 2_147_483_647_000;

/// Ordered whitelist of fields the JSON wire form carries. Anything not
/// listed here is dropped when a jar is serialized.
pub const SERIALIZABLE_PROPERTIES: &[&str] = &[
    "key",
    "value",
    "expires",
    "maxAge",
    "domain",
    "path",
    "secure",
    "httpOnly",
    "extensions",
    "hostOnly",
    "pathIsDefault",
    "creation",
    "lastAccessed",
];

// Process-wide creation counter: init-at-load, monotonic, never reset.
// Distributed stores that need cross-process ordering should substitute a
// logical clock of their own.
static CREATION_INDEX: AtomicU64 = AtomicU64::new(0);

fn next_creation_index() -> u64 {
    CREATION_INDEX.fetch_add(1, AtomicOrdering::Relaxed)
}

fn ms_of(date: OffsetDateTime) -> i64 {
    (date.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Expiry state carried by the `Expires=` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expires {
    /// Concrete expiry instant (UTC).
    AtUtc(OffsetDateTime),
    /// No expiry: a session cookie. Serialized as the literal `"Infinity"`.
    Session,
}

/// `Max-Age` state. The attribute grammar only produces finite values, but
/// out-of-range magnitudes clamp to the sentinels, and callers may set them
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxAge {
    Seconds(i64),
    Infinity,
    NegInfinity,
}

/// Result of the expiry computation: a concrete epoch-millisecond instant
/// or one of the unbounded sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryTime {
    AtMs(i64),
    Infinite,
    NegInfinite,
}

/// One cookie record.
#[derive(Debug, Clone)]
pub struct Cookie {
    /// Cookie name (case-sensitive). May be empty for loose-parsed pairs.
    pub key: String,

    /// Raw cookie value, taken literally (no quote stripping).
    pub value: String,

    /// `Expires=` attribute; session cookies carry [`Expires::Session`].
    pub expires: Expires,

    /// `Max-Age=` attribute; takes precedence over `expires` in the expiry
    /// computation when present. Both fields remain stored.
    pub max_age: Option<MaxAge>,

    /// `Domain=` attribute as received (lowercased, leading dot stripped),
    /// or the request host once a jar accepts the cookie.
    pub domain: Option<String>,

    /// `Path=` attribute as received; the jar fills in the default path.
    pub path: Option<String>,

    /// Send only over secure channels.
    pub secure: bool,

    /// Hide from non-HTTP APIs.
    pub http_only: bool,

    /// Unrecognized attributes, verbatim and ordered.
    pub extensions: Vec<String>,

    /// Set once at construction. A jar replacing a same-key cookie carries
    /// the old record's value over; that is the sole exception.
    pub creation: OffsetDateTime,

    /// Process-wide monotonic tie-breaker for `creation`. Not serialized;
    /// deserialization assigns a fresh one.
    pub creation_index: u64,

    /// `None` until a jar resolves it: `Some(true)` means the cookie was
    /// accepted without a `Domain=` attribute and matches only its exact
    /// host.
    pub host_only: Option<bool>,

    /// True when the jar supplied `path` via §5.1.4 default-path.
    pub path_is_default: bool,

    /// Updated every time the cookie is retrieved.
    pub last_accessed: Option<OffsetDateTime>,
}

impl Default for Cookie {
    fn default() -> Self {
        Self {
            key: String::new(),
            value: String::new(),
            expires: Expires::Session,
            max_age: None,
            domain: None,
            path: None,
            secure: false,
            http_only: false,
            extensions: Vec::new(),
            creation: OffsetDateTime::now_utc(),
            creation_index: next_creation_index(),
            host_only: None,
            path_is_default: false,
            last_accessed: None,
        }
    }
}

// `creation_index` is process-local bookkeeping; two records that agree on
// everything else are the same cookie.
impl PartialEq for Cookie {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.value == other.value
            && self.expires == other.expires
            && self.max_age == other.max_age
            && self.domain == other.domain
            && self.path == other.path
            && self.secure == other.secure
            && self.http_only == other.http_only
            && self.extensions == other.extensions
            && self.creation == other.creation
            && self.host_only == other.host_only
            && self.path_is_default == other.path_is_default
            && self.last_accessed == other.last_accessed
    }
}

impl Cookie {
    /// Creates a cookie with the given pair and defaults everywhere else.
    pub fn new<K, V>(key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            key: key.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    /// Parses a single `Set-Cookie` header value, strictly: the pair before
    /// the first `;` must contain `=` with a non-empty name.
    pub fn parse(header: &str) -> Result<Self, ParseError> {
        parse_set_cookie(header, false)
    }

    /// Parses a single `Set-Cookie` header value leniently: a missing `=`
    /// or empty name yields an empty-key cookie instead of an error.
    pub fn parse_loose(header: &str) -> Result<Self, ParseError> {
        parse_set_cookie(header, true)
    }

    /// The `key=value` request form; a bare value when the key is empty.
    pub fn cookie_string(&self) -> String {
        if self.key.is_empty() {
            self.value.clone()
        } else {
            format!("{}={}", self.key, self.value)
        }
    }

    /// Expiry instant per the precedence rules: a finite `Max-Age` counts
    /// from `creation`, the sentinels pass through, and `Expires` applies
    /// only when `Max-Age` is absent.
    pub fn expiry_time(&self) -> ExpiryTime {
        match self.max_age {
            Some(MaxAge::NegInfinity) => ExpiryTime::NegInfinite,
            Some(MaxAge::Infinity) => ExpiryTime::Infinite,
            Some(MaxAge::Seconds(seconds)) => ExpiryTime::AtMs(
                ms_of(self.creation).saturating_add(seconds.saturating_mul(1000)),
            ),
            None => match self.expires {
                Expires::AtUtc(at) => ExpiryTime::AtMs(ms_of(at)),
                Expires::Session => ExpiryTime::Infinite,
            },
        }
    }

    /// [`expiry_time`](Self::expiry_time) as a date, with the unbounded
    /// states clamped to [`MAX_DATE`] and the epoch respectively.
    pub fn expiry_date(&self) -> OffsetDateTime {
        let ms = match self.expiry_time() {
            ExpiryTime::AtMs(ms) => ms,
            ExpiryTime::Infinite => MAX_TIME_MS,
            ExpiryTime::NegInfinite => 0,
        };
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000).unwrap_or({
            if ms < 0 {
                OffsetDateTime::UNIX_EPOCH
            } else {
                MAX_DATE
            }
        })
    }

    /// Remaining lifetime in milliseconds at `now`: `None` when unbounded,
    /// `Some(0)` once expired.
    pub fn ttl(&self, now: OffsetDateTime) -> Option<i64> {
        match self.expiry_time() {
            ExpiryTime::Infinite => None,
            ExpiryTime::NegInfinite => Some(0),
            ExpiryTime::AtMs(ms) => Some((ms - ms_of(now)).max(0)),
        }
    }

    /// Whether the cookie is expired at `now`.
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        match self.expiry_time() {
            ExpiryTime::NegInfinite => true,
            ExpiryTime::Infinite => false,
            ExpiryTime::AtMs(ms) => ms <= ms_of(now),
        }
    }

    /// Sanity checks on a record: `path` begins with `/` when present and
    /// `domain` is non-empty when present. (`expires` is valid or the
    /// sentinel by construction.)
    pub fn validate(&self) -> bool {
        if let Some(path) = &self.path {
            if !path.starts_with('/') {
                return false;
            }
        }
        if let Some(domain) = &self.domain {
            if domain.is_empty() {
                return false;
            }
        }
        true
    }

    /// The JSON wire form: the [`SERIALIZABLE_PROPERTIES`] whitelist in
    /// order, nothing else.
    pub fn to_json(&self) -> Value {
        let value = serde_json::to_value(SerializedCookie::from(self)).unwrap_or(Value::Null);
        match value {
            Value::Object(map) => {
                let mut out = Map::new();
                for property in SERIALIZABLE_PROPERTIES {
                    if let Some(entry) = map.get(*property) {
                        out.insert((*property).to_owned(), entry.clone());
                    }
                }
                Value::Object(out)
            }
            other => other,
        }
    }

    /// Rebuilds a record from its JSON wire form. Instants are parsed with
    /// the RFC 3339 parser, not the cookie-date grammar, because the wire
    /// form carries our own output. A fresh `creation_index` is assigned.
    pub fn from_json(value: &Value) -> Result<Self, ParseError> {
        let serialized: SerializedCookie =
            serde_json::from_value(value.clone()).map_err(|_| ParseError::InvalidJson)?;
        Cookie::try_from(serialized)
    }

    /// Whitelist-faithful copy: equal on every serialized field, fresh
    /// `creation_index`.
    pub fn duplicate(&self) -> Result<Self, ParseError> {
        Cookie::from_json(&self.to_json())
    }
}

impl FromStr for Cookie {
    type Err = ParseError;

    fn from_str(header: &str) -> Result<Self, ParseError> {
        Cookie::parse(header)
    }
}

impl fmt::Display for Cookie {
    /// Emits `Set-Cookie` syntax. `Expires=` is omitted for session
    /// cookies, `Max-Age=` for the sentinel states, and `Domain=` for
    /// host-only cookies.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cookie_string())?;
        if let Expires::AtUtc(at) = self.expires {
            write!(f, "; Expires={}", format_date(at))?;
        }
        if let Some(MaxAge::Seconds(seconds)) = self.max_age {
            write!(f, "; Max-Age={}", seconds)?;
        }
        if let Some(domain) = &self.domain {
            if self.host_only != Some(true) {
                write!(f, "; Domain={}", domain)?;
            }
        }
        if let Some(path) = &self.path {
            write!(f, "; Path={}", path)?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        for extension in &self.extensions {
            write!(f, "; {}", extension)?;
        }
        Ok(())
    }
}

/// Canonical send-order: longest path first, then earliest creation, then
/// lowest creation index. Index uniqueness makes this a total order with
/// no ties.
pub fn cookie_compare(a: &Cookie, b: &Cookie) -> Ordering {
    let a_path = a.path.as_deref().map_or(0, str::len);
    let b_path = b.path.as_deref().map_or(0, str::len);
    b_path
        .cmp(&a_path)
        .then_with(|| a.creation.cmp(&b.creation))
        .then_with(|| a.creation_index.cmp(&b.creation_index))
}

/// Splits a `Cookie:` request header (RFC 6265 §4.2.1) into records, one
/// per `name=value` pair. Pairs are parsed leniently; empty segments are
/// skipped.
pub fn parse_cookie_header(header: &str) -> Vec<Cookie> {
    header
        .split(';')
        .filter_map(|pair| {
            let pair = pair.trim();
            if pair.is_empty() {
                return None;
            }
            Cookie::parse_loose(pair).ok()
        })
        .collect()
}

// The first CTL terminator truncates the cookie pair.
const TERMINATORS: [char; 3] = ['\n', '\r', '\0'];

fn trim_terminator(input: &str) -> &str {
    match input.find(&TERMINATORS[..]) {
        Some(index) => &input[..index],
        None => input,
    }
}

fn has_control_chars(input: &str) -> bool {
    input.bytes().any(|byte| byte < 0x20)
}

/// Full-string match of `-?[0-9]+`.
fn is_integer(input: &str) -> bool {
    let digits = input.strip_prefix('-').unwrap_or(input);
    !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit())
}

fn parse_cookie_pair(pair: &str, loose: bool) -> Result<(String, String), ParseError> {
    let mut pair = trim_terminator(pair);
    let mut first_eq = pair.find('=');
    if loose {
        if first_eq == Some(0) {
            // A leading `=` is dropped once, then the pair is re-examined.
            pair = &pair[1..];
            first_eq = pair.find('=');
        }
    } else if first_eq.is_none() || first_eq == Some(0) {
        return Err(ParseError::MissingKey);
    }

    let (key, value) = match first_eq {
        Some(index) if index > 0 => (pair[..index].trim(), pair[index + 1..].trim()),
        _ => ("", pair.trim()),
    };

    if has_control_chars(key) || has_control_chars(value) {
        return Err(ParseError::ControlCharacter);
    }
    Ok((key.to_owned(), value.to_owned()))
}

fn parse_set_cookie(header: &str, loose: bool) -> Result<Cookie, ParseError> {
    let header = header.trim();
    if header.is_empty() {
        return Err(ParseError::Empty);
    }

    let (pair, unparsed) = match header.find(';') {
        Some(index) => (&header[..index], Some(&header[index + 1..])),
        None => (header, None),
    };
    let (key, value) = parse_cookie_pair(pair, loose)?;
    let mut cookie = Cookie::new(key, value);

    let unparsed = match unparsed {
        Some(rest) => rest.trim(),
        None => return Ok(cookie),
    };
    if unparsed.is_empty() {
        return Ok(cookie);
    }

    for attribute in unparsed.split(';') {
        let attribute = attribute.trim();
        if attribute.is_empty() {
            continue;
        }
        let (av_key, av_value) = match attribute.find('=') {
            Some(index) => (&attribute[..index], Some(attribute[index + 1..].trim())),
            None => (attribute, None),
        };
        let av_key = av_key.trim().to_ascii_lowercase();

        // Recognized attributes: last occurrence wins. Malformed values are
        // ignored, leaving any earlier occurrence in place.
        match av_key.as_str() {
            "expires" => {
                if let Some(text) = av_value.filter(|text| !text.is_empty()) {
                    if let Some(at) = parse_cookie_date(text) {
                        cookie.expires = Expires::AtUtc(at);
                    }
                }
            }
            "max-age" => {
                if let Some(text) = av_value.filter(|text| is_integer(text)) {
                    cookie.max_age = Some(match text.parse::<i64>() {
                        Ok(seconds) => MaxAge::Seconds(seconds),
                        // Magnitude beyond i64 clamps to the sentinels.
                        Err(_) if text.starts_with('-') => MaxAge::NegInfinity,
                        Err(_) => MaxAge::Infinity,
                    });
                }
            }
            "domain" => {
                if let Some(text) = av_value.filter(|text| !text.is_empty()) {
                    let domain = text.strip_prefix('.').unwrap_or(text);
                    if !domain.is_empty() {
                        cookie.domain = Some(domain.to_ascii_lowercase());
                    }
                }
            }
            "path" => {
                // A value without a leading `/` leaves the path unset; the
                // jar will fall back to the default path.
                if let Some(text) = av_value.filter(|text| text.starts_with('/')) {
                    cookie.path = Some(text.to_owned());
                }
            }
            "secure" => cookie.secure = true,
            "httponly" => cookie.http_only = true,
            _ => cookie.extensions.push(attribute.to_owned()),
        }
    }

    Ok(cookie)
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// Wire form of a [`Cookie`]: exactly the whitelist fields, camelCase
/// names, instants as RFC 3339 strings, sentinels as literal tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedCookie {
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<MaxAgeRepr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub http_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_only: Option<bool>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub path_is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<String>,
}

/// `maxAge` on the wire: a number, or `"Infinity"` / `"-Infinity"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaxAgeRepr {
    Seconds(i64),
    Sentinel(String),
}

impl From<&Cookie> for SerializedCookie {
    fn from(cookie: &Cookie) -> Self {
        Self {
            key: cookie.key.clone(),
            value: cookie.value.clone(),
            expires: Some(match cookie.expires {
                Expires::Session => "Infinity".to_owned(),
                Expires::AtUtc(at) => format_iso_date(at),
            }),
            max_age: cookie.max_age.map(|max_age| match max_age {
                MaxAge::Seconds(seconds) => MaxAgeRepr::Seconds(seconds),
                MaxAge::Infinity => MaxAgeRepr::Sentinel("Infinity".to_owned()),
                MaxAge::NegInfinity => MaxAgeRepr::Sentinel("-Infinity".to_owned()),
            }),
            domain: cookie.domain.clone(),
            path: cookie.path.clone(),
            secure: cookie.secure,
            http_only: cookie.http_only,
            extensions: if cookie.extensions.is_empty() {
                None
            } else {
                Some(cookie.extensions.clone())
            },
            host_only: cookie.host_only,
            path_is_default: cookie.path_is_default,
            creation: Some(format_iso_date(cookie.creation)),
            last_accessed: cookie.last_accessed.map(format_iso_date),
        }
    }
}

impl TryFrom<SerializedCookie> for Cookie {
    type Error = ParseError;

    fn try_from(serialized: SerializedCookie) -> Result<Self, ParseError> {
        let expires = match serialized.expires.as_deref() {
            None | Some("Infinity") => Expires::Session,
            Some(text) => {
                Expires::AtUtc(parse_iso_date(text).ok_or(ParseError::InvalidJson)?)
            }
        };
        let max_age = match serialized.max_age {
            None => None,
            Some(MaxAgeRepr::Seconds(seconds)) => Some(MaxAge::Seconds(seconds)),
            Some(MaxAgeRepr::Sentinel(token)) => Some(match token.as_str() {
                "Infinity" => MaxAge::Infinity,
                "-Infinity" => MaxAge::NegInfinity,
                _ => return Err(ParseError::InvalidJson),
            }),
        };
        let creation = match serialized.creation.as_deref() {
            Some(text) => parse_iso_date(text).ok_or(ParseError::InvalidJson)?,
            None => OffsetDateTime::now_utc(),
        };
        let last_accessed = match serialized.last_accessed.as_deref() {
            Some(text) => Some(parse_iso_date(text).ok_or(ParseError::InvalidJson)?),
            None => None,
        };

        Ok(Cookie {
            key: serialized.key,
            value: serialized.value,
            expires,
            max_age,
            domain: serialized.domain,
            path: serialized.path,
            secure: serialized.secure,
            http_only: serialized.http_only,
            extensions: serialized.extensions.unwrap_or_default(),
            creation,
            creation_index: next_creation_index(),
            host_only: serialized.host_only,
            path_is_default: serialized.path_is_default,
            last_accessed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fixed_date() -> OffsetDateTime {
        datetime!(1994-11-06 08:49:37 UTC)
    }

    #[test]
    fn parses_pair_and_attributes() {
        let cookie = Cookie::parse("a=b; Domain=example.com; Path=/; Secure; HttpOnly").unwrap();
        assert_eq!(cookie.key, "a");
        assert_eq!(cookie.value, "b");
        assert_eq!(cookie.domain.as_deref(), Some("example.com"));
        assert_eq!(cookie.path.as_deref(), Some("/"));
        assert!(cookie.secure);
        assert!(cookie.http_only);
        assert_eq!(cookie.host_only, None);
        assert!(!cookie.path_is_default);
        assert_eq!(cookie.expires, Expires::Session);
        assert_eq!(cookie.max_age, None);
    }

    #[test]
    fn parses_bare_pair() {
        let cookie = Cookie::parse("SID=31d4d96e407aad42").unwrap();
        assert_eq!(cookie.key, "SID");
        assert_eq!(cookie.value, "31d4d96e407aad42");
        assert_eq!(cookie.domain, None);
        assert_eq!(cookie.path, None);
    }

    #[test]
    fn whitespace_is_trimmed_but_value_kept_literal() {
        let cookie = Cookie::parse("  a  =  \"b\"  ; Path=/ ").unwrap();
        assert_eq!(cookie.key, "a");
        // No quote stripping.
        assert_eq!(cookie.value, "\"b\"");
    }

    #[test]
    fn strict_mode_requires_a_named_pair() {
        assert_eq!(Cookie::parse("bare-token"), Err(ParseError::MissingKey));
        assert_eq!(Cookie::parse("=value"), Err(ParseError::MissingKey));
        assert_eq!(Cookie::parse(""), Err(ParseError::Empty));
        assert_eq!(Cookie::parse("   "), Err(ParseError::Empty));
    }

    #[test]
    fn loose_mode_accepts_empty_keys() {
        let cookie = Cookie::parse_loose("bare-token").unwrap();
        assert_eq!(cookie.key, "");
        assert_eq!(cookie.value, "bare-token");

        let cookie = Cookie::parse_loose("=value").unwrap();
        assert_eq!(cookie.key, "");
        assert_eq!(cookie.value, "value");

        // The leading `=` is dropped once and the pair re-examined.
        let cookie = Cookie::parse_loose("=foo=bar").unwrap();
        assert_eq!(cookie.key, "foo");
        assert_eq!(cookie.value, "bar");
    }

    #[test]
    fn control_characters_reject_the_pair() {
        assert_eq!(
            Cookie::parse("a\u{1}b=c"),
            Err(ParseError::ControlCharacter)
        );
        // A terminator truncates instead of rejecting.
        let cookie = Cookie::parse("a=b\nDiscarded").unwrap();
        assert_eq!(cookie.value, "b");
    }

    #[test]
    fn last_occurrence_of_an_attribute_wins() {
        let cookie = Cookie::parse("a=b; Path=/one; Path=/two").unwrap();
        assert_eq!(cookie.path.as_deref(), Some("/two"));

        let cookie = Cookie::parse("a=b; Domain=one.com; Domain=two.com").unwrap();
        assert_eq!(cookie.domain.as_deref(), Some("two.com"));
    }

    #[test]
    fn malformed_expires_is_ignored() {
        let cookie = Cookie::parse("a=b; Expires=garbage").unwrap();
        assert_eq!(cookie.expires, Expires::Session);

        // A later malformed occurrence leaves the earlier value in place.
        let cookie =
            Cookie::parse("a=b; Expires=Sun, 06 Nov 1994 08:49:37 GMT; Expires=nope").unwrap();
        assert_eq!(cookie.expires, Expires::AtUtc(fixed_date()));
    }

    #[test]
    fn max_age_grammar_and_clamping() {
        let cookie = Cookie::parse("a=b; Max-Age=3600").unwrap();
        assert_eq!(cookie.max_age, Some(MaxAge::Seconds(3600)));

        // Zero and negatives are preserved as finite values.
        let cookie = Cookie::parse("a=b; Max-Age=0").unwrap();
        assert_eq!(cookie.max_age, Some(MaxAge::Seconds(0)));
        let cookie = Cookie::parse("a=b; Max-Age=-1").unwrap();
        assert_eq!(cookie.max_age, Some(MaxAge::Seconds(-1)));

        // Non-integers are ignored.
        let cookie = Cookie::parse("a=b; Max-Age=1.5").unwrap();
        assert_eq!(cookie.max_age, None);
        let cookie = Cookie::parse("a=b; Max-Age=soon").unwrap();
        assert_eq!(cookie.max_age, None);

        // Out-of-range magnitudes clamp to the sentinels.
        let cookie = Cookie::parse("a=b; Max-Age=99999999999999999999").unwrap();
        assert_eq!(cookie.max_age, Some(MaxAge::Infinity));
        let cookie = Cookie::parse("a=b; Max-Age=-99999999999999999999").unwrap();
        assert_eq!(cookie.max_age, Some(MaxAge::NegInfinity));
    }

    #[test]
    fn domain_attribute_is_normalized() {
        let cookie = Cookie::parse("a=b; Domain=.Example.COM").unwrap();
        assert_eq!(cookie.domain.as_deref(), Some("example.com"));

        // Empty after dot-stripping: ignored.
        let cookie = Cookie::parse("a=b; Domain=.").unwrap();
        assert_eq!(cookie.domain, None);
        let cookie = Cookie::parse("a=b; Domain=").unwrap();
        assert_eq!(cookie.domain, None);
    }

    #[test]
    fn path_attribute_requires_leading_slash() {
        let cookie = Cookie::parse("a=b; Path=relative").unwrap();
        assert_eq!(cookie.path, None);
    }

    #[test]
    fn flag_attributes_ignore_values() {
        let cookie = Cookie::parse("a=b; Secure=false; HttpOnly=no").unwrap();
        assert!(cookie.secure);
        assert!(cookie.http_only);
    }

    #[test]
    fn unknown_attributes_are_kept_verbatim() {
        let cookie = Cookie::parse("a=b; Priority=High; fancy; SameSite=Lax").unwrap();
        assert_eq!(
            cookie.extensions,
            vec!["Priority=High", "fancy", "SameSite=Lax"]
        );
    }

    #[test]
    fn displays_set_cookie_syntax() {
        let header = "a=b; Domain=example.com; Path=/; Secure; HttpOnly";
        let cookie = Cookie::parse(header).unwrap();
        assert_eq!(cookie.to_string(), header);

        let mut cookie = Cookie::parse("a=b; Expires=Sun, 06 Nov 1994 08:49:37 GMT").unwrap();
        assert_eq!(
            cookie.to_string(),
            "a=b; Expires=Sun, 06 Nov 1994 08:49:37 GMT"
        );

        // Sentinel max-age never appears in header form.
        cookie.max_age = Some(MaxAge::Infinity);
        assert_eq!(
            cookie.to_string(),
            "a=b; Expires=Sun, 06 Nov 1994 08:49:37 GMT"
        );
    }

    #[test]
    fn display_omits_domain_for_host_only_cookies() {
        let mut cookie = Cookie::new("a", "b");
        cookie.domain = Some("example.com".to_owned());
        cookie.host_only = Some(true);
        assert_eq!(cookie.to_string(), "a=b");

        cookie.host_only = Some(false);
        assert_eq!(cookie.to_string(), "a=b; Domain=example.com");
    }

    #[test]
    fn cookie_string_with_empty_key_is_the_bare_value() {
        let cookie = Cookie::parse_loose("bare-token").unwrap();
        assert_eq!(cookie.cookie_string(), "bare-token");
        let cookie = Cookie::new("k", "v");
        assert_eq!(cookie.cookie_string(), "k=v");
    }

    #[test]
    fn max_age_takes_precedence_over_expires() {
        let mut cookie =
            Cookie::parse("a=b; Expires=Sun, 06 Nov 1994 08:49:37 GMT; Max-Age=60").unwrap();
        cookie.creation = fixed_date();
        assert_eq!(
            cookie.expiry_time(),
            ExpiryTime::AtMs(fixed_date().unix_timestamp() * 1000 + 60_000)
        );
        // Both fields remain stored.
        assert_eq!(cookie.expires, Expires::AtUtc(fixed_date()));
        assert_eq!(cookie.max_age, Some(MaxAge::Seconds(60)));
    }

    #[test]
    fn expiry_time_is_independent_of_now_for_finite_max_age() {
        let mut cookie = Cookie::parse("a=b; Max-Age=0").unwrap();
        cookie.creation = fixed_date();
        assert_eq!(
            cookie.expiry_time(),
            ExpiryTime::AtMs(fixed_date().unix_timestamp() * 1000)
        );
        assert!(cookie.is_expired_at(fixed_date()));
        assert!(cookie.is_expired_at(fixed_date() + time::Duration::days(1)));
    }

    #[test]
    fn session_cookies_never_expire() {
        let cookie = Cookie::parse("a=b").unwrap();
        assert_eq!(cookie.expiry_time(), ExpiryTime::Infinite);
        assert!(!cookie.is_expired_at(OffsetDateTime::now_utc()));
        assert_eq!(cookie.expiry_date(), MAX_DATE);
        assert_eq!(cookie.ttl(OffsetDateTime::now_utc()), None);
    }

    #[test]
    fn ttl_is_zero_once_expired() {
        let mut cookie = Cookie::parse("a=b; Max-Age=60").unwrap();
        cookie.creation = fixed_date();
        assert_eq!(cookie.ttl(fixed_date()), Some(60_000));
        assert_eq!(cookie.ttl(fixed_date() + time::Duration::hours(1)), Some(0));

        cookie.max_age = Some(MaxAge::NegInfinity);
        assert_eq!(cookie.ttl(fixed_date()), Some(0));
        assert_eq!(cookie.expiry_date(), OffsetDateTime::UNIX_EPOCH);
    }

    #[test]
    fn json_round_trip_preserves_whitelisted_fields() {
        let mut cookie =
            Cookie::parse("a=b; Domain=example.com; Path=/app; Secure; HttpOnly; Ext=1").unwrap();
        cookie.creation = fixed_date();
        cookie.host_only = Some(false);
        cookie.last_accessed = Some(fixed_date());

        let restored = cookie.duplicate().unwrap();
        assert_eq!(restored, cookie);
        assert_ne!(restored.creation_index, cookie.creation_index);
    }

    #[test]
    fn json_uses_literal_sentinels() {
        let mut cookie = Cookie::parse("a=b; Max-Age=-99999999999999999999").unwrap();
        cookie.creation = fixed_date();
        let json = cookie.to_json();
        assert_eq!(json["expires"], "Infinity");
        assert_eq!(json["maxAge"], "-Infinity");
        assert_eq!(json["creation"], "1994-11-06T08:49:37Z");

        let restored = Cookie::from_json(&json).unwrap();
        assert_eq!(restored.expires, Expires::Session);
        assert_eq!(restored.max_age, Some(MaxAge::NegInfinity));
    }

    #[test]
    fn json_contains_only_whitelisted_properties() {
        let cookie = Cookie::parse("a=b; Path=/").unwrap();
        let json = cookie.to_json();
        let map = json.as_object().unwrap();
        for key in map.keys() {
            assert!(
                SERIALIZABLE_PROPERTIES.contains(&key.as_str()),
                "unexpected property {:?}",
                key
            );
        }
    }

    #[test]
    fn from_json_rejects_malformed_records() {
        assert!(Cookie::from_json(&serde_json::json!({"key": "a", "value": "b", "expires": "nope"})).is_err());
        assert!(Cookie::from_json(&serde_json::json!({"key": "a", "value": "b", "maxAge": "huge"})).is_err());
        assert!(Cookie::from_json(&serde_json::json!("not an object")).is_err());

        // Unknown properties are dropped, not fatal.
        let cookie =
            Cookie::from_json(&serde_json::json!({"key": "a", "value": "b", "wat": true})).unwrap();
        assert_eq!(cookie.key, "a");
    }

    #[test]
    fn comparator_orders_by_path_then_creation_then_index() {
        let mut by_path_short = Cookie::new("a", "1");
        by_path_short.path = Some("/".to_owned());
        let mut by_path_long = Cookie::new("a", "2");
        by_path_long.path = Some("/app".to_owned());
        assert_eq!(
            cookie_compare(&by_path_long, &by_path_short),
            Ordering::Less
        );

        let mut older = Cookie::new("b", "1");
        older.path = Some("/".to_owned());
        older.creation = fixed_date();
        let mut newer = Cookie::new("b", "2");
        newer.path = Some("/".to_owned());
        newer.creation = fixed_date() + time::Duration::seconds(1);
        assert_eq!(cookie_compare(&older, &newer), Ordering::Less);

        // Same path and instant: the creation index breaks the tie.
        let mut first = Cookie::new("c", "1");
        first.path = Some("/".to_owned());
        first.creation = fixed_date();
        let mut second = Cookie::new("c", "2");
        second.path = Some("/".to_owned());
        second.creation = fixed_date();
        assert_eq!(cookie_compare(&first, &second), Ordering::Less);
        assert_eq!(cookie_compare(&second, &first), Ordering::Greater);
    }

    #[test]
    fn creation_indexes_are_unique_and_increasing() {
        let a = Cookie::new("a", "1");
        let b = Cookie::new("b", "2");
        let c = Cookie::new("c", "3");
        assert!(a.creation_index < b.creation_index);
        assert!(b.creation_index < c.creation_index);
    }

    #[test]
    fn splits_request_cookie_headers() {
        let cookies = parse_cookie_header("sid=abc; lang=en-US; bare");
        assert_eq!(cookies.len(), 3);
        assert_eq!(cookies[0].key, "sid");
        assert_eq!(cookies[0].value, "abc");
        assert_eq!(cookies[1].key, "lang");
        assert_eq!(cookies[2].key, "");
        assert_eq!(cookies[2].value, "bare");

        assert!(parse_cookie_header("").is_empty());
    }

    #[test]
    fn validates_stored_shape() {
        let mut cookie = Cookie::new("a", "b");
        assert!(cookie.validate());
        cookie.path = Some("relative".to_owned());
        assert!(!cookie.validate());
        cookie.path = Some("/ok".to_owned());
        cookie.domain = Some(String::new());
        assert!(!cookie.validate());
    }
}
