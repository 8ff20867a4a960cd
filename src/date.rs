//! Cookie date handling.
//!
//! RFC 6265 §5.1.1 defines its own date grammar rather than reusing the
//! HTTP one: the string is split on a fixed delimiter set and each token is
//! tried, in order, as a time, a day of month, a month name, and a year.
//! A token can only fill the first category that is still open. Parsing
//! succeeds when all four categories are filled with in-range values.
//!
//! ```text
//! delimiter       = %x09 / %x20-2F / %x3B-40 / %x5B-60 / %x7B-7E
//! time            = 1*2DIGIT ":" 1*2DIGIT ":" 1*2DIGIT ( non-digit *OCTET )
//! day-of-month    = 1*2DIGIT ( non-digit *OCTET )
//! month           = "jan" / "feb" / ... / "dec" (case-insensitive prefix)
//! year            = 2*4DIGIT ( non-digit *OCTET )
//! ```
//!
//! This module also owns the two other date codecs the crate needs:
//! IMF-fixdate output for `Expires=` attributes, and RFC 3339 for the JSON
//! serialization, which carries our own output and therefore does *not* go
//! through the lenient cookie grammar.

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// Date delimiter per the cookie-date grammar.
fn is_delimiter(byte: u8) -> bool {
    byte == 0x09
        || (0x20..=0x2f).contains(&byte)
        || (0x3b..=0x40).contains(&byte)
        || (0x5b..=0x60).contains(&byte)
        || (0x7b..=0x7e).contains(&byte)
}

/// Reads up to `max` leading ASCII digits from `token`.
///
/// Returns the parsed number when between `min` and `max` digits are
/// present and, unless `trailing_ok`, nothing follows them. Whatever does
/// follow necessarily starts with a non-digit.
fn parse_digits(token: &str, min: usize, max: usize, trailing_ok: bool) -> Option<u32> {
    let bytes = token.as_bytes();
    let mut count = 0;
    while count < bytes.len() && bytes[count].is_ascii_digit() {
        count += 1;
    }
    if count < min || count > max {
        return None;
    }
    if !trailing_ok && count != bytes.len() {
        return None;
    }
    token[..count].parse().ok()
}

/// `HH:MM:SS` with optional trailing non-digits after the seconds.
fn parse_time(token: &str) -> Option<(u8, u8, u8)> {
    let mut parts = token.split(':');
    let hour = parse_digits(parts.next()?, 1, 2, false)?;
    let minute = parse_digits(parts.next()?, 1, 2, false)?;
    let second = parse_digits(parts.next()?, 1, 2, true)?;
    if parts.next().is_some() {
        return None;
    }
    Some((hour as u8, minute as u8, second as u8))
}

/// Month tokens match on their first three characters, case-insensitively.
fn parse_month(token: &str) -> Option<Month> {
    if token.len() < 3 {
        return None;
    }
    let mut abbrev = [0u8; 3];
    for (i, byte) in token.as_bytes()[..3].iter().enumerate() {
        abbrev[i] = byte.to_ascii_lowercase();
    }
    match &abbrev {
        b"jan" => Some(Month::January),
        b"feb" => Some(Month::February),
        b"mar" => Some(Month::March),
        b"apr" => Some(Month::April),
        b"may" => Some(Month::May),
        b"jun" => Some(Month::June),
        b"jul" => Some(Month::July),
        b"aug" => Some(Month::August),
        b"sep" => Some(Month::September),
        b"oct" => Some(Month::October),
        b"nov" => Some(Month::November),
        b"dec" => Some(Month::December),
        _ => None,
    }
}

/// Parses a cookie-date string into a UTC instant.
///
/// Returns `None` for anything the §5.1.1 grammar rejects: a missing
/// category, an out-of-range field, a year before 1601, or a day that does
/// not exist in the named month.
pub fn parse_cookie_date(input: &str) -> Option<OffsetDateTime> {
    let mut time = None;
    let mut day = None;
    let mut month = None;
    let mut year = None;

    // Delimiters are all ASCII, so each split segment is valid UTF-8.
    for token in input.as_bytes().split(|&byte| is_delimiter(byte)) {
        if token.is_empty() {
            continue;
        }
        let token = match std::str::from_utf8(token) {
            Ok(token) => token,
            Err(_) => continue,
        };

        if time.is_none() {
            if let Some(parsed) = parse_time(token) {
                time = Some(parsed);
                continue;
            }
        }
        if day.is_none() {
            if let Some(parsed) = parse_digits(token, 1, 2, true) {
                day = Some(parsed as u8);
                continue;
            }
        }
        if month.is_none() {
            if let Some(parsed) = parse_month(token) {
                month = Some(parsed);
                continue;
            }
        }
        if year.is_none() {
            if let Some(parsed) = parse_digits(token, 2, 4, true) {
                let mut parsed = parsed as i32;
                if (70..=99).contains(&parsed) {
                    parsed += 1900;
                } else if (0..=69).contains(&parsed) {
                    parsed += 2000;
                }
                year = Some(parsed);
                continue;
            }
        }
    }

    let (hour, minute, second) = time?;
    let day = day?;
    let month = month?;
    let year = year?;

    if !(1..=31).contains(&day) || hour > 23 || minute > 59 || second > 59 || year < 1601 {
        return None;
    }

    let date = Date::from_calendar_date(year, month, day).ok()?;
    let time = Time::from_hms(hour, minute, second).ok()?;
    Some(PrimitiveDateTime::new(date, time).assume_utc())
}

/// Formats an instant as IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn format_date(date: OffsetDateTime) -> String {
    let format = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    date.to_offset(UtcOffset::UTC)
        .format(&format)
        .unwrap_or_default()
}

/// Formats an instant as RFC 3339 for the JSON wire form.
pub fn format_iso_date(date: OffsetDateTime) -> String {
    date.to_offset(UtcOffset::UTC)
        .format(&Rfc3339)
        .unwrap_or_default()
}

/// Parses an RFC 3339 instant from the JSON wire form.
pub fn parse_iso_date(input: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(input, &Rfc3339).ok()
}
