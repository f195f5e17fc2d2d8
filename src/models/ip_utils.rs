// src/models/ip_utils.rs

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::net::IpAddr;
use thiserror::Error;

/// Malformed IP input, reported to the user before any lookup runs
#[derive(Debug, Error)]
#[error("invalid IP address: {0}")]
pub struct InvalidIp(pub String);

/// Strip one pair of enclosing square brackets from an indicator.
///
/// Defanged indicators are commonly written as `1.2.3.4` wrapped in brackets;
/// lookups need the bare address.
pub fn unbracket(value: &str) -> &str {
    let trimmed = value.trim();
    trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(trimmed)
}

/// Normalize and validate an IP argument.
///
/// Accepts bracketed input; anything that does not parse as a syntactically
/// correct IPv4/IPv6 address is a user error, not a crash.
pub fn parse_ip(value: &str) -> Result<IpAddr, InvalidIp> {
    let bare = unbracket(value);
    bare.parse::<IpAddr>()
        .map_err(|_| InvalidIp(value.to_string()))
}

/// Parse a provider timestamp into a timezone-free value.
///
/// Providers disagree on formats: RFC 3339 with an offset, bare ISO 8601,
/// `YYYY-MM-DD HH:MM:SS`, or a plain date. Any timezone component is dropped
/// so records from different providers compare uniformly.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    None
}

/// Convert unix epoch seconds (as reported by providers with single
/// observation dates) into a timezone-free timestamp.
pub fn timestamp_from_epoch(secs: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbracket_strips_one_enclosing_pair() {
        assert_eq!(unbracket("[8.8.8.8]"), "8.8.8.8");
        assert_eq!(unbracket("8.8.8.8"), "8.8.8.8");
        assert_eq!(unbracket(" [2001:db8::1] "), "2001:db8::1");
        // Unbalanced brackets are left alone
        assert_eq!(unbracket("[8.8.8.8"), "[8.8.8.8");
    }

    #[test]
    fn parse_ip_accepts_v4_and_v6() {
        assert!(parse_ip("172.34.127.2").unwrap().is_ipv4());
        assert!(parse_ip("[2001:db8::1]").unwrap().is_ipv6());
    }

    #[test]
    fn parse_ip_rejects_garbage() {
        for bad in ["", "not-an-ip", "999.1.2.3", "1.2.3", "example.org"] {
            assert!(parse_ip(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn parse_timestamp_handles_provider_formats() {
        // RFC 3339 with offset: the offset is dropped, not applied twice
        let dt = parse_timestamp("2019-03-15T10:21:31+00:00").unwrap();
        assert_eq!(dt.to_string(), "2019-03-15 10:21:31");

        let dt = parse_timestamp("2017-06-15T22:12:08Z").unwrap();
        assert_eq!(dt.to_string(), "2017-06-15 22:12:08");

        // Bare ISO 8601 with fractional seconds (pulse creation dates)
        let dt = parse_timestamp("2019-03-26T15:00:12.123456").unwrap();
        assert_eq!(dt.date().to_string(), "2019-03-26");

        // Space-separated (sample collection dates)
        let dt = parse_timestamp("2018-11-02 08:00:00").unwrap();
        assert_eq!(dt.to_string(), "2018-11-02 08:00:00");

        // Plain date
        let dt = parse_timestamp("2018-11-02").unwrap();
        assert_eq!(dt.to_string(), "2018-11-02 00:00:00");

        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn epoch_conversion() {
        let dt = timestamp_from_epoch(1552644091).unwrap();
        assert_eq!(dt.date().to_string(), "2019-03-15");
    }
}
