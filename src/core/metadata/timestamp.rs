//! Date-time strings as written by cameras and editors.
//!
//! Accepts EXIF layout (`2021:05:01 10:00:00`) and ISO 8601 layout
//! (`2021-05-01T10:00:00+02:00`), optionally without seconds or without a
//! time at all. Any zone designator is dropped: all times are compared as
//! wall-clock times.

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

fn layout() -> &'static Regex {
    static LAYOUT: OnceLock<Regex> = OnceLock::new();
    LAYOUT.get_or_init(|| {
        Regex::new(
            r"^(\d{4})[:-](\d{2})[:-](\d{2})(?:[T ](\d{2}):(\d{2})(?::(\d{2})(?:[.,]\d+)?)?(?:Z|[+-]\d{2}(?::?\d{2})?)?)?$",
        )
        .expect("timestamp layout is a valid regex")
    })
}

/// Parse a timestamp, returning `None` for blank, zeroed or malformed values
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let caps = layout().captures(text.trim())?;
    let number = |i: usize| -> Option<u32> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };

    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, number(2)?, number(3)?)?;
    date.and_hms_opt(number(4)?, number(5)?, number(6)?)
}
