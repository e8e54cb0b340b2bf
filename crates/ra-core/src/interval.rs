//! Watch interval syntax: a sequence of `<number><unit>` parts such as `30s`,
//! `1m30s` or `1.5h`, with units `ns`, `us` (`µs`), `ms`, `s`, `m` and `h`.
//! A bare integer is read as seconds. A leading `-` is accepted and yields a
//! zero interval, which fires on every tick.

use std::time::Duration;

use crate::error::{AppError, Result};

const NANOS_PER_SEC: u128 = 1_000_000_000;

pub fn parse_interval(input: &str) -> Result<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AppError::Validation("empty interval".to_string()));
    }
    let invalid = || AppError::Validation(format!("invalid interval: {input:?}"));

    let (negative, body) = match input.as_bytes()[0] {
        b'-' => (true, &input[1..]),
        b'+' => (false, &input[1..]),
        _ => (false, input),
    };
    let total = match body.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => parse_parts(body).ok_or_else(invalid)?,
    };
    Ok(if negative { Duration::ZERO } else { total })
}

/// `None` on any malformed part or on overflow.
fn parse_parts(mut rest: &str) -> Option<Duration> {
    if rest.is_empty() {
        return None;
    }
    let mut nanos: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let int_part = &rest[..int_len];
        rest = &rest[int_len..];

        let mut frac_part = "";
        if let Some(after_dot) = rest.strip_prefix('.') {
            let frac_len = after_dot
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(after_dot.len());
            frac_part = &after_dot[..frac_len];
            rest = &after_dot[frac_len..];
        }
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit: u128 = match &rest[..unit_len] {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" => NANOS_PER_SEC,
            "m" => 60 * NANOS_PER_SEC,
            "h" => 3_600 * NANOS_PER_SEC,
            _ => return None,
        };
        rest = &rest[unit_len..];

        let whole: u128 = if int_part.is_empty() { 0 } else { int_part.parse().ok()? };
        nanos = nanos.checked_add(whole.checked_mul(unit)?)?;

        // digits past nanosecond precision of an hour cannot matter
        let (mut frac, mut scale) = (0u128, 1u128);
        for digit in frac_part.bytes().take(18) {
            frac = frac * 10 + u128::from(digit - b'0');
            scale *= 10;
        }
        nanos = nanos.checked_add(frac * unit / scale)?;
    }

    let secs = u64::try_from(nanos / NANOS_PER_SEC).ok()?;
    Some(Duration::new(secs, (nanos % NANOS_PER_SEC) as u32))
}

/// Inverse of [`parse_interval`] for display, e.g. `90s` → `1m30s`.
pub fn format_interval(interval: Duration) -> String {
    if interval.is_zero() {
        return "0s".to_string();
    }
    let mut out = String::new();
    let secs = interval.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        out.push_str(&format!("{h}h"));
    }
    if m > 0 {
        out.push_str(&format!("{m}m"));
    }
    if s > 0 {
        out.push_str(&format!("{s}s"));
    }
    let sub = interval.subsec_nanos();
    let parts = [(sub / 1_000_000, "ms"), (sub / 1_000 % 1_000, "us"), (sub % 1_000, "ns")];
    for (value, unit) in parts {
        if value > 0 {
            out.push_str(&format!("{value}{unit}"));
        }
    }
    out
}

/// `#[serde(with = "crate::interval::serde_interval")]` for `Duration` fields.
pub mod serde_interval {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(interval: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_interval(*interval))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_interval(&raw).map_err(serde::de::Error::custom)
    }
}
