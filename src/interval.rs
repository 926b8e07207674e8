//! Converts human duration literals (`"2m"`, `"30s"`, bare integers) to
//! milliseconds. Deliberately not built on `humantime`: the grammar this
//! crate's configuration relies on includes `M` (month, ~30 days) and `y`
//! (year, ~365.25 days) units that `humantime` does not define.

use crate::error::UplinkError;

const SECOND: u64 = 1000;
const MINUTE: u64 = 60 * SECOND;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;
const MONTH: u64 = 30 * DAY;
const YEAR: u64 = (365.25 * DAY as f64) as u64;

/// Parses a duration literal into milliseconds.
///
/// Accepted forms: a bare integer (already milliseconds), or
/// `<number><unit>` where unit is one of `ms, s, m, h, d, w, M, y`.
/// Unit matching is case-sensitive for `M` (month) vs `m` (minute) to
/// disambiguate the two.
pub fn parse_ms(raw: &str) -> Result<u64, UplinkError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UplinkError::BadInterval(raw.to_string()));
    }

    if let Ok(n) = raw.parse::<u64>() {
        return Ok(n);
    }

    let split_at = raw
        .find(|c: char| !c.is_ascii_digit() && c != '.' && c != '-')
        .ok_or_else(|| UplinkError::BadInterval(raw.to_string()))?;
    let (number_part, unit_part) = raw.split_at(split_at);

    let number: f64 = number_part
        .parse()
        .map_err(|_| UplinkError::BadInterval(raw.to_string()))?;
    if number < 0.0 {
        return Err(UplinkError::BadInterval(raw.to_string()));
    }

    let unit_ms = match unit_part {
        "ms" => 1,
        "s" => SECOND,
        "m" => MINUTE,
        "h" => HOUR,
        "d" => DAY,
        "w" => WEEK,
        "M" => MONTH,
        "y" => YEAR,
        _ => return Err(UplinkError::BadInterval(raw.to_string())),
    };

    Ok((number * unit_ms as f64).round() as u64)
}

/// Parses a duration either already expressed in milliseconds or a literal.
/// For the `timeout` field specifically, warns when a raw bare-number value
/// is >= 1000: a legacy heuristic, since values that large are almost
/// always seconds mistakenly given as milliseconds.
pub fn parse_timeout_ms(raw: &str, field: &str) -> Result<u64, UplinkError> {
    let ms = parse_ms(raw)?;
    if field == "timeout" && raw.chars().all(|c| c.is_ascii_digit()) && ms >= 1000 {
        tracing::warn!(
            field,
            value_ms = ms,
            "timeout is >= 1000ms and was given as a bare number; \
             this is often seconds mistaken for milliseconds"
        );
    }
    Ok(ms)
}

#[cfg(test)]
#[path = "interval_test.rs"]
mod interval_test;
