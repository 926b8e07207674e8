use super::*;

#[test]
fn bare_integer_is_milliseconds() {
    assert_eq!(parse_ms("1500").unwrap(), 1500);
}

#[test]
fn seconds_and_minutes() {
    assert_eq!(parse_ms("30s").unwrap(), 30_000);
    assert_eq!(parse_ms("2m").unwrap(), 120_000);
}

#[test]
fn hours_days_weeks() {
    assert_eq!(parse_ms("1h").unwrap(), 3_600_000);
    assert_eq!(parse_ms("1d").unwrap(), 86_400_000);
    assert_eq!(parse_ms("1w").unwrap(), 7 * 86_400_000);
}

#[test]
fn month_and_year_are_distinct_from_minute() {
    assert_eq!(parse_ms("1M").unwrap(), 30 * 86_400_000);
    assert!(parse_ms("1y").unwrap() > 365 * 86_400_000);
}

#[test]
fn fractional_values() {
    assert_eq!(parse_ms("1.5s").unwrap(), 1500);
}

#[test]
fn unrecognised_unit_fails_with_bad_interval() {
    let err = parse_ms("5x").unwrap_err();
    assert!(matches!(err, UplinkError::BadInterval(_)));
}

#[test]
fn empty_string_fails() {
    assert!(parse_ms("").is_err());
}

#[test]
fn negative_number_fails() {
    assert!(parse_ms("-5s").is_err());
}

#[test]
fn large_bare_timeout_warns_but_still_parses() {
    assert_eq!(parse_timeout_ms("5000", "timeout").unwrap(), 5000);
}
