use chrono::{Datelike, Duration, NaiveDate, SecondsFormat, Utc};

/// Row timestamps are RFC 3339 UTC text so both backends sort them lexically.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn timestamp_days_ago(days: i64) -> String {
    (Utc::now() - Duration::days(days)).to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Calendar dates are `YYYY-MM-DD`.
pub fn today() -> String {
    Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

/// First day of the month `months` before the current month, as a timestamp prefix.
pub fn months_ago_start(months: u32) -> String {
    let now = Utc::now().date_naive();
    let mut year = now.year();
    let mut month = now.month() as i32 - months as i32;
    while month < 1 {
        month += 12;
        year -= 1;
    }
    NaiveDate::from_ymd_opt(year, month as u32, 1)
        .unwrap_or(now)
        .format("%Y-%m-01")
        .to_string()
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp and keeps the date part.
pub fn normalize_date(input: &str) -> Option<String> {
    let trimmed = input.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_dates_and_timestamps() {
        assert_eq!(normalize_date("2024-03-05").as_deref(), Some("2024-03-05"));
        assert_eq!(normalize_date("2024-03-05T10:00:00Z").as_deref(), Some("2024-03-05"));
        assert_eq!(normalize_date("March 5"), None);
    }

    #[test]
    fn months_ago_is_first_of_month() {
        let start = months_ago_start(5);
        assert!(start.ends_with("-01"));
        assert!(start < today());
    }
}
