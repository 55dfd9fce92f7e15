use chrono::{NaiveDate, NaiveDateTime};

const DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
];

pub fn parse_event_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for format in DATE_TIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Seconds since the Unix epoch, treating the naive time as UTC.
pub fn event_timestamp(raw: &str) -> Option<i64> {
    parse_event_time(raw).map(|parsed| parsed.and_utc().timestamp())
}

pub fn format_timestamp(timestamp: i64, format: &str) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|value| value.naive_utc().format(format).to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_primary_minute_format() {
        let parsed = parse_event_time("2025-09-24 09:45").unwrap();
        assert_eq!(parsed.to_string(), "2025-09-24 09:45:00");
    }

    #[test]
    fn accepts_seconds_iso_and_date_only() {
        assert!(parse_event_time("2025-09-24 09:45:30").is_some());
        assert!(parse_event_time("2025-09-24T09:45").is_some());
        assert_eq!(
            parse_event_time("2025-09-24").unwrap().to_string(),
            "2025-09-24 00:00:00"
        );
    }

    #[test]
    fn rejects_blank_and_garbage() {
        assert!(parse_event_time("").is_none());
        assert!(parse_event_time("   ").is_none());
        assert!(parse_event_time("next tuesday").is_none());
    }

    #[test]
    fn timestamps_order_like_the_calendar() {
        let earlier = event_timestamp("2025-09-17 19:30").unwrap();
        let later = event_timestamp("2025-10-14 19:30").unwrap();
        assert!(earlier < later);
        assert_eq!(format_timestamp(earlier, "%m/%d %H:%M"), "09/17 19:30");
    }
}
