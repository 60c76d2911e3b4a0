//! Date helper functions

use chrono::{DateTime, TimeZone, Utc};

/// Format date in full format (like "January 15, 2024")
pub fn full_date<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format("%B %-d, %Y").to_string()
}

/// Format a post's ISO date string for display, falling back to the raw text
pub fn display_date(date: &str) -> String {
    crate::content::parse_date_string(date)
        .map(|d| full_date(&d))
        .unwrap_or_else(|| date.to_string())
}

/// Get relative time for a comment timestamp (milliseconds since epoch).
///
/// Within a week this reads like "5 minutes ago"; older timestamps are
/// shown as a short date. A missing timestamp (not yet resolved by the
/// server) reads "Just now".
pub fn relative_date(timestamp_ms: Option<i64>, now: DateTime<Utc>) -> String {
    let Some(date) = timestamp_ms.and_then(DateTime::<Utc>::from_timestamp_millis) else {
        return "Just now".to_string();
    };

    let duration = now.signed_duration_since(date);
    let minutes = duration.num_minutes();
    let hours = duration.num_hours();
    let days = duration.num_days();

    let plural = |n: i64| if n > 1 { "s" } else { "" };

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{} minute{} ago", minutes, plural(minutes))
    } else if hours < 24 {
        format!("{} hour{} ago", hours, plural(hours))
    } else if days < 7 {
        format!("{} day{} ago", days, plural(days))
    } else {
        date.format("%b %-d, %Y").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_full_date() {
        let date = Utc.with_ymd_and_hms(2024, 1, 5, 10, 30, 0).unwrap();
        assert_eq!(full_date(&date), "January 5, 2024");
        assert_eq!(display_date("2024-01-05T10:30:00.000Z"), "January 5, 2024");
        assert_eq!(display_date("whenever"), "whenever");
    }

    #[test]
    fn test_relative_date() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let ago = |d: Duration| Some((now - d).timestamp_millis());

        assert_eq!(relative_date(None, now), "Just now");
        assert_eq!(relative_date(ago(Duration::seconds(30)), now), "Just now");
        assert_eq!(relative_date(ago(Duration::minutes(1)), now), "1 minute ago");
        assert_eq!(relative_date(ago(Duration::minutes(5)), now), "5 minutes ago");
        assert_eq!(relative_date(ago(Duration::hours(1)), now), "1 hour ago");
        assert_eq!(relative_date(ago(Duration::hours(23)), now), "23 hours ago");
        assert_eq!(relative_date(ago(Duration::days(3)), now), "3 days ago");
        assert_eq!(relative_date(ago(Duration::days(30)), now), "May 11, 2024");
    }
}
