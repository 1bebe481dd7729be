use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

/// Parse a date string (YYYY-MM-DD)
pub fn parse_date(date_str: &str) -> anyhow::Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")?)
}

/// Format a date as YYYY-MM-DD
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Today's date in the given time zone
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// Midnight UTC of a date as a unix timestamp
pub fn date_to_timestamp(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// Calendar date of a unix timestamp, as seen in `tz`
pub fn timestamp_to_local_date(timestamp: i64, tz: Tz) -> Option<NaiveDate> {
    let utc: DateTime<Utc> = DateTime::from_timestamp(timestamp, 0)?;
    Some(tz.from_utc_datetime(&utc.naive_utc()).date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format_date() {
        let date = parse_date("2024-02-29").unwrap();
        assert_eq!(format_date(date), "2024-02-29");
        assert!(parse_date("2024-13-01").is_err());
    }

    #[test]
    fn test_market_open_timestamp_maps_to_exchange_date() {
        // 2024-01-02 14:30 UTC is the New York open that day
        let ts = 1_704_205_800;
        let tz: Tz = "America/New_York".parse().unwrap();
        assert_eq!(
            timestamp_to_local_date(ts, tz),
            NaiveDate::from_ymd_opt(2024, 1, 2)
        );

        // 03:00 UTC is still the previous evening in New York
        let late = date_to_timestamp(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()) + 3 * 3600;
        assert_eq!(
            timestamp_to_local_date(late, tz),
            NaiveDate::from_ymd_opt(2024, 1, 2)
        );
    }
}
