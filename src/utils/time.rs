use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone};

/// Format of every start/end/comment timestamp stored in the ledger.
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y, %H:%M:%S";

/// Format used for the report generation date.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

pub const TIME_OF_DAY_FORMAT: &str = "%H:%M:%S";

/// This is the standard way of converting a moment into a ledger timestamp.
pub fn format_timestamp<Tz: TimeZone>(moment: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    moment.format(TIMESTAMP_FORMAT).to_string()
}

/// Reverse of [format_timestamp]. Imported ledgers may carry strings in other formats, those
/// return [None].
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Renders whole seconds as `HH:MM:SS`. Hours are not wrapped at 24.
pub fn format_hms(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60
    )
}

/// Converts a wall-clock delta into fractional seconds with millisecond resolution. Negative
/// deltas (clock stepped backwards) count as zero.
pub fn duration_seconds(duration: Duration) -> f64 {
    duration.num_milliseconds().max(0) as f64 / 1000.
}
