//! Clock helpers shared by the archive stamp and the build-info record.

use time::OffsetDateTime;

/// Current wall-clock time in UTC.
pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// `YYYY-MM-DD HH:MM:SS`, the format stamped into archive metadata.
pub fn build_date(at: OffsetDateTime) -> String {
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        at.year(),
        at.month() as u8,
        at.day(),
        at.hour(),
        at.minute(),
        at.second()
    )
}

pub fn unix_seconds(at: OffsetDateTime) -> i64 {
    at.unix_timestamp()
}
