//! Reloj de la aplicación.
//!
//! Every timestamp the service stores or compares is Santiago wall-clock
//! time, persisted zone-naive. Keeping the conversion in one place means
//! repositories and derived fields never touch `Utc` directly.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use chrono_tz::America::Santiago;
use chrono_tz::Tz;

pub const ZONE: Tz = Santiago;

/// Current wall-clock time in the reporting zone, truncated to whole seconds.
pub fn now_local() -> NaiveDateTime {
    let now = Utc::now().with_timezone(&ZONE).naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

pub fn today() -> NaiveDate {
    now_local().date()
}

/// `00:00:00` of `d`, the inclusive lower bound of a date filter.
pub fn day_start(d: NaiveDate) -> NaiveDateTime {
    d.and_time(NaiveTime::MIN)
}

/// `23:59:59` of `d`, the inclusive upper bound of a date filter.
pub fn day_end(d: NaiveDate) -> NaiveDateTime {
    day_start(d) + Duration::seconds(86_399)
}

/// `YYYY-MM-DD HH:MM:SS`, the shape timestamps take on the wire.
pub fn format_datetime(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// `YYYY-MM` bucket used to partition the upload directory.
pub fn month_partition(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn day_bounds_cover_the_whole_day() {
        let d = date(2024, 1, 31);
        assert_eq!(format_datetime(day_start(d)), "2024-01-31 00:00:00");
        assert_eq!(format_datetime(day_end(d)), "2024-01-31 23:59:59");
    }

    #[test]
    fn now_local_has_no_subsecond_part() {
        assert_eq!(now_local().nanosecond(), 0);
    }

    #[test]
    fn month_partition_shape() {
        let dt = day_start(date(2024, 7, 3));
        assert_eq!(month_partition(dt), "2024-07");
    }
}
