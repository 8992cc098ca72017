//! Conversion of local wall clock times to absolute time.
//!
//! The offset is always looked up for the very local date and time to be
//! converted. Times that are ambiguous or do not exist because of a daylight
//! saving transition are resolved as follows:
//!
//! * ambiguous (clocks fall back, the hour is repeated): the earlier instant,
//!   i.e. the local time is read with the offset in force before the transition;
//! * non-existent (clocks spring forward, the hour is skipped): the local time is
//!   read with the offset in force before the transition, e.g. 02:30 on the
//!   spring forward day in New York is read as 02:30 EST = 07:30 UTC.

use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;
use log::debug;

use crate::error::CalendarError;

/// Maximum length of a gap in local time searched for before giving up.
/// Real world transitions skip at most a day (e.g. Samoa end of 2011).
const MAX_GAP_HOURS: i64 = 25;

/// Convert a local date and time in time zone `tz` to UTC
pub fn localize(tz: Tz, date: NaiveDate, time: NaiveTime) -> Result<DateTime<Utc>, CalendarError> {
    let local = date.and_time(time);
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earlier, later) => {
            let (earlier, later) = if earlier <= later {
                (earlier, later)
            } else {
                (later, earlier)
            };
            debug!(
                "ambiguous local time {} in {}, using {} rather than {}",
                local,
                tz.name(),
                earlier,
                later
            );
            Ok(earlier.with_timezone(&Utc))
        }
        LocalResult::None => {
            let offset = offset_before_gap(tz, local)?;
            debug!(
                "local time {} does not exist in {}, using offset {} from before the transition",
                local,
                tz.name(),
                offset
            );
            Ok(Utc.from_utc_datetime(&(local - Duration::seconds(offset as i64))))
        }
    }
}

/// Offset in seconds (local minus UTC) in force just before a local time gap
fn offset_before_gap(tz: Tz, local: NaiveDateTime) -> Result<i32, CalendarError> {
    for hours in 1..=MAX_GAP_HOURS {
        let earlier = local - Duration::hours(hours);
        match tz.offset_from_local_datetime(&earlier) {
            LocalResult::Single(offset) => return Ok(offset.fix().local_minus_utc()),
            LocalResult::Ambiguous(first, _) => return Ok(first.fix().local_minus_utc()),
            LocalResult::None => continue,
        }
    }
    Err(CalendarError::ScheduleDefect(format!(
        "no valid offset found for local time {} in {}",
        local,
        tz.name()
    )))
}
