use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while configuring, building or querying a trading calendar
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalendarError {
    /// Malformed calendar definition, fatal at construction
    #[error("invalid calendar configuration: {0}")]
    Configuration(String),
    /// An internal invariant was violated while building a schedule.
    /// This points to a broken rule table or time zone conversion.
    #[error("schedule defect: {0}")]
    ScheduleDefect(String),
    #[error("{0} is not a trading session")]
    NotASession(NaiveDate),
    #[error("{date} is outside of the built schedule range [{start}, {end}]")]
    OutOfRange {
        date: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
    },
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("calendar schedule has not been built yet")]
    NotBuilt,
    #[error("unknown calendar '{0}'")]
    UnknownCalendar(String),
}
