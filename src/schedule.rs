//! Construction of session schedules.
//! A schedule is the ordered list of sessions of a calendar for an inclusive
//! date range, with open and close given as absolute instants.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::definition::CalendarDefinition;
use crate::error::CalendarError;
use crate::localize::localize;

/// Upper bound of a plausible session length. Anything longer is a defect.
pub const MAX_SESSION_HOURS: i64 = 22;

/// A single trading session
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub date: NaiveDate,
    pub open: DateTime<Utc>,
    pub close: DateTime<Utc>,
}

impl Session {
    pub fn duration(&self) -> Duration {
        self.close - self.open
    }

    pub fn local_open(&self, tz: Tz) -> DateTime<Tz> {
        self.open.with_timezone(&tz)
    }

    pub fn local_close(&self, tz: Tz) -> DateTime<Tz> {
        self.close.with_timezone(&tz)
    }

    /// Check whether `instant` falls into `[open, close)`
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.open && instant < self.close
    }
}

/// Immutable, ordered table of sessions for the inclusive range `[start, end]`
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    calendar: String,
    start: NaiveDate,
    end: NaiveDate,
    sessions: Vec<Session>,
    early_closes: BTreeSet<NaiveDate>,
}

impl Schedule {
    pub fn calendar(&self) -> &str {
        &self.calendar
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Sessions with a shortened close
    pub fn early_closes(&self) -> &BTreeSet<NaiveDate> {
        &self.early_closes
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Position of the session at `date`, or the position it would be inserted at
    pub(crate) fn search(&self, date: NaiveDate) -> Result<usize, usize> {
        self.sessions.binary_search_by_key(&date, |session| session.date)
    }
}

/// Build the schedule of `definition` for the inclusive range `[start, end]`
pub fn build_schedule(
    definition: &CalendarDefinition,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Schedule, CalendarError> {
    if start > end {
        return Err(CalendarError::InvalidRange { start, end });
    }
    debug!(
        "building schedule for calendar '{}' from {} to {}",
        definition.name(),
        start,
        end
    );
    let holidays = definition.holidays().holidays_in(start.year(), end.year());
    let early_closes = definition
        .early_closes()
        .early_closes_in(start.year(), end.year());

    let tz = definition.tz();
    let mut sessions = Vec::new();
    let mut session_early_closes = BTreeSet::new();
    for date in start.iter_days().take_while(|date| *date <= end) {
        if !definition.is_trading_weekday(date.weekday()) {
            continue;
        }
        if holidays.contains(&date) {
            trace!("{} is a holiday", date);
            continue;
        }
        let close_time = match early_closes.get(&date) {
            Some(close) => {
                session_early_closes.insert(date);
                *close
            }
            None => definition.close(),
        };
        sessions.push(Session {
            date,
            open: localize(tz, date, definition.open())?,
            close: localize(tz, date, close_time)?,
        });
    }
    check_sessions(&sessions)?;
    info!(
        "built {} sessions ({} early closes) for calendar '{}' from {} to {}",
        sessions.len(),
        session_early_closes.len(),
        definition.name(),
        start,
        end
    );
    Ok(Schedule {
        calendar: definition.name().to_string(),
        start,
        end,
        sessions,
        early_closes: session_early_closes,
    })
}

/// Verify session durations and strict ordering
fn check_sessions(sessions: &[Session]) -> Result<(), CalendarError> {
    let max_length = Duration::hours(MAX_SESSION_HOURS);
    for session in sessions {
        if session.close <= session.open {
            return Err(CalendarError::ScheduleDefect(format!(
                "session {} closes at {} before it opens at {}",
                session.date, session.close, session.open
            )));
        }
        if session.duration() > max_length {
            return Err(CalendarError::ScheduleDefect(format!(
                "session {} lasts {} minutes, more than {} hours",
                session.date,
                session.duration().num_minutes(),
                MAX_SESSION_HOURS
            )));
        }
    }
    for pair in sessions.windows(2) {
        if pair[0].date >= pair[1].date || pair[0].close > pair[1].open {
            return Err(CalendarError::ScheduleDefect(format!(
                "sessions {} and {} are not strictly ordered",
                pair[0].date, pair[1].date
            )));
        }
    }
    Ok(())
}

/// Key of a cached schedule
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScheduleKey {
    pub calendar: String,
    /// Identity of the calendar definition the schedule was built from
    pub identity: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ScheduleKey {
    pub fn new(definition: &CalendarDefinition, start: NaiveDate, end: NaiveDate) -> Self {
        ScheduleKey {
            calendar: definition.name().to_string(),
            identity: definition.identity().to_string(),
            start,
            end,
        }
    }
}

/// Thread safe cache of built schedules, keyed by calendar identity and range.
/// Built schedules are immutable and shared via `Arc`. Since entries are only
/// inserted or removed as a whole, a lock poisoned by a panicking thread still
/// guards a consistent map and is recovered.
#[derive(Debug, Default)]
pub struct ScheduleCache {
    schedules: RwLock<BTreeMap<ScheduleKey, Arc<Schedule>>>,
}

impl ScheduleCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<ScheduleKey, Arc<Schedule>>> {
        self.schedules.read().unwrap_or_else(|err| {
            warn!("recovering poisoned schedule cache");
            err.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<ScheduleKey, Arc<Schedule>>> {
        self.schedules.write().unwrap_or_else(|err| {
            warn!("recovering poisoned schedule cache");
            err.into_inner()
        })
    }

    /// Get a cached schedule built from `definition`
    pub fn get(
        &self,
        definition: &CalendarDefinition,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Option<Arc<Schedule>> {
        self.read().get(&ScheduleKey::new(definition, start, end)).cloned()
    }

    /// Return the cached schedule for the given range or build and store it
    pub fn get_or_build(
        &self,
        definition: &CalendarDefinition,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Arc<Schedule>, CalendarError> {
        if let Some(schedule) = self.get(definition, start, end) {
            trace!(
                "reusing cached schedule for calendar '{}' from {} to {}",
                definition.name(),
                start,
                end
            );
            return Ok(schedule);
        }
        let schedule = Arc::new(build_schedule(definition, start, end)?);
        // another thread may have built the same range meanwhile
        let cached = self
            .write()
            .entry(ScheduleKey::new(definition, start, end))
            .or_insert(schedule)
            .clone();
        Ok(cached)
    }

    /// Drop a single schedule
    pub fn remove(&self, definition: &CalendarDefinition, start: NaiveDate, end: NaiveDate) {
        self.write().remove(&ScheduleKey::new(definition, start, end));
    }

    /// Drop all schedules of calendars named `calendar`
    pub fn invalidate(&self, calendar: &str) {
        self.write().retain(|key, _| key.calendar != calendar);
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
