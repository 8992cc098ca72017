//! Query engine on top of a built schedule.
//!
//! A [`TradingCalendar`] is either unbuilt (only the configuration can be
//! accessed) or built for exactly one inclusive date range. Building again with
//! another range replaces the schedule as a whole, there is no way to extend
//! an existing schedule. Queries never extend the range silently, dates outside
//! of the built range are reported as [`CalendarError::OutOfRange`].

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use log::debug;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::definition::CalendarDefinition;
use crate::error::CalendarError;
use crate::schedule::{build_schedule, Schedule, ScheduleCache, Session};

#[derive(Debug, Clone)]
pub struct TradingCalendar {
    definition: Arc<CalendarDefinition>,
    cache: Option<Arc<ScheduleCache>>,
    schedule: Option<Arc<Schedule>>,
}

impl TradingCalendar {
    /// New unbuilt calendar
    pub fn new(definition: CalendarDefinition) -> Self {
        Self::from_shared(Arc::new(definition), None)
    }

    /// New unbuilt calendar sharing built schedules with other calendars via `cache`
    pub fn with_cache(definition: Arc<CalendarDefinition>, cache: Arc<ScheduleCache>) -> Self {
        Self::from_shared(definition, Some(cache))
    }

    fn from_shared(definition: Arc<CalendarDefinition>, cache: Option<Arc<ScheduleCache>>) -> Self {
        TradingCalendar {
            definition,
            cache,
            schedule: None,
        }
    }

    /// Build the schedule for the inclusive range `[start, end]`.
    /// Building the range that is already built is a no-op, building another
    /// range discards the current schedule.
    pub fn build(&mut self, start: NaiveDate, end: NaiveDate) -> Result<(), CalendarError> {
        if self.bounds() == Some((start, end)) {
            return Ok(());
        }
        let schedule = match &self.cache {
            Some(cache) => cache.get_or_build(&self.definition, start, end)?,
            None => Arc::new(build_schedule(&self.definition, start, end)?),
        };
        if let (Some(cache), Some((old_start, old_end))) = (&self.cache, self.bounds()) {
            debug!(
                "discarding schedule of '{}' from {} to {}",
                self.name(),
                old_start,
                old_end
            );
            cache.remove(&self.definition, old_start, old_end);
        }
        self.schedule = Some(schedule);
        Ok(())
    }

    pub fn is_built(&self) -> bool {
        self.schedule.is_some()
    }

    pub fn definition(&self) -> &CalendarDefinition {
        &self.definition
    }

    pub fn name(&self) -> &str {
        self.definition.name()
    }

    pub fn tz(&self) -> Tz {
        self.definition.tz()
    }

    /// Bounds of the built range, if any
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.schedule
            .as_ref()
            .map(|schedule| (schedule.start(), schedule.end()))
    }

    pub fn schedule(&self) -> Result<&Schedule, CalendarError> {
        self.schedule.as_deref().ok_or(CalendarError::NotBuilt)
    }

    /// Check if `date` is a trading session
    pub fn is_session(&self, date: NaiveDate) -> Result<bool, CalendarError> {
        let schedule = self.schedule_for(date)?;
        Ok(schedule.search(date).is_ok())
    }

    pub fn session(&self, date: NaiveDate) -> Result<&Session, CalendarError> {
        let schedule = self.schedule_for(date)?;
        match schedule.search(date) {
            Ok(idx) => Ok(&schedule.sessions()[idx]),
            Err(_) => Err(CalendarError::NotASession(date)),
        }
    }

    /// Open and close instant of the session at `date`
    pub fn session_open_close(
        &self,
        date: NaiveDate,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), CalendarError> {
        let session = self.session(date)?;
        Ok((session.open, session.close))
    }

    /// Trading minutes of the session at `date`
    pub fn minutes_for_session(&self, date: NaiveDate) -> Result<i64, CalendarError> {
        Ok(self.session(date)?.duration().num_minutes())
    }

    /// The first session strictly after `date`
    pub fn next_session(&self, date: NaiveDate) -> Result<Session, CalendarError> {
        let schedule = self.schedule_for(date)?;
        let sessions = schedule.sessions();
        let idx = sessions.partition_point(|session| session.date <= date);
        sessions
            .get(idx)
            .copied()
            .ok_or_else(|| out_of_range(schedule, date))
    }

    /// The last session strictly before `date`
    pub fn previous_session(&self, date: NaiveDate) -> Result<Session, CalendarError> {
        let schedule = self.schedule_for(date)?;
        let sessions = schedule.sessions();
        let idx = sessions.partition_point(|session| session.date < date);
        if idx == 0 {
            return Err(out_of_range(schedule, date));
        }
        Ok(sessions[idx - 1])
    }

    /// All sessions in the inclusive range `[start, end]`, which must lie
    /// within the built range.
    pub fn sessions_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<&[Session], CalendarError> {
        if start > end {
            return Err(CalendarError::InvalidRange { start, end });
        }
        self.schedule_for(start)?;
        let schedule = self.schedule_for(end)?;
        let sessions = schedule.sessions();
        let from = sessions.partition_point(|session| session.date < start);
        let to = sessions.partition_point(|session| session.date <= end);
        Ok(&sessions[from..to])
    }

    /// Number of sessions in the inclusive range `[start, end]`
    pub fn session_count_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<usize, CalendarError> {
        Ok(self.sessions_in_range(start, end)?.len())
    }

    pub fn all_sessions(&self) -> Result<&[Session], CalendarError> {
        Ok(self.schedule()?.sessions())
    }

    /// Dates of all built sessions, e.g. as time index of a simulation period
    pub fn session_dates(&self) -> Result<Vec<NaiveDate>, CalendarError> {
        Ok(self.all_sessions()?.iter().map(|session| session.date).collect())
    }

    pub fn first_session(&self) -> Result<Session, CalendarError> {
        let schedule = self.schedule()?;
        schedule
            .sessions()
            .first()
            .copied()
            .ok_or_else(|| out_of_range(schedule, schedule.start()))
    }

    pub fn last_session(&self) -> Result<Session, CalendarError> {
        let schedule = self.schedule()?;
        schedule
            .sessions()
            .last()
            .copied()
            .ok_or_else(|| out_of_range(schedule, schedule.end()))
    }

    /// Sessions of the built range that close early
    pub fn early_closes(&self) -> Result<&BTreeSet<NaiveDate>, CalendarError> {
        Ok(self.schedule()?.early_closes())
    }

    /// Check whether the market is open at `instant`
    pub fn is_open_at(&self, instant: DateTime<Utc>) -> Result<bool, CalendarError> {
        let local_date = instant.with_timezone(&self.tz()).date_naive();
        let schedule = self.schedule_for(local_date)?;
        let sessions = schedule.sessions();
        let idx = sessions.partition_point(|session| session.open <= instant);
        Ok(idx > 0 && sessions[idx - 1].contains(instant))
    }

    fn schedule_for(&self, date: NaiveDate) -> Result<&Schedule, CalendarError> {
        let schedule = self.schedule()?;
        if schedule.contains_date(date) {
            Ok(schedule)
        } else {
            Err(out_of_range(schedule, date))
        }
    }
}

fn out_of_range(schedule: &Schedule, date: NaiveDate) -> CalendarError {
    CalendarError::OutOfRange {
        date,
        start: schedule.start(),
        end: schedule.end(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::WEEKDAYS;
    use crate::early_close::EarlyCloseRules;
    use crate::holidays::HolidayRules;
    use crate::rules::{DateRule, Observance};
    use chrono::{Duration, NaiveTime, TimeZone};

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn hm(hour: u32, min: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, min, 0).unwrap()
    }

    fn definition() -> CalendarDefinition {
        let holidays = HolidayRules::new()
            .with_rule("New Year's Day", DateRule::observed(1, 1, Observance::SundayToMonday))
            .with_rule("Christmas", DateRule::observed(12, 25, Observance::NearestWeekday));
        let early_closes =
            EarlyCloseRules::new().with_rule("New Year's Eve", DateRule::fixed(12, 31), hm(12, 0));
        CalendarDefinition::new(
            "TEST",
            chrono_tz::Europe::Berlin,
            &WEEKDAYS,
            hm(9, 0),
            hm(17, 30),
            Arc::new(holidays),
            Arc::new(early_closes),
        )
        .unwrap()
    }

    fn built(start: NaiveDate, end: NaiveDate) -> TradingCalendar {
        let mut cal = TradingCalendar::new(definition());
        cal.build(start, end).unwrap();
        cal
    }

    #[test]
    fn unbuilt_calendar() {
        let cal = TradingCalendar::new(definition());
        assert!(!cal.is_built());
        assert_eq!(cal.name(), "TEST");
        assert_eq!(cal.tz(), chrono_tz::Europe::Berlin);
        assert_eq!(cal.bounds(), None);
        assert_eq!(cal.is_session(ymd(2019, 1, 2)), Err(CalendarError::NotBuilt));
        assert_eq!(cal.all_sessions(), Err(CalendarError::NotBuilt));
        assert_eq!(cal.early_closes(), Err(CalendarError::NotBuilt));
    }

    #[test]
    fn membership_and_lookup() {
        let cal = built(ymd(2019, 1, 1), ymd(2019, 12, 31));
        assert_eq!(cal.is_session(ymd(2019, 1, 1)), Ok(false));
        assert_eq!(cal.is_session(ymd(2019, 1, 2)), Ok(true));
        assert_eq!(cal.is_session(ymd(2019, 1, 5)), Ok(false));
        assert_eq!(
            cal.session_open_close(ymd(2019, 1, 5)),
            Err(CalendarError::NotASession(ymd(2019, 1, 5)))
        );
        let (open, close) = cal.session_open_close(ymd(2019, 1, 2)).unwrap();
        assert_eq!(open, Utc.with_ymd_and_hms(2019, 1, 2, 8, 0, 0).unwrap());
        assert_eq!(close, Utc.with_ymd_and_hms(2019, 1, 2, 16, 30, 0).unwrap());
        assert_eq!(cal.minutes_for_session(ymd(2019, 1, 2)), Ok(510));
        assert_eq!(cal.minutes_for_session(ymd(2019, 12, 31)), Ok(180));
        assert_eq!(
            cal.is_session(ymd(2020, 1, 2)),
            Err(CalendarError::OutOfRange {
                date: ymd(2020, 1, 2),
                start: ymd(2019, 1, 1),
                end: ymd(2019, 12, 31)
            })
        );
    }

    #[test]
    fn navigation() {
        let cal = built(ymd(2019, 12, 20), ymd(2020, 1, 10));
        // Christmas 2019 is a Wednesday
        assert_eq!(cal.next_session(ymd(2019, 12, 24)).unwrap().date, ymd(2019, 12, 26));
        assert_eq!(cal.previous_session(ymd(2019, 12, 26)).unwrap().date, ymd(2019, 12, 24));
        // from a weekend
        assert_eq!(cal.next_session(ymd(2019, 12, 28)).unwrap().date, ymd(2019, 12, 30));
        assert_eq!(cal.previous_session(ymd(2019, 12, 29)).unwrap().date, ymd(2019, 12, 27));
        assert_eq!(cal.next_session(ymd(2019, 12, 31)).unwrap().date, ymd(2020, 1, 2));
        assert!(matches!(
            cal.next_session(ymd(2020, 1, 10)),
            Err(CalendarError::OutOfRange { .. })
        ));
        assert!(matches!(
            cal.previous_session(ymd(2019, 12, 20)),
            Err(CalendarError::OutOfRange { .. })
        ));
        assert!(matches!(
            cal.previous_session(ymd(2020, 2, 3)),
            Err(CalendarError::OutOfRange { .. })
        ));
        assert_eq!(cal.first_session().unwrap().date, ymd(2019, 12, 20));
        assert_eq!(cal.last_session().unwrap().date, ymd(2020, 1, 10));
    }

    #[test]
    fn ranges() {
        let cal = built(ymd(2019, 12, 1), ymd(2020, 1, 31));
        let sessions = cal.sessions_in_range(ymd(2019, 12, 21), ymd(2020, 1, 3)).unwrap();
        let dates: Vec<NaiveDate> = sessions.iter().map(|s| s.date).collect();
        assert_eq!(
            dates,
            vec![
                ymd(2019, 12, 23),
                ymd(2019, 12, 24),
                ymd(2019, 12, 26),
                ymd(2019, 12, 27),
                ymd(2019, 12, 30),
                ymd(2019, 12, 31),
                ymd(2020, 1, 2),
                ymd(2020, 1, 3),
            ]
        );
        assert_eq!(cal.session_count_between(ymd(2019, 12, 21), ymd(2019, 12, 22)), Ok(0));
        assert!(matches!(
            cal.sessions_in_range(ymd(2019, 11, 1), ymd(2020, 1, 3)),
            Err(CalendarError::OutOfRange { .. })
        ));
        assert!(matches!(
            cal.sessions_in_range(ymd(2019, 12, 2), ymd(2020, 2, 3)),
            Err(CalendarError::OutOfRange { .. })
        ));
        assert!(matches!(
            cal.sessions_in_range(ymd(2020, 1, 3), ymd(2019, 12, 2)),
            Err(CalendarError::InvalidRange { .. })
        ));
        assert_eq!(cal.session_dates().unwrap().len(), cal.all_sessions().unwrap().len());
        let early: Vec<NaiveDate> = cal.early_closes().unwrap().iter().cloned().collect();
        assert_eq!(early, vec![ymd(2019, 12, 31)]);
    }

    #[test]
    fn open_at_instant() {
        let cal = built(ymd(2019, 1, 1), ymd(2019, 1, 31));
        let open = Utc.with_ymd_and_hms(2019, 1, 2, 8, 0, 0).unwrap();
        assert_eq!(cal.is_open_at(open), Ok(true));
        assert_eq!(cal.is_open_at(open - Duration::seconds(1)), Ok(false));
        assert_eq!(cal.is_open_at(open + Duration::hours(8)), Ok(true));
        assert_eq!(cal.is_open_at(open + Duration::minutes(510)), Ok(false));
        // Saturday
        assert_eq!(cal.is_open_at(open + Duration::days(3)), Ok(false));
        assert!(matches!(
            cal.is_open_at(open + Duration::days(60)),
            Err(CalendarError::OutOfRange { .. })
        ));
    }

    #[test]
    fn rebuild_replaces_schedule() {
        let mut cal = built(ymd(2019, 1, 1), ymd(2019, 12, 31));
        cal.build(ymd(2020, 1, 1), ymd(2020, 12, 31)).unwrap();
        assert_eq!(cal.bounds(), Some((ymd(2020, 1, 1), ymd(2020, 12, 31))));
        assert!(matches!(
            cal.is_session(ymd(2019, 6, 3)),
            Err(CalendarError::OutOfRange { .. })
        ));
        assert_eq!(cal.is_session(ymd(2020, 6, 3)), Ok(true));
        // failed build keeps the current schedule
        assert!(cal.build(ymd(2021, 1, 1), ymd(2020, 1, 1)).is_err());
        assert_eq!(cal.bounds(), Some((ymd(2020, 1, 1), ymd(2020, 12, 31))));
    }

    #[test]
    fn shared_cache() {
        let cache = Arc::new(ScheduleCache::new());
        let definition = Arc::new(definition());
        let mut first = TradingCalendar::with_cache(definition.clone(), cache.clone());
        let mut second = TradingCalendar::with_cache(definition.clone(), cache.clone());
        first.build(ymd(2019, 1, 1), ymd(2019, 12, 31)).unwrap();
        second.build(ymd(2019, 1, 1), ymd(2019, 12, 31)).unwrap();
        assert_eq!(cache.len(), 1);
        assert!(std::ptr::eq(first.schedule().unwrap(), second.schedule().unwrap()));
        first.build(ymd(2020, 1, 1), ymd(2020, 12, 31)).unwrap();
        assert!(cache.get(&definition, ymd(2019, 1, 1), ymd(2019, 12, 31)).is_none());
        assert!(cache.get(&definition, ymd(2020, 1, 1), ymd(2020, 12, 31)).is_some());
        // second still owns its schedule
        assert_eq!(second.is_session(ymd(2019, 6, 3)), Ok(true));
    }

    #[test]
    fn shared_cache_with_same_named_calendars() {
        let x = |holidays: HolidayRules| {
            let definition = CalendarDefinition::new(
                "X",
                chrono_tz::UTC,
                &WEEKDAYS,
                hm(9, 0),
                hm(17, 0),
                Arc::new(holidays),
                Arc::new(EarlyCloseRules::new()),
            )
            .unwrap();
            Arc::new(definition)
        };
        let cache = Arc::new(ScheduleCache::new());
        let mut a = TradingCalendar::with_cache(x(HolidayRules::new()), cache.clone());
        let mut b = TradingCalendar::with_cache(
            x(HolidayRules::new().with_adhoc(ymd(2016, 1, 4), "closure")),
            cache.clone(),
        );
        a.build(ymd(2016, 1, 1), ymd(2016, 1, 31)).unwrap();
        b.build(ymd(2016, 1, 1), ymd(2016, 1, 31)).unwrap();
        assert_eq!(a.is_session(ymd(2016, 1, 4)), Ok(true));
        assert_eq!(b.is_session(ymd(2016, 1, 4)), Ok(false));
        assert_eq!(cache.len(), 2);
    }
}
