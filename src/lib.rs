//! # exchange-calendar
//!
//! Trading calendars of exchanges. Given the weekly trading days, holiday
//! rules, early close rules and standard local open and close times of a
//! market, the library computes the trading sessions of any date range and
//! the exact open and close instant of each session.
//!
//! Holidays and early closes are defined by a small, closed set of rules
//! (fixed dates with optional weekend substitution, nth weekday of a month,
//! days relative to Easter, one-off closures). A [`CalendarDefinition`] ties
//! these rules to a time zone and trading hours. Schedules are built for an
//! inclusive date range and queried through a [`TradingCalendar`].
//!
//! ```
//! use chrono::NaiveDate;
//! use exchange_calendar::{markets, TradingCalendar};
//!
//! let mut ice = TradingCalendar::new(markets::calendar_definition("ICE").unwrap());
//! ice.build(
//!     NaiveDate::from_ymd_opt(2016, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2016, 12, 31).unwrap(),
//! )
//! .unwrap();
//! // Good Friday
//! assert_eq!(ice.is_session(NaiveDate::from_ymd_opt(2016, 3, 25).unwrap()), Ok(false));
//! ```

pub mod definition;
pub mod early_close;
pub mod error;
pub mod holidays;
pub mod localize;
pub mod markets;
pub mod rules;
pub mod schedule;
pub mod trading_calendar;

pub use definition::{CalendarConfig, CalendarDefinition, WEEKDAYS};
pub use early_close::{AdhocEarlyClose, EarlyCloseRule, EarlyCloseRules};
pub use error::CalendarError;
pub use holidays::{AdhocHoliday, HolidayRule, HolidayRules};
pub use localize::localize;
pub use rules::{DateRule, NthWeekday, Observance};
pub use schedule::{build_schedule, Schedule, ScheduleCache, ScheduleKey, Session, MAX_SESSION_HOURS};
pub use trading_calendar::TradingCalendar;
