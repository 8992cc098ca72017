//! Date rules shared by holiday and early close rule sets.
//! Each rule maps a year to at most one calendar date. The set of rule
//! kinds is closed, rules are evaluated by a single dispatch in
//! [`DateRule::date_in_year`].

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

extern crate computus;

/// Specifies the nth week of a month
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NthWeekday {
    #[serde(rename = "first")]
    First,
    #[serde(rename = "second")]
    Second,
    #[serde(rename = "third")]
    Third,
    #[serde(rename = "fourth")]
    Fourth,
    #[serde(rename = "last")]
    Last,
}

/// Substitution applied when a fixed date falls on a weekend
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observance {
    /// The date is used as is, even if it falls on a weekend
    #[serde(rename = "none")]
    None,
    /// Sunday is moved to Monday, Saturday is kept
    #[serde(rename = "sunday to monday")]
    SundayToMonday,
    /// Saturday is moved to the preceding Friday, Sunday to the following Monday
    #[serde(rename = "nearest weekday")]
    NearestWeekday,
    /// Saturday and Sunday are both moved to the following Monday
    #[serde(rename = "next weekday")]
    NextWeekday,
    /// Saturday is moved to Monday, Sunday to Tuesday. Used for pairs of
    /// consecutive holidays like Christmas and Boxing Day.
    #[serde(rename = "monday or tuesday")]
    MondayOrTuesday,
}

impl Observance {
    pub fn apply(&self, date: NaiveDate) -> NaiveDate {
        let shift = match (self, date.weekday()) {
            (Observance::None, _) => 0,
            (Observance::SundayToMonday, Weekday::Sun) => 1,
            (Observance::NearestWeekday, Weekday::Sat) => -1,
            (Observance::NearestWeekday, Weekday::Sun) => 1,
            (Observance::NextWeekday, Weekday::Sat) => 2,
            (Observance::NextWeekday, Weekday::Sun) => 1,
            (Observance::MondayOrTuesday, Weekday::Sat) => 2,
            (Observance::MondayOrTuesday, Weekday::Sun) => 2,
            _ => 0,
        };
        date + Duration::days(shift)
    }
}

/// Rule producing at most one date per year
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum DateRule {
    /// Same month and day every year, optionally substituted if it falls on a weekend.
    /// `first` and `last` are the first and last year the rule applies.
    YearlyDay {
        month: u32,
        day: u32,
        observance: Observance,
        first: Option<i32>,
        last: Option<i32>,
    },
    /// The nth given weekday of a month, e.g. the third Monday of January
    MonthWeekday {
        month: u32,
        weekday: Weekday,
        nth: NthWeekday,
        first: Option<i32>,
        last: Option<i32>,
    },
    /// A day defined relative to (western) Easter Sunday
    EasterOffset {
        offset: i64,
        first: Option<i32>,
        last: Option<i32>,
    },
    /// Another rule shifted by a fixed number of days
    Offset { base: Box<DateRule>, days: i64 },
    /// A single date valid only once in time
    SingularDay(NaiveDate),
}

impl DateRule {
    /// Fixed date used as is every year
    pub fn fixed(month: u32, day: u32) -> DateRule {
        DateRule::YearlyDay {
            month,
            day,
            observance: Observance::None,
            first: None,
            last: None,
        }
    }

    /// Fixed date substituted according to `observance` if it falls on a weekend
    pub fn observed(month: u32, day: u32, observance: Observance) -> DateRule {
        DateRule::YearlyDay {
            month,
            day,
            observance,
            first: None,
            last: None,
        }
    }

    pub fn nth_weekday(month: u32, weekday: Weekday, nth: NthWeekday) -> DateRule {
        DateRule::MonthWeekday {
            month,
            weekday,
            nth,
            first: None,
            last: None,
        }
    }

    pub fn easter_offset(offset: i64) -> DateRule {
        DateRule::EasterOffset {
            offset,
            first: None,
            last: None,
        }
    }

    pub fn shifted(self, days: i64) -> DateRule {
        DateRule::Offset {
            base: Box::new(self),
            days,
        }
    }

    /// Restrict a recurring rule to the years `first..=last`.
    /// Singular days are returned unchanged.
    pub fn between(self, from: Option<i32>, to: Option<i32>) -> DateRule {
        match self {
            DateRule::YearlyDay {
                month,
                day,
                observance,
                ..
            } => DateRule::YearlyDay {
                month,
                day,
                observance,
                first: from,
                last: to,
            },
            DateRule::MonthWeekday {
                month, weekday, nth, ..
            } => DateRule::MonthWeekday {
                month,
                weekday,
                nth,
                first: from,
                last: to,
            },
            DateRule::EasterOffset { offset, .. } => DateRule::EasterOffset {
                offset,
                first: from,
                last: to,
            },
            DateRule::Offset { base, days } => DateRule::Offset {
                base: Box::new(base.between(from, to)),
                days,
            },
            rule @ DateRule::SingularDay(_) => rule,
        }
    }

    /// Evaluate the rule for the given year. Returns `None` if the rule is not
    /// active in this year or does not produce a valid date.
    /// The returned date may lie in an adjacent year if a substitution crosses
    /// the year boundary.
    pub fn date_in_year(&self, year: i32) -> Option<NaiveDate> {
        match self {
            DateRule::YearlyDay {
                month,
                day,
                observance,
                first,
                last,
            } => {
                if !is_active(year, first, last) {
                    return None;
                }
                NaiveDate::from_ymd_opt(year, *month, *day).map(|date| observance.apply(date))
            }
            DateRule::MonthWeekday {
                month,
                weekday,
                nth,
                first,
                last,
            } => {
                if !is_active(year, first, last) {
                    return None;
                }
                nth_weekday_of_month(year, *month, *weekday, *nth)
            }
            DateRule::EasterOffset {
                offset,
                first,
                last,
            } => {
                if !is_active(year, first, last) {
                    return None;
                }
                easter_sunday(year)
                    .and_then(|easter| easter.checked_add_signed(Duration::days(*offset)))
            }
            DateRule::Offset { base, days } => base
                .date_in_year(year)
                .and_then(|date| date.checked_add_signed(Duration::days(*days))),
            DateRule::SingularDay(date) => {
                if date.year() == year {
                    Some(*date)
                } else {
                    None
                }
            }
        }
    }

    /// All dates produced by this rule that fall into the years `first..=last`.
    /// Neighbouring years are evaluated as well, such that substitutions crossing
    /// the year boundary end up in the year they actually fall into.
    pub fn dates_in(&self, first: i32, last: i32) -> Vec<NaiveDate> {
        if first > last {
            return Vec::new();
        }
        (first - 1..=last + 1)
            .filter_map(|year| self.date_in_year(year))
            .filter(|date| date.year() >= first && date.year() <= last)
            .collect()
    }
}

fn is_active(year: i32, first: &Option<i32>, last: &Option<i32>) -> bool {
    first.map_or(true, |first| year >= first) && last.map_or(true, |last| year <= last)
}

/// Western Easter Sunday of the given year
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let easter = computus::gregorian(year).ok()?;
    NaiveDate::from_ymd_opt(easter.year, easter.month, easter.day)
}

/// Returns the last day of a given month
pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

/// Calculate the nth (or last) weekday of a month
pub fn nth_weekday_of_month(
    year: i32,
    month: u32,
    weekday: Weekday,
    nth: NthWeekday,
) -> Option<NaiveDate> {
    let n = match nth {
        NthWeekday::First => 1,
        NthWeekday::Second => 2,
        NthWeekday::Third => 3,
        NthWeekday::Fourth => 4,
        NthWeekday::Last => {
            let last = last_day_of_month(year, month)?;
            let back = (7 + last.weekday().num_days_from_monday()
                - weekday.num_days_from_monday())
                % 7;
            return Some(last - Duration::days(back as i64));
        }
    };
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
}
