//! Rule tables of supported exchanges.
//! All markets share the same schedule builder and query engine and differ
//! only by the definitions returned here.

use chrono::{NaiveDate, NaiveTime, Weekday};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::definition::{CalendarDefinition, WEEKDAYS};
use crate::early_close::EarlyCloseRules;
use crate::error::CalendarError;
use crate::holidays::HolidayRules;
use crate::rules::{DateRule, NthWeekday, Observance};

const MARKETS: [&str; 3] = ["ICE", "LSE", "NYSE"];

/// Names of all supported markets
pub fn names() -> Vec<&'static str> {
    MARKETS.to_vec()
}

/// Calendar definition of a supported market
pub fn calendar_definition(name: &str) -> Result<CalendarDefinition, CalendarError> {
    match name {
        "ICE" => ice(),
        "LSE" => lse(),
        "NYSE" => nyse(),
        _ => Err(CalendarError::UnknownCalendar(name.to_string())),
    }
}

/// Definitions of all supported markets, keyed by name
pub fn generate_calendars() -> Result<BTreeMap<String, CalendarDefinition>, CalendarError> {
    let mut calendars = BTreeMap::new();
    for name in MARKETS.iter() {
        calendars.insert(name.to_string(), calendar_definition(name)?);
    }
    Ok(calendars)
}

fn time(hour: u32, min: u32) -> Result<NaiveTime, CalendarError> {
    NaiveTime::from_hms_opt(hour, min, 0)
        .ok_or_else(|| CalendarError::Configuration(format!("invalid time {}:{}", hour, min)))
}

fn date(year: i32, month: u32, day: u32) -> Result<NaiveDate, CalendarError> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        CalendarError::Configuration(format!("invalid date {}-{}-{}", year, month, day))
    })
}

fn mlk_day() -> DateRule {
    DateRule::nth_weekday(1, Weekday::Mon, NthWeekday::Third).between(Some(1998), None)
}

fn presidents_day() -> DateRule {
    DateRule::nth_weekday(2, Weekday::Mon, NthWeekday::Third).between(Some(1971), None)
}

fn memorial_day() -> DateRule {
    DateRule::nth_weekday(5, Weekday::Mon, NthWeekday::Last).between(Some(1971), None)
}

fn independence_day() -> DateRule {
    DateRule::observed(7, 4, Observance::NearestWeekday)
}

fn labor_day() -> DateRule {
    DateRule::nth_weekday(9, Weekday::Mon, NthWeekday::First)
}

fn thanksgiving() -> DateRule {
    DateRule::nth_weekday(11, Weekday::Thu, NthWeekday::Fourth)
}

/// ICE Futures US
fn ice() -> Result<CalendarDefinition, CalendarError> {
    let holidays = HolidayRules::new()
        .with_rule(
            "New Year's Day",
            DateRule::observed(1, 1, Observance::SundayToMonday),
        )
        .with_rule("Good Friday", DateRule::easter_offset(-2))
        .with_rule("Christmas", DateRule::observed(12, 25, Observance::NearestWeekday))
        // ICE reopened on the second day of the closure
        .with_adhoc(date(2012, 10, 29)?, "Hurricane Sandy");

    let one_pm = time(13, 0)?;
    let early_closes = EarlyCloseRules::new()
        .with_rule("Martin Luther King Jr. Day", mlk_day(), one_pm)
        .with_rule("Presidents' Day", presidents_day(), one_pm)
        .with_rule("Memorial Day", memorial_day(), one_pm)
        .with_rule("Independence Day", independence_day(), one_pm)
        .with_rule("Labor Day", labor_day(), one_pm)
        .with_rule("Thanksgiving", thanksgiving(), one_pm);

    CalendarDefinition::new(
        "ICE",
        chrono_tz::America::New_York,
        &WEEKDAYS,
        time(8, 0)?,
        time(18, 0)?,
        Arc::new(holidays),
        Arc::new(early_closes),
    )
}

/// New York Stock Exchange
fn nyse() -> Result<CalendarDefinition, CalendarError> {
    let mut holidays = HolidayRules::new()
        .with_rule(
            "New Year's Day",
            DateRule::observed(1, 1, Observance::SundayToMonday),
        )
        .with_rule("Martin Luther King Jr. Day", mlk_day())
        .with_rule("Presidents' Day", presidents_day())
        .with_rule("Good Friday", DateRule::easter_offset(-2))
        .with_rule("Memorial Day", memorial_day())
        .with_rule(
            "Juneteenth",
            DateRule::observed(6, 19, Observance::NearestWeekday).between(Some(2022), None),
        )
        .with_rule("Independence Day", independence_day())
        .with_rule("Labor Day", labor_day())
        .with_rule("Thanksgiving", thanksgiving())
        .with_rule("Christmas", DateRule::observed(12, 25, Observance::NearestWeekday));
    for day in 11..=14 {
        holidays = holidays.with_adhoc(date(2001, 9, day)?, "September 11 attacks");
    }
    let holidays = holidays
        .with_adhoc(date(2004, 6, 11)?, "National Day of Mourning for Ronald Reagan")
        .with_adhoc(date(2007, 1, 2)?, "National Day of Mourning for Gerald Ford")
        .with_adhoc(date(2012, 10, 29)?, "Hurricane Sandy")
        .with_adhoc(date(2012, 10, 30)?, "Hurricane Sandy")
        .with_adhoc(date(2018, 12, 5)?, "National Day of Mourning for George H. W. Bush")
        .with_adhoc(date(2025, 1, 9)?, "National Day of Mourning for Jimmy Carter");

    let one_pm = time(13, 0)?;
    let early_closes = EarlyCloseRules::new()
        .with_rule(
            "Day before Independence Day",
            DateRule::fixed(7, 3).between(Some(2013), None),
            one_pm,
        )
        .with_rule(
            "Day after Thanksgiving",
            thanksgiving().shifted(1).between(Some(1993), None),
            one_pm,
        )
        .with_rule(
            "Christmas Eve",
            DateRule::fixed(12, 24).between(Some(1999), None),
            one_pm,
        );

    CalendarDefinition::new(
        "NYSE",
        chrono_tz::America::New_York,
        &WEEKDAYS,
        time(9, 30)?,
        time(16, 0)?,
        Arc::new(holidays),
        Arc::new(early_closes),
    )
}

/// London Stock Exchange
fn lse() -> Result<CalendarDefinition, CalendarError> {
    let early_may = |first, last| {
        DateRule::nth_weekday(5, Weekday::Mon, NthWeekday::First).between(first, last)
    };
    let spring = |first, last| {
        DateRule::nth_weekday(5, Weekday::Mon, NthWeekday::Last).between(first, last)
    };
    let holidays = HolidayRules::new()
        .with_rule("New Year's Day", DateRule::observed(1, 1, Observance::NextWeekday))
        .with_rule("Good Friday", DateRule::easter_offset(-2))
        .with_rule("Easter Monday", DateRule::easter_offset(1))
        // moved two times in history to the 8th of May
        .with_rule("Early May Bank Holiday", early_may(Some(1978), Some(1994)))
        .with_rule("Early May Bank Holiday", early_may(Some(1996), Some(2019)))
        .with_rule("Early May Bank Holiday", early_may(Some(2021), None))
        .with_adhoc(date(1995, 5, 8)?, "VE Day 50th anniversary")
        .with_adhoc(date(2020, 5, 8)?, "VE Day 75th anniversary")
        // moved for the jubilees
        .with_rule("Spring Bank Holiday", spring(None, Some(2001)))
        .with_rule("Spring Bank Holiday", spring(Some(2003), Some(2011)))
        .with_rule("Spring Bank Holiday", spring(Some(2013), Some(2021)))
        .with_rule("Spring Bank Holiday", spring(Some(2023), None))
        .with_adhoc(date(2002, 6, 4)?, "Spring Bank Holiday")
        .with_adhoc(date(2012, 6, 4)?, "Spring Bank Holiday")
        .with_adhoc(date(2022, 6, 2)?, "Spring Bank Holiday")
        .with_rule(
            "Summer Bank Holiday",
            DateRule::nth_weekday(8, Weekday::Mon, NthWeekday::Last),
        )
        .with_rule("Christmas", DateRule::observed(12, 25, Observance::MondayOrTuesday))
        .with_rule("Boxing Day", DateRule::observed(12, 26, Observance::MondayOrTuesday))
        .with_adhoc(date(1999, 12, 31)?, "Millennium celebrations")
        .with_adhoc(date(2002, 6, 3)?, "Golden Jubilee")
        .with_adhoc(date(2011, 4, 29)?, "Royal Wedding")
        .with_adhoc(date(2012, 6, 5)?, "Diamond Jubilee")
        .with_adhoc(date(2022, 6, 3)?, "Platinum Jubilee")
        .with_adhoc(date(2022, 9, 19)?, "State Funeral of Queen Elizabeth II")
        .with_adhoc(date(2023, 5, 8)?, "Coronation of King Charles III");

    let half_past_noon = time(12, 30)?;
    let early_closes = EarlyCloseRules::new()
        .with_rule("Christmas Eve", DateRule::fixed(12, 24), half_past_noon)
        .with_rule("New Year's Eve", DateRule::fixed(12, 31), half_past_noon);

    CalendarDefinition::new(
        "LSE",
        chrono_tz::Europe::London,
        &WEEKDAYS,
        time(8, 0)?,
        time(16, 30)?,
        Arc::new(holidays),
        Arc::new(early_closes),
    )
}
