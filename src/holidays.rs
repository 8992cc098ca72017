//! Holiday rule sets.
//! A holiday rule set is a list of named recurring rules plus a list of
//! one-off closures (disasters, days of mourning) that are used verbatim.

use chrono::{Datelike, NaiveDate};
use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::rules::DateRule;

/// A recurring holiday
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct HolidayRule {
    pub name: String,
    pub rule: DateRule,
}

/// A one-time closure outside of any recurring rule
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct AdhocHoliday {
    pub date: NaiveDate,
    pub reason: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct HolidayRules {
    #[serde(default)]
    rules: Vec<HolidayRule>,
    #[serde(default)]
    adhoc: Vec<AdhocHoliday>,
}

impl HolidayRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named recurring rule
    pub fn with_rule(mut self, name: &str, rule: DateRule) -> Self {
        self.rules.push(HolidayRule {
            name: name.to_string(),
            rule,
        });
        self
    }

    /// Add a one-time closure
    pub fn with_adhoc(mut self, date: NaiveDate, reason: &str) -> Self {
        self.adhoc.push(AdhocHoliday {
            date,
            reason: reason.to_string(),
        });
        self
    }

    pub fn rules(&self) -> &[HolidayRule] {
        &self.rules
    }

    pub fn adhoc(&self) -> &[AdhocHoliday] {
        &self.adhoc
    }

    /// All holidays in the years `first..=last`.
    /// Dates produced by several rules are recorded once.
    pub fn holidays_in(&self, first: i32, last: i32) -> BTreeSet<NaiveDate> {
        self.named_holidays_in(first, last).into_keys().collect()
    }

    /// Holidays in the years `first..=last` together with the name of the
    /// rule or the reason of the closure. If more than one rule hits the same
    /// date, the first one wins.
    pub fn named_holidays_in(&self, first: i32, last: i32) -> BTreeMap<NaiveDate, String> {
        let mut holidays = BTreeMap::new();
        for rule in &self.rules {
            for date in rule.rule.dates_in(first, last) {
                trace!("holiday '{}' on {}", rule.name, date);
                holidays.entry(date).or_insert_with(|| rule.name.clone());
            }
        }
        for closure in &self.adhoc {
            let year = closure.date.year();
            if year >= first && year <= last {
                holidays
                    .entry(closure.date)
                    .or_insert_with(|| closure.reason.clone());
            }
        }
        holidays
    }
}
