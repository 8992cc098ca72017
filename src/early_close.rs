//! Early close rule sets.
//! Same rule vocabulary as holidays, but each rule carries the local close
//! time of the shortened session.

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::rules::DateRule;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct EarlyCloseRule {
    pub name: String,
    pub rule: DateRule,
    /// Local close time on the early close date
    pub close: NaiveTime,
}

/// A one-time early close
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct AdhocEarlyClose {
    pub date: NaiveDate,
    pub close: NaiveTime,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct EarlyCloseRules {
    #[serde(default)]
    rules: Vec<EarlyCloseRule>,
    #[serde(default)]
    adhoc: Vec<AdhocEarlyClose>,
}

impl EarlyCloseRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, name: &str, rule: DateRule, close: NaiveTime) -> Self {
        self.rules.push(EarlyCloseRule {
            name: name.to_string(),
            rule,
            close,
        });
        self
    }

    pub fn with_adhoc(mut self, date: NaiveDate, close: NaiveTime) -> Self {
        self.adhoc.push(AdhocEarlyClose { date, close });
        self
    }

    pub fn rules(&self) -> &[EarlyCloseRule] {
        &self.rules
    }

    pub fn adhoc(&self) -> &[AdhocEarlyClose] {
        &self.adhoc
    }

    /// All close times used by this rule set
    pub fn close_times(&self) -> Vec<NaiveTime> {
        self.rules
            .iter()
            .map(|rule| rule.close)
            .chain(self.adhoc.iter().map(|adhoc| adhoc.close))
            .collect()
    }

    /// Early closes in the years `first..=last`, mapped to their local close time.
    /// If several rules hit the same date, the earliest close time wins.
    /// Whether the date is a session at all is not checked here, the schedule
    /// builder drops early closes on holidays and non-trading weekdays.
    pub fn early_closes_in(&self, first: i32, last: i32) -> BTreeMap<NaiveDate, NaiveTime> {
        let mut closes: BTreeMap<NaiveDate, NaiveTime> = BTreeMap::new();
        let adhoc = self
            .adhoc
            .iter()
            .filter(|adhoc| adhoc.date.year() >= first && adhoc.date.year() <= last)
            .map(|adhoc| (adhoc.date, adhoc.close));
        let recurring = self.rules.iter().flat_map(|rule| {
            rule.rule
                .dates_in(first, last)
                .into_iter()
                .map(move |date| (date, rule.close))
        });
        for (date, close) in recurring.chain(adhoc) {
            closes
                .entry(date)
                .and_modify(|existing| *existing = (*existing).min(close))
                .or_insert(close);
        }
        closes
    }
}
