//! Per market calendar configuration.
//! Markets differ only by the data held in a [`CalendarDefinition`], the
//! schedule builder and query engine are shared.

use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::early_close::EarlyCloseRules;
use crate::error::CalendarError;
use crate::holidays::HolidayRules;

/// Monday to Friday
pub const WEEKDAYS: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

/// Serializable form of a calendar definition, e.g. to load rule tables
/// supplied by an external layer. The time zone is given by its IANA name.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CalendarConfig {
    pub name: String,
    pub timezone: String,
    pub weekmask: Vec<Weekday>,
    pub open: NaiveTime,
    pub close: NaiveTime,
    #[serde(default)]
    pub holidays: HolidayRules,
    #[serde(default)]
    pub early_closes: EarlyCloseRules,
}

/// Immutable configuration of an exchange calendar
#[derive(Debug, Clone)]
pub struct CalendarDefinition {
    name: String,
    tz: Tz,
    weekmask: Vec<Weekday>,
    open: NaiveTime,
    close: NaiveTime,
    holidays: Arc<HolidayRules>,
    early_closes: Arc<EarlyCloseRules>,
    /// Serialized configuration, identifies the calendar beyond its name
    identity: String,
}

impl CalendarDefinition {
    /// Create a new calendar definition.
    /// Fails if the weekmask is empty, if the standard open is not before the
    /// standard close on the same local day, or if any early close time is
    /// not strictly between open and standard close.
    pub fn new(
        name: &str,
        tz: Tz,
        weekmask: &[Weekday],
        open: NaiveTime,
        close: NaiveTime,
        holidays: Arc<HolidayRules>,
        early_closes: Arc<EarlyCloseRules>,
    ) -> Result<Self, CalendarError> {
        if weekmask.is_empty() {
            return Err(CalendarError::Configuration(format!(
                "calendar '{}' has no trading weekdays",
                name
            )));
        }
        if open >= close {
            return Err(CalendarError::Configuration(format!(
                "calendar '{}': open {} must be before close {}",
                name, open, close
            )));
        }
        for early in early_closes.close_times() {
            if early <= open || early >= close {
                return Err(CalendarError::Configuration(format!(
                    "calendar '{}': early close {} must be between open {} and close {}",
                    name, early, open, close
                )));
            }
        }
        let mut weekmask = weekmask.to_vec();
        weekmask.sort_by_key(|day| day.num_days_from_monday());
        weekmask.dedup();
        let mut definition = CalendarDefinition {
            name: name.to_string(),
            tz,
            weekmask,
            open,
            close,
            holidays,
            early_closes,
            identity: String::new(),
        };
        definition.identity = serde_json::to_string(&definition.to_config()).map_err(|err| {
            CalendarError::Configuration(format!("calendar '{}': {}", name, err))
        })?;
        Ok(definition)
    }

    /// Construct from a serializable configuration
    pub fn from_config(config: CalendarConfig) -> Result<Self, CalendarError> {
        let tz: Tz = config.timezone.parse().map_err(|_| {
            CalendarError::Configuration(format!("unknown time zone '{}'", config.timezone))
        })?;
        Self::new(
            &config.name,
            tz,
            &config.weekmask,
            config.open,
            config.close,
            Arc::new(config.holidays),
            Arc::new(config.early_closes),
        )
    }

    pub fn to_config(&self) -> CalendarConfig {
        CalendarConfig {
            name: self.name.clone(),
            timezone: self.tz.name().to_string(),
            weekmask: self.weekmask.clone(),
            open: self.open,
            close: self.close,
            holidays: (*self.holidays).clone(),
            early_closes: (*self.early_closes).clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fingerprint of the complete configuration. Two definitions with the
    /// same name but different rules have different identities.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn weekmask(&self) -> &[Weekday] {
        &self.weekmask
    }

    pub fn is_trading_weekday(&self, weekday: Weekday) -> bool {
        self.weekmask.contains(&weekday)
    }

    /// Standard local open time
    pub fn open(&self) -> NaiveTime {
        self.open
    }

    /// Standard local close time
    pub fn close(&self) -> NaiveTime {
        self.close
    }

    pub fn holidays(&self) -> &HolidayRules {
        &self.holidays
    }

    pub fn early_closes(&self) -> &EarlyCloseRules {
        &self.early_closes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::DateRule;

    fn hm(hour: u32, min: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, min, 0).unwrap()
    }

    fn definition(
        weekmask: &[Weekday],
        open: NaiveTime,
        close: NaiveTime,
        early: EarlyCloseRules,
    ) -> Result<CalendarDefinition, CalendarError> {
        CalendarDefinition::new(
            "TEST",
            chrono_tz::America::New_York,
            weekmask,
            open,
            close,
            Arc::new(HolidayRules::new()),
            Arc::new(early),
        )
    }

    #[test]
    fn valid_definition() {
        let def = definition(
            &[Weekday::Fri, Weekday::Mon, Weekday::Mon],
            hm(9, 30),
            hm(16, 0),
            EarlyCloseRules::new(),
        )
        .unwrap();
        assert_eq!(def.weekmask(), &[Weekday::Mon, Weekday::Fri]);
        assert!(def.is_trading_weekday(Weekday::Fri));
        assert!(!def.is_trading_weekday(Weekday::Tue));
        assert_eq!(def.name(), "TEST");
    }

    #[test]
    fn empty_weekmask_is_rejected() {
        let res = definition(&[], hm(9, 30), hm(16, 0), EarlyCloseRules::new());
        assert!(matches!(res, Err(CalendarError::Configuration(_))));
    }

    #[test]
    fn open_after_close_is_rejected() {
        let res = definition(&WEEKDAYS, hm(16, 0), hm(9, 30), EarlyCloseRules::new());
        assert!(matches!(res, Err(CalendarError::Configuration(_))));
        let res = definition(&WEEKDAYS, hm(9, 30), hm(9, 30), EarlyCloseRules::new());
        assert!(matches!(res, Err(CalendarError::Configuration(_))));
    }

    #[test]
    fn early_close_must_shorten_session() {
        let late = EarlyCloseRules::new().with_rule("late", DateRule::fixed(12, 24), hm(17, 0));
        let res = definition(&WEEKDAYS, hm(9, 30), hm(16, 0), late);
        assert!(matches!(res, Err(CalendarError::Configuration(_))));
        let early = EarlyCloseRules::new().with_rule("early", DateRule::fixed(12, 24), hm(9, 0));
        let res = definition(&WEEKDAYS, hm(9, 30), hm(16, 0), early);
        assert!(matches!(res, Err(CalendarError::Configuration(_))));
    }

    #[test]
    fn config_round_trip() {
        let json = r#"{
            "name": "XTST",
            "timezone": "Europe/Berlin",
            "weekmask": ["Mon", "Tue", "Wed", "Thu", "Fri"],
            "open": "09:00:00",
            "close": "17:30:00",
            "holidays": {
                "rules": [{"name": "Christmas", "rule": {"YearlyDay": {"month": 12, "day": 25, "observance": "none", "first": null, "last": null}}}]
            },
            "early_closes": {
                "adhoc": [{"date": "2019-12-30", "close": "14:00:00"}]
            }
        }"#;
        let config: CalendarConfig = serde_json::from_str(json).unwrap();
        let def = CalendarDefinition::from_config(config.clone()).unwrap();
        assert_eq!(def.tz(), chrono_tz::Europe::Berlin);
        assert_eq!(def.close(), hm(17, 30));
        assert_eq!(def.holidays().rules().len(), 1);
        assert_eq!(def.to_config(), config);
    }

    #[test]
    fn identity_covers_rules() {
        let plain = definition(&WEEKDAYS, hm(9, 30), hm(16, 0), EarlyCloseRules::new()).unwrap();
        let same = definition(&WEEKDAYS, hm(9, 30), hm(16, 0), EarlyCloseRules::new()).unwrap();
        let early = EarlyCloseRules::new().with_rule("early", DateRule::fixed(12, 24), hm(13, 0));
        let other = definition(&WEEKDAYS, hm(9, 30), hm(16, 0), early).unwrap();
        assert_eq!(plain.name(), other.name());
        assert_eq!(plain.identity(), same.identity());
        assert_ne!(plain.identity(), other.identity());
    }

    #[test]
    fn unknown_time_zone() {
        let config = CalendarConfig {
            name: "XTST".to_string(),
            timezone: "Mars/Olympus_Mons".to_string(),
            weekmask: WEEKDAYS.to_vec(),
            open: hm(9, 0),
            close: hm(17, 0),
            holidays: HolidayRules::new(),
            early_closes: EarlyCloseRules::new(),
        };
        assert!(matches!(
            CalendarDefinition::from_config(config),
            Err(CalendarError::Configuration(_))
        ));
    }
}
