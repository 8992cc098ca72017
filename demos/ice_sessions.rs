use chrono::NaiveDate;
use exchange_calendar::{markets, CalendarConfig, CalendarDefinition, TradingCalendar};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    let start = NaiveDate::from_ymd_opt(2016, 11, 1).ok_or("invalid start date")?;
    let end = NaiveDate::from_ymd_opt(2016, 12, 31).ok_or("invalid end date")?;

    let mut ice = TradingCalendar::new(markets::calendar_definition("ICE")?);
    ice.build(start, end)?;
    let tz = ice.tz();
    println!("{} sessions from {} to {}:", ice.name(), start, end);
    for session in ice.all_sessions()? {
        let marker = if ice.early_closes()?.contains(&session.date) {
            " (early close)"
        } else {
            ""
        };
        println!(
            "{}  {} - {}{}",
            session.date,
            session.local_open(tz).format("%H:%M %Z"),
            session.local_close(tz).format("%H:%M %Z"),
            marker
        );
    }

    let lse = markets::calendar_definition("LSE")?;
    println!("\n{} holidays 2022:", lse.name());
    for (date, name) in lse.holidays().named_holidays_in(2022, 2022) {
        println!("{}  {}", date, name);
    }

    // rule tables may also be supplied as configuration
    let config: CalendarConfig = serde_json::from_str(
        r#"{
            "name": "XETR",
            "timezone": "Europe/Berlin",
            "weekmask": ["Mon", "Tue", "Wed", "Thu", "Fri"],
            "open": "09:00:00",
            "close": "17:30:00",
            "holidays": {
                "rules": [
                    {"name": "Good Friday", "rule": {"EasterOffset": {"offset": -2, "first": null, "last": null}}},
                    {"name": "Easter Monday", "rule": {"EasterOffset": {"offset": 1, "first": null, "last": null}}}
                ]
            }
        }"#,
    )?;
    let mut xetra = TradingCalendar::new(CalendarDefinition::from_config(config)?);
    xetra.build(start, end)?;
    println!(
        "\n{} has {} sessions from {} to {}",
        xetra.name(),
        xetra.session_count_between(start, end)?,
        start,
        end
    );
    Ok(())
}
