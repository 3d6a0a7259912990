//! Parsing of shell input lines into commands.

use circlock::prelude::*;

/// A parsed shell command. Alarm handles are the small numbers shown by
/// `alarm list`, not engine ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Now,
    Angles,
    Format(HourFormat),
    Set { hour: u8, minute: u8, second: u8 },
    Day(u8),
    Sync,
    Start,
    Stop,
    Watch(bool),
    AlarmAdd(NewAlarm),
    AlarmList,
    AlarmToggle(usize),
    AlarmDelete(usize),
    AlarmDismiss { handle: usize, minutes: u32 },
    AlarmSnooze(usize),
    AlarmToday,
    Logs,
    Stats,
    Help,
    Exit,
    Empty,
}

pub const HELP: &[(&str, &str)] = &[
    ("now", "Shows the clock's time and weekday."),
    ("angles", "Shows the hand angles in degrees."),
    ("format 12|24", "Switches the display format."),
    ("set HH MM SS", "Sets the time (24h)."),
    ("day N", "Sets the weekday (0=Monday..6=Sunday)."),
    ("sync", "Re-syncs with Colombia time."),
    ("start | stop", "Starts or stops the ticker."),
    ("watch on|off", "Prints every tick."),
    (
        "alarm add H M AM|PM [day=N] [date=YYYY-MM-DD] [daily] [label...]",
        "Adds an alarm.",
    ),
    ("alarm list", "Lists alarms with their handles."),
    ("alarm toggle|delete|snooze #", "Acts on the alarm with handle #."),
    ("alarm dismiss # [min]", "Silences for min minutes, or deactivates."),
    ("alarm today", "Lists the alarms that ring today."),
    ("logs", "Shows the alarm activity log."),
    ("stats", "Shows engine counters."),
    ("exit", "Quits the shell."),
];

/// Parses one input line.
pub fn parse(line: &str) -> Result<Command, String> {
    let args: Vec<&str> = line.split_whitespace().collect();
    let Some(&command) = args.first() else {
        return Ok(Command::Empty);
    };

    match command {
        "now" => Ok(Command::Now),
        "angles" => Ok(Command::Angles),
        "format" => match args.get(1) {
            Some(&"12") => Ok(Command::Format(HourFormat::TwelveHour)),
            Some(&"24") => Ok(Command::Format(HourFormat::TwentyFourHour)),
            _ => Err("Usage: format 12|24".into()),
        },
        "set" => match args.get(1..4) {
            Some(&[hour, minute, second]) => Ok(Command::Set {
                hour: number(hour, "hour")?,
                minute: number(minute, "minute")?,
                second: number(second, "second")?,
            }),
            _ => Err("Usage: set HH MM SS".into()),
        },
        "day" => match args.get(1) {
            Some(day) => Ok(Command::Day(number(day, "day")?)),
            None => Err("Usage: day N".into()),
        },
        "sync" => Ok(Command::Sync),
        "start" => Ok(Command::Start),
        "stop" => Ok(Command::Stop),
        "watch" => match args.get(1) {
            Some(&"on") => Ok(Command::Watch(true)),
            Some(&"off") => Ok(Command::Watch(false)),
            _ => Err("Usage: watch on|off".into()),
        },
        "alarm" => parse_alarm(&args[1..]),
        "logs" => Ok(Command::Logs),
        "stats" => Ok(Command::Stats),
        "help" => Ok(Command::Help),
        "exit" | "quit" => Ok(Command::Exit),
        other => Err(format!("Unknown command: '{}'. Type 'help'.", other)),
    }
}

fn parse_alarm(args: &[&str]) -> Result<Command, String> {
    match args.first() {
        Some(&"add") => parse_alarm_add(&args[1..]),
        Some(&"list") => Ok(Command::AlarmList),
        Some(&"today") => Ok(Command::AlarmToday),
        Some(&"toggle") => Ok(Command::AlarmToggle(handle(args.get(1))?)),
        Some(&"delete") => Ok(Command::AlarmDelete(handle(args.get(1))?)),
        Some(&"snooze") => Ok(Command::AlarmSnooze(handle(args.get(1))?)),
        Some(&"dismiss") => {
            let handle = handle(args.get(1))?;
            let minutes = match args.get(2) {
                Some(minutes) => number(minutes, "minutes")?,
                None => 0,
            };
            Ok(Command::AlarmDismiss { handle, minutes })
        }
        _ => Err("Unknown 'alarm' command. Try 'help'.".into()),
    }
}

fn parse_alarm_add(args: &[&str]) -> Result<Command, String> {
    const USAGE: &str = "Usage: alarm add H M AM|PM [day=N] [date=YYYY-MM-DD] [daily] [label...]";
    let (hour, minute, period) = match args {
        [hour, minute, period, ..] => (
            number(hour, "hour")?,
            number(minute, "minute")?,
            period.parse::<Period>().map_err(|e| e.to_string())?,
        ),
        _ => return Err(USAGE.into()),
    };

    let mut request = NewAlarm::new(hour, minute, period);
    let mut label = Vec::new();
    for arg in &args[3..] {
        if let Some(day) = arg.strip_prefix("day=") {
            request = request.on_weekday(number(day, "day")?);
        } else if let Some(date) = arg.strip_prefix("date=") {
            request = request.on_date(parse_alarm_date(date).map_err(|e| e.to_string())?);
        } else if *arg == "daily" {
            request = request.repeating_daily();
        } else {
            label.push(*arg);
        }
    }
    if !label.is_empty() {
        request = request.titled(label.join(" "));
    }
    Ok(Command::AlarmAdd(request))
}

fn handle(arg: Option<&&str>) -> Result<usize, String> {
    let arg = arg.ok_or("Missing alarm handle. Use 'alarm list' to see handles.")?;
    arg.trim_start_matches('#')
        .parse()
        .map_err(|_| format!("Error: Handle must be a number (e.g., '0', '1'), got '{}'.", arg))
}

fn number<T: std::str::FromStr>(arg: &str, what: &str) -> Result<T, String> {
    arg.parse()
        .map_err(|_| format!("Error: '{}' is not a valid {}.", arg, what))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use test_case::test_case;

    #[test_case("now", Command::Now)]
    #[test_case("  angles  ", Command::Angles)]
    #[test_case("format 24", Command::Format(HourFormat::TwentyFourHour))]
    #[test_case("format 12", Command::Format(HourFormat::TwelveHour))]
    #[test_case("set 14 05 09", Command::Set { hour: 14, minute: 5, second: 9 })]
    #[test_case("day 6", Command::Day(6))]
    #[test_case("watch on", Command::Watch(true))]
    #[test_case("alarm list", Command::AlarmList)]
    #[test_case("alarm toggle #2", Command::AlarmToggle(2))]
    #[test_case("alarm delete 0", Command::AlarmDelete(0))]
    #[test_case("alarm dismiss 1", Command::AlarmDismiss { handle: 1, minutes: 0 })]
    #[test_case("alarm dismiss 1 10", Command::AlarmDismiss { handle: 1, minutes: 10 })]
    #[test_case("", Command::Empty)]
    #[test_case("quit", Command::Exit)]
    fn parses(line: &str, expected: Command) {
        assert_eq!(parse(line), Ok(expected));
    }

    #[test_case("format 13")]
    #[test_case("set 10 20")]
    #[test_case("set 10 x 20")]
    #[test_case("watch")]
    #[test_case("alarm toggle")]
    #[test_case("alarm dismiss one")]
    #[test_case("alarm add 6 30")]
    #[test_case("alarm add 6 30 XM")]
    #[test_case("alarm add 6 30 AM date=tomorrow")]
    #[test_case("alarm ring 1")]
    #[test_case("fly")]
    fn rejects(line: &str) {
        assert!(parse(line).is_err());
    }

    #[test]
    fn alarm_add_with_options_and_label() {
        let parsed = parse("alarm add 6 30 pm day=2 daily take the meds").unwrap();
        let expected = NewAlarm::new(6, 30, Period::PM)
            .on_weekday(2)
            .repeating_daily()
            .titled("take the meds");
        assert_eq!(parsed, Command::AlarmAdd(expected));
    }

    #[test]
    fn alarm_add_with_date() {
        let parsed = parse("alarm add 7 0 AM date=2026-12-24").unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 12, 24).unwrap();
        assert_eq!(parsed, Command::AlarmAdd(NewAlarm::new(7, 0, Period::AM).on_date(date)));
    }

    #[test]
    fn range_checks_are_left_to_the_engine() {
        // Parsing only checks shape; `create_alarm` rejects hour 13.
        assert!(matches!(parse("alarm add 13 0 AM"), Ok(Command::AlarmAdd(_))));
    }
}
