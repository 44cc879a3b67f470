use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Weekday};

pub fn is_weekday(weekday: Weekday) -> bool {
    !matches!(weekday, Weekday::Sat | Weekday::Sun)
}

/// The next Monday to Friday occurrence of `at` strictly after `now`.
pub fn next_weekday_run(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let mut candidate = now.date().and_time(at);
    if candidate <= now {
        candidate += Duration::days(1);
    }
    while !is_weekday(candidate.weekday()) {
        candidate += Duration::days(1);
    }
    candidate
}
