use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use common::{PeriodError, YearMonth};

/// Picks the month a request refers to. Missing parts default to `today`.
pub fn resolve_month(
    year: Option<i32>,
    month: Option<u32>,
    today: YearMonth,
) -> Result<YearMonth, PeriodError> {
    YearMonth::new(year.unwrap_or(today.year()), month.unwrap_or(today.month()))
}

/// Midnight UTC at the start of `date`.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Midnight UTC after `date`, the exclusive bound of an inclusive end date.
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.checked_add_days(Days::new(1))
        .map(start_of_day)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
