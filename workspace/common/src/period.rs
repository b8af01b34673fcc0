use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeriodError {
    #[error("Month must be between 1 and 12, got {0}")]
    InvalidMonth(u32),

    #[error("Year {0} is out of the supported range")]
    InvalidYear(i32),

    #[error("Expected a period formatted as YYYY-MM, got '{0}'")]
    InvalidFormat(String),

    #[error("Trend window must be 3, 6 or 12 months, got {0}")]
    UnsupportedWindow(u32),
}

const SHORT_MONTHS: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

/// A calendar month. Month boundaries are evaluated in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, PeriodError> {
        if !(1..=12).contains(&month) {
            return Err(PeriodError::InvalidMonth(month));
        }
        if !(1970..=9999).contains(&year) {
            return Err(PeriodError::InvalidYear(year));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn containing(timestamp: DateTime<Utc>) -> Self {
        Self::from_date(timestamp.date_naive())
    }

    pub fn current() -> Self {
        Self::containing(Utc::now())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next().first_day().pred_opt().unwrap_or(NaiveDate::MAX)
    }

    pub fn days_in_month(&self) -> u32 {
        self.last_day().day()
    }

    pub fn next(&self) -> Self {
        self.shift(1)
    }

    pub fn previous(&self) -> Self {
        self.shift(-1)
    }

    /// Moves by `months` calendar months in either direction.
    pub fn shift(&self, months: i32) -> Self {
        let index = self.year * 12 + self.month as i32 - 1 + months;
        Self {
            year: index.div_euclid(12),
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    /// Start of the month, inclusive.
    pub fn start(&self) -> DateTime<Utc> {
        self.first_day().and_time(chrono::NaiveTime::MIN).and_utc()
    }

    /// Start of the following month, exclusive upper bound of this one.
    pub fn end(&self) -> DateTime<Utc> {
        self.next().start()
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start() && timestamp < self.end()
    }

    /// Adds `days - 1` days to the first of the month, so day 31 of a 30-day
    /// month lands on the first of the next one.
    pub fn rolled_day(&self, day: u32) -> Option<NaiveDate> {
        self.first_day()
            .checked_add_days(Days::new(u64::from(day.saturating_sub(1))))
    }

    /// Same day of month, capped at the month's last day.
    pub fn clamped_day(&self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day.clamp(1, self.days_in_month()))
    }

    /// Short display label such as `mai/24`.
    pub fn short_label(&self) -> String {
        format!(
            "{}/{:02}",
            SHORT_MONTHS[(self.month - 1) as usize],
            self.year.rem_euclid(100)
        )
    }

    /// Months from `self` back through `count - 1` months earlier, oldest first.
    pub fn trailing(&self, count: u32) -> Vec<YearMonth> {
        (0..count as i32)
            .rev()
            .map(|offset| self.shift(-offset))
            .collect()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| PeriodError::InvalidFormat(s.to_string()))?;
        if year.len() != 4 || month.len() != 2 {
            return Err(PeriodError::InvalidFormat(s.to_string()));
        }
        let year = year
            .parse()
            .map_err(|_| PeriodError::InvalidFormat(s.to_string()))?;
        let month = month
            .parse()
            .map_err(|_| PeriodError::InvalidFormat(s.to_string()))?;
        Self::new(year, month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Length of the trailing window used by the analysis view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TrendWindow {
    Quarter,
    #[default]
    HalfYear,
    Year,
}

impl TrendWindow {
    pub fn months(self) -> u32 {
        match self {
            TrendWindow::Quarter => 3,
            TrendWindow::HalfYear => 6,
            TrendWindow::Year => 12,
        }
    }
}

impl TryFrom<u32> for TrendWindow {
    type Error = PeriodError;

    fn try_from(months: u32) -> Result<Self, Self::Error> {
        match months {
            3 => Ok(TrendWindow::Quarter),
            6 => Ok(TrendWindow::HalfYear),
            12 => Ok(TrendWindow::Year),
            other => Err(PeriodError::UnsupportedWindow(other)),
        }
    }
}
