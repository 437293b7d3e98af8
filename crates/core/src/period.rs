use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A calendar month, the unit budgets are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Month {
    pub fn of(date: NaiveDate) -> Self {
        Month {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parses `YYYY-MM`. Returns `None` for anything else, including an empty string.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (y, m) = raw.split_once('-')?;
        if y.len() != 4 || m.len() != 2 {
            return None;
        }
        let year: i32 = y.parse().ok()?;
        let month: u32 = m.parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, 1).map(Month::of)
    }

    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// December ends on the 31st; every other month ends the day before the
    /// first of the following month.
    pub fn last_day(self) -> NaiveDate {
        if self.month == 12 {
            return NaiveDate::from_ymd_opt(self.year, 12, 31).unwrap_or(NaiveDate::MAX);
        }
        NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)
            .and_then(|d| d.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Month {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Month {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    /// An inverted range contains no days.
    pub fn is_empty(self) -> bool {
        self.start > self.end
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Every calendar month the range touches, in order. Empty for an inverted range.
    pub fn months(self) -> Vec<Month> {
        let mut months = Vec::new();
        if self.is_empty() {
            return months;
        }
        let last = Month::of(self.end);
        let mut current = Month::of(self.start);
        while current <= last {
            months.push(current);
            current = current.next();
        }
        months
    }
}

/// Resolves raw `YYYY-MM` start/end selections into an inclusive day range.
///
/// An empty or unparsable start becomes the first day of `today`'s month. The
/// end is the last day of the parsed end month, or of `today`'s month when the
/// end is empty or unparsable. A start after the end is returned as is.
pub fn resolve_window(raw_start: &str, raw_end: &str, today: NaiveDate) -> DateRange {
    let current = Month::of(today);
    let start = Month::parse(raw_start).unwrap_or(current).first_day();
    let end = Month::parse(raw_end).unwrap_or(current).last_day();
    DateRange::new(start, end)
}
