use std::fmt;
use std::str::FromStr;

use jiff::{civil::Date, ToSpan};
use thiserror::Error;

#[derive(Error, Debug)]
#[error("{0}")]
pub struct ParseError(pub String);

/// A calendar month, e.g. 2024-03.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    start: Date,
}

impl Month {
    pub fn new(year: i16, month: i8) -> Result<Month, jiff::Error> {
        Ok(Month {
            start: Date::new(year, month, 1)?,
        })
    }

    /// Return the month that contains this date.
    pub fn containing(date: Date) -> Month {
        Month {
            start: date.first_of_month(),
        }
    }

    pub fn year(&self) -> i16 {
        self.start.year()
    }

    pub fn month(&self) -> i8 {
        self.start.month()
    }

    /// First day of the month
    pub fn start_date(&self) -> Date {
        self.start
    }

    /// First day of the next month, exclusive.
    pub fn end_date(&self) -> Result<Date, jiff::Error> {
        self.start.checked_add(1.month())
    }

    pub fn next(&self) -> Result<Month, jiff::Error> {
        Ok(Month {
            start: self.end_date()?,
        })
    }

    pub fn previous(&self) -> Result<Month, jiff::Error> {
        Ok(Month {
            start: self.start.checked_sub(1.month())?,
        })
    }

    pub fn contains(&self, date: Date) -> bool {
        date.first_of_month() == self.start
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start.strftime("%Y-%m"))
    }
}

impl FromStr for Month {
    type Err = ParseError;

    /// Parse a `YYYY-MM` string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| ParseError(format!("Failed parsing {} as a month", s)))?;
        let year = year
            .parse::<i16>()
            .map_err(|_| ParseError(format!("Failed parsing {} as a month", s)))?;
        let month = month
            .parse::<i8>()
            .map_err(|_| ParseError(format!("Failed parsing {} as a month", s)))?;
        if !(1..=12).contains(&month) {
            return Err(ParseError(format!("Month of year {} not in 1..=12", month)));
        }
        Month::new(year, month).map_err(|e| ParseError(e.to_string()))
    }
}
