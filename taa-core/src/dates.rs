//! Run dates, file dates and projection horizons
//!
//! A run is keyed on a calendar date. Downstream stages only see the
//! compact `MMDDYY` form (`FileDate`), so both directions are provided.

use crate::{Error, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed set of horizons produced by every run, in processing order.
pub const HORIZONS: [Horizon; 3] = [Horizon(1), Horizon(2), Horizon(3)];

/// Forward-looking projection period (1, 2 or 3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Horizon(u8);

impl Horizon {
    pub fn new(value: u8) -> Result<Self> {
        if (1..=3).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::InvalidInput(format!(
                "horizon must be 1, 2 or 3, got {}",
                value
            )))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Horizon {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Horizon> for u8 {
    fn from(h: Horizon) -> u8 {
        h.0
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A date component as it arrives in an invocation event.
///
/// Schedulers send `{"year": 2023}` while console test events tend to send
/// `{"year": "2023"}`; both are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateField {
    Int(i64),
    Text(String),
}

impl DateField {
    /// Parse the field as a decimal integer
    pub fn parse(&self, name: &str) -> Result<i64> {
        match self {
            DateField::Int(v) => Ok(*v),
            DateField::Text(s) => s.trim().parse::<i64>().map_err(|_| {
                Error::InvalidInput(format!("{} must be an integer, got {:?}", name, s))
            }),
        }
    }
}

/// Calendar date a run is keyed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunDate(NaiveDate);

impl RunDate {
    pub fn new(year: i64, month: i64, day: i64) -> Result<Self> {
        let invalid = || {
            Error::InvalidInput(format!(
                "{}-{}-{} is not a valid calendar date",
                year, month, day
            ))
        };

        if !(1000..=9999).contains(&year) {
            return Err(Error::InvalidInput(format!(
                "year must have four digits, got {}",
                year
            )));
        }
        let month = u32::try_from(month).map_err(|_| invalid())?;
        let day = u32::try_from(day).map_err(|_| invalid())?;

        NaiveDate::from_ymd_opt(year as i32, month, day)
            .map(Self)
            .ok_or_else(invalid)
    }

    /// Build a run date from raw event fields
    pub fn from_fields(year: &DateField, month: &DateField, day: &DateField) -> Result<Self> {
        Self::new(
            year.parse("year")?,
            month.parse("month")?,
            day.parse("day")?,
        )
    }

    /// Parse a `YYYY-MM-DD` valuation date
    pub fn parse_iso(value: &str) -> Result<Self> {
        NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
            .map(Self)
            .map_err(|_| {
                Error::InvalidInput(format!("expected a YYYY-MM-DD date, got {:?}", value))
            })
    }

    pub fn from_naive(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    pub fn naive(&self) -> NaiveDate {
        self.0
    }

    /// Compact `MMDDYY` form carried in trigger payloads
    pub fn file_date(&self) -> FileDate {
        FileDate(*self)
    }
}

impl fmt::Display for RunDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// `MMDDYY` date shared between stages
///
/// The century is implied: `YY` always maps to `20YY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileDate(RunDate);

impl FileDate {
    /// Expand back to a calendar date
    pub fn run_date(&self) -> RunDate {
        self.0
    }
}

impl FromStr for FileDate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidInput(format!("file_date must be MMDDYY, got {:?}", s));

        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let month: i64 = s[0..2].parse().map_err(|_| invalid())?;
        let day: i64 = s[2..4].parse().map_err(|_| invalid())?;
        let year: i64 = s[4..6].parse().map_err(|_| invalid())?;

        RunDate::new(2000 + year, month, day)
            .map(Self)
            .map_err(|_| invalid())
    }
}

impl TryFrom<String> for FileDate {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<FileDate> for String {
    fn from(d: FileDate) -> String {
        d.to_string()
    }
}

impl fmt::Display for FileDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}{:02}{:02}",
            self.0.month(),
            self.0.day(),
            self.0.year().rem_euclid(100)
        )
    }
}
