//! Approximate dates
//!
//! Position and organisation dates are often only known to the year or month,
//! and open-ended positions end in the "future". Values are stored as sortable
//! text so that plain string comparison in SQL orders them correctly:
//!
//! | value            | stored as      |
//! |------------------|----------------|
//! | unknown          | `""`           |
//! | past             | `0000-00-00`   |
//! | 2013             | `2013-00-00`   |
//! | February 2013    | `2013-02-00`   |
//! | 7 February 2013  | `2013-02-07`   |
//! | future           | `9999-12-31`   |

use crate::{Error, Result};
use chrono::{Datelike, NaiveDate};
use std::fmt;

const FUTURE_DB: &str = "9999-12-31";
const PAST_DB: &str = "0000-00-00";

/// A date known to year, month or day precision, or an open sentinel
///
/// Variant order gives the same ordering as the stored text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ApproximateDate {
    Past,
    Date {
        year: i32,
        month: Option<u32>,
        day: Option<u32>,
    },
    Future,
}

impl ApproximateDate {
    /// Year-only date (e.g. an organisation founded "in 2013")
    pub fn year(year: i32) -> Self {
        ApproximateDate::Date {
            year,
            month: None,
            day: None,
        }
    }

    /// Fully specified date
    pub fn exact(date: NaiveDate) -> Self {
        ApproximateDate::Date {
            year: date.year(),
            month: Some(date.month()),
            day: Some(date.day()),
        }
    }

    /// Sortable text representation used in the database
    pub fn to_db_string(&self) -> String {
        match self {
            ApproximateDate::Past => PAST_DB.to_string(),
            ApproximateDate::Future => FUTURE_DB.to_string(),
            ApproximateDate::Date { year, month, day } => format!(
                "{:04}-{:02}-{:02}",
                year,
                month.unwrap_or(0),
                day.unwrap_or(0)
            ),
        }
    }

    /// Parse a stored value. The empty string means "unknown" and yields `None`.
    ///
    /// Also accepts the literal words `future` and `past`.
    pub fn from_db_str(value: &str) -> Result<Option<Self>> {
        let value = value.trim();
        match value {
            "" => return Ok(None),
            "future" | FUTURE_DB => return Ok(Some(ApproximateDate::Future)),
            "past" | PAST_DB => return Ok(Some(ApproximateDate::Past)),
            _ => {}
        }

        let invalid = || Error::InvalidInput(format!("Invalid approximate date: '{}'", value));

        let mut parts = value.split('-');
        let year: i32 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        let month: u32 = match parts.next() {
            Some(p) => p.parse().map_err(|_| invalid())?,
            None => 0,
        };
        let day: u32 = match parts.next() {
            Some(p) => p.parse().map_err(|_| invalid())?,
            None => 0,
        };
        if parts.next().is_some() || month > 12 || (month == 0 && day != 0) {
            return Err(invalid());
        }

        let month = (month != 0).then_some(month);
        let day = (day != 0).then_some(day);

        if let (Some(m), Some(d)) = (month, day) {
            if NaiveDate::from_ymd_opt(year, m, d).is_none() {
                return Err(invalid());
            }
        }

        Ok(Some(ApproximateDate::Date { year, month, day }))
    }
}

impl fmt::Display for ApproximateDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApproximateDate::Past => write!(f, "past"),
            ApproximateDate::Future => write!(f, "future"),
            ApproximateDate::Date {
                year,
                month: Some(m),
                day: Some(d),
            } => write!(f, "{:04}-{:02}-{:02}", year, m, d),
            ApproximateDate::Date {
                year, month: Some(m), ..
            } => write!(f, "{:04}-{:02}", year, m),
            ApproximateDate::Date { year, .. } => write!(f, "{:04}", year),
        }
    }
}

/// Whether a row is current on `today`; binds `today` twice
///
/// Unknown start or end dates do not exclude a row.
pub const CURRENTLY_ACTIVE_SQL: &str =
    "(start_date = '' OR start_date <= ?) AND (end_date = '' OR end_date >= ?)";

/// `today` in stored form
pub fn today_db_string(today: NaiveDate) -> String {
    ApproximateDate::exact(today).to_db_string()
}

/// The day before `today`, as used when ending positions
pub fn yesterday(today: NaiveDate) -> ApproximateDate {
    ApproximateDate::exact(today.pred_opt().unwrap_or(today))
}
