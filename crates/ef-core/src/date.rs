use core::fmt;
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

const DAYS_IN_MONTH: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Simple calendar date as year, month, day.
///
/// Serialises as `{Year, Month, Day}`; ordering is chronological.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Date {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Month")]
    pub month: u32,
    #[serde(rename = "Day")]
    pub day: u32,
}

/// Const constructor for embedded calendar tables. Does not validate.
pub const fn date(year: i32, month: u32, day: u32) -> Date {
    Date { year, month, day }
}

impl Date {
    /// Checked constructor; month in [1, 12], day valid for the month.
    pub fn new(year: i32, month: u32, day: u32) -> CoreResult<Self> {
        let d = Date { year, month, day };
        if month < 1 || month > 12 || day < 1 || day > d.days_in_month() {
            return Err(CoreError::InvalidParameter {
                what: format!("date out of range: {year}-{month}-{day}"),
            });
        }
        Ok(d)
    }

    pub fn is_leap_year(self) -> bool {
        (self.year % 4 == 0 && self.year % 100 != 0) || self.year % 400 == 0
    }

    fn days_in_month(self) -> u32 {
        if self.month == 2 && self.is_leap_year() {
            29
        } else {
            DAYS_IN_MONTH[(self.month - 1) as usize]
        }
    }

    /// 1-based day of the year (Jan 1 = 1).
    pub fn day_in_year(self) -> u32 {
        let mut days = self.day;
        for m in 1..self.month {
            days += Date {
                year: self.year,
                month: m,
                day: 1,
            }
            .days_in_month();
        }
        days
    }

    fn days_in_year(self) -> u32 {
        if self.is_leap_year() {
            366
        } else {
            365
        }
    }

    /// Signed number of days from this date to `other`.
    pub fn days_until(self, other: Date) -> i32 {
        if other < self {
            return -other.days_until(self);
        }
        let mut days = other.day_in_year() as i32 - self.day_in_year() as i32;
        for year in self.year..other.year {
            days += Date {
                year,
                month: 1,
                day: 1,
            }
            .days_in_year() as i32;
        }
        days
    }

    /// The date `days` days after (or before, if negative) this one.
    pub fn offset_by_days(self, days: i32) -> Date {
        let mut d = self;
        let mut remaining = days;
        while remaining > 0 {
            let left_in_month = d.days_in_month() - d.day;
            if (remaining as u32) <= left_in_month {
                d.day += remaining as u32;
                return d;
            }
            remaining -= (left_in_month + 1) as i32;
            d.day = 1;
            if d.month == 12 {
                d.month = 1;
                d.year += 1;
            } else {
                d.month += 1;
            }
        }
        while remaining < 0 {
            if (-remaining as u32) < d.day {
                d.day -= -remaining as u32;
                return d;
            }
            remaining += d.day as i32;
            if d.month == 1 {
                d.month = 12;
                d.year -= 1;
            } else {
                d.month -= 1;
            }
            d.day = d.days_in_month();
        }
        d
    }
}

impl fmt::Debug for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}-{:02}", self.year, self.month, self.day)
    }
}
