//! Calendar month arithmetic.

use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// A calendar month. `month` is zero-based (0 = January, 11 = December), which is also how months
/// are keyed in persisted data. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    year: i32,
    month: u8,
}

impl YearMonth {
    /// Creates a `YearMonth`, returning `None` if `month` is not in `0..=11`.
    pub fn new(year: i32, month: u8) -> Option<Self> {
        if month < 12 {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// Creates a `YearMonth` from a one-based month number (1 = January) as typed by people.
    pub fn from_human(year: i32, month: u8) -> Option<Self> {
        month.checked_sub(1).and_then(|m| Self::new(year, m))
    }

    /// The current month according to the local clock.
    pub fn today() -> Self {
        let now = Local::now();
        Self {
            year: now.year(),
            month: now.month0() as u8,
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// The zero-based month index.
    pub fn month(&self) -> u8 {
        self.month
    }

    /// The English name of the month, e.g. "March".
    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES[self.month as usize]
    }

    /// Moves `n` months forward (or backward when `n` is negative), rolling over years.
    pub fn offset(&self, n: i32) -> Self {
        let absolute = self.absolute() + i64::from(n);
        Self {
            year: absolute.div_euclid(12) as i32,
            month: absolute.rem_euclid(12) as u8,
        }
    }

    /// The month before this one.
    pub fn prev(&self) -> Self {
        self.offset(-1)
    }

    /// The month after this one.
    pub fn next(&self) -> Self {
        self.offset(1)
    }

    /// The number of months from `start` to `self`. Negative when `self` is earlier than `start`.
    pub fn months_since(&self, start: YearMonth) -> i64 {
        self.absolute() - start.absolute()
    }

    fn absolute(&self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month)
    }
}

impl Display for YearMonth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.month_name(), self.year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(year: i32, month: u8) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        assert!(YearMonth::new(2024, 12).is_none());
        assert!(YearMonth::from_human(2024, 0).is_none());
        assert_eq!(YearMonth::from_human(2024, 12), Some(ym(2024, 11)));
    }

    #[test]
    fn test_rollover() {
        assert_eq!(ym(2024, 0).prev(), ym(2023, 11));
        assert_eq!(ym(2023, 11).next(), ym(2024, 0));
        assert_eq!(ym(2024, 3).offset(-17), ym(2022, 10));
        assert_eq!(ym(2024, 3).offset(21), ym(2026, 0));
    }

    #[test]
    fn test_months_since() {
        assert_eq!(ym(2024, 2).months_since(ym(2024, 0)), 2);
        assert_eq!(ym(2023, 11).months_since(ym(2024, 0)), -1);
        assert_eq!(ym(2025, 0).months_since(ym(2024, 0)), 12);
    }

    #[test]
    fn test_ordering_and_display() {
        assert!(ym(2023, 11) < ym(2024, 0));
        assert_eq!(ym(2024, 2).to_string(), "March 2024");
    }
}
