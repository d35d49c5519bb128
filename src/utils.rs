use crate::error::{AmortizationError, Result};
use chrono::{Datelike, Months, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

/// Adds whole calendar months, keeping the day-of-month and clamping to the last
/// day of shorter months (Jan 31 + 1 month = Feb 28, or Feb 29 in leap years).
pub fn add_months_clamped(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    date.checked_add_months(Months::new(months)).ok_or_else(|| {
        AmortizationError::invalid_input(format!(
            "Date {} + {} months is out of range",
            date, months
        ))
    })
}

pub fn validate_fiscal_year_end_month(month: u32) -> Result<()> {
    if !(1..=12).contains(&month) {
        return Err(AmortizationError::InvalidConfig(format!(
            "fiscal year end month {} must be between 1 and 12",
            month
        )));
    }
    Ok(())
}

/// A fiscal year, identified by the calendar year in which it begins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct FiscalYear(pub i32);

impl FiscalYear {
    pub fn start_year(self) -> i32 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for FiscalYear {
    /// Formats as `FY 2024-25`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FY {}-{:02}", self.0, (self.0 + 1).rem_euclid(100))
    }
}

/// Maps calendar dates onto fiscal years that close at the end of `end_month`.
///
/// With the default March year end, April 2024 through March 2025 is `FY 2024-25`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiscalCalendar {
    end_month: u32,
}

impl Default for FiscalCalendar {
    fn default() -> Self {
        Self { end_month: 3 }
    }
}

impl FiscalCalendar {
    pub fn new(end_month: u32) -> Result<Self> {
        validate_fiscal_year_end_month(end_month)?;
        Ok(Self { end_month })
    }

    pub fn end_month(&self) -> u32 {
        self.end_month
    }

    pub fn start_month(&self) -> u32 {
        if self.end_month == 12 {
            1
        } else {
            self.end_month + 1
        }
    }

    pub fn fiscal_year_of(&self, date: NaiveDate) -> FiscalYear {
        if date.month() >= self.start_month() {
            FiscalYear(date.year())
        } else {
            FiscalYear(date.year() - 1)
        }
    }

    /// Last day of the fiscal year, e.g. 2025-03-31 for `FY 2024-25`.
    pub fn year_end(&self, year: FiscalYear) -> Result<NaiveDate> {
        let end_year = if self.end_month == 12 {
            year.start_year()
        } else {
            year.start_year() + 1
        };

        last_day_of_month(end_year, self.end_month).ok_or_else(|| {
            AmortizationError::invalid_input(format!("Fiscal year {} is out of range", year))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(last_day_of_month(2023, 2), Some(date(2023, 2, 28)));
        assert_eq!(last_day_of_month(2024, 2), Some(date(2024, 2, 29)));
        assert_eq!(last_day_of_month(2023, 4), Some(date(2023, 4, 30)));
        assert_eq!(last_day_of_month(2023, 12), Some(date(2023, 12, 31)));
    }

    #[test]
    fn test_add_months_clamps_to_month_end() {
        let jan31 = date(2023, 1, 31);
        assert_eq!(add_months_clamped(jan31, 1).unwrap(), date(2023, 2, 28));
        assert_eq!(add_months_clamped(jan31, 2).unwrap(), date(2023, 3, 31));
        assert_eq!(add_months_clamped(jan31, 3).unwrap(), date(2023, 4, 30));
        assert_eq!(add_months_clamped(date(2024, 1, 31), 1).unwrap(), date(2024, 2, 29));
        assert_eq!(add_months_clamped(date(2022, 2, 22), 12).unwrap(), date(2023, 2, 22));
    }

    #[test]
    fn test_fiscal_year_of_march_year_end() {
        let cal = FiscalCalendar::default();
        // March belongs to the fiscal year that began the previous April
        assert_eq!(cal.fiscal_year_of(date(2024, 3, 1)), FiscalYear(2023));
        assert_eq!(cal.fiscal_year_of(date(2024, 3, 31)), FiscalYear(2023));
        assert_eq!(cal.fiscal_year_of(date(2024, 4, 1)), FiscalYear(2024));
        assert_eq!(cal.fiscal_year_of(date(2024, 4, 30)), FiscalYear(2024));
        assert_eq!(cal.fiscal_year_of(date(2024, 12, 31)), FiscalYear(2024));
        assert_eq!(cal.fiscal_year_of(date(2025, 1, 1)), FiscalYear(2024));
    }

    #[test]
    fn test_fiscal_year_of_other_year_ends() {
        let calendar_year = FiscalCalendar::new(12).unwrap();
        assert_eq!(calendar_year.fiscal_year_of(date(2024, 1, 1)), FiscalYear(2024));
        assert_eq!(calendar_year.fiscal_year_of(date(2024, 12, 31)), FiscalYear(2024));

        let june = FiscalCalendar::new(6).unwrap();
        assert_eq!(june.fiscal_year_of(date(2024, 6, 30)), FiscalYear(2023));
        assert_eq!(june.fiscal_year_of(date(2024, 7, 1)), FiscalYear(2024));
    }

    #[test]
    fn test_year_end() {
        let cal = FiscalCalendar::default();
        assert_eq!(cal.year_end(FiscalYear(2024)).unwrap(), date(2025, 3, 31));

        let calendar_year = FiscalCalendar::new(12).unwrap();
        assert_eq!(
            calendar_year.year_end(FiscalYear(2024)).unwrap(),
            date(2024, 12, 31)
        );
    }

    #[test]
    fn test_fiscal_year_label() {
        assert_eq!(FiscalYear(2024).to_string(), "FY 2024-25");
        assert_eq!(FiscalYear(2099).to_string(), "FY 2099-00");
        assert_eq!(FiscalYear(2008).to_string(), "FY 2008-09");
    }

    #[test]
    fn test_invalid_end_month() {
        assert!(FiscalCalendar::new(0).is_err());
        assert!(FiscalCalendar::new(13).is_err());
    }
}
