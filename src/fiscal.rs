use crate::error::{AmortizationError, Result};
use crate::schedule::ScheduleRow;
use crate::schema::DEFAULT_MAX_FISCAL_YEARS;
use crate::utils::{FiscalCalendar, FiscalYear};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum FiscalMetric {
    /// Principal repaid during the fiscal year
    Principal,
    /// Interest paid during the fiscal year
    Interest,
    /// Balance still owed at fiscal year end
    Outstanding,
    /// Principal falling due in the 12 months after fiscal year end
    Liability,
}

impl FiscalMetric {
    pub const ALL: [FiscalMetric; 4] = [
        FiscalMetric::Principal,
        FiscalMetric::Interest,
        FiscalMetric::Outstanding,
        FiscalMetric::Liability,
    ];

    /// Column prefix used in report headers, e.g. `Principal FY 2024-25`.
    pub fn prefix(self) -> &'static str {
        match self {
            FiscalMetric::Principal => "Principal",
            FiscalMetric::Interest => "Interest",
            FiscalMetric::Outstanding => "Outstanding",
            FiscalMetric::Liability => "Liability",
        }
    }
}

impl fmt::Display for FiscalMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Identity of the loan a schedule belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanMeta {
    pub id: String,
    pub label: String,
    pub principal: f64,
}

/// One metric for one loan, keyed by fiscal year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiscalSummaryRow {
    pub loan_id: String,
    pub label: String,
    pub metric: FiscalMetric,
    pub values: BTreeMap<FiscalYear, f64>,
}

impl FiscalSummaryRow {
    pub fn value(&self, year: FiscalYear) -> f64 {
        self.values.get(&year).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.values.values().sum()
    }
}

/// Everything computed for a single loan: its schedule and the four fiscal rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanReport {
    pub meta: LoanMeta,
    pub schedule: Vec<ScheduleRow>,
    pub principal: FiscalSummaryRow,
    pub interest: FiscalSummaryRow,
    pub outstanding: FiscalSummaryRow,
    pub liability: FiscalSummaryRow,
}

impl LoanReport {
    pub fn row(&self, metric: FiscalMetric) -> &FiscalSummaryRow {
        match metric {
            FiscalMetric::Principal => &self.principal,
            FiscalMetric::Interest => &self.interest,
            FiscalMetric::Outstanding => &self.outstanding,
            FiscalMetric::Liability => &self.liability,
        }
    }

    pub fn fiscal_years(&self) -> impl Iterator<Item = FiscalYear> + '_ {
        self.principal.values.keys().copied()
    }
}

pub struct FiscalAggregator {
    calendar: FiscalCalendar,
    max_fiscal_years: u32,
}

impl Default for FiscalAggregator {
    fn default() -> Self {
        Self::new(FiscalCalendar::default(), DEFAULT_MAX_FISCAL_YEARS)
    }
}

impl FiscalAggregator {
    pub fn new(calendar: FiscalCalendar, max_fiscal_years: u32) -> Self {
        Self {
            calendar,
            max_fiscal_years,
        }
    }

    /// Fiscal years covered by a schedule: from the first row's year up to and
    /// including the last row's year, but never more than `max_fiscal_years`.
    pub fn fiscal_span(&self, schedule: &[ScheduleRow]) -> Result<Vec<FiscalYear>> {
        let (first, last) = match (schedule.first(), schedule.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(AmortizationError::invalid_input(
                    "cannot aggregate an empty schedule",
                ))
            }
        };

        let min_year = self.calendar.fiscal_year_of(first.date).start_year();
        let end_year = last.fiscal_year.start_year() + 1;
        let max_year = i32::try_from(self.max_fiscal_years)
            .ok()
            .and_then(|n| min_year.checked_add(n))
            .map_or(end_year, |cap| end_year.min(cap));

        Ok((min_year..max_year).map(FiscalYear).collect())
    }

    pub fn aggregate(&self, schedule: Vec<ScheduleRow>, meta: LoanMeta) -> Result<LoanReport> {
        let years = self.fiscal_span(&schedule)?;

        debug!(
            "Loan {}: {} periods across {} fiscal years ({} to {})",
            meta.id,
            schedule.len(),
            years.len(),
            years.first().map(ToString::to_string).unwrap_or_default(),
            years.last().map(ToString::to_string).unwrap_or_default(),
        );

        let mut flows: BTreeMap<FiscalYear, (f64, f64)> = BTreeMap::new();
        for row in &schedule {
            let entry = flows.entry(row.fiscal_year).or_insert((0.0, 0.0));
            entry.0 += row.principal;
            entry.1 += row.interest;
        }

        let mut principal = BTreeMap::new();
        let mut interest = BTreeMap::new();
        let mut outstanding = BTreeMap::new();
        let mut liability = BTreeMap::new();

        for &year in &years {
            let (paid_principal, paid_interest) = flows.get(&year).copied().unwrap_or((0.0, 0.0));
            principal.insert(year, paid_principal);
            interest.insert(year, paid_interest);

            let year_end = self.calendar.year_end(year)?;
            outstanding.insert(year, outstanding_at(&schedule, year_end, meta.principal));

            let next_year_end = self.calendar.year_end(year.next())?;
            liability.insert(year, principal_due_between(&schedule, year_end, next_year_end));
        }

        let row = |metric, values| FiscalSummaryRow {
            loan_id: meta.id.clone(),
            label: meta.label.clone(),
            metric,
            values,
        };

        Ok(LoanReport {
            principal: row(FiscalMetric::Principal, principal),
            interest: row(FiscalMetric::Interest, interest),
            outstanding: row(FiscalMetric::Outstanding, outstanding),
            liability: row(FiscalMetric::Liability, liability),
            meta,
            schedule,
        })
    }
}

/// Closing balance of the last installment on or before `as_of`.
fn outstanding_at(schedule: &[ScheduleRow], as_of: NaiveDate, original_principal: f64) -> f64 {
    match schedule.first() {
        Some(first) if first.date > as_of => original_principal,
        _ => schedule
            .iter()
            .take_while(|row| row.date <= as_of)
            .last()
            .map(|row| row.balance)
            .unwrap_or(0.0),
    }
}

/// Principal of installments dated in `(after, until]`.
fn principal_due_between(schedule: &[ScheduleRow], after: NaiveDate, until: NaiveDate) -> f64 {
    schedule
        .iter()
        .filter(|row| row.date > after && row.date <= until)
        .map(|row| row.principal)
        .sum()
}
