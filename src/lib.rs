//! # Loan Fiscal Report
//!
//! A library for turning loan terms into monthly amortization schedules and rolling
//! those schedules up into financial-year reports.
//!
//! ## Core Concepts
//!
//! - **Schedule**: one row per monthly installment, split into principal and interest
//! - **Fiscal Year**: an accounting year (April to March by default), labelled `FY 2024-25`
//! - **Summary Rows**: per loan, principal paid, interest paid, balance outstanding at
//!   year end and principal falling due in the following 12 months
//! - **Batch Tables**: one table per metric across all loans, with fiscal-year columns
//!   aligned and totals appended
//!
//! ## Example
//!
//! ```rust,ignore
//! use loan_fiscal_report::*;
//! use chrono::NaiveDate;
//!
//! let loans = vec![LoanInput {
//!     id: "1".to_string(),
//!     label: "A1".to_string(),
//!     principal: 15.0,
//!     annual_rate_percent: 12.0,
//!     term_months: 36,
//!     start_date: NaiveDate::from_ymd_opt(2022, 2, 22).unwrap(),
//!     fixed_payment: None,
//! }];
//!
//! let report = process_batch(&loans);
//! for table in report.tables() {
//!     println!("{:?}", table.header());
//! }
//! ```

pub mod batch;
pub mod error;
pub mod export;
pub mod fiscal;
pub mod ingestion;
pub mod schedule;
pub mod schema;
pub mod utils;

pub use batch::{combine, round2, BatchRow, BatchTable, TOTAL_LABEL};
pub use error::{AmortizationError, LoanRejection, Result};
pub use export::{table_to_json, write_schedule_csv, write_table_csv};
pub use fiscal::{FiscalAggregator, FiscalMetric, FiscalSummaryRow, LoanMeta, LoanReport};
pub use ingestion::{parse_start_date, read_loan_records, RawLoanRecord, ACCEPTED_DATE_FORMATS};
pub use schedule::{generate_for_loan, generate_schedule, level_installment, ScheduleRow};
pub use schema::*;
pub use utils::{FiscalCalendar, FiscalYear};

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;

/// Output of a batch run: per-loan reports, the four combined tables, and the
/// loans that were rejected.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub reports: Vec<LoanReport>,
    pub principal: BatchTable,
    pub interest: BatchTable,
    pub outstanding: BatchTable,
    pub liability: BatchTable,
    #[serde(skip)]
    pub rejected: Vec<LoanRejection>,
}

impl BatchReport {
    fn from_reports(reports: Vec<LoanReport>, rejected: Vec<LoanRejection>) -> Self {
        let table = |metric: FiscalMetric| {
            let rows: Vec<FiscalSummaryRow> =
                reports.iter().map(|r| r.row(metric).clone()).collect();
            combine(&rows, metric)
        };

        Self {
            principal: table(FiscalMetric::Principal),
            interest: table(FiscalMetric::Interest),
            outstanding: table(FiscalMetric::Outstanding),
            liability: table(FiscalMetric::Liability),
            reports,
            rejected,
        }
    }

    /// The four tables in principal, interest, outstanding, liability order.
    pub fn tables(&self) -> [&BatchTable; 4] {
        [
            &self.principal,
            &self.interest,
            &self.outstanding,
            &self.liability,
        ]
    }

    pub fn table(&self, metric: FiscalMetric) -> &BatchTable {
        match metric {
            FiscalMetric::Principal => &self.principal,
            FiscalMetric::Interest => &self.interest,
            FiscalMetric::Outstanding => &self.outstanding,
            FiscalMetric::Liability => &self.liability,
        }
    }
}

pub struct LoanReportProcessor {
    config: ReportConfig,
    calendar: FiscalCalendar,
}

impl LoanReportProcessor {
    pub fn new(config: ReportConfig) -> Result<Self> {
        config.validate()?;
        let calendar = config.calendar()?;
        Ok(Self { config, calendar })
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Single-loan mode: the first error halts processing.
    pub fn process_loan(&self, loan: &LoanInput) -> Result<LoanReport> {
        let schedule = generate_for_loan(loan, &self.calendar)?;
        let aggregator = FiscalAggregator::new(self.calendar, self.config.max_fiscal_years);
        aggregator.aggregate(
            schedule,
            LoanMeta {
                id: loan.id.clone(),
                label: loan.label.clone(),
                principal: loan.principal,
            },
        )
    }

    /// Processes every loan independently. Failed loans are reported in
    /// `rejected` and left out of the tables; the rest keep input order.
    pub fn process_batch(&self, loans: &[LoanInput]) -> BatchReport {
        info!("Processing batch of {} loans", loans.len());

        let results: Vec<Result<LoanReport>> = if self.config.parallel {
            loans.par_iter().map(|loan| self.process_loan(loan)).collect()
        } else {
            loans.iter().map(|loan| self.process_loan(loan)).collect()
        };

        let mut reports = Vec::with_capacity(loans.len());
        let mut rejected = Vec::new();
        for (loan, result) in loans.iter().zip(results) {
            match result {
                Ok(report) => reports.push(report),
                Err(error) => {
                    warn!("Rejecting loan {}: {}", loan.id, error);
                    rejected.push(LoanRejection {
                        loan_id: loan.id.clone(),
                        error,
                    });
                }
            }
        }

        self.finish(reports, rejected)
    }

    /// Validates raw records first, then runs the accepted loans as a batch.
    pub fn process_records(&self, records: Vec<RawLoanRecord>) -> BatchReport {
        let mut loans = Vec::with_capacity(records.len());
        let mut rejected = Vec::new();

        for (idx, record) in records.into_iter().enumerate() {
            let tag = record.tag(idx + 1);
            match record.into_loan_input() {
                Ok(loan) => loans.push(loan),
                Err(error) => {
                    warn!("Rejecting record {}: {}", tag, error);
                    rejected.push(LoanRejection {
                        loan_id: tag,
                        error,
                    });
                }
            }
        }

        let mut report = self.process_batch(&loans);
        rejected.append(&mut report.rejected);
        report.rejected = rejected;
        report
    }

    /// Reads loan records from CSV and processes them. Only an unreadable file
    /// fails the call; bad rows end up in `rejected`.
    pub fn process_csv<R: std::io::Read>(&self, reader: R) -> Result<BatchReport> {
        let records = read_loan_records(reader)?;
        debug!("Read {} loan records", records.len());
        Ok(self.process_records(records))
    }

    fn finish(&self, reports: Vec<LoanReport>, rejected: Vec<LoanRejection>) -> BatchReport {
        let report = BatchReport::from_reports(reports, rejected);
        info!(
            "Batch complete: {} loans reported, {} rejected",
            report.reports.len(),
            report.rejected.len()
        );
        for table in report.tables() {
            debug!(
                "{} table spans {} fiscal years, grand total {:.2}",
                table.metric,
                table.columns.len(),
                table.totals.total
            );
        }
        report
    }
}

impl Default for LoanReportProcessor {
    fn default() -> Self {
        Self {
            config: ReportConfig::default(),
            calendar: FiscalCalendar::default(),
        }
    }
}

pub fn process_loan(loan: &LoanInput) -> Result<LoanReport> {
    LoanReportProcessor::default().process_loan(loan)
}

pub fn process_batch(loans: &[LoanInput]) -> BatchReport {
    LoanReportProcessor::default().process_batch(loans)
}
