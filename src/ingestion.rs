use crate::error::{AmortizationError, Result};
use crate::schema::LoanInput;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Date layouts accepted for a start date, tried in this order.
pub const ACCEPTED_DATE_FORMATS: [&str; 3] = ["%m/%d/%Y", "%d/%m/%Y", "%Y-%m-%d"];

/// A loan row as it arrives from a sheet or CSV upload, before any typing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLoanRecord {
    pub sr_no: Option<String>,
    pub bank_name_or_loan_no: Option<String>,
    pub loan_amount: Option<String>,
    pub interest_rate: Option<String>,
    pub loan_term: Option<String>,
    pub start_date: Option<String>,
    pub payment_amount: Option<String>,
}

pub fn parse_start_date(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    ACCEPTED_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| AmortizationError::MalformedDate {
            value: value.to_string(),
            accepted: ACCEPTED_DATE_FORMATS.to_vec(),
        })
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str> {
    present(value).ok_or(AmortizationError::MissingField { field })
}

fn parse_number(value: &str, field: &str) -> Result<f64> {
    value
        .replace(',', "")
        .parse::<f64>()
        .map_err(|_| {
            AmortizationError::invalid_input(format!("{} '{}' is not a number", field, value))
        })
}

fn parse_term(value: &str) -> Result<u32> {
    let term = parse_number(value, "loan_term")?;
    if term.fract() != 0.0 || term < 0.0 || term > u32::MAX as f64 {
        return Err(AmortizationError::invalid_input(format!(
            "loan_term '{}' must be a whole number of months",
            value
        )));
    }
    Ok(term as u32)
}

impl RawLoanRecord {
    /// Identifier used to tag errors for this record, `row N` when absent.
    pub fn tag(&self, row_number: usize) -> String {
        present(&self.sr_no)
            .map(str::to_string)
            .unwrap_or_else(|| format!("row {}", row_number))
    }

    pub fn into_loan_input(self) -> Result<LoanInput> {
        let id = required(&self.sr_no, "sr_no")?.to_string();
        let label = required(&self.bank_name_or_loan_no, "bank_name_or_loan_no")?.to_string();
        let principal = parse_number(required(&self.loan_amount, "loan_amount")?, "loan_amount")?;
        let annual_rate_percent =
            parse_number(required(&self.interest_rate, "interest_rate")?, "interest_rate")?;
        let term_months = parse_term(required(&self.loan_term, "loan_term")?)?;
        let start_date = parse_start_date(required(&self.start_date, "start_date")?)?;
        let fixed_payment = present(&self.payment_amount)
            .map(|v| parse_number(v, "payment_amount"))
            .transpose()?;

        let loan = LoanInput {
            id,
            label,
            principal,
            annual_rate_percent,
            term_months,
            start_date,
            fixed_payment,
        };
        loan.validate()?;
        Ok(loan)
    }
}

/// Lower-cases a header and joins words with underscores, so `Loan Amount` and
/// ` loan amount ` both become `loan_amount`.
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Reads loan records from CSV. Unknown columns are ignored; missing columns
/// surface later as per-record `MissingField` errors.
pub fn read_loan_records<R: Read>(reader: R) -> Result<Vec<RawLoanRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(normalize_header)
        .collect();

    let column = |name: &str| headers.iter().position(|h| h == name);
    let sr_no = column("sr_no");
    let bank = column("bank_name_or_loan_no");
    let amount = column("loan_amount");
    let rate = column("interest_rate");
    let term = column("loan_term");
    let start = column("start_date");
    let payment = column("payment_amount");

    let mut records = Vec::new();
    for result in csv_reader.records() {
        let record = result?;
        let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i)).map(str::to_string);
        records.push(RawLoanRecord {
            sr_no: cell(sr_no),
            bank_name_or_loan_no: cell(bank),
            loan_amount: cell(amount),
            interest_rate: cell(rate),
            loan_term: cell(term),
            start_date: cell(start),
            payment_amount: cell(payment),
        });
    }

    Ok(records)
}
