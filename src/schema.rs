use crate::error::{AmortizationError, Result};
use crate::utils::{validate_fiscal_year_end_month, FiscalCalendar};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default number of fiscal-year columns a single loan may contribute.
pub const DEFAULT_MAX_FISCAL_YEARS: u32 = 20;

/// Upper bound for `max_fiscal_years` in a report config.
pub const MAX_FISCAL_YEARS_LIMIT: u32 = 200;

/// Annual rates at or above this percentage are rejected.
pub const MAX_ANNUAL_RATE_PERCENT: f64 = 50.0;

/// Longest accepted loan term, 100 years of monthly installments.
pub const MAX_TERM_MONTHS: u32 = 1200;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct LoanInput {
    #[schemars(description = "Loan identifier, e.g. the serial number from the input sheet")]
    pub id: String,

    #[schemars(description = "Bank name or loan number shown next to the identifier")]
    pub label: String,

    #[schemars(
        description = "Amount borrowed. Any currency scale works as long as the fixed payment uses the same one."
    )]
    pub principal: f64,

    #[schemars(description = "Annual interest rate in percent. Must be above 0 and below 50.")]
    pub annual_rate_percent: f64,

    #[schemars(description = "Number of monthly installments (1 to 1200)")]
    pub term_months: u32,

    #[schemars(description = "Date of the first installment in YYYY-MM-DD format")]
    pub start_date: NaiveDate,

    #[serde(default)]
    #[schemars(
        description = "Fixed monthly payment. Omit or use 0 (or a negative value) to compute the level installment from the annuity formula."
    )]
    pub fixed_payment: Option<f64>,
}

impl LoanInput {
    /// Checks the same preconditions the schedule generator enforces.
    pub fn validate(&self) -> Result<()> {
        validate_loan_terms(
            self.principal,
            self.annual_rate_percent,
            self.term_months,
            self.fixed_payment,
        )
    }

    /// The fixed payment if one was supplied and is positive.
    pub fn effective_fixed_payment(&self) -> Option<f64> {
        self.fixed_payment.filter(|p| *p > 0.0)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(LoanInput)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

pub(crate) fn validate_loan_terms(
    principal: f64,
    annual_rate_percent: f64,
    term_months: u32,
    fixed_payment: Option<f64>,
) -> Result<()> {
    if !principal.is_finite() || principal <= 0.0 {
        return Err(AmortizationError::invalid_input(format!(
            "loan amount must be positive, got {}",
            principal
        )));
    }

    if !annual_rate_percent.is_finite()
        || annual_rate_percent <= 0.0
        || annual_rate_percent >= MAX_ANNUAL_RATE_PERCENT
    {
        return Err(AmortizationError::invalid_input(format!(
            "interest rate must be above 0% and below {}%, got {}%",
            MAX_ANNUAL_RATE_PERCENT, annual_rate_percent
        )));
    }

    if term_months == 0 || term_months > MAX_TERM_MONTHS {
        return Err(AmortizationError::invalid_input(format!(
            "loan term must be between 1 and {} months, got {}",
            MAX_TERM_MONTHS, term_months
        )));
    }

    if let Some(payment) = fixed_payment {
        if !payment.is_finite() {
            return Err(AmortizationError::invalid_input(format!(
                "payment amount must be a finite number, got {}",
                payment
            )));
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ReportConfig {
    #[serde(default = "default_fiscal_year_end_month")]
    #[schemars(
        description = "The month when the fiscal year ends (1 = January, 12 = December). Defaults to 3 for an April-March year."
    )]
    pub fiscal_year_end_month: u32,

    #[serde(default = "default_max_fiscal_years")]
    #[schemars(
        description = "Maximum number of fiscal years reported per loan, counted from the loan's first fiscal year. Bounds the table width for very long loans."
    )]
    pub max_fiscal_years: u32,

    #[serde(default = "default_parallel")]
    #[schemars(description = "Compute batch loans on the rayon thread pool")]
    pub parallel: bool,
}

fn default_fiscal_year_end_month() -> u32 {
    3
}

fn default_max_fiscal_years() -> u32 {
    DEFAULT_MAX_FISCAL_YEARS
}

fn default_parallel() -> bool {
    true
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            fiscal_year_end_month: default_fiscal_year_end_month(),
            max_fiscal_years: default_max_fiscal_years(),
            parallel: default_parallel(),
        }
    }
}

impl ReportConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_fiscal_year_end_month(self.fiscal_year_end_month)?;
        if self.max_fiscal_years == 0 || self.max_fiscal_years > MAX_FISCAL_YEARS_LIMIT {
            return Err(AmortizationError::InvalidConfig(format!(
                "max_fiscal_years must be between 1 and {}, got {}",
                MAX_FISCAL_YEARS_LIMIT, self.max_fiscal_years
            )));
        }
        Ok(())
    }

    pub fn calendar(&self) -> Result<FiscalCalendar> {
        FiscalCalendar::new(self.fiscal_year_end_month)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ReportConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
