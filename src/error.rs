use thiserror::Error;

#[derive(Error, Debug)]
pub enum AmortizationError {
    #[error("Invalid input: {details}")]
    InvalidInput { details: String },

    #[error("Malformed date '{value}': expected one of {}", .accepted.join(", "))]
    MalformedDate {
        value: String,
        accepted: Vec<&'static str>,
    },

    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("Invalid report configuration: {0}")]
    InvalidConfig(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AmortizationError {
    pub fn invalid_input(details: impl Into<String>) -> Self {
        Self::InvalidInput {
            details: details.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AmortizationError>;

/// A loan that was dropped from a batch, tagged with its identifier.
#[derive(Error, Debug)]
#[error("Loan {loan_id}: {error}")]
pub struct LoanRejection {
    pub loan_id: String,
    #[source]
    pub error: AmortizationError,
}
