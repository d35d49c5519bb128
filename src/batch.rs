use crate::fiscal::{FiscalMetric, FiscalSummaryRow};
use crate::utils::FiscalYear;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const TOTAL_LABEL: &str = "Total";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRow {
    pub loan_id: String,
    pub label: String,
    /// One value per column of the owning table, zero where the loan has no entry
    pub values: Vec<f64>,
    pub total: f64,
}

/// One metric across a batch of loans, with fiscal years aligned and totals appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchTable {
    pub metric: FiscalMetric,
    pub columns: Vec<FiscalYear>,
    pub rows: Vec<BatchRow>,
    pub totals: BatchRow,
}

/// Merges one metric's per-loan rows into a single table.
///
/// Columns are the union of every row's fiscal years in ascending order. Rows keep
/// their input order.
pub fn combine(rows: &[FiscalSummaryRow], metric: FiscalMetric) -> BatchTable {
    let columns: Vec<FiscalYear> = rows
        .iter()
        .flat_map(|row| row.values.keys().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let table_rows: Vec<BatchRow> = rows
        .iter()
        .map(|row| {
            let values: Vec<f64> = columns.iter().map(|&year| row.value(year)).collect();
            BatchRow {
                loan_id: row.loan_id.clone(),
                label: row.label.clone(),
                total: values.iter().sum(),
                values,
            }
        })
        .collect();

    let column_totals: Vec<f64> = (0..columns.len())
        .map(|idx| table_rows.iter().map(|row| row.values[idx]).sum())
        .collect();

    let totals = BatchRow {
        loan_id: TOTAL_LABEL.to_string(),
        label: String::new(),
        values: column_totals,
        total: table_rows.iter().map(|row| row.total).sum(),
    };

    BatchTable {
        metric,
        columns,
        rows: table_rows,
        totals,
    }
}

pub fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    // -0.0 prints as "-0.00"
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

impl BatchTable {
    pub fn column_labels(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|year| format!("{} {}", self.metric.prefix(), year))
            .collect()
    }

    /// Header row: `Sr no`, `Loan name`, one column per fiscal year, `Total`.
    pub fn header(&self) -> Vec<String> {
        let mut header = vec!["Sr no".to_string(), "Loan name".to_string()];
        header.extend(self.column_labels());
        header.push(TOTAL_LABEL.to_string());
        header
    }

    /// Loan rows followed by the totals row, values rounded to 2 decimals.
    pub fn display_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .chain(std::iter::once(&self.totals))
            .map(|row| {
                let mut cells = vec![row.loan_id.clone(), row.label.clone()];
                cells.extend(row.values.iter().map(|v| format!("{:.2}", round2(*v))));
                cells.push(format!("{:.2}", round2(row.total)));
                cells
            })
            .collect()
    }

    pub fn value(&self, loan_id: &str, year: FiscalYear) -> Option<f64> {
        let idx = self.columns.iter().position(|c| *c == year)?;
        self.rows
            .iter()
            .find(|row| row.loan_id == loan_id)
            .map(|row| row.values[idx])
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
