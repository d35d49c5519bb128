use crate::batch::{round2, BatchTable};
use crate::error::Result;
use crate::fiscal::LoanReport;
use std::io::Write;

pub const SCHEDULE_HEADER: [&str; 7] = [
    "Period",
    "Date",
    "Financial_Year",
    "Principal",
    "Interest",
    "Payment",
    "Balance",
];

/// Writes a batch table as CSV: header, one row per loan, then the totals row.
pub fn write_table_csv<W: Write>(table: &BatchTable, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(table.header())?;
    for row in table.display_rows() {
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes one loan's annotated schedule as CSV, dates as DD/MM/YYYY.
pub fn write_schedule_csv<W: Write>(report: &LoanReport, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(SCHEDULE_HEADER)?;
    for row in &report.schedule {
        wtr.write_record([
            row.period.to_string(),
            row.date.format("%d/%m/%Y").to_string(),
            row.fiscal_year.start_year().to_string(),
            format!("{:.2}", round2(row.principal)),
            format!("{:.2}", round2(row.interest)),
            format!("{:.2}", round2(row.payment)),
            format!("{:.2}", round2(row.balance)),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn table_to_json(table: &BatchTable) -> Result<String> {
    Ok(serde_json::to_string_pretty(table)?)
}
