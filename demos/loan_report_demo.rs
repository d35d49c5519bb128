use chrono::NaiveDate;
use loan_fiscal_report::*;

fn print_table(table: &BatchTable) {
    println!("\n📊 {}:", table.metric);
    println!("  {}", table.header().join(" | "));
    for row in table.display_rows() {
        println!("  {}", row.join(" | "));
    }
}

fn main() {
    println!("🏦 Loan Fiscal Report Demo\n");
    println!("Three loans with different start dates and terms, reported by April-March fiscal year.\n");

    let loans = vec![
        LoanInput {
            id: "1".to_string(),
            label: "A1".to_string(),
            principal: 15.0,
            annual_rate_percent: 12.0,
            term_months: 36,
            start_date: NaiveDate::from_ymd_opt(2022, 2, 22).unwrap(),
            fixed_payment: None,
        },
        LoanInput {
            id: "2".to_string(),
            label: "Term loan HDFC".to_string(),
            principal: 40.0,
            annual_rate_percent: 9.25,
            term_months: 60,
            start_date: NaiveDate::from_ymd_opt(2023, 7, 31).unwrap(),
            fixed_payment: None,
        },
        LoanInput {
            id: "3".to_string(),
            label: "Vehicle loan".to_string(),
            principal: 6.5,
            annual_rate_percent: 10.5,
            term_months: 48,
            start_date: NaiveDate::from_ymd_opt(2024, 4, 5).unwrap(),
            fixed_payment: Some(0.2),
        },
    ];

    let report = process_batch(&loans);

    for rejection in &report.rejected {
        eprintln!("❌ {}", rejection);
    }

    for table in report.tables() {
        print_table(table);
    }

    if let Some(first) = report.reports.first() {
        println!("\n📋 Schedule for loan {} ({}), first 6 periods:", first.meta.id, first.meta.label);
        for row in first.schedule.iter().take(6) {
            println!(
                "  #{:>3} {} {}  principal {:>8.4}  interest {:>8.4}  balance {:>9.4}",
                row.period, row.date, row.fiscal_year, row.principal, row.interest, row.balance
            );
        }
    }

    match write_table_csv(&report.principal, std::io::stdout()) {
        Ok(()) => println!("\n✅ Principal table written as CSV above"),
        Err(e) => eprintln!("❌ Error: {}", e),
    }
}
