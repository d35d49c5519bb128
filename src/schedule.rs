use crate::error::Result;
use crate::schema::{validate_loan_terms, LoanInput};
use crate::utils::{add_months_clamped, FiscalCalendar, FiscalYear};
use chrono::NaiveDate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRow {
    /// 1-based installment number
    pub period: u32,
    pub date: NaiveDate,
    pub fiscal_year: FiscalYear,
    pub principal: f64,
    pub interest: f64,
    pub payment: f64,
    /// Closing balance after this installment
    pub balance: f64,
}

pub fn monthly_rate(annual_rate_percent: f64) -> f64 {
    annual_rate_percent / 100.0 / 12.0
}

/// Level installment that amortizes `principal` over `periods` months.
///
/// Rates too small for `(1 + r)^n` to differ from 1 in f64 fall back to straight-line
/// repayment, `principal / periods`.
pub fn level_installment(principal: f64, monthly_rate: f64, periods: u32) -> f64 {
    let growth = (1.0 + monthly_rate).powf(periods as f64);
    if growth - 1.0 <= f64::EPSILON {
        return principal / periods as f64;
    }
    principal * monthly_rate * growth / (growth - 1.0)
}

pub fn generate_schedule(
    principal: f64,
    annual_rate_percent: f64,
    term_months: u32,
    start_date: NaiveDate,
    fixed_payment: Option<f64>,
    calendar: &FiscalCalendar,
) -> Result<Vec<ScheduleRow>> {
    validate_loan_terms(principal, annual_rate_percent, term_months, fixed_payment)?;

    let rate = monthly_rate(annual_rate_percent);
    let installment = match fixed_payment {
        Some(payment) if payment > 0.0 => payment,
        _ => level_installment(principal, rate, term_months),
    };

    debug!(
        "Generating {} periods from {} with installment {:.6} (monthly rate {:.6})",
        term_months, start_date, installment, rate
    );

    let mut rows = Vec::with_capacity(term_months as usize);
    let mut balance = principal;

    for period in 1..=term_months {
        let date = add_months_clamped(start_date, period - 1)?;

        let interest = balance * rate;
        let mut principal_part = installment - interest;
        let mut payment = installment;

        if principal_part > balance {
            principal_part = balance;
            payment = principal_part + interest;
        }

        if principal_part < 0.0 {
            warn!(
                "Period {} ({}): payment {:.6} does not cover interest {:.6}, balance grows",
                period, date, installment, interest
            );
        }

        balance -= principal_part;

        rows.push(ScheduleRow {
            period,
            date,
            fiscal_year: calendar.fiscal_year_of(date),
            principal: principal_part,
            interest,
            payment,
            balance,
        });
    }

    Ok(rows)
}

pub fn generate_for_loan(loan: &LoanInput, calendar: &FiscalCalendar) -> Result<Vec<ScheduleRow>> {
    generate_schedule(
        loan.principal,
        loan.annual_rate_percent,
        loan.term_months,
        loan.start_date,
        loan.effective_fixed_payment(),
        calendar,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AmortizationError;

    const EPS: f64 = 1e-6;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn reference_schedule() -> Vec<ScheduleRow> {
        generate_schedule(15.0, 12.0, 36, date(2022, 2, 22), None, &FiscalCalendar::default())
            .unwrap()
    }

    #[test]
    fn test_level_installment() {
        let installment = level_installment(15.0, 0.01, 36);
        assert!(
            (installment - 0.498215).abs() < 1e-5,
            "installment was {}",
            installment
        );
    }

    #[test]
    fn test_reference_loan_first_period() {
        let rows = reference_schedule();
        assert_eq!(rows.len(), 36);

        let first = &rows[0];
        assert_eq!(first.period, 1);
        assert_eq!(first.date, date(2022, 2, 22));
        assert_eq!(first.fiscal_year, FiscalYear(2021));
        assert!((first.interest - 0.15).abs() < EPS);
        assert!((first.principal - 0.348215).abs() < 1e-5);
        assert!((first.balance - (15.0 - first.principal)).abs() < EPS);
    }

    #[test]
    fn test_schedule_fully_amortizes() {
        let rows = reference_schedule();

        let principal_sum: f64 = rows.iter().map(|r| r.principal).sum();
        assert!((principal_sum - 15.0).abs() < EPS, "sum was {}", principal_sum);

        let last = rows.last().unwrap();
        assert!(last.balance.abs() < EPS, "final balance {}", last.balance);
        assert_eq!(last.date, date(2025, 1, 22));
        assert_eq!(last.fiscal_year, FiscalYear(2024));
    }

    #[test]
    fn test_interest_accrues_on_prior_balance() {
        let rows = reference_schedule();
        let mut prior = 15.0;
        for row in &rows {
            assert!((row.interest - prior * 0.01).abs() < 1e-9);
            assert!((row.balance - (prior - row.principal)).abs() < 1e-9);
            prior = row.balance;
        }
    }

    #[test]
    fn test_dates_advance_by_calendar_month_with_clamping() {
        let rows =
            generate_schedule(1200.0, 6.0, 5, date(2024, 1, 31), None, &FiscalCalendar::default())
                .unwrap();
        let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![
                date(2024, 1, 31),
                date(2024, 2, 29),
                date(2024, 3, 31),
                date(2024, 4, 30),
                date(2024, 5, 31),
            ]
        );
        assert_eq!(rows[2].fiscal_year, FiscalYear(2023));
        assert_eq!(rows[3].fiscal_year, FiscalYear(2024));
    }

    #[test]
    fn test_negative_amortization_is_allowed() {
        // 1% monthly on 1000 accrues 10; paying 5 leaves 5 unpaid interest each month
        let rows = generate_schedule(
            1000.0,
            12.0,
            3,
            date(2023, 4, 1),
            Some(5.0),
            &FiscalCalendar::default(),
        )
        .unwrap();

        assert!((rows[0].interest - 10.0).abs() < EPS);
        assert!((rows[0].principal + 5.0).abs() < EPS);
        assert!((rows[0].payment - 5.0).abs() < EPS);
        assert!((rows[0].balance - 1005.0).abs() < EPS);
        assert!(rows[2].balance > rows[1].balance);
    }

    #[test]
    fn test_large_fixed_payment_trues_up_and_then_idles() {
        let rows = generate_schedule(
            100.0,
            12.0,
            4,
            date(2023, 4, 1),
            Some(60.0),
            &FiscalCalendar::default(),
        )
        .unwrap();

        // Period 2 caps principal to the remaining balance
        assert!((rows[0].principal - 59.0).abs() < EPS);
        assert!((rows[1].principal - 41.0).abs() < EPS);
        assert!((rows[1].payment - (41.0 + 0.41)).abs() < EPS);
        assert!(rows[1].balance.abs() < EPS);

        for row in &rows[2..] {
            assert!(row.principal.abs() < EPS);
            assert!(row.interest.abs() < EPS);
            assert!(row.payment.abs() < EPS);
        }
    }

    #[test]
    fn test_zero_fixed_payment_uses_level_installment() {
        let auto = reference_schedule();
        let zero = generate_schedule(
            15.0,
            12.0,
            36,
            date(2022, 2, 22),
            Some(0.0),
            &FiscalCalendar::default(),
        )
        .unwrap();
        assert_eq!(auto, zero);
    }

    #[test]
    fn test_negative_fixed_payment_uses_level_installment() {
        let auto = reference_schedule();
        let negative = generate_schedule(
            15.0,
            12.0,
            36,
            date(2022, 2, 22),
            Some(-1.0),
            &FiscalCalendar::default(),
        )
        .unwrap();
        assert_eq!(auto, negative);
    }

    #[test]
    fn test_tiny_rate_falls_back_to_straight_line() {
        let rate = monthly_rate(1e-15);
        assert_eq!((1.0 + rate).powf(12.0), 1.0);

        let installment = level_installment(120.0, rate, 12);
        assert!(installment.is_finite());
        assert!((installment - 10.0).abs() < EPS);

        let rows =
            generate_schedule(120.0, 1e-15, 12, date(2023, 4, 1), None, &FiscalCalendar::default())
                .unwrap();
        assert!((rows[0].principal - 10.0).abs() < EPS);
        assert!((rows[0].balance - 110.0).abs() < EPS);
        assert!(rows.last().unwrap().balance.abs() < EPS);
    }

    #[test]
    fn test_single_period_loan() {
        let rows =
            generate_schedule(100.0, 12.0, 1, date(2023, 4, 1), None, &FiscalCalendar::default())
                .unwrap();
        assert_eq!(rows.len(), 1);
        assert!((rows[0].payment - 101.0).abs() < EPS);
        assert!(rows[0].balance.abs() < EPS);
    }

    #[test]
    fn test_invalid_inputs() {
        let cal = FiscalCalendar::default();
        let start = date(2023, 4, 1);
        for (principal, rate, term) in [
            (0.0, 12.0, 12),
            (-5.0, 12.0, 12),
            (100.0, 0.0, 12),
            (100.0, -1.0, 12),
            (100.0, 50.0, 12),
            (100.0, 12.0, 0),
            (100.0, 12.0, 1201),
            (100.0, 12.0, u32::MAX),
            (f64::NAN, 12.0, 12),
        ] {
            let result = generate_schedule(principal, rate, term, start, None, &cal);
            assert!(
                matches!(result, Err(AmortizationError::InvalidInput { .. })),
                "expected InvalidInput for ({}, {}, {})",
                principal,
                rate,
                term
            );
        }
    }
}
