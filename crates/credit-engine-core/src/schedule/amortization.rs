//! Loan amortization schedules.
//!
//! Three repayment shapes selected by the loan's amortization type:
//! 1. **Interest-only** -- interest every period, principal at maturity.
//! 2. **Amortizing** -- equal installment via the annuity formula, with the
//!    final period's principal forced to the remaining balance so rounding
//!    drift never survives to the last row.
//! 3. **Bullet** -- same cash-flow shape as interest-only; no partial
//!    amortization is ever permitted.
//!
//! Every monetary output is rounded to 2 decimal places at each step, not
//! just at the end: schedules must reconcile row-by-row with ledgered
//! payments. All arithmetic uses `rust_decimal::Decimal`. No `f64`.

use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::CreditEngineError;
use crate::types::*;
use crate::CreditEngineResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One projected payment period.
///
/// Invariants: `closing_balance = opening_balance - principal_payment`, the
/// closing balance of row `n` equals the opening balance of row `n + 1`, and
/// the final row closes at exactly zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRow {
    /// 1-based, contiguous.
    pub period: u32,
    pub due_date: NaiveDate,
    pub opening_balance: Money,
    pub principal_payment: Money,
    pub interest_payment: Money,
    pub total_payment: Money,
    pub closing_balance: Money,
}

/// Full projected schedule for one loan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedSchedule {
    pub loan_id: String,
    pub currency: Currency,
    pub annual_rate_pct: Pct,
    pub rows: Vec<ScheduleRow>,
    pub total_principal: Money,
    pub total_interest: Money,
    pub total_payments: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Generate the full amortization schedule for one loan.
///
/// `start_date` defaults to the loan's start date and `assumed_rate_pct` to
/// the loan's current all-in rate. If maturity does not leave room for a
/// single whole period, the schedule still contains one period (a
/// single-payment loan), never zero rows.
pub fn generate_schedule(
    loan: &Loan,
    start_date: Option<NaiveDate>,
    assumed_rate_pct: Option<Pct>,
) -> CreditEngineResult<ComputationOutput<GeneratedSchedule>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if loan.principal_amount <= Decimal::ZERO {
        return Err(CreditEngineError::InvalidInput {
            field: "principal_amount".into(),
            reason: "Loan principal must be positive".into(),
        });
    }

    let annual_rate_pct = assumed_rate_pct.unwrap_or(loan.current_rate_pct);
    if annual_rate_pct < Decimal::ZERO {
        return Err(CreditEngineError::InvalidInput {
            field: "annual_rate_pct".into(),
            reason: "Annual rate cannot be negative".into(),
        });
    }

    let first_date = start_date.unwrap_or(loan.start_date);
    let periods_per_year = loan.payment_frequency.periods_per_year();
    let months_per_period = loan.payment_frequency.months_per_period();

    let months = whole_months_between(first_date, loan.maturity_date);
    let raw_periods = if months > 0 {
        months as u32 / months_per_period
    } else {
        0
    };
    let total_periods = raw_periods.max(1);
    if raw_periods == 0 {
        warnings.push(format!(
            "Maturity {} leaves no whole {:?} period after {}; clamped to a single-payment schedule.",
            loan.maturity_date, loan.payment_frequency, first_date
        ));
    }

    let periodic_rate = annual_rate_pct / dec!(100) / Decimal::from(periods_per_year);

    let rows = match loan.amortization_type {
        AmortizationType::InterestOnly | AmortizationType::Bullet => build_interest_only_rows(
            loan.principal_amount,
            periodic_rate,
            total_periods,
            first_date,
            months_per_period,
        )?,
        AmortizationType::Amortizing => {
            if periodic_rate.is_zero() {
                warnings.push(
                    "Zero periodic rate; amortizing schedule splits principal evenly.".into(),
                );
            }
            build_amortizing_rows(
                loan.principal_amount,
                periodic_rate,
                total_periods,
                first_date,
                months_per_period,
            )?
        }
    };

    let total_principal: Money = rows.iter().map(|r| r.principal_payment).sum();
    let total_interest: Money = rows.iter().map(|r| r.interest_payment).sum();
    let total_payments: Money = rows.iter().map(|r| r.total_payment).sum();

    let output = GeneratedSchedule {
        loan_id: loan.id.clone(),
        currency: loan.currency.clone(),
        annual_rate_pct,
        rows,
        total_principal,
        total_interest,
        total_payments,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Loan Amortization Schedule",
        &serde_json::json!({
            "loan": loan.id,
            "amortization_type": loan.amortization_type,
            "payment_frequency": loan.payment_frequency,
            "annual_rate_pct": annual_rate_pct.to_string(),
            "periods": total_periods,
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Whole calendar months from `start` to `end`. A partial trailing month
/// does not count; negative when `end` precedes `start`.
fn whole_months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    let mut months = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    if end.day() < start.day() {
        months -= 1;
    }
    months
}

fn due_date_for(
    first_date: NaiveDate,
    period: u32,
    months_per_period: u32,
) -> CreditEngineResult<NaiveDate> {
    first_date
        .checked_add_months(Months::new(period * months_per_period))
        .ok_or_else(|| {
            CreditEngineError::DateError(format!(
                "Due date overflow adding {} months to {first_date}",
                period * months_per_period
            ))
        })
}

fn build_interest_only_rows(
    principal: Money,
    periodic_rate: Decimal,
    total_periods: u32,
    first_date: NaiveDate,
    months_per_period: u32,
) -> CreditEngineResult<Vec<ScheduleRow>> {
    let mut rows = Vec::with_capacity(total_periods as usize);
    let interest = (principal * periodic_rate).round_dp(2);

    for period in 1..=total_periods {
        let is_final = period == total_periods;
        let principal_payment = if is_final { principal } else { Decimal::ZERO };
        let closing = principal - principal_payment;

        rows.push(ScheduleRow {
            period,
            due_date: due_date_for(first_date, period, months_per_period)?,
            opening_balance: principal,
            principal_payment,
            interest_payment: interest,
            total_payment: (principal_payment + interest).round_dp(2),
            closing_balance: closing,
        });
    }

    Ok(rows)
}

fn build_amortizing_rows(
    principal: Money,
    periodic_rate: Decimal,
    total_periods: u32,
    first_date: NaiveDate,
    months_per_period: u32,
) -> CreditEngineResult<Vec<ScheduleRow>> {
    let installment = annuity_payment(principal, periodic_rate, total_periods)?;

    let mut rows = Vec::with_capacity(total_periods as usize);
    let mut balance = principal;

    for period in 1..=total_periods {
        let opening = balance;
        let interest = (opening * periodic_rate).round_dp(2);

        // Final period absorbs rounding drift: principal is the remaining
        // balance, not the formula output.
        let is_final = period == total_periods;
        let principal_payment = if is_final {
            opening
        } else {
            (installment - interest).round_dp(2)
        };
        let total_payment = if is_final {
            (principal_payment + interest).round_dp(2)
        } else {
            installment
        };

        balance = (opening - principal_payment).round_dp(2);

        rows.push(ScheduleRow {
            period,
            due_date: due_date_for(first_date, period, months_per_period)?,
            opening_balance: opening,
            principal_payment,
            interest_payment: interest,
            total_payment,
            closing_balance: balance,
        });
    }

    Ok(rows)
}

/// Equal installment via the standard annuity formula
/// `PMT = P * r * (1+r)^n / ((1+r)^n - 1)`, rounded to 2 decimal places.
/// Degenerates to an even principal split at a zero rate.
fn annuity_payment(
    principal: Money,
    periodic_rate: Decimal,
    total_periods: u32,
) -> CreditEngineResult<Money> {
    if total_periods == 0 {
        return Err(CreditEngineError::InvalidInput {
            field: "total_periods".into(),
            reason: "Annuity requires at least one period".into(),
        });
    }

    if periodic_rate.is_zero() {
        return Ok((principal / Decimal::from(total_periods)).round_dp(2));
    }

    let one_plus_r = Decimal::ONE + periodic_rate;
    let factor = one_plus_r.powd(Decimal::from(total_periods));
    let denominator = factor - Decimal::ONE;
    if denominator.is_zero() {
        return Err(CreditEngineError::DivisionByZero {
            context: "annuity factor".into(),
        });
    }

    Ok((principal * periodic_rate * factor / denominator).round_dp(2))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
