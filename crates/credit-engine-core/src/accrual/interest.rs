//! Effective-rate resolution and interest cost aggregation.
//!
//! The year-to-date summary blends realized and projected interest by
//! design: settled interest since January 1 plus accrual-to-date on the
//! current outstanding balance. A forecast consumer needs the
//! forward-looking total, not just settled cash.
//!
//! This calculator is a pure aggregation; it never writes to loans or
//! payments.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use super::day_count::{actual_days, year_fraction, DayCountMethod};
use crate::config::EngineConfig;
use crate::error::CreditEngineError;
use crate::types::*;
use crate::CreditEngineResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Interest accrued over one period on a flat principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterestCalculation {
    pub principal: Money,
    pub annual_rate_pct: Pct,
    pub accrual_start: NaiveDate,
    pub accrual_end: NaiveDate,
    pub days: i64,
    pub day_count: DayCountMethod,
    pub interest: Money,
}

/// Per-loan detail inside the YTD summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanInterestDetail {
    pub loan_id: String,
    pub outstanding: Money,
    pub current_rate_pct: Pct,
    pub interest_paid_ytd: Money,
    pub interest_accrued: Money,
    /// Start of the open accrual window: the latest paid-payment date, or
    /// the loan start when nothing has been paid.
    pub accrued_from: NaiveDate,
}

/// Portfolio interest cost, year to date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterestCostSummary {
    pub currency: Currency,
    pub as_of: NaiveDate,
    pub interest_paid_ytd: Money,
    pub interest_accrued: Money,
    pub total_interest_ytd: Money,
    pub loans: Vec<LoanInterestDetail>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Live fixing for a floating loan's index, falling back to the configured
/// default. `None` only for indexes absent from both maps.
pub fn resolve_base_rate(
    index: &BaseRateIndex,
    fixings: &BTreeMap<BaseRateIndex, Pct>,
    config: &EngineConfig,
) -> Option<Pct> {
    fixings
        .get(index)
        .copied()
        .or_else(|| config.default_base_rates.get(index).copied())
}

/// Effective annual rate for a loan in percent. Fixed loans use the
/// contract rate; floating loans use fixing + spread, with an unresolvable
/// index contributing zero (the spread still applies).
pub fn current_rate_pct(
    loan: &Loan,
    fixings: &BTreeMap<BaseRateIndex, Pct>,
    config: &EngineConfig,
) -> Pct {
    match &loan.rate_type {
        RateType::Fixed { rate_pct } => *rate_pct,
        RateType::Floating {
            base_rate,
            spread_pct,
        } => {
            let base = resolve_base_rate(base_rate, fixings, config).unwrap_or(Decimal::ZERO);
            base + spread_pct
        }
    }
}

/// Interest on a flat principal between two dates under a day-count
/// convention, rounded to 2 decimal places.
pub fn period_interest(
    principal: Money,
    annual_rate_pct: Pct,
    accrual_start: NaiveDate,
    accrual_end: NaiveDate,
    method: DayCountMethod,
) -> CreditEngineResult<InterestCalculation> {
    if principal < Decimal::ZERO {
        return Err(CreditEngineError::InvalidInput {
            field: "principal".into(),
            reason: "Principal cannot be negative".into(),
        });
    }

    let fraction = year_fraction(accrual_start, accrual_end, method)?;
    let interest = (principal * annual_rate_pct / dec!(100) * fraction).round_dp(2);

    Ok(InterestCalculation {
        principal,
        annual_rate_pct,
        accrual_start,
        accrual_end,
        days: actual_days(accrual_start, accrual_end),
        day_count: method,
        interest,
    })
}

/// Year-to-date interest cost across a loan portfolio in one currency.
///
/// For each active loan: settled interest since January 1 of the `as_of`
/// year, plus Actual/360 accrual on the current outstanding balance from
/// the latest paid payment (or the loan start) through `as_of`.
pub fn interest_cost_ytd(
    loans: &[Loan],
    payments: &[Payment],
    currency: &Currency,
    fixings: &BTreeMap<BaseRateIndex, Pct>,
    config: &EngineConfig,
    as_of: NaiveDate,
) -> CreditEngineResult<ComputationOutput<InterestCostSummary>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let jan_first = NaiveDate::from_ymd_opt(as_of.year(), 1, 1).ok_or_else(|| {
        CreditEngineError::DateError(format!("No January 1 for year {}", as_of.year()))
    })?;

    let mut details: Vec<LoanInterestDetail> = Vec::new();
    let mut total_paid = Decimal::ZERO;
    let mut total_accrued = Decimal::ZERO;

    for loan in loans {
        if loan.status != LoanStatus::Active || &loan.currency != currency {
            continue;
        }

        if let RateType::Floating { base_rate, .. } = &loan.rate_type {
            if resolve_base_rate(base_rate, fixings, config).is_none() {
                warnings.push(format!(
                    "Loan {}: no fixing or default for {base_rate:?}; spread-only rate used.",
                    loan.id
                ));
            }
        }
        let rate_pct = current_rate_pct(loan, fixings, config);

        let mut interest_paid = Decimal::ZERO;
        let mut latest_paid: Option<NaiveDate> = None;
        for payment in payments {
            if payment.loan_id != loan.id || payment.status != PaymentStatus::Paid {
                continue;
            }
            let settled_on = payment.paid_date.unwrap_or(payment.due_date);
            if settled_on >= jan_first && settled_on <= as_of {
                interest_paid += payment.interest_part;
            }
            if latest_paid.map_or(true, |d| settled_on > d) {
                latest_paid = Some(settled_on);
            }
        }

        let accrued_from = latest_paid.unwrap_or(loan.start_date);
        let interest_accrued = if accrued_from < as_of {
            period_interest(
                loan.outstanding_amount,
                rate_pct,
                accrued_from,
                as_of,
                DayCountMethod::Actual360,
            )?
            .interest
        } else {
            Decimal::ZERO
        };

        total_paid += interest_paid;
        total_accrued += interest_accrued;
        details.push(LoanInterestDetail {
            loan_id: loan.id.clone(),
            outstanding: loan.outstanding_amount,
            current_rate_pct: rate_pct,
            interest_paid_ytd: interest_paid,
            interest_accrued,
            accrued_from,
        });
    }

    if details.is_empty() {
        warnings.push(format!(
            "No active loans in {currency:?}; summary is empty."
        ));
    }

    let output = InterestCostSummary {
        currency: currency.clone(),
        as_of,
        interest_paid_ytd: total_paid,
        interest_accrued: total_accrued,
        total_interest_ytd: total_paid + total_accrued,
        loans: details,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Interest Cost Year-to-Date",
        &serde_json::json!({
            "currency": currency,
            "as_of": as_of.to_string(),
            "day_count": "actual_360",
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
