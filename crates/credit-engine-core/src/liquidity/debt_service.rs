//! Debt-service windows: totals over a date range and per-loan horizon
//! impact for liquidity planning.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CreditEngineError;
use crate::types::*;
use crate::CreditEngineResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Open debt payments falling due inside a window, in one currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtPaymentsTotal {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub currency: Currency,
    pub principal: Money,
    pub interest: Money,
    pub fees: Money,
    pub total: Money,
    pub payment_count: u64,
}

/// Upcoming obligations of one loan inside a planning horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanLiquidityImpact {
    pub loan_id: String,
    pub as_of: NaiveDate,
    pub horizon_days: u64,
    pub payment_count: u64,
    pub principal_due: Money,
    pub interest_due: Money,
    pub fees_due: Money,
    pub total_due: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_payment_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_payment_amount: Option<Money>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Total open debt payments due in `[from, to]` for one currency.
pub fn total_debt_payments(
    payments: &[Payment],
    from: NaiveDate,
    to: NaiveDate,
    currency: &Currency,
) -> CreditEngineResult<DebtPaymentsTotal> {
    if to < from {
        return Err(CreditEngineError::DateError(format!(
            "Window end {to} precedes start {from}"
        )));
    }

    let mut principal = Decimal::ZERO;
    let mut interest = Decimal::ZERO;
    let mut fees = Decimal::ZERO;
    let mut payment_count = 0;

    for payment in payments {
        if !payment.is_open()
            || &payment.currency != currency
            || payment.due_date < from
            || payment.due_date > to
        {
            continue;
        }
        principal += payment.principal_part;
        interest += payment.interest_part;
        fees += payment.fees_part;
        payment_count += 1;
    }

    Ok(DebtPaymentsTotal {
        from,
        to,
        currency: currency.clone(),
        principal,
        interest,
        fees,
        total: principal + interest + fees,
        payment_count,
    })
}

/// Upcoming open payments of one loan within `horizon_days` of `as_of`.
pub fn loan_liquidity_impact(
    loan: &Loan,
    payments: &[Payment],
    as_of: NaiveDate,
    horizon_days: u64,
) -> LoanLiquidityImpact {
    let horizon_end = as_of
        .checked_add_days(Days::new(horizon_days))
        .unwrap_or(NaiveDate::MAX);

    let mut principal = Decimal::ZERO;
    let mut interest = Decimal::ZERO;
    let mut fees = Decimal::ZERO;
    let mut payment_count = 0;
    let mut next: Option<(NaiveDate, Money)> = None;

    for payment in payments {
        if payment.loan_id != loan.id
            || !payment.is_open()
            || payment.due_date < as_of
            || payment.due_date > horizon_end
        {
            continue;
        }
        principal += payment.principal_part;
        interest += payment.interest_part;
        fees += payment.fees_part;
        payment_count += 1;
        if next.map_or(true, |(d, _)| payment.due_date < d) {
            next = Some((payment.due_date, payment.amount));
        }
    }

    LoanLiquidityImpact {
        loan_id: loan.id.clone(),
        as_of,
        horizon_days,
        payment_count,
        principal_due: principal,
        interest_due: interest,
        fees_due: fees,
        total_due: principal + interest + fees,
        next_payment_date: next.map(|(d, _)| d),
        next_payment_amount: next.map(|(_, a)| a),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
