//! Conversion of debt obligations into normalized cash-flow events.
//!
//! Each obligation splits into up to two flow records -- principal and
//! interest -- so a downstream forecasting system can categorize them
//! independently. Ledgered payments export as confirmed; projected schedule
//! rows export as unconfirmed. The two carry different certainty and the
//! distinction must survive the export. This is a forward obligation feed:
//! settled history is never exported.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;

use crate::schedule::amortization::{generate_schedule, GeneratedSchedule};
use crate::types::*;
use crate::CreditEngineResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowCategory {
    DebtPrincipal,
    DebtInterest,
}

/// One normalized outbound cash-flow event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObligationFlow {
    pub date: NaiveDate,
    pub amount: Money,
    pub currency: Currency,
    pub category: FlowCategory,
    /// True for ledgered payments, false for projected schedule rows.
    pub is_confirmed: bool,
    pub loan_id: String,
    pub description: String,
}

/// Portfolio obligation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityExportOutput {
    pub as_of: NaiveDate,
    pub flows: Vec<ObligationFlow>,
    pub confirmed_count: u64,
    pub projected_count: u64,
    pub total_principal: Money,
    pub total_interest: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Export future-or-current, non-paid ledger payments for the given loan
/// portfolio as confirmed flows. Fees ride on the interest leg: they are a
/// non-principal cost of carry to a forecast consumer.
pub fn payments_to_flows(
    payments: &[Payment],
    loans: &[Loan],
    as_of: NaiveDate,
) -> Vec<ObligationFlow> {
    let loan_ids: BTreeSet<&str> = loans.iter().map(|l| l.id.as_str()).collect();

    let mut result = Vec::new();
    for payment in payments {
        if !payment.is_open() || payment.due_date < as_of {
            continue;
        }
        if !loan_ids.contains(payment.loan_id.as_str()) {
            continue;
        }

        if payment.principal_part > Decimal::ZERO {
            result.push(ObligationFlow {
                date: payment.due_date,
                amount: payment.principal_part,
                currency: payment.currency.clone(),
                category: FlowCategory::DebtPrincipal,
                is_confirmed: true,
                loan_id: payment.loan_id.clone(),
                description: format!("Loan {} principal installment", payment.loan_id),
            });
        }

        let carry = payment.interest_part + payment.fees_part;
        if carry > Decimal::ZERO {
            result.push(ObligationFlow {
                date: payment.due_date,
                amount: carry,
                currency: payment.currency.clone(),
                category: FlowCategory::DebtInterest,
                is_confirmed: true,
                loan_id: payment.loan_id.clone(),
                description: format!("Loan {} interest and fees", payment.loan_id),
            });
        }
    }
    result
}

/// Export projected schedule rows as unconfirmed flows, optionally limited
/// to rows due on or after `from_date`.
pub fn schedule_to_flows(
    schedule: &GeneratedSchedule,
    loan: &Loan,
    from_date: Option<NaiveDate>,
) -> Vec<ObligationFlow> {
    let mut result = Vec::new();
    for row in &schedule.rows {
        if let Some(from) = from_date {
            if row.due_date < from {
                continue;
            }
        }

        if row.principal_payment > Decimal::ZERO {
            result.push(ObligationFlow {
                date: row.due_date,
                amount: row.principal_payment,
                currency: loan.currency.clone(),
                category: FlowCategory::DebtPrincipal,
                is_confirmed: false,
                loan_id: loan.id.clone(),
                description: format!("Loan {} projected principal, period {}", loan.id, row.period),
            });
        }
        if row.interest_payment > Decimal::ZERO {
            result.push(ObligationFlow {
                date: row.due_date,
                amount: row.interest_payment,
                currency: loan.currency.clone(),
                category: FlowCategory::DebtInterest,
                is_confirmed: false,
                loan_id: loan.id.clone(),
                description: format!("Loan {} projected interest, period {}", loan.id, row.period),
            });
        }
    }
    result
}

/// Export the full forward obligation feed for a loan portfolio.
///
/// Loans with open ledger payments export those as confirmed flows; loans
/// with no ledgered schedule fall back to a projected amortization
/// schedule, exported unconfirmed. A loan never contributes both, so the
/// feed cannot double-count.
pub fn export_obligations(
    loans: &[Loan],
    payments: &[Payment],
    as_of: NaiveDate,
) -> CreditEngineResult<ComputationOutput<LiquidityExportOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let mut flows: Vec<ObligationFlow> = Vec::new();

    for loan in loans {
        if loan.status != LoanStatus::Active {
            continue;
        }

        let has_open_ledger = payments
            .iter()
            .any(|p| p.loan_id == loan.id && p.is_open() && p.due_date >= as_of);

        if has_open_ledger {
            flows.extend(payments_to_flows(
                payments,
                std::slice::from_ref(loan),
                as_of,
            ));
        } else {
            let generated = generate_schedule(loan, None, None)?;
            warnings.extend(generated.warnings.iter().map(|w| format!("Loan {}: {w}", loan.id)));
            warnings.push(format!(
                "Loan {} has no open ledger payments; projected schedule exported.",
                loan.id
            ));
            flows.extend(schedule_to_flows(&generated.result, loan, Some(as_of)));
        }
    }

    flows.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.loan_id.cmp(&b.loan_id)));

    let confirmed_count = flows.iter().filter(|f| f.is_confirmed).count() as u64;
    let projected_count = flows.len() as u64 - confirmed_count;
    let total_principal: Money = flows
        .iter()
        .filter(|f| f.category == FlowCategory::DebtPrincipal)
        .map(|f| f.amount)
        .sum();
    let total_interest: Money = flows
        .iter()
        .filter(|f| f.category == FlowCategory::DebtInterest)
        .map(|f| f.amount)
        .sum();

    let output = LiquidityExportOutput {
        as_of,
        flows,
        confirmed_count,
        projected_count,
        total_principal,
        total_interest,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Obligation Export",
        &serde_json::json!({
            "loan_count": loans.len(),
            "as_of": as_of.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
