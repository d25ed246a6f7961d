//! Loan-to-value calculation, status classification and margin calls.
//!
//! LTV saturates at 100 when the pledged value is non-positive: a pledge
//! worth nothing cannot divide, but it must still signal maximal risk. The
//! margin call restores LTV exactly to target, not merely out of breach.
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use super::valuation::needs_revaluation;
use crate::config::EngineConfig;
use crate::error::CreditEngineError;
use crate::types::*;
use crate::CreditEngineResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Full LTV picture for one collateral item against its linked exposure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LtvCalculation {
    pub collateral_id: String,
    pub link: EntityLink,
    pub loan_outstanding: Money,
    pub current_value: Money,
    /// Haircut actually applied (stored or configured default).
    pub haircut_pct: Pct,
    pub pledged_value: Money,
    pub ltv_pct: Pct,
    pub target_ltv_pct: Pct,
    pub status: ComplianceStatus,
    /// Additional pledged value needed to restore LTV to target; zero
    /// unless the item is at risk or breached.
    pub margin_call_amount: Money,
}

/// A collateral item whose LTV exceeds its target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LtvBreachEvent {
    pub collateral_id: String,
    pub link: EntityLink,
    pub ltv_pct: Pct,
    pub target_ltv_pct: Pct,
    pub excess_pct: Pct,
    pub margin_call_amount: Money,
}

/// Portfolio LTV monitoring run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LtvMonitorOutput {
    pub calculations: Vec<LtvCalculation>,
    pub breaches: Vec<LtvBreachEvent>,
    pub total_pledged: Money,
    pub total_outstanding: Money,
    /// Aggregate outstanding over aggregate pledged, saturated like the
    /// per-item ratio.
    pub portfolio_ltv_pct: Pct,
    pub ok_count: u64,
    pub at_risk_count: u64,
    pub breach_count: u64,
}

/// One bar of the portfolio LTV histogram.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LtvBucket {
    pub label: String,
    pub count: u64,
    pub pledged_value: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Lendable value of a pledge: market value net of haircut, rounded to
/// 2 decimal places. Haircuts are clamped into [0, 100] so a malformed
/// haircut can never produce a pledged value above market or below zero.
pub fn pledged_value(current_value: Money, haircut_pct: Pct) -> Money {
    let haircut = haircut_pct.clamp(Decimal::ZERO, dec!(100));
    (current_value * (Decimal::ONE - haircut / dec!(100))).round_dp(2)
}

/// LTV in percent. Saturates at 100 for non-positive pledged value.
pub fn current_ltv(loan_outstanding: Money, pledged: Money) -> Pct {
    if pledged <= Decimal::ZERO {
        return dec!(100);
    }
    (loan_outstanding / pledged * dec!(100)).round_dp(2)
}

/// Classify an LTV against its target with a warning buffer (maximum-style
/// threshold, so the buffer contracts the ok zone downward).
pub fn determine_ltv_status(
    ltv_pct: Pct,
    target_ltv_pct: Pct,
    warning_buffer_pct: Pct,
) -> ComplianceStatus {
    if ltv_pct > target_ltv_pct {
        return ComplianceStatus::Breach;
    }
    let warning_floor = target_ltv_pct * (Decimal::ONE - warning_buffer_pct / dec!(100));
    if ltv_pct >= warning_floor {
        ComplianceStatus::AtRisk
    } else {
        ComplianceStatus::Ok
    }
}

/// Additional pledged value needed to bring LTV back exactly to target.
/// A non-positive target yields no computable requirement and returns zero.
pub fn margin_call_amount(
    loan_outstanding: Money,
    target_ltv_pct: Pct,
    current_pledged: Money,
) -> Money {
    if target_ltv_pct <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let required_pledged = loan_outstanding / (target_ltv_pct / dec!(100));
    (required_pledged - current_pledged).max(Decimal::ZERO).round_dp(2)
}

/// Full LTV calculation for one collateral item.
pub fn compute_ltv_calculation(
    collateral: &Collateral,
    loan_outstanding: Money,
    config: &EngineConfig,
) -> LtvCalculation {
    let haircut_pct = collateral
        .haircut_pct
        .unwrap_or_else(|| config.default_haircut_pct(&collateral.collateral_type));
    let pledged = pledged_value(collateral.current_value, haircut_pct);
    let ltv_pct = current_ltv(loan_outstanding, pledged);
    let status = determine_ltv_status(
        ltv_pct,
        collateral.target_ltv_pct,
        config.ltv_warning_buffer_pct,
    );

    let margin_call = if status == ComplianceStatus::Ok {
        Decimal::ZERO
    } else {
        margin_call_amount(loan_outstanding, collateral.target_ltv_pct, pledged)
    };

    LtvCalculation {
        collateral_id: collateral.id.clone(),
        link: collateral.link.clone(),
        loan_outstanding,
        current_value: collateral.current_value,
        haircut_pct,
        pledged_value: pledged,
        ltv_pct,
        target_ltv_pct: collateral.target_ltv_pct,
        status,
        margin_call_amount: margin_call,
    }
}

/// Monitor a collateral portfolio against linked exposures.
///
/// `exposures` maps the linked facility/loan id to its outstanding amount.
/// Items without an exposure entry are computed against zero and warned.
/// The portfolio is expected to be single-currency; callers pre-filter.
pub fn check_all_ltv_breaches(
    collateral: &[Collateral],
    exposures: &BTreeMap<String, Money>,
    config: &EngineConfig,
    as_of: NaiveDate,
) -> CreditEngineResult<ComputationOutput<LtvMonitorOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if collateral.is_empty() {
        return Err(CreditEngineError::InsufficientData(
            "At least one collateral item must be provided.".into(),
        ));
    }

    let mut calculations: Vec<LtvCalculation> = Vec::with_capacity(collateral.len());
    let mut breaches: Vec<LtvBreachEvent> = Vec::new();
    let mut total_pledged = Decimal::ZERO;
    let mut total_outstanding = Decimal::ZERO;
    let mut ok_count = 0;
    let mut at_risk_count = 0;
    let mut breach_count = 0;

    for item in collateral {
        let linked_id = match &item.link {
            EntityLink::Facility(id) | EntityLink::Loan(id) => id,
        };
        let outstanding = match exposures.get(linked_id) {
            Some(amount) => *amount,
            None => {
                warnings.push(format!(
                    "Collateral '{}': no exposure supplied for linked entity '{linked_id}'; assuming zero.",
                    item.id
                ));
                Decimal::ZERO
            }
        };

        if needs_revaluation(item, as_of, config.revaluation_max_age_days) {
            warnings.push(format!(
                "Collateral '{}' needs revaluation (never valued or older than {} days).",
                item.id, config.revaluation_max_age_days
            ));
        }

        let calc = compute_ltv_calculation(item, outstanding, config);
        total_pledged += calc.pledged_value;
        total_outstanding += calc.loan_outstanding;

        match calc.status {
            ComplianceStatus::Ok => ok_count += 1,
            ComplianceStatus::AtRisk => at_risk_count += 1,
            ComplianceStatus::Breach => {
                breach_count += 1;
                breaches.push(LtvBreachEvent {
                    collateral_id: calc.collateral_id.clone(),
                    link: calc.link.clone(),
                    ltv_pct: calc.ltv_pct,
                    target_ltv_pct: calc.target_ltv_pct,
                    excess_pct: calc.ltv_pct - calc.target_ltv_pct,
                    margin_call_amount: calc.margin_call_amount,
                });
            }
        }

        calculations.push(calc);
    }

    let portfolio_ltv_pct = current_ltv(total_outstanding, total_pledged);

    let output = LtvMonitorOutput {
        calculations,
        breaches,
        total_pledged,
        total_outstanding,
        portfolio_ltv_pct,
        ok_count,
        at_risk_count,
        breach_count,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Collateral LTV Monitoring",
        &serde_json::json!({
            "collateral_count": collateral.len(),
            "as_of": as_of.to_string(),
            "warning_buffer_pct": config.ltv_warning_buffer_pct.to_string(),
            "revaluation_max_age_days": config.revaluation_max_age_days,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Histogram of collateral items by LTV range for portfolio risk reporting.
pub fn ltv_distribution(calculations: &[LtvCalculation]) -> Vec<LtvBucket> {
    let ranges: [(&str, Decimal, Decimal); 4] = [
        ("0-25%", Decimal::ZERO, dec!(25)),
        ("25-50%", dec!(25), dec!(50)),
        ("50-75%", dec!(50), dec!(75)),
        ("75-100%", dec!(75), dec!(100)),
    ];

    let mut buckets: Vec<LtvBucket> = ranges
        .iter()
        .map(|(label, _, _)| LtvBucket {
            label: (*label).to_string(),
            count: 0,
            pledged_value: Decimal::ZERO,
        })
        .collect();
    buckets.push(LtvBucket {
        label: ">100%".to_string(),
        count: 0,
        pledged_value: Decimal::ZERO,
    });

    for calc in calculations {
        let idx = ranges
            .iter()
            .position(|(_, low, high)| calc.ltv_pct >= *low && calc.ltv_pct < *high)
            .unwrap_or(if calc.ltv_pct <= dec!(100) { 3 } else { 4 });
        buckets[idx].count += 1;
        buckets[idx].pledged_value += calc.pledged_value;
    }

    buckets
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
