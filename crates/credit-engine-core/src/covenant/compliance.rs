//! Covenant compliance testing.
//!
//! The status classification is asymmetric around the threshold: minimum
//! covenants (`>=`/`>`) expand the at-risk zone above the threshold by the
//! buffer, maximum covenants (`<=`/`<`) contract it below. A uniform ±buffer
//! would misclassify one side. An unresolvable current value preserves the
//! previous status -- "unknown" is never conflated with "compliant."

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::EngineConfig;
use crate::error::CreditEngineError;
use crate::types::*;
use crate::CreditEngineResult;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

/// External financial data a covenant test draws on, assembled by the host
/// from accounting and valuation modules. Absent fields make the covenants
/// that need them unresolvable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CovenantDataSources {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_balance: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_worth: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_debt: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ebitda: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collateral_value: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_outstanding: Option<Money>,
}

/// Result of testing one covenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CovenantTestResult {
    pub covenant_id: String,
    pub tested_at: NaiveDate,
    /// `None` when the value could not be derived from the data sources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<Decimal>,
    pub threshold: Threshold,
    pub previous_status: ComplianceStatus,
    pub new_status: ComplianceStatus,
    /// Distance to the threshold in the compliant direction; negative when
    /// breached, `None` when unresolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headroom: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headroom_pct: Option<Decimal>,
    pub requires_action: bool,
    pub waived: bool,
    pub next_test_date: NaiveDate,
}

/// Portfolio-level covenant test run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CovenantPortfolioOutput {
    pub results: Vec<CovenantTestResult>,
    pub ok_count: u64,
    pub at_risk_count: u64,
    pub breach_count: u64,
    pub unresolved_count: u64,
    /// Covenant ids whose test flagged action.
    pub action_required: Vec<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Derive a covenant's current value from the supplied data sources.
///
/// Returns `None` when the sources cannot support the covenant type:
/// ratios with non-positive denominators, `DebtServiceCoverage` (no debt
/// service input exists -- a documented gap, not an approximation), or
/// missing fields. `Other` covenants fall back to the last stored value.
pub fn covenant_current_value(
    covenant: &Covenant,
    sources: &CovenantDataSources,
) -> Option<Decimal> {
    match &covenant.covenant_type {
        CovenantType::MinLiquidity => sources.cash_balance,
        CovenantType::MinNetWorth => sources.net_worth,
        CovenantType::MinEbitda => sources.ebitda,
        CovenantType::MaxLeverage => {
            let debt = sources.total_debt?;
            let net_worth = sources.net_worth?;
            if net_worth <= Decimal::ZERO {
                None
            } else {
                Some(debt / net_worth)
            }
        }
        CovenantType::MaxLtv => {
            let outstanding = sources.loan_outstanding?;
            let collateral = sources.collateral_value?;
            if collateral <= Decimal::ZERO {
                None
            } else {
                Some(outstanding / collateral * dec!(100))
            }
        }
        CovenantType::DebtServiceCoverage => None,
        CovenantType::Other(_) => covenant.current_value,
    }
}

/// Classify a resolved value against a threshold with an at-risk buffer.
///
/// Non-compliant is a breach. Within compliance, minimum-style thresholds
/// flag at-risk below `threshold * (1 + buffer/100)` and maximum-style
/// thresholds above `threshold * (1 - buffer/100)`.
pub fn determine_covenant_status(
    current: Decimal,
    threshold: &Threshold,
    buffer_pct: Pct,
) -> ComplianceStatus {
    if !threshold.is_satisfied_by(current) {
        return ComplianceStatus::Breach;
    }

    let buffer = buffer_pct / dec!(100);
    let at_risk = if threshold.operator.is_minimum() {
        current < threshold.value * (Decimal::ONE + buffer)
    } else if threshold.operator.is_maximum() {
        current > threshold.value * (Decimal::ONE - buffer)
    } else {
        // Equality thresholds have no buffer zone: satisfied is satisfied.
        false
    };

    if at_risk {
        ComplianceStatus::AtRisk
    } else {
        ComplianceStatus::Ok
    }
}

/// Test one covenant against the supplied data sources.
///
/// Action is edge-triggered, not level-triggered: a breach, a worsening
/// from ok to at-risk, or an unresolvable value. A repeated at-risk result
/// does not re-flag. Waived covenants report their computed status but
/// never require action.
pub fn test_covenant(
    covenant: &Covenant,
    sources: &CovenantDataSources,
    config: &EngineConfig,
    as_of: NaiveDate,
) -> CovenantTestResult {
    let buffer_pct = covenant.buffer_pct.unwrap_or(config.covenant_buffer_pct);
    let previous_status = covenant.status;
    let current = covenant_current_value(covenant, sources);

    let (new_status, headroom, requires_action) = match current {
        None => (previous_status, None, !covenant.waived),
        Some(value) => {
            let status = determine_covenant_status(value, &covenant.threshold, buffer_pct);
            let headroom = signed_headroom(value, &covenant.threshold);
            let worsened = previous_status == ComplianceStatus::Ok
                && status == ComplianceStatus::AtRisk;
            let action =
                !covenant.waived && (status == ComplianceStatus::Breach || worsened);
            (status, Some(headroom), action)
        }
    };

    let headroom_pct = headroom.and_then(|h| {
        if covenant.threshold.value.is_zero() {
            None
        } else {
            Some(h / covenant.threshold.value * dec!(100))
        }
    });

    let next_test_date = as_of
        .checked_add_months(Months::new(covenant.test_frequency.months_per_period()))
        .unwrap_or(as_of);

    CovenantTestResult {
        covenant_id: covenant.id.clone(),
        tested_at: as_of,
        current_value: current,
        threshold: covenant.threshold.clone(),
        previous_status,
        new_status,
        headroom,
        headroom_pct,
        requires_action,
        waived: covenant.waived,
        next_test_date,
    }
}

/// Test a set of covenants against one borrower snapshot.
pub fn test_all_covenants(
    covenants: &[Covenant],
    sources: &CovenantDataSources,
    config: &EngineConfig,
    as_of: NaiveDate,
) -> CreditEngineResult<ComputationOutput<CovenantPortfolioOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if covenants.is_empty() {
        return Err(CreditEngineError::InsufficientData(
            "At least one covenant must be provided.".into(),
        ));
    }

    let mut results: Vec<CovenantTestResult> = Vec::with_capacity(covenants.len());
    let mut ok_count = 0;
    let mut at_risk_count = 0;
    let mut breach_count = 0;
    let mut unresolved_count = 0;

    for covenant in covenants {
        let result = test_covenant(covenant, sources, config, as_of);

        if result.current_value.is_none() {
            unresolved_count += 1;
            warnings.push(format!(
                "Covenant '{}': current value unresolvable from data sources; previous status preserved.",
                covenant.id
            ));
        }
        match result.new_status {
            ComplianceStatus::Ok => ok_count += 1,
            ComplianceStatus::AtRisk => at_risk_count += 1,
            ComplianceStatus::Breach => {
                breach_count += 1;
                warnings.push(format!("Covenant '{}' is in breach.", covenant.id));
            }
        }

        results.push(result);
    }

    let action_required: Vec<String> = results
        .iter()
        .filter(|r| r.requires_action)
        .map(|r| r.covenant_id.clone())
        .collect();

    let output = CovenantPortfolioOutput {
        results,
        ok_count,
        at_risk_count,
        breach_count,
        unresolved_count,
        action_required,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Covenant Compliance Testing",
        &serde_json::json!({
            "covenant_count": covenants.len(),
            "as_of": as_of.to_string(),
            "default_buffer_pct": config.covenant_buffer_pct.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Headroom in the compliant direction: positive inside compliance,
/// negative past the threshold.
fn signed_headroom(current: Decimal, threshold: &Threshold) -> Decimal {
    match threshold.operator {
        ThresholdOperator::Gte | ThresholdOperator::Gt => current - threshold.value,
        ThresholdOperator::Lte | ThresholdOperator::Lt => threshold.value - current,
        ThresholdOperator::Eq => -(current - threshold.value).abs(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn min_liquidity_covenant(threshold: Decimal) -> Covenant {
        Covenant {
            id: "cov-liq".into(),
            link: EntityLink::Facility("fac-1".into()),
            covenant_type: CovenantType::MinLiquidity,
            threshold: Threshold {
                operator: ThresholdOperator::Gte,
                value: threshold,
                unit: Some("USD".into()),
            },
            current_value: None,
            current_value_date: None,
            buffer_pct: None,
            status: ComplianceStatus::Ok,
            test_frequency: Frequency::Quarterly,
            next_test_date: None,
            last_test_date: None,
            waived: false,
        }
    }

    fn sources_with_cash(cash: Decimal) -> CovenantDataSources {
        CovenantDataSources {
            cash_balance: Some(cash),
            ..CovenantDataSources::default()
        }
    }

    #[test]
    fn test_minimum_buffer_expands_upward() {
        let threshold = Threshold {
            operator: ThresholdOperator::Gte,
            value: dec!(100),
            unit: None,
        };
        // Compliant but inside threshold * 1.10 => at risk
        assert_eq!(
            determine_covenant_status(dec!(105), &threshold, dec!(10)),
            ComplianceStatus::AtRisk
        );
        // Clear of the buffer => ok
        assert_eq!(
            determine_covenant_status(dec!(115), &threshold, dec!(10)),
            ComplianceStatus::Ok
        );
        // Below threshold => breach
        assert_eq!(
            determine_covenant_status(dec!(95), &threshold, dec!(10)),
            ComplianceStatus::Breach
        );
    }

    #[test]
    fn test_maximum_buffer_contracts_downward() {
        let threshold = Threshold {
            operator: ThresholdOperator::Lte,
            value: dec!(100),
            unit: None,
        };
        assert_eq!(
            determine_covenant_status(dec!(95), &threshold, dec!(10)),
            ComplianceStatus::AtRisk
        );
        assert_eq!(
            determine_covenant_status(dec!(85), &threshold, dec!(10)),
            ComplianceStatus::Ok
        );
        assert_eq!(
            determine_covenant_status(dec!(105), &threshold, dec!(10)),
            ComplianceStatus::Breach
        );
    }

    #[test]
    fn test_buffer_boundary_values() {
        let threshold = Threshold {
            operator: ThresholdOperator::Gte,
            value: dec!(100),
            unit: None,
        };
        // Exactly at threshold * 1.10 is outside the at-risk zone
        assert_eq!(
            determine_covenant_status(dec!(110), &threshold, dec!(10)),
            ComplianceStatus::Ok
        );
        // Exactly at threshold is compliant but deep in the buffer
        assert_eq!(
            determine_covenant_status(dec!(100), &threshold, dec!(10)),
            ComplianceStatus::AtRisk
        );
    }

    #[test]
    fn test_strict_operators() {
        let gt = Threshold {
            operator: ThresholdOperator::Gt,
            value: dec!(0),
            unit: None,
        };
        assert_eq!(
            determine_covenant_status(dec!(0), &gt, dec!(10)),
            ComplianceStatus::Breach
        );
        assert_eq!(
            determine_covenant_status(dec!(1), &gt, dec!(10)),
            ComplianceStatus::Ok
        );
    }

    #[test]
    fn test_current_value_resolution_by_type() {
        let sources = CovenantDataSources {
            cash_balance: Some(dec!(2_500_000)),
            net_worth: Some(dec!(10_000_000)),
            total_debt: Some(dec!(25_000_000)),
            ebitda: Some(dec!(4_000_000)),
            collateral_value: Some(dec!(8_000_000)),
            loan_outstanding: Some(dec!(6_000_000)),
        };

        let mut cov = min_liquidity_covenant(dec!(1_000_000));
        assert_eq!(covenant_current_value(&cov, &sources), Some(dec!(2_500_000)));

        cov.covenant_type = CovenantType::MinNetWorth;
        assert_eq!(
            covenant_current_value(&cov, &sources),
            Some(dec!(10_000_000))
        );

        cov.covenant_type = CovenantType::MaxLeverage;
        assert_eq!(covenant_current_value(&cov, &sources), Some(dec!(2.5)));

        cov.covenant_type = CovenantType::MaxLtv;
        assert_eq!(covenant_current_value(&cov, &sources), Some(dec!(75)));

        cov.covenant_type = CovenantType::MinEbitda;
        assert_eq!(
            covenant_current_value(&cov, &sources),
            Some(dec!(4_000_000))
        );
    }

    #[test]
    fn test_leverage_undefined_for_nonpositive_net_worth() {
        let mut cov = min_liquidity_covenant(dec!(3));
        cov.covenant_type = CovenantType::MaxLeverage;
        let sources = CovenantDataSources {
            total_debt: Some(dec!(1_000_000)),
            net_worth: Some(Decimal::ZERO),
            ..CovenantDataSources::default()
        };
        assert_eq!(covenant_current_value(&cov, &sources), None);
    }

    #[test]
    fn test_ltv_undefined_for_nonpositive_collateral() {
        let mut cov = min_liquidity_covenant(dec!(80));
        cov.covenant_type = CovenantType::MaxLtv;
        let sources = CovenantDataSources {
            loan_outstanding: Some(dec!(1_000_000)),
            collateral_value: Some(Decimal::ZERO),
            ..CovenantDataSources::default()
        };
        assert_eq!(covenant_current_value(&cov, &sources), None);
    }

    #[test]
    fn test_debt_service_coverage_is_a_known_gap() {
        let mut cov = min_liquidity_covenant(dec!(1.2));
        cov.covenant_type = CovenantType::DebtServiceCoverage;
        cov.current_value = Some(dec!(1.5)); // stored value must NOT be used
        let sources = CovenantDataSources {
            cash_balance: Some(dec!(1_000_000)),
            ebitda: Some(dec!(500_000)),
            ..CovenantDataSources::default()
        };
        assert_eq!(covenant_current_value(&cov, &sources), None);
    }

    #[test]
    fn test_other_type_falls_back_to_stored_value() {
        let mut cov = min_liquidity_covenant(dec!(2));
        cov.covenant_type = CovenantType::Other("capex_limit".into());
        cov.current_value = Some(dec!(1.8));
        assert_eq!(
            covenant_current_value(&cov, &CovenantDataSources::default()),
            Some(dec!(1.8))
        );
    }

    #[test]
    fn test_unresolved_preserves_previous_status() {
        let config = EngineConfig::default();
        let mut cov = min_liquidity_covenant(dec!(1_000_000));
        cov.status = ComplianceStatus::AtRisk;
        // No cash balance supplied => unresolvable
        let result = test_covenant(
            &cov,
            &CovenantDataSources::default(),
            &config,
            date(2024, 6, 30),
        );
        assert_eq!(result.current_value, None);
        assert_eq!(result.new_status, ComplianceStatus::AtRisk);
        assert!(result.requires_action);
    }

    #[test]
    fn test_breach_requires_action() {
        let config = EngineConfig::default();
        let cov = min_liquidity_covenant(dec!(1_000_000));
        let result = test_covenant(
            &cov,
            &sources_with_cash(dec!(800_000)),
            &config,
            date(2024, 6, 30),
        );
        assert_eq!(result.new_status, ComplianceStatus::Breach);
        assert!(result.requires_action);
        assert_eq!(result.headroom, Some(dec!(-200_000)));
    }

    #[test]
    fn test_action_is_edge_triggered_on_worsening() {
        let config = EngineConfig::default();
        let mut cov = min_liquidity_covenant(dec!(1_000_000));

        // ok -> at_risk flags action
        cov.status = ComplianceStatus::Ok;
        let worsening = test_covenant(
            &cov,
            &sources_with_cash(dec!(1_050_000)),
            &config,
            date(2024, 6, 30),
        );
        assert_eq!(worsening.new_status, ComplianceStatus::AtRisk);
        assert!(worsening.requires_action);

        // at_risk -> at_risk stays quiet
        cov.status = ComplianceStatus::AtRisk;
        let repeated = test_covenant(
            &cov,
            &sources_with_cash(dec!(1_050_000)),
            &config,
            date(2024, 9, 30),
        );
        assert_eq!(repeated.new_status, ComplianceStatus::AtRisk);
        assert!(!repeated.requires_action);
    }

    #[test]
    fn test_waived_covenant_never_requires_action() {
        let config = EngineConfig::default();
        let mut cov = min_liquidity_covenant(dec!(1_000_000));
        cov.waived = true;
        let result = test_covenant(
            &cov,
            &sources_with_cash(dec!(500_000)),
            &config,
            date(2024, 6, 30),
        );
        // Status still reported honestly
        assert_eq!(result.new_status, ComplianceStatus::Breach);
        assert!(!result.requires_action);
    }

    #[test]
    fn test_covenant_buffer_override() {
        let config = EngineConfig::default();
        let mut cov = min_liquidity_covenant(dec!(1_000_000));
        cov.buffer_pct = Some(dec!(25));
        // 1.2M is ok with the 10% default, at risk with a 25% buffer
        let result = test_covenant(
            &cov,
            &sources_with_cash(dec!(1_200_000)),
            &config,
            date(2024, 6, 30),
        );
        assert_eq!(result.new_status, ComplianceStatus::AtRisk);
    }

    #[test]
    fn test_next_test_date_follows_frequency() {
        let config = EngineConfig::default();
        let cov = min_liquidity_covenant(dec!(1_000_000)); // quarterly
        let result = test_covenant(
            &cov,
            &sources_with_cash(dec!(2_000_000)),
            &config,
            date(2024, 6, 30),
        );
        assert_eq!(result.next_test_date, date(2024, 9, 30));
    }

    #[test]
    fn test_headroom_pct() {
        let config = EngineConfig::default();
        let cov = min_liquidity_covenant(dec!(1_000_000));
        let result = test_covenant(
            &cov,
            &sources_with_cash(dec!(1_500_000)),
            &config,
            date(2024, 6, 30),
        );
        // headroom = 500k over a 1M threshold = 50%
        assert_eq!(result.headroom, Some(dec!(500_000)));
        assert_eq!(result.headroom_pct, Some(dec!(50)));
    }

    #[test]
    fn test_portfolio_counts_and_warnings() {
        let config = EngineConfig::default();
        let ok = min_liquidity_covenant(dec!(500_000));
        let mut breach = min_liquidity_covenant(dec!(2_000_000));
        breach.id = "cov-breach".into();
        let mut unresolved = min_liquidity_covenant(dec!(1));
        unresolved.id = "cov-dscr".into();
        unresolved.covenant_type = CovenantType::DebtServiceCoverage;
        unresolved.status = ComplianceStatus::Ok;

        let output = test_all_covenants(
            &[ok, breach, unresolved],
            &sources_with_cash(dec!(1_000_000)),
            &config,
            date(2024, 6, 30),
        )
        .unwrap();

        let portfolio = &output.result;
        assert_eq!(portfolio.breach_count, 1);
        assert_eq!(portfolio.unresolved_count, 1);
        assert!(portfolio
            .action_required
            .contains(&"cov-breach".to_string()));
        assert!(output.warnings.iter().any(|w| w.contains("cov-dscr")));
        assert!(output.warnings.iter().any(|w| w.contains("breach")));
    }

    #[test]
    fn test_empty_portfolio_rejected() {
        let config = EngineConfig::default();
        let err = test_all_covenants(
            &[],
            &CovenantDataSources::default(),
            &config,
            date(2024, 6, 30),
        )
        .unwrap_err();
        match err {
            CreditEngineError::InsufficientData(_) => {}
            other => panic!("Expected InsufficientData, got {other:?}"),
        }
    }
}
