//! Facility portfolio exposure summary.
//!
//! Covers:
//! 1. **Totals** -- limit, drawn, available, utilization.
//! 2. **Status breakdown** -- counts and drawn balance per facility status.
//! 3. **Maturity profile** -- drawn balance bucketed by time to maturity.
//! 4. **Consistency checks** -- stored availability drifting from
//!    `limit - drawn`, and facilities past maturity still marked active.
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::CreditEngineError;
use crate::types::*;
use crate::CreditEngineResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Counts and drawn balance for one facility status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusBreakdownItem {
    pub status: FacilityStatus,
    pub count: u64,
    pub drawn: Money,
}

/// Drawn balance maturing within one horizon band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaturityBucket {
    pub bucket: String,
    pub count: u64,
    pub drawn: Money,
}

/// Aggregated facility exposure in one currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityExposureOutput {
    pub currency: Currency,
    pub as_of: NaiveDate,
    pub facility_count: u64,
    pub total_limit: Money,
    pub total_drawn: Money,
    pub total_available: Money,
    /// Drawn over limit, in percent; zero when there is no limit.
    pub utilization_pct: Pct,
    pub status_breakdown: Vec<StatusBreakdownItem>,
    pub maturity_buckets: Vec<MaturityBucket>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Summarize facility exposure for one currency.
///
/// The stored `available_amount` is compared against `limit - drawn`;
/// drift beyond a cent is warned, never silently corrected -- the caller
/// owns that invariant.
pub fn facility_exposure_summary(
    facilities: &[Facility],
    currency: &Currency,
    as_of: NaiveDate,
) -> CreditEngineResult<ComputationOutput<FacilityExposureOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if facilities.is_empty() {
        return Err(CreditEngineError::InsufficientData(
            "At least one facility must be provided.".into(),
        ));
    }

    let in_scope: Vec<&Facility> = facilities
        .iter()
        .filter(|f| &f.currency == currency)
        .collect();
    if in_scope.is_empty() {
        warnings.push(format!("No facilities in {currency:?}; summary is empty."));
    }

    let mut total_limit = Decimal::ZERO;
    let mut total_drawn = Decimal::ZERO;
    let mut total_available = Decimal::ZERO;

    let mut status_breakdown: Vec<StatusBreakdownItem> = [
        FacilityStatus::Active,
        FacilityStatus::Pending,
        FacilityStatus::Closed,
    ]
    .iter()
    .map(|status| StatusBreakdownItem {
        status: *status,
        count: 0,
        drawn: Decimal::ZERO,
    })
    .collect();

    let bucket_labels = ["<=90d", "<=1y", "<=3y", ">3y", "matured"];
    let mut maturity_buckets: Vec<MaturityBucket> = bucket_labels
        .iter()
        .map(|label| MaturityBucket {
            bucket: (*label).to_string(),
            count: 0,
            drawn: Decimal::ZERO,
        })
        .collect();

    for facility in &in_scope {
        let derived = facility.derived_available();
        if (facility.available_amount - derived).abs() > dec!(0.01) {
            warnings.push(format!(
                "Facility '{}': stored available {} drifts from limit - drawn = {}.",
                facility.id, facility.available_amount, derived
            ));
        }
        if facility.status == FacilityStatus::Active && facility.maturity_date < as_of {
            warnings.push(format!(
                "Facility '{}' matured {} but is still active.",
                facility.id, facility.maturity_date
            ));
        }

        total_limit += facility.limit_amount;
        total_drawn += facility.drawn_amount;
        total_available += derived;

        let status_idx = match facility.status {
            FacilityStatus::Active => 0,
            FacilityStatus::Pending => 1,
            FacilityStatus::Closed => 2,
        };
        status_breakdown[status_idx].count += 1;
        status_breakdown[status_idx].drawn += facility.drawn_amount;

        let days_to_maturity = (facility.maturity_date - as_of).num_days();
        let bucket_idx = if days_to_maturity < 0 {
            4
        } else if days_to_maturity <= 90 {
            0
        } else if days_to_maturity <= 365 {
            1
        } else if days_to_maturity <= 3 * 365 {
            2
        } else {
            3
        };
        maturity_buckets[bucket_idx].count += 1;
        maturity_buckets[bucket_idx].drawn += facility.drawn_amount;
    }

    let utilization_pct = if total_limit.is_zero() {
        Decimal::ZERO
    } else {
        (total_drawn / total_limit * dec!(100)).round_dp(2)
    };

    let output = FacilityExposureOutput {
        currency: currency.clone(),
        as_of,
        facility_count: in_scope.len() as u64,
        total_limit,
        total_drawn,
        total_available,
        utilization_pct,
        status_breakdown,
        maturity_buckets,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Facility Exposure Summary",
        &serde_json::json!({
            "currency": currency,
            "as_of": as_of.to_string(),
            "facility_count": in_scope.len(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
