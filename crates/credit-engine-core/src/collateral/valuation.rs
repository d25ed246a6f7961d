//! Collateral valuation updates and staleness checks.
//!
//! The pledged value is never independently authoritative: applying a
//! valuation always recomputes it from the new market value and the haircut.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ltv::pledged_value;
use crate::config::EngineConfig;
use crate::types::*;

/// A fresh market valuation for a collateral item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationUpdate {
    pub value: Money,
    pub source: String,
    pub valued_at: NaiveDate,
}

/// A collateral item needs revaluation when it has never been valued or its
/// last valuation is older than `max_age_days`.
pub fn needs_revaluation(collateral: &Collateral, as_of: NaiveDate, max_age_days: i64) -> bool {
    match collateral.last_valued_at {
        None => true,
        Some(valued_at) => (as_of - valued_at).num_days() > max_age_days,
    }
}

/// Ids of portfolio items due for revaluation.
pub fn stale_collateral(
    collateral: &[Collateral],
    as_of: NaiveDate,
    config: &EngineConfig,
) -> Vec<String> {
    collateral
        .iter()
        .filter(|item| needs_revaluation(item, as_of, config.revaluation_max_age_days))
        .map(|item| item.id.clone())
        .collect()
}

/// Apply a valuation update, returning a new collateral record with the
/// pledged value recomputed. Compliance status is left untouched; the LTV
/// monitor owns that classification and needs the linked exposure to
/// recompute it.
pub fn apply_valuation(
    collateral: &Collateral,
    update: &ValuationUpdate,
    config: &EngineConfig,
) -> Collateral {
    let haircut_pct = collateral
        .haircut_pct
        .unwrap_or_else(|| config.default_haircut_pct(&collateral.collateral_type));

    Collateral {
        current_value: update.value,
        pledged_value: pledged_value(update.value, haircut_pct),
        last_valued_at: Some(update.valued_at),
        valuation_source: Some(update.source.clone()),
        ..collateral.clone()
    }
}
