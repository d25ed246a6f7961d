//! Injectable engine configuration.
//!
//! Default base-rate fixings, default haircuts by collateral type and the
//! classification buffers are parameters the host tunes per environment or
//! tenant, never module-level constants. Every default here can be
//! overridden by constructing the struct directly or editing the map
//! returned by [`EngineConfig::default`].

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

use crate::types::{BaseRateIndex, CollateralType, Pct};

/// Tunable defaults threaded by reference into engine entry points.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Fallback fixings in percent, used when the caller supplies no live
    /// rate for a floating loan's index.
    pub default_base_rates: BTreeMap<BaseRateIndex, Pct>,
    /// Fallback haircuts in percent by collateral type, for pledges seeded
    /// without one.
    pub default_haircut_pcts: BTreeMap<CollateralType, Pct>,
    /// Covenant at-risk buffer in percent when a covenant carries none.
    pub covenant_buffer_pct: Pct,
    /// LTV at-risk warning buffer in percent.
    pub ltv_warning_buffer_pct: Pct,
    /// Collateral valuations older than this many days need revaluation.
    pub revaluation_max_age_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut default_base_rates = BTreeMap::new();
        default_base_rates.insert(BaseRateIndex::Sofr, dec!(5.30));
        default_base_rates.insert(BaseRateIndex::Euribor3m, dec!(3.90));
        default_base_rates.insert(BaseRateIndex::Saron, dec!(1.70));
        default_base_rates.insert(BaseRateIndex::Sonia, dec!(5.20));

        let mut default_haircut_pcts = BTreeMap::new();
        default_haircut_pcts.insert(CollateralType::Cash, dec!(0));
        default_haircut_pcts.insert(CollateralType::Securities, dec!(20));
        default_haircut_pcts.insert(CollateralType::RealEstate, dec!(30));
        default_haircut_pcts.insert(CollateralType::Guarantee, dec!(50));
        default_haircut_pcts.insert(CollateralType::Commodities, dec!(40));

        EngineConfig {
            default_base_rates,
            default_haircut_pcts,
            covenant_buffer_pct: dec!(10),
            ltv_warning_buffer_pct: dec!(10),
            revaluation_max_age_days: 90,
        }
    }
}

impl EngineConfig {
    /// Default fixing for an index, in percent. Indexes absent from the map
    /// (typically `Other`) resolve to zero.
    pub fn default_base_rate(&self, index: &BaseRateIndex) -> Pct {
        self.default_base_rates
            .get(index)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Default haircut for a collateral type, in percent. Unknown types
    /// resolve to zero (no discount), the conservative-for-ingestion choice:
    /// an unpriced haircut is surfaced by the LTV monitor, not invented here.
    pub fn default_haircut_pct(&self, collateral_type: &CollateralType) -> Pct {
        self.default_haircut_pcts
            .get(collateral_type)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}
