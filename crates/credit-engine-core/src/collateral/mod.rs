//! Collateral loan-to-value monitoring and valuation staleness.

pub mod ltv;
pub mod valuation;

pub use ltv::{
    check_all_ltv_breaches, compute_ltv_calculation, current_ltv, determine_ltv_status,
    ltv_distribution, margin_call_amount, pledged_value, LtvBreachEvent, LtvBucket,
    LtvCalculation, LtvMonitorOutput,
};
pub use valuation::{apply_valuation, needs_revaluation, stale_collateral, ValuationUpdate};
