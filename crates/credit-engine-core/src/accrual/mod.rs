//! Interest accrual: day-count conventions, rate resolution and
//! portfolio-level year-to-date interest cost.

pub mod day_count;
pub mod interest;

pub use day_count::{year_fraction, DayCountMethod};
pub use interest::{
    current_rate_pct, interest_cost_ytd, period_interest, InterestCalculation,
    InterestCostSummary, LoanInterestDetail,
};
