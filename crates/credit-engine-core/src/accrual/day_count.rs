use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::CreditEngineError;
use crate::CreditEngineResult;

/// Day-count convention for accrual arithmetic.
///
/// These are planning approximations, not ISDA-precise conventions: 30/360
/// scales actual elapsed days by 30/30.44 (the mean month length) rather
/// than applying per-date 30th/31st adjustments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayCountMethod {
    Actual360,
    Actual365,
    Thirty360,
}

/// Actual calendar days elapsed from `start` to `end`.
pub fn actual_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// Fraction of a year from `start` to `end` under the given convention.
pub fn year_fraction(
    start: NaiveDate,
    end: NaiveDate,
    method: DayCountMethod,
) -> CreditEngineResult<Decimal> {
    if end < start {
        return Err(CreditEngineError::DateError(format!(
            "Accrual period end {end} precedes start {start}"
        )));
    }

    let days = Decimal::from(actual_days(start, end));
    let fraction = match method {
        DayCountMethod::Actual360 => days / dec!(360),
        DayCountMethod::Actual365 => days / dec!(365),
        DayCountMethod::Thirty360 => days * dec!(30) / dec!(30.44) / dec!(360),
    };

    Ok(fraction)
}
