use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Percentage points (5 = 5%). Rates, haircuts, LTVs and buffers all use
/// this convention; divide by 100 at the point of arithmetic.
pub type Pct = Decimal;

/// Currency code
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    GBP,
    #[default]
    USD,
    EUR,
    CHF,
    JPY,
    CAD,
    AUD,
    HKD,
    SGD,
    Other(String),
}

/// Payment or covenant-test cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    Monthly,
    Quarterly,
    SemiAnnual,
    Annual,
}

impl Frequency {
    pub fn periods_per_year(&self) -> u32 {
        match self {
            Frequency::Monthly => 12,
            Frequency::Quarterly => 4,
            Frequency::SemiAnnual => 2,
            Frequency::Annual => 1,
        }
    }

    pub fn months_per_period(&self) -> u32 {
        match self {
            Frequency::Monthly => 1,
            Frequency::Quarterly => 3,
            Frequency::SemiAnnual => 6,
            Frequency::Annual => 12,
        }
    }
}

/// Three-state compliance classification shared by covenants and collateral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComplianceStatus {
    Ok,
    AtRisk,
    Breach,
}

/// What a collateral pledge or covenant is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityLink {
    Facility(String),
    Loan(String),
}

// ---------------------------------------------------------------------------
// Facility
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FacilityType {
    Revolver,
    Term,
    Margin,
    Lombard,
    Bridge,
    Construction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FacilityStatus {
    Active,
    Closed,
    Pending,
}

/// A credit line from a bank. `available_amount` is caller-maintained and
/// must equal `limit_amount - drawn_amount`; the facility exposure module
/// re-derives it and warns on drift rather than silently correcting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facility {
    pub id: String,
    pub bank_id: String,
    pub facility_type: FacilityType,
    pub currency: Currency,
    pub limit_amount: Money,
    pub drawn_amount: Money,
    pub available_amount: Money,
    pub maturity_date: NaiveDate,
    pub status: FacilityStatus,
}

impl Facility {
    /// Headroom derived from limit and drawn, ignoring the stored field.
    pub fn derived_available(&self) -> Money {
        self.limit_amount - self.drawn_amount
    }
}

// ---------------------------------------------------------------------------
// Loan
// ---------------------------------------------------------------------------

/// Reference index for floating-rate loans.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BaseRateIndex {
    Sofr,
    Euribor3m,
    Saron,
    Sonia,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RateType {
    Fixed { rate_pct: Pct },
    Floating { base_rate: BaseRateIndex, spread_pct: Pct },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AmortizationType {
    /// Interest every period, principal in full at maturity.
    InterestOnly,
    /// Equal total installment per period (annuity).
    Amortizing,
    /// Interest every period, single principal repayment at maturity.
    /// Same cash-flow shape as interest-only but partial amortization is
    /// never permitted.
    Bullet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanStatus {
    Active,
    PaidOff,
    Default,
}

/// A drawdown under a facility. `outstanding_amount` is monotonically
/// non-increasing while active and never exceeds `principal_amount`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub id: String,
    pub facility_id: String,
    pub principal_amount: Money,
    pub outstanding_amount: Money,
    pub currency: Currency,
    pub rate_type: RateType,
    /// Last known all-in annual rate in percent. For fixed loans this equals
    /// the contract rate; for floating loans it is the most recent fixing
    /// plus spread, maintained by the caller on each reset.
    pub current_rate_pct: Pct,
    pub amortization_type: AmortizationType,
    pub payment_frequency: Frequency,
    pub start_date: NaiveDate,
    pub maturity_date: NaiveDate,
    pub status: LoanStatus,
}

// ---------------------------------------------------------------------------
// Payment
// ---------------------------------------------------------------------------

/// `Late` is a derived state, never stored: a payment record holds
/// `Scheduled` until settlement and [`Payment::effective_status`] reports
/// `Late` once the due date has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    Scheduled,
    Paid,
    Partial,
    Late,
}

/// An actual or scheduled installment on one loan. Distinct from a schedule
/// row: the row is a projection, the payment is the ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub loan_id: String,
    pub due_date: NaiveDate,
    pub amount: Money,
    pub principal_part: Money,
    pub interest_part: Money,
    pub fees_part: Money,
    pub currency: Currency,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_amount: Option<Money>,
}

impl Payment {
    /// Stored status with the derived `Late` classification applied.
    pub fn effective_status(&self, as_of: NaiveDate) -> PaymentStatus {
        if self.status == PaymentStatus::Scheduled && self.due_date < as_of {
            PaymentStatus::Late
        } else {
            self.status
        }
    }

    /// Anything not fully settled.
    pub fn is_open(&self) -> bool {
        self.status != PaymentStatus::Paid
    }
}

// ---------------------------------------------------------------------------
// Collateral
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CollateralType {
    Securities,
    RealEstate,
    Cash,
    Guarantee,
    Commodities,
    Other(String),
}

/// A pledge securing a facility or loan. `pledged_value` is derived
/// (`current_value` net of haircut) and must be recomputed whenever value
/// or haircut changes; it is never independently authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collateral {
    pub id: String,
    pub link: EntityLink,
    pub collateral_type: CollateralType,
    pub current_value: Money,
    pub currency: Currency,
    /// `None` for pledges seeded without a haircut; the engine substitutes
    /// the configured default for the collateral type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub haircut_pct: Option<Pct>,
    pub pledged_value: Money,
    pub target_ltv_pct: Pct,
    pub status: ComplianceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_valued_at: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valuation_source: Option<String>,
}

// ---------------------------------------------------------------------------
// Covenant
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CovenantType {
    MinLiquidity,
    MaxLtv,
    MinNetWorth,
    MaxLeverage,
    MinEbitda,
    /// Not computable from the standard data sources; always resolves to
    /// the stored value being unavailable (a documented gap, not a bug).
    DebtServiceCoverage,
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThresholdOperator {
    Gte,
    Lte,
    Gt,
    Lt,
    Eq,
}

impl ThresholdOperator {
    /// Minimum-style thresholds hold a floor under the metric; maximum-style
    /// thresholds cap it. Equality thresholds are neither.
    pub fn is_minimum(&self) -> bool {
        matches!(self, ThresholdOperator::Gte | ThresholdOperator::Gt)
    }

    pub fn is_maximum(&self) -> bool {
        matches!(self, ThresholdOperator::Lte | ThresholdOperator::Lt)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub operator: ThresholdOperator,
    pub value: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Threshold {
    pub fn is_satisfied_by(&self, current: Decimal) -> bool {
        match self.operator {
            ThresholdOperator::Gte => current >= self.value,
            ThresholdOperator::Lte => current <= self.value,
            ThresholdOperator::Gt => current > self.value,
            ThresholdOperator::Lt => current < self.value,
            ThresholdOperator::Eq => current == self.value,
        }
    }
}

/// A contractual financial test on a facility or loan. `status` is a derived
/// classification recomputed on each test, not an independent write target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Covenant {
    pub id: String,
    pub link: EntityLink,
    pub covenant_type: CovenantType,
    pub threshold: Threshold,
    /// Last stored observation, used as the fallback for `Other` covenant
    /// types whose value the engine cannot derive itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value_date: Option<NaiveDate>,
    /// At-risk buffer in percent; `None` uses the engine default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_pct: Option<Pct>,
    pub status: ComplianceStatus,
    pub test_frequency: Frequency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_test_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_test_date: Option<NaiveDate>,
    pub waived: bool,
}

// ---------------------------------------------------------------------------
// Computation envelope
// ---------------------------------------------------------------------------

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
