pub mod config;
pub mod error;
pub mod types;

#[cfg(feature = "schedule")]
pub mod schedule;

#[cfg(feature = "accrual")]
pub mod accrual;

#[cfg(feature = "covenant")]
pub mod covenant;

#[cfg(feature = "collateral")]
pub mod collateral;

#[cfg(feature = "facility")]
pub mod facility;

#[cfg(feature = "liquidity")]
pub mod liquidity;

pub use config::EngineConfig;
pub use error::CreditEngineError;
pub use types::*;

/// Standard result type for all credit-engine operations
pub type CreditEngineResult<T> = Result<T, CreditEngineError>;
