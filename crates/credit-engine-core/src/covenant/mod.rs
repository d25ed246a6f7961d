//! Covenant compliance evaluation.

pub mod compliance;

pub use compliance::{
    covenant_current_value, determine_covenant_status, test_all_covenants, test_covenant,
    CovenantDataSources, CovenantPortfolioOutput, CovenantTestResult,
};
