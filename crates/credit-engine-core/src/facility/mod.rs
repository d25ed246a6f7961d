//! Facility-level exposure aggregation.

pub mod exposure;

pub use exposure::{
    facility_exposure_summary, FacilityExposureOutput, MaturityBucket, StatusBreakdownItem,
};
