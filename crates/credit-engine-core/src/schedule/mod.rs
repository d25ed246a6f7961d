//! Amortization schedule generation.

pub mod amortization;

pub use amortization::{generate_schedule, GeneratedSchedule, ScheduleRow};
