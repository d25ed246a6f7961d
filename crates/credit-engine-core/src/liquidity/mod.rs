//! Obligation export: normalized cash-flow events for an external
//! liquidity-forecasting consumer.

pub mod debt_service;
pub mod flows;

pub use debt_service::{
    loan_liquidity_impact, total_debt_payments, DebtPaymentsTotal, LoanLiquidityImpact,
};
pub use flows::{
    export_obligations, payments_to_flows, schedule_to_flows, FlowCategory,
    LiquidityExportOutput, ObligationFlow,
};
