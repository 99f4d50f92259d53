#![deny(warnings)]

//! Economic models for generation-capacity investment.
//!
//! This crate provides validated utilities for:
//! - Geometric-trend forecasting of fuel prices, demand and CO2 price
//! - Expected merit-order dispatch and segment clearing prices
//! - Discounted cash-flow valuation, WACC and loan annuities
//! - Merton-style pricing of a producer's cost of debt

pub mod credit;
pub mod forecast;
pub mod fuel;
pub mod merit;
pub mod valuation;

pub use credit::{
    cumulative_normal, merton_cost_of_debt, merton_pricing, MertonInputs, MertonPricing, MIN_DEBT,
};
pub use forecast::{forecast_series, Forecast, Forecaster, GeometricTrendRegression};
pub use fuel::{dispatch_cost, emission_intensity, fuel_share, marginal_cost, DispatchCost};
pub use merit::{MarketConditions, MarketOutlook, MeritOrder, MeritUnit};
pub use valuation::{
    loan_annuity, operating_outlook, value_project, wacc, CashFlowSchedule, OperatingOutlook,
    ProjectValuation,
};

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors produced by economic helpers.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// A series, price or reference needed by the model is missing.
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    /// A parameter lies outside the domain of the model.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
    /// Numeric computation produced NaN or infinity.
    #[error("non-finite numeric result")]
    NonFinite,
}

/// Convert an analytical amount into ledger money, rounded to cents.
pub fn to_money(value: f64) -> Result<Decimal, EconError> {
    if !value.is_finite() {
        return Err(EconError::NonFinite);
    }
    Decimal::from_f64(value)
        .map(|d| d.round_dp(2))
        .ok_or(EconError::NonFinite)
}
