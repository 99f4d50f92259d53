#![deny(warnings)]

//! Core domain models and invariants for the gencap investment simulation.
//!
//! This crate defines the serializable types shared by the forecasting,
//! valuation and decision crates, with validation helpers that guarantee the
//! basic invariants those crates rely on.

pub mod ledger;
pub mod market;
pub mod producer;
pub mod series;
pub mod technology;

pub use ledger::{CashFlow, Counterparty, Loan, PlantId, PowerPlant};
pub use market::{CapacityTarget, Market, NodeCapacityLimit, Segment, StrategicReserve};
pub use producer::{
    CreditRiskParams, DiversificationParams, McdaChoice, McdaParams, McdaWeights, Producer,
    RiskPremiums, TraitConfig,
};
pub use series::{History, TimeSeries, Trend};
pub use technology::{
    segment_availability, CandidatePlant, Fuel, FuelShare, Technology, TechnologyCategory,
};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use thiserror::Error;

/// Simulation time step, one per year.
pub type Tick = i64;

/// Unique identifier for a technology, e.g. "CoalPSC", "Wind".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TechnologyId(pub String);

/// Unique identifier for a fuel, e.g. "coal", "natural_gas".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FuelId(pub String);

/// Unique identifier for an electricity market.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarketId(pub String);

/// Unique identifier for a grid node.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

/// Unique identifier for a geographic zone.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ZoneId(pub String);

/// Unique identifier for a producer agent.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

macro_rules! display_id {
    ($($ty:ty),*) => {
        $(impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        })*
    };
}

display_id!(TechnologyId, FuelId, MarketId, NodeId, ZoneId, AgentId);

/// Simulation run parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimConfig {
    /// Seed for deterministic RNG.
    pub rng_seed: u64,
    /// First tick simulated.
    #[serde(default)]
    pub start_tick: Tick,
    /// Number of ticks to run.
    pub ticks: u32,
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Numeric field must be finite.
    #[error("non-finite numeric value in {0}")]
    NonFinite(&'static str),
    /// Fraction, share or rate outside its allowed range.
    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    /// Capacity must be strictly positive.
    #[error("capacity must be > 0")]
    NonPositiveCapacity,
    /// Duration in ticks must be strictly positive.
    #[error("{0} must be at least one tick")]
    ZeroDuration(&'static str),
    /// A market needs at least one load segment.
    #[error("load-duration curve of market {0} is empty")]
    EmptyLoadCurve(String),
    /// Cash must be non-negative.
    #[error("negative monetary value is invalid")]
    NegativeMoney,
    /// Identifier used twice.
    #[error("duplicate identifier: {0}")]
    DuplicateId(String),
    /// Reference to an identifier that does not exist.
    #[error("unknown reference: {0}")]
    UnknownReference(String),
}

fn check_finite(value: f64, field: &'static str) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite(field));
    }
    Ok(())
}

fn check_range(
    value: f64,
    range: RangeInclusive<f64>,
    field: &'static str,
) -> Result<(), ValidationError> {
    check_finite(value, field)?;
    if !range.contains(&value) {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        });
    }
    Ok(())
}

/// Validate a technology.
pub fn validate_technology(t: &Technology) -> Result<(), ValidationError> {
    check_finite(t.capacity_mw, "capacity_mw")?;
    if t.capacity_mw <= 0.0 {
        return Err(ValidationError::NonPositiveCapacity);
    }
    for (trend, field) in [
        (&t.investment_cost_per_mw, "investment_cost_per_mw"),
        (&t.fixed_om_cost_per_mw, "fixed_om_cost_per_mw"),
        (&t.efficiency, "efficiency"),
    ] {
        if !trend.is_finite() {
            return Err(ValidationError::NonFinite(field));
        }
    }
    check_range(t.co2_capture_efficiency, 0.0..=1.0, "co2_capture_efficiency")?;
    check_range(t.max_fraction_in_country, 0.0..=1.0, "max_fraction_in_country")?;
    check_range(t.max_fraction_per_agent, 0.0..=1.0, "max_fraction_per_agent")?;
    check_range(t.peak_segment_availability, 0.0..=1.0, "peak_segment_availability")?;
    check_range(t.base_segment_availability, 0.0..=1.0, "base_segment_availability")?;
    check_finite(t.minimum_running_hours, "minimum_running_hours")?;
    if t.depreciation_time == 0 {
        return Err(ValidationError::ZeroDuration("depreciation_time"));
    }
    if t.expected_lifetime == 0 {
        return Err(ValidationError::ZeroDuration("expected_lifetime"));
    }
    Ok(())
}

/// Validate a fuel.
pub fn validate_fuel(f: &Fuel) -> Result<(), ValidationError> {
    check_finite(f.energy_density, "energy_density")?;
    if f.energy_density <= 0.0 {
        return Err(ValidationError::OutOfRange {
            field: "energy_density",
            value: f.energy_density,
            min: f64::MIN_POSITIVE,
            max: f64::MAX,
        });
    }
    check_range(f.co2_density, 0.0..=f64::MAX, "co2_density")
}

/// Validate a market and its load-duration curve.
pub fn validate_market(m: &Market) -> Result<(), ValidationError> {
    if m.load_duration_curve.is_empty() {
        return Err(ValidationError::EmptyLoadCurve(m.id.0.clone()));
    }
    for s in &m.load_duration_curve {
        check_range(s.base_load_mw, 0.0..=f64::MAX, "base_load_mw")?;
        check_range(s.length_hours, 0.0..=8784.0, "length_hours")?;
    }
    check_finite(m.value_of_lost_load, "value_of_lost_load")?;
    if let Some(floor) = &m.co2_price_floor {
        if !floor.is_finite() {
            return Err(ValidationError::NonFinite("co2_price_floor"));
        }
    }
    Ok(())
}

/// Validate a producer and its trait configuration.
pub fn validate_producer(p: &Producer) -> Result<(), ValidationError> {
    if p.cash < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney);
    }
    check_range(p.debt_ratio_of_investments, 0.0..=1.0, "debt_ratio_of_investments")?;
    check_range(p.downpayment_fraction_of_cash, 0.0..=1.0, "downpayment_fraction_of_cash")?;
    check_range(p.equity_interest_rate, -1.0..=1.0, "equity_interest_rate")?;
    check_range(p.loan_interest_rate, -1.0..=1.0, "loan_interest_rate")?;
    if p.forecast_lookback == 0 {
        return Err(ValidationError::ZeroDuration("forecast_lookback"));
    }
    let traits = &p.traits;
    if let Some(cr) = &traits.credit_risk {
        check_range(cr.loan_interest_free_rate, 0.0..=1.0, "loan_interest_free_rate")?;
        check_range(cr.asset_value_deviation, 1e-6..=1.0, "asset_value_deviation")?;
        check_range(cr.time_to_maturity, 1.0..=15.0, "time_to_maturity")?;
        check_range(cr.debt_bias, 0.0..=f64::MAX, "debt_bias")?;
    }
    if let Some(mcda) = &traits.mcda {
        for w in mcda.weights.as_array() {
            check_range(w, 0.0..=5.0, "mcda weight")?;
        }
        check_range(mcda.normalisation_slack, 1.0..=2.0, "normalisation_slack")?;
    }
    if let Some(rp) = &traits.risk_premiums {
        for (value, field) in [
            (rp.nuclear, "risk_premium_nuclear"),
            (rp.coal, "risk_premium_coal"),
            (rp.gas, "risk_premium_gas"),
            (rp.renewable, "risk_premium_renewable"),
        ] {
            check_range(value, -0.15..=0.15, field)?;
        }
    }
    if let Some(div) = &traits.diversification {
        check_range(div.market_giant_capacity, 0.0..=f64::MAX, "market_giant_capacity")?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn coal() -> Technology {
        Technology {
            id: TechnologyId("CoalPSC".to_string()),
            category: TechnologyCategory::CoalFamily,
            fuels: vec![FuelId("coal".to_string())],
            capacity_mw: 750.0,
            investment_cost_per_mw: Trend::Constant { value: 1_400_000.0 },
            fixed_om_cost_per_mw: Trend::Constant { value: 40_000.0 },
            efficiency: Trend::Linear {
                start: 0.40,
                slope: 0.001,
            },
            co2_capture_efficiency: 0.0,
            depreciation_time: 20,
            expected_lead_time: 4,
            expected_permit_time: 1,
            expected_lifetime: 40,
            minimum_running_hours: 5000.0,
            max_fraction_in_country: 0.5,
            max_fraction_per_agent: 0.5,
            peak_segment_availability: 0.9,
            base_segment_availability: 0.95,
        }
    }

    pub fn producer() -> Producer {
        Producer {
            id: AgentId("EnergyProducer A".to_string()),
            cash: Decimal::new(3_000_000_000, 0),
            investor_market: MarketId("NL".to_string()),
            debt_ratio_of_investments: 0.7,
            equity_interest_rate: 0.12,
            loan_interest_rate: 0.09,
            downpayment_fraction_of_cash: 0.5,
            investment_horizon: 7,
            forecast_lookback: 5,
            willing_to_invest: true,
            traits: TraitConfig::default(),
        }
    }
}
