//! Persisted records: plants, loans and cash flows.

use crate::technology::FuelShare;
use crate::{AgentId, MarketId, NodeId, TechnologyId, Tick};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Unique identifier of a persisted plant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlantId(pub u64);

/// Other side of a loan or cash flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Counterparty {
    /// The plant manufacturer receiving down payments.
    Manufacturer,
    /// The bank financing the debt share.
    Bank,
}

/// A built or planned power plant.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PowerPlant {
    pub id: PlantId,
    pub owner: AgentId,
    pub technology: TechnologyId,
    pub market: MarketId,
    pub node: NodeId,
    /// Tick of the investment decision.
    pub construction_start: Tick,
    /// Permit plus construction time in ticks.
    pub lead_time: u32,
    /// Operational lifetime in ticks.
    pub lifetime: u32,
    pub nominal_capacity_mw: f64,
    pub invested_capital: Decimal,
    pub efficiency: f64,
    #[serde(default)]
    pub fuel_mix: Vec<FuelShare>,
    #[serde(default)]
    pub loan: Option<Loan>,
}

impl PowerPlant {
    /// First tick the plant produces.
    pub fn operational_from(&self) -> Tick {
        self.construction_start + self.lead_time as Tick
    }

    /// Whether the plant produces at `tick`.
    pub fn is_operational(&self, tick: Tick) -> bool {
        let from = self.operational_from();
        from <= tick && tick < from + self.lifetime as Tick
    }

    /// Whether the plant is being permitted or built at `tick`.
    pub fn is_in_pipeline(&self, tick: Tick) -> bool {
        self.construction_start <= tick && tick < self.operational_from()
    }

    /// Invested capital minus straight-line depreciation up to `tick`.
    ///
    /// Returns `None` if the capital does not fit in an `f64`.
    pub fn book_value(&self, tick: Tick, depreciation_time: u32) -> Option<f64> {
        let invested = self.invested_capital.to_f64()?;
        if depreciation_time == 0 {
            return Some(0.0);
        }
        let age = (tick - self.operational_from()).clamp(0, depreciation_time as Tick);
        Some(invested * (1.0 - age as f64 / depreciation_time as f64))
    }
}

/// An amortising loan attached to a plant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub lender: Counterparty,
    pub principal: Decimal,
    pub interest_rate: f64,
    pub amount_per_payment: Decimal,
    pub total_payments: u32,
    #[serde(default)]
    pub payments_done: u32,
    pub start_tick: Tick,
}

impl Loan {
    /// Sum of the payments still due.
    pub fn remaining_payments(&self) -> Decimal {
        let left = self.total_payments.saturating_sub(self.payments_done);
        self.amount_per_payment * Decimal::from(left)
    }
}

/// A down-payment installment from a producer to the manufacturer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CashFlow {
    pub payer: AgentId,
    pub payee: Counterparty,
    pub amount: Decimal,
    /// Tick the installment is due.
    pub tick: Tick,
    pub plant: PlantId,
}
