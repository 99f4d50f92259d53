//! Read-only query interfaces the decision engine runs against.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sim_core::{
    AgentId, CapacityTarget, Fuel, FuelId, History, Market, MarketId, NodeCapacityLimit, NodeId,
    PowerPlant, StrategicReserve, Technology, TechnologyId, Tick, ZoneId,
};
use sim_econ::EconError;
use std::collections::BTreeMap;

/// Technologies and fuels.
pub trait CatalogRepository {
    /// All technologies, in catalog order.
    fn technologies(&self) -> &[Technology];
    fn fuels(&self) -> &BTreeMap<FuelId, Fuel>;

    fn technology(&self, id: &TechnologyId) -> Option<&Technology> {
        self.technologies().iter().find(|t| &t.id == id)
    }
}

/// Markets and the policy instruments attached to them.
pub trait MarketRepository {
    fn markets(&self) -> &[Market];
    fn strategic_reserves(&self) -> &[StrategicReserve];
    fn capacity_targets(&self) -> &[CapacityTarget];
    fn node_limits(&self) -> &[NodeCapacityLimit];

    fn market(&self, id: &MarketId) -> Option<&Market> {
        self.markets().iter().find(|m| &m.id == id)
    }

    fn reserve_in_zone(&self, zone: &ZoneId) -> Option<&StrategicReserve> {
        self.strategic_reserves().iter().find(|r| &r.zone == zone)
    }

    fn targets_in_market<'a>(&'a self, market: &'a MarketId) -> impl Iterator<Item = &'a CapacityTarget> + 'a {
        self.capacity_targets().iter().filter(move |t| &t.market == market)
    }

    fn capacity_target(&self, market: &MarketId, technology: &TechnologyId) -> Option<&CapacityTarget> {
        self.capacity_targets()
            .iter()
            .find(|t| &t.market == market && &t.technology == technology)
    }

    fn node_limit(&self, node: &NodeId, technology: &TechnologyId) -> Option<&NodeCapacityLimit> {
        self.node_limits()
            .iter()
            .find(|l| &l.node == node && &l.technology == technology)
    }
}

/// Observed prices and demand.
pub trait HistoryRepository {
    fn history(&self) -> &History;
}

fn capacity<'a>(plants: impl Iterator<Item = &'a PowerPlant>) -> f64 {
    plants.map(|p| p.nominal_capacity_mw).sum()
}

/// Persisted plants and aggregate capacity queries over them.
pub trait PlantRepository {
    fn plants(&self) -> &[PowerPlant];

    /// Plants of `market` operational at `tick`.
    fn expected_plants_in_market<'a>(
        &'a self,
        market: &'a MarketId,
        tick: Tick,
    ) -> impl Iterator<Item = &'a PowerPlant> + 'a {
        self.plants()
            .iter()
            .filter(move |p| &p.market == market && p.is_operational(tick))
    }

    fn expected_capacity_of_technology_in_market(
        &self,
        market: &MarketId,
        technology: &TechnologyId,
        tick: Tick,
    ) -> f64 {
        capacity(
            self.expected_plants_in_market(market, tick)
                .filter(|p| &p.technology == technology),
        )
    }

    fn expected_capacity_of_technology_at_node(
        &self,
        node: &NodeId,
        technology: &TechnologyId,
        tick: Tick,
    ) -> f64 {
        capacity(self.plants().iter().filter(|p| {
            &p.node == node && &p.technology == technology && p.is_operational(tick)
        }))
    }

    fn expected_capacity_of_owner_in_market(&self, market: &MarketId, owner: &AgentId, tick: Tick) -> f64 {
        capacity(
            self.expected_plants_in_market(market, tick)
                .filter(|p| &p.owner == owner),
        )
    }

    fn expected_capacity_of_owner_technology_in_market(
        &self,
        market: &MarketId,
        owner: &AgentId,
        technology: &TechnologyId,
        tick: Tick,
    ) -> f64 {
        capacity(
            self.expected_plants_in_market(market, tick)
                .filter(|p| &p.owner == owner && &p.technology == technology),
        )
    }

    fn pipeline_capacity_in_market(&self, market: &MarketId, tick: Tick) -> f64 {
        capacity(
            self.plants()
                .iter()
                .filter(|p| &p.market == market && p.is_in_pipeline(tick)),
        )
    }

    fn pipeline_capacity_of_technology(&self, technology: &TechnologyId, tick: Tick) -> f64 {
        capacity(
            self.plants()
                .iter()
                .filter(|p| &p.technology == technology && p.is_in_pipeline(tick)),
        )
    }

    fn operational_capacity_of_technology(&self, technology: &TechnologyId, tick: Tick) -> f64 {
        capacity(
            self.plants()
                .iter()
                .filter(|p| &p.technology == technology && p.is_operational(tick)),
        )
    }

    fn operational_capacity_of_owner(&self, owner: &AgentId, tick: Tick) -> f64 {
        capacity(
            self.plants()
                .iter()
                .filter(|p| &p.owner == owner && p.is_operational(tick)),
        )
    }

    fn operational_capacity_of_owner_technology(
        &self,
        owner: &AgentId,
        technology: &TechnologyId,
        tick: Tick,
    ) -> f64 {
        capacity(self.plants().iter().filter(|p| {
            &p.owner == owner && &p.technology == technology && p.is_operational(tick)
        }))
    }

    /// Loan payments still due on the owner's plants.
    fn remaining_debt_of_owner(&self, owner: &AgentId) -> Decimal {
        self.plants()
            .iter()
            .filter(|p| &p.owner == owner)
            .filter_map(|p| p.loan.as_ref())
            .map(|l| l.remaining_payments())
            .sum()
    }
}

/// Everything the decision engine reads during one tick.
pub trait WorldView: CatalogRepository + MarketRepository + HistoryRepository + PlantRepository {
    /// Straight-line book value of the owner's plants at `tick`.
    ///
    /// Plants of unknown technologies are valued at zero.
    fn book_value_of_owner(&self, owner: &AgentId, tick: Tick) -> f64 {
        self.plants()
            .iter()
            .filter(|p| &p.owner == owner)
            .filter_map(|p| {
                let t = self.technology(&p.technology)?;
                p.book_value(tick, t.depreciation_time)
            })
            .sum()
    }

    /// Remaining debt as `f64` for the credit-risk model.
    fn remaining_debt_of_owner_f64(&self, owner: &AgentId) -> Result<f64, EconError> {
        self.remaining_debt_of_owner(owner)
            .to_f64()
            .ok_or(EconError::NonFinite)
    }
}

impl<T> WorldView for T where T: CatalogRepository + MarketRepository + HistoryRepository + PlantRepository {}
