//! In-memory world state, read-only for the duration of a tick.

use crate::repository::{CatalogRepository, HistoryRepository, MarketRepository, PlantRepository};
use serde::{Deserialize, Serialize};
use sim_core::{
    validate_fuel, validate_market, validate_technology, CapacityTarget, Fuel, FuelId, History,
    Market, NodeCapacityLimit, PlantId, PowerPlant, StrategicReserve, Technology, ValidationError,
};
use std::collections::{BTreeMap, BTreeSet};

/// Catalog, markets, history and plants of a scenario.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WorldSnapshot {
    #[serde(default)]
    pub technologies: Vec<Technology>,
    #[serde(default)]
    pub fuels: BTreeMap<FuelId, Fuel>,
    #[serde(default)]
    pub markets: Vec<Market>,
    #[serde(default)]
    pub strategic_reserves: Vec<StrategicReserve>,
    #[serde(default)]
    pub capacity_targets: Vec<CapacityTarget>,
    #[serde(default)]
    pub node_limits: Vec<NodeCapacityLimit>,
    #[serde(default)]
    pub history: History,
    #[serde(default)]
    pub plants: Vec<PowerPlant>,
}

impl WorldSnapshot {
    /// Validate every entity and the references between them.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut techs = BTreeSet::new();
        for t in &self.technologies {
            validate_technology(t)?;
            if !techs.insert(&t.id) {
                return Err(ValidationError::DuplicateId(t.id.to_string()));
            }
            for f in &t.fuels {
                if !self.fuels.contains_key(f) {
                    return Err(ValidationError::UnknownReference(format!("fuel {f} of {}", t.id)));
                }
            }
        }
        for (id, f) in &self.fuels {
            validate_fuel(f)?;
            if id != &f.id {
                return Err(ValidationError::UnknownReference(format!(
                    "fuel keyed {id} is named {}",
                    f.id
                )));
            }
        }
        let mut markets = BTreeSet::new();
        for m in &self.markets {
            validate_market(m)?;
            if !markets.insert(&m.id) {
                return Err(ValidationError::DuplicateId(m.id.to_string()));
            }
        }
        for target in &self.capacity_targets {
            if !markets.contains(&target.market) || !techs.contains(&target.technology) {
                return Err(ValidationError::UnknownReference(format!(
                    "capacity target {} in {}",
                    target.technology, target.market
                )));
            }
        }
        for limit in &self.node_limits {
            if !techs.contains(&limit.technology) {
                return Err(ValidationError::UnknownReference(format!(
                    "node limit for {} at {}",
                    limit.technology, limit.node
                )));
            }
        }
        let mut plants = BTreeSet::new();
        for p in &self.plants {
            if !plants.insert(p.id) {
                return Err(ValidationError::DuplicateId(format!("plant {}", p.id.0)));
            }
            if !techs.contains(&p.technology) {
                return Err(ValidationError::UnknownReference(format!(
                    "technology {} of plant {}",
                    p.technology, p.id.0
                )));
            }
        }
        Ok(())
    }

    /// Next free plant identifier.
    pub fn next_plant_id(&self) -> PlantId {
        PlantId(self.plants.iter().map(|p| p.id.0 + 1).max().unwrap_or(1))
    }
}

impl CatalogRepository for WorldSnapshot {
    fn technologies(&self) -> &[Technology] {
        &self.technologies
    }

    fn fuels(&self) -> &BTreeMap<FuelId, Fuel> {
        &self.fuels
    }
}

impl MarketRepository for WorldSnapshot {
    fn markets(&self) -> &[Market] {
        &self.markets
    }

    fn strategic_reserves(&self) -> &[StrategicReserve] {
        &self.strategic_reserves
    }

    fn capacity_targets(&self) -> &[CapacityTarget] {
        &self.capacity_targets
    }

    fn node_limits(&self) -> &[NodeCapacityLimit] {
        &self.node_limits
    }
}

impl HistoryRepository for WorldSnapshot {
    fn history(&self) -> &History {
        &self.history
    }
}

impl PlantRepository for WorldSnapshot {
    fn plants(&self) -> &[PowerPlant] {
        &self.plants
    }
}
