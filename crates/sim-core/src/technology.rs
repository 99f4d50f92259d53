//! Technology catalog, fuels, and speculative candidate plants.

use crate::series::Trend;
use crate::{AgentId, FuelId, NodeId, TechnologyId, Tick};
use serde::{Deserialize, Serialize};

/// Broad technology family used to pick a risk premium.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechnologyCategory {
    /// Nuclear fission.
    Nuclear,
    /// Hard coal, lignite and gasified coal, with or without capture.
    CoalFamily,
    /// Gas-fired plants.
    Gas,
    /// Renewables and anything not covered above.
    Renewable,
}

/// A power-generating technology that producers may build.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Technology {
    /// Technology identifier, e.g. "CoalPSC".
    pub id: TechnologyId,
    /// Family used for risk premiums.
    pub category: TechnologyCategory,
    /// Fuels the technology can burn; empty for renewables.
    #[serde(default)]
    pub fuels: Vec<FuelId>,
    /// Nominal capacity of one new unit in MW (> 0).
    pub capacity_mw: f64,
    /// Overnight investment cost per MW.
    pub investment_cost_per_mw: Trend,
    /// Fixed operation and maintenance cost per MW per tick.
    pub fixed_om_cost_per_mw: Trend,
    /// Electrical efficiency in (0, 1].
    pub efficiency: Trend,
    /// Share of CO2 captured in [0, 1].
    #[serde(default)]
    pub co2_capture_efficiency: f64,
    /// Depreciation time in ticks (> 0).
    pub depreciation_time: u32,
    /// Construction time in ticks.
    pub expected_lead_time: u32,
    /// Permitting time in ticks, before construction starts.
    #[serde(default)]
    pub expected_permit_time: u32,
    /// Operational lifetime in ticks (> 0).
    pub expected_lifetime: u32,
    /// Hours per tick the plant must run to be worth building.
    #[serde(default)]
    pub minimum_running_hours: f64,
    /// Maximum share of peak load this technology may cover country-wide.
    pub max_fraction_in_country: f64,
    /// Maximum share of an agent's own portfolio in this technology.
    pub max_fraction_per_agent: f64,
    /// Availability in the peak segment in [0, 1].
    #[serde(default = "full_availability")]
    pub peak_segment_availability: f64,
    /// Availability in the base segment in [0, 1].
    #[serde(default = "full_availability")]
    pub base_segment_availability: f64,
}

fn full_availability() -> f64 {
    1.0
}

impl Technology {
    /// Ticks between the decision and first operation.
    pub fn total_lead_time(&self) -> u32 {
        self.expected_permit_time + self.expected_lead_time
    }

    pub fn segment_availability(&self, segment: usize, segments: usize) -> f64 {
        segment_availability(
            self.peak_segment_availability,
            self.base_segment_availability,
            segment,
            segments,
        )
    }
}

/// Availability in `segment` (0 = peak) out of `segments`, linear from peak to base.
pub fn segment_availability(peak: f64, base: f64, segment: usize, segments: usize) -> f64 {
    if segments <= 1 || segment == 0 {
        return peak;
    }
    let last = (segments - 1) as f64;
    let towards_peak = (last - segment.min(segments - 1) as f64) / last;
    base - towards_peak * (base - peak)
}

/// A fuel with the physical constants needed for fuel mixes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Fuel {
    /// Fuel identifier, e.g. "coal".
    pub id: FuelId,
    /// Energy density in GJ per tonne (> 0).
    pub energy_density: f64,
    /// CO2 released per tonne burnt.
    #[serde(default)]
    pub co2_density: f64,
}

/// Tonnes of a fuel burnt per MWh produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FuelShare {
    pub fuel: FuelId,
    pub share: f64,
}

/// Unpersisted plant a producer is considering; discarded unless selected.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CandidatePlant {
    pub technology: TechnologyId,
    pub owner: AgentId,
    pub node: NodeId,
    /// Tick at which the investment decision is taken.
    pub decision_tick: Tick,
    pub nominal_capacity_mw: f64,
    pub invested_capital: f64,
    /// Permit plus construction time in ticks.
    pub lead_time: u32,
    pub efficiency: f64,
    pub lifetime: u32,
    pub fuel_mix: Vec<FuelShare>,
    /// Tonnes CO2 per MWh.
    pub emission_intensity: f64,
}

impl CandidatePlant {
    /// Instantiate `technology` for `owner` at `node` without persisting it.
    ///
    /// Cost is taken at the decision tick, efficiency at the first
    /// operational tick. Fuel mix and emission intensity stay empty until
    /// prices are known.
    pub fn specify(technology: &Technology, owner: &AgentId, node: &NodeId, tick: Tick) -> Self {
        let lead_time = technology.total_lead_time();
        let capacity = technology.capacity_mw;
        Self {
            technology: technology.id.clone(),
            owner: owner.clone(),
            node: node.clone(),
            decision_tick: tick,
            nominal_capacity_mw: capacity,
            invested_capital: technology.investment_cost_per_mw.value(tick) * capacity,
            lead_time,
            efficiency: technology.efficiency.value(tick + lead_time as Tick),
            lifetime: technology.expected_lifetime,
            fuel_mix: Vec::new(),
            emission_intensity: 0.0,
        }
    }

    /// Available capacity in `segment` of `segments` once operational.
    pub fn available_capacity(&self, technology: &Technology, segment: usize, segments: usize) -> f64 {
        self.nominal_capacity_mw * technology.segment_availability(segment, segments)
    }
}
