//! Expected merit-order dispatch and segment clearing prices.

use serde::{Deserialize, Serialize};
use sim_core::{segment_availability, Segment, StrategicReserve};

/// One generation unit offered into the expected merit order.
#[derive(Clone, Debug, PartialEq)]
pub struct MeritUnit {
    pub marginal_cost: f64,
    pub capacity_mw: f64,
    pub peak_availability: f64,
    pub base_availability: f64,
}

impl MeritUnit {
    /// Capacity available in `segment` (0 = peak) out of `segments`.
    pub fn available(&self, segment: usize, segments: usize) -> f64 {
        self.capacity_mw
            * segment_availability(self.peak_availability, self.base_availability, segment, segments)
    }
}

/// Demand side of the simulated market.
#[derive(Clone, Copy, Debug)]
pub struct MarketConditions<'a> {
    /// Load-duration curve, peak first.
    pub segments: &'a [Segment],
    pub demand_factor: f64,
    pub value_of_lost_load: f64,
    pub reserve: Option<&'a StrategicReserve>,
}

/// Expected prices and loads per segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketOutlook {
    pub segment_prices: Vec<f64>,
    pub segment_loads: Vec<f64>,
    pub max_expected_load: f64,
    /// Nominal capacity of all units in the merit order.
    pub capacity_sum: f64,
}

/// Units sorted by ascending marginal cost; equal costs keep insertion order.
#[derive(Clone, Debug, Default)]
pub struct MeritOrder {
    units: Vec<MeritUnit>,
}

impl MeritOrder {
    pub fn new(mut units: Vec<MeritUnit>) -> Self {
        units.sort_by(|a, b| a.marginal_cost.total_cmp(&b.marginal_cost));
        Self { units }
    }

    pub fn units(&self) -> &[MeritUnit] {
        &self.units
    }

    /// Clear every segment of the load-duration curve.
    ///
    /// The price is the marginal cost of the last unit needed to cover the
    /// expected load, the value of lost load if supply falls short, or the
    /// reserve price when a strategic reserve is present and the margin is
    /// within its volume.
    pub fn clear(&self, market: &MarketConditions<'_>) -> MarketOutlook {
        let n = market.segments.len();
        let mut prices = Vec::with_capacity(n);
        let mut loads = Vec::with_capacity(n);
        let mut max_load = 0.0f64;

        for (i, segment) in market.segments.iter().enumerate() {
            let load = segment.base_load_mw * market.demand_factor;
            max_load = max_load.max(load);

            let mut supply = 0.0;
            let mut price = 0.0;
            let mut available_total = 0.0;
            for unit in &self.units {
                let cap = unit.available(i, n);
                available_total += cap;
                if supply < load {
                    supply += cap;
                    price = unit.marginal_cost;
                }
            }

            let cleared = if supply < load {
                market.value_of_lost_load
            } else {
                match market.reserve {
                    Some(r) if available_total - load <= r.reserve_volume_mw => r.reserve_price,
                    _ => price,
                }
            };
            prices.push(cleared);
            loads.push(load);
        }

        MarketOutlook {
            segment_prices: prices,
            segment_loads: loads,
            max_expected_load: max_load,
            capacity_sum: self.units.iter().map(|u| u.capacity_mw).sum(),
        }
    }
}
