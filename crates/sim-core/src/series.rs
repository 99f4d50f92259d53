//! Time-indexed inputs: parametric trends and observed series.

use crate::{FuelId, MarketId, Tick};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parametric curve evaluated at a tick (tick 0 is the curve origin).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trend {
    /// Same value at every tick.
    Constant { value: f64 },
    /// `start + slope * tick`.
    Linear { start: f64, slope: f64 },
    /// `start * (1 + growth)^tick`.
    Geometric { start: f64, growth: f64 },
}

impl Trend {
    /// Value of the curve at `tick`.
    pub fn value(&self, tick: Tick) -> f64 {
        match *self {
            Trend::Constant { value } => value,
            Trend::Linear { start, slope } => start + slope * tick as f64,
            Trend::Geometric { start, growth } => start * (1.0 + growth).powf(tick as f64),
        }
    }

    /// True when every parameter is finite.
    pub fn is_finite(&self) -> bool {
        match *self {
            Trend::Constant { value } => value.is_finite(),
            Trend::Linear { start, slope } => start.is_finite() && slope.is_finite(),
            Trend::Geometric { start, growth } => {
                start.is_finite() && growth.is_finite() && growth > -1.0
            }
        }
    }
}

/// Observed values indexed by tick, at most one per tick.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeSeries {
    points: BTreeMap<Tick, f64>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from `(tick, value)` pairs; later duplicates win.
    pub fn from_points<I: IntoIterator<Item = (Tick, f64)>>(points: I) -> Self {
        Self {
            points: points.into_iter().collect(),
        }
    }

    /// Record (or overwrite) the value observed at `tick`.
    pub fn insert(&mut self, tick: Tick, value: f64) {
        self.points.insert(tick, value);
    }

    pub fn value(&self, tick: Tick) -> Option<f64> {
        self.points.get(&tick).copied()
    }

    /// Observations with `from <= tick <= to`, ascending by tick.
    pub fn window(&self, from: Tick, to: Tick) -> impl Iterator<Item = (Tick, f64)> + '_ {
        let lo = from.min(to);
        self.points.range(lo..=to).map(|(&t, &v)| (t, v))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_finite(&self) -> bool {
        self.points.values().all(|v| v.is_finite())
    }
}

/// Historical observations the forecaster reads from.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct History {
    /// Commodity clearing prices per fuel.
    #[serde(default)]
    pub fuel_prices: BTreeMap<FuelId, TimeSeries>,
    /// CO2 clearing prices.
    #[serde(default)]
    pub co2_prices: TimeSeries,
    /// Government CO2 tax added on top of the expected CO2 price.
    #[serde(default)]
    pub co2_tax: Option<Trend>,
    /// Demand growth index per market (1.0 = reference demand).
    #[serde(default)]
    pub demand_index: BTreeMap<MarketId, TimeSeries>,
}
