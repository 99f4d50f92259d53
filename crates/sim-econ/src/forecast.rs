//! Geometric-trend forecasting of fuel prices, demand and CO2 price.

use crate::EconError;
use sim_core::{FuelId, History, Market, TimeSeries, Tick};
use std::collections::BTreeMap;

/// Least-squares fit of `value = a * b^tick` on log-transformed observations.
///
/// Degenerate inputs fall back to the most recent observation: a single
/// point, several points at the same tick, or any non-positive value (the
/// logarithm is undefined there). Without observations there is nothing to
/// fall back to and prediction fails.
#[derive(Clone, Debug, Default)]
pub struct GeometricTrendRegression {
    n: usize,
    sum_x: f64,
    sum_y: f64,
    sum_xx: f64,
    sum_xy: f64,
    latest: Option<(Tick, f64)>,
    non_positive: bool,
}

impl GeometricTrendRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, tick: Tick, value: f64) {
        match self.latest {
            Some((t, _)) if t > tick => {}
            _ => self.latest = Some((tick, value)),
        }
        if value <= 0.0 {
            self.non_positive = true;
            return;
        }
        let x = tick as f64;
        let y = value.ln();
        self.n += 1;
        self.sum_x += x;
        self.sum_y += y;
        self.sum_xx += x * x;
        self.sum_xy += x * y;
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_none()
    }

    pub fn predict(&self, tick: Tick) -> Result<f64, EconError> {
        let (_, last) = self
            .latest
            .ok_or_else(|| EconError::InsufficientData("no observations to fit".to_string()))?;
        if self.non_positive || self.n < 2 {
            return Ok(last);
        }
        let n = self.n as f64;
        let denom = n * self.sum_xx - self.sum_x * self.sum_x;
        if denom.abs() < f64::EPSILON {
            return Ok(last);
        }
        let slope = (n * self.sum_xy - self.sum_x * self.sum_y) / denom;
        let intercept = (self.sum_y - slope * self.sum_x) / n;
        let predicted = (intercept + slope * tick as f64).exp();
        if !predicted.is_finite() {
            return Err(EconError::NonFinite);
        }
        Ok(predicted)
    }
}

/// Fit the window ending at `current` and extrapolate to `future`.
pub fn forecast_series(
    series: &TimeSeries,
    current: Tick,
    lookback: u32,
    future: Tick,
) -> Result<f64, EconError> {
    let from = (current - lookback.max(1) as Tick + 1).max(0);
    let mut gtr = GeometricTrendRegression::new();
    for (tick, value) in series.window(from, current) {
        gtr.add(tick, value);
    }
    gtr.predict(future)
}

/// Expected conditions in one market at the future time point.
#[derive(Clone, Debug, PartialEq)]
pub struct Forecast {
    pub future_tick: Tick,
    /// Expected price per fuel with a clearing history.
    pub fuel_prices: BTreeMap<FuelId, f64>,
    /// Expected demand index of the market.
    pub demand_factor: f64,
    /// Expected CO2 price including floor and tax.
    pub co2_price: f64,
}

/// Forecasting horizon of one producer at one tick.
#[derive(Clone, Copy, Debug)]
pub struct Forecaster {
    pub current_tick: Tick,
    pub lookback: u32,
    pub horizon: u32,
}

impl Forecaster {
    pub fn new(current_tick: Tick, lookback: u32, horizon: u32) -> Self {
        Self {
            current_tick,
            lookback,
            horizon,
        }
    }

    pub fn future_tick(&self) -> Tick {
        self.current_tick + self.horizon as Tick
    }

    fn extrapolate(&self, series: &TimeSeries, what: &str) -> Result<f64, EconError> {
        forecast_series(series, self.current_tick, self.lookback, self.future_tick()).map_err(
            |e| match e {
                EconError::InsufficientData(_) => EconError::InsufficientData(format!(
                    "no {what} observations up to tick {}",
                    self.current_tick
                )),
                other => other,
            },
        )
    }

    /// Forecast every fuel with a price history, plus demand and CO2 for `market`.
    pub fn forecast(&self, history: &History, market: &Market) -> Result<Forecast, EconError> {
        let future = self.future_tick();
        let mut fuel_prices = BTreeMap::new();
        for (fuel, series) in &history.fuel_prices {
            let price = self.extrapolate(series, &format!("{fuel} price"))?;
            fuel_prices.insert(fuel.clone(), price);
        }

        let demand_series = history.demand_index.get(&market.id).ok_or_else(|| {
            EconError::InsufficientData(format!("no demand index for market {}", market.id))
        })?;
        let demand_factor = self.extrapolate(demand_series, "demand")?;

        let mut co2_price = self.extrapolate(&history.co2_prices, "CO2 price")?;
        if let Some(floor) = &market.co2_price_floor {
            co2_price = co2_price.max(floor.value(future));
        }
        if let Some(tax) = &history.co2_tax {
            co2_price += tax.value(future);
        }

        Ok(Forecast {
            future_tick: future,
            fuel_prices,
            demand_factor,
            co2_price,
        })
    }
}
