//! Fuel mixes, emission intensities and expected marginal costs.

use crate::forecast::Forecast;
use crate::EconError;
use sim_core::{Fuel, FuelId, FuelShare, Technology};
use std::collections::BTreeMap;

const GJ_PER_MWH: f64 = 3.6;

/// Tonnes of `fuel` burnt per MWh at `efficiency`.
pub fn fuel_share(fuel: &Fuel, efficiency: f64) -> Result<f64, EconError> {
    if !(efficiency > 0.0 && efficiency.is_finite()) {
        return Err(EconError::InvalidParameter("efficiency"));
    }
    Ok(GJ_PER_MWH / (efficiency * fuel.energy_density))
}

fn lookup<'a>(fuels: &'a BTreeMap<FuelId, Fuel>, id: &FuelId) -> Result<&'a Fuel, EconError> {
    fuels
        .get(id)
        .ok_or_else(|| EconError::InsufficientData(format!("unknown fuel {id}")))
}

fn price(prices: &BTreeMap<FuelId, f64>, id: &FuelId) -> Result<f64, EconError> {
    prices
        .get(id)
        .copied()
        .ok_or_else(|| EconError::InsufficientData(format!("no price forecast for fuel {id}")))
}

/// Tonnes CO2 emitted per MWh for a fuel mix.
pub fn emission_intensity(
    mix: &[FuelShare],
    fuels: &BTreeMap<FuelId, Fuel>,
    capture_efficiency: f64,
) -> Result<f64, EconError> {
    let mut co2 = 0.0;
    for s in mix {
        co2 += s.share * lookup(fuels, &s.fuel)?.co2_density;
    }
    Ok(co2 * (1.0 - capture_efficiency))
}

/// Σ(fuel share × fuel price) + emission intensity × CO2 price.
pub fn marginal_cost(
    mix: &[FuelShare],
    fuel_prices: &BTreeMap<FuelId, f64>,
    emission_intensity: f64,
    co2_price: f64,
) -> Result<f64, EconError> {
    let mut cost = emission_intensity * co2_price;
    for s in mix {
        cost += s.share * price(fuel_prices, &s.fuel)?;
    }
    Ok(cost)
}

/// Fuel mix, emissions and marginal cost of running a unit.
#[derive(Clone, Debug, PartialEq)]
pub struct DispatchCost {
    pub fuel_mix: Vec<FuelShare>,
    pub emission_intensity: f64,
    pub marginal_cost: f64,
}

/// Cost of running `technology` at `efficiency` under `forecast`.
///
/// Multi-fuel technologies burn the single fuel that is cheapest once CO2 is
/// priced in; the first listed fuel wins ties. Technologies without fuels run
/// at zero marginal cost.
pub fn dispatch_cost(
    technology: &Technology,
    efficiency: f64,
    fuels: &BTreeMap<FuelId, Fuel>,
    forecast: &Forecast,
) -> Result<DispatchCost, EconError> {
    let capture = technology.co2_capture_efficiency;
    let mut best: Option<DispatchCost> = None;
    for id in &technology.fuels {
        let fuel = lookup(fuels, id)?;
        let mix = vec![FuelShare {
            fuel: id.clone(),
            share: fuel_share(fuel, efficiency)?,
        }];
        let emissions = emission_intensity(&mix, fuels, capture)?;
        let cost = marginal_cost(&mix, &forecast.fuel_prices, emissions, forecast.co2_price)?;
        if best.as_ref().map_or(true, |b| cost < b.marginal_cost) {
            best = Some(DispatchCost {
                fuel_mix: mix,
                emission_intensity: emissions,
                marginal_cost: cost,
            });
        }
    }
    Ok(best.unwrap_or(DispatchCost {
        fuel_mix: Vec::new(),
        emission_intensity: 0.0,
        marginal_cost: 0.0,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::{TechnologyCategory, TechnologyId, Trend};

    fn fuels() -> BTreeMap<FuelId, Fuel> {
        [("coal", 29.0, 2.4), ("biomass", 18.0, 0.0)]
            .into_iter()
            .map(|(id, energy_density, co2_density)| {
                let id = FuelId(id.to_string());
                (
                    id.clone(),
                    Fuel {
                        id,
                        energy_density,
                        co2_density,
                    },
                )
            })
            .collect()
    }

    fn technology(fuel_ids: &[&str]) -> Technology {
        Technology {
            id: TechnologyId("CoalPSC".to_string()),
            category: TechnologyCategory::CoalFamily,
            fuels: fuel_ids.iter().map(|f| FuelId(f.to_string())).collect(),
            capacity_mw: 750.0,
            investment_cost_per_mw: Trend::Constant { value: 1.0 },
            fixed_om_cost_per_mw: Trend::Constant { value: 1.0 },
            efficiency: Trend::Constant { value: 0.4 },
            co2_capture_efficiency: 0.0,
            depreciation_time: 20,
            expected_lead_time: 4,
            expected_permit_time: 1,
            expected_lifetime: 40,
            minimum_running_hours: 0.0,
            max_fraction_in_country: 1.0,
            max_fraction_per_agent: 1.0,
            peak_segment_availability: 1.0,
            base_segment_availability: 1.0,
        }
    }

    fn forecast(coal: f64, biomass: f64, co2: f64) -> Forecast {
        Forecast {
            future_tick: 10,
            fuel_prices: [
                (FuelId("coal".to_string()), coal),
                (FuelId("biomass".to_string()), biomass),
            ]
            .into_iter()
            .collect(),
            demand_factor: 1.0,
            co2_price: co2,
        }
    }

    #[test]
    fn coal_marginal_cost_includes_co2() {
        let d = dispatch_cost(&technology(&["coal"]), 0.4, &fuels(), &forecast(60.0, 0.0, 20.0))
            .unwrap();
        let share = 3.6 / (0.4 * 29.0);
        assert!((d.emission_intensity - share * 2.4).abs() < 1e-12);
        assert!((d.marginal_cost - (share * 60.0 + share * 2.4 * 20.0)).abs() < 1e-9);
    }

    #[test]
    fn co2_price_switches_to_cheaper_fuel() {
        let t = technology(&["coal", "biomass"]);
        let cheap_co2 = dispatch_cost(&t, 0.4, &fuels(), &forecast(60.0, 120.0, 0.0)).unwrap();
        assert_eq!(cheap_co2.fuel_mix[0].fuel.0, "coal");
        let dear_co2 = dispatch_cost(&t, 0.4, &fuels(), &forecast(60.0, 120.0, 200.0)).unwrap();
        assert_eq!(dear_co2.fuel_mix[0].fuel.0, "biomass");
        assert_eq!(dear_co2.emission_intensity, 0.0);
    }

    #[test]
    fn capture_reduces_emissions() {
        let mut t = technology(&["coal"]);
        t.co2_capture_efficiency = 0.9;
        let d = dispatch_cost(&t, 0.4, &fuels(), &forecast(60.0, 0.0, 0.0)).unwrap();
        let share = 3.6 / (0.4 * 29.0);
        assert!((d.emission_intensity - share * 2.4 * 0.1).abs() < 1e-12);
    }

    #[test]
    fn fuel_free_technology_runs_for_nothing() {
        let d = dispatch_cost(&technology(&[]), 1.0, &fuels(), &forecast(60.0, 0.0, 50.0)).unwrap();
        assert_eq!(d.marginal_cost, 0.0);
        assert!(d.fuel_mix.is_empty());
    }

    #[test]
    fn missing_fuel_price_is_an_error() {
        let mut f = forecast(60.0, 0.0, 0.0);
        f.fuel_prices.clear();
        assert!(matches!(
            dispatch_cost(&technology(&["coal"]), 0.4, &fuels(), &f),
            Err(EconError::InsufficientData(_))
        ));
    }

    #[test]
    fn zero_efficiency_is_rejected() {
        assert_eq!(
            fuel_share(&fuels()[&FuelId("coal".to_string())], 0.0),
            Err(EconError::InvalidParameter("efficiency"))
        );
    }
}
