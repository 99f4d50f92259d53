//! Per-agent investment decisions over a read-only world snapshot.

use crate::config::EngineConfig;
use crate::executor::{ExecError, InvestmentExecutor, InvestmentOrder};
use crate::repository::WorldView;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rust_decimal::prelude::ToPrimitive;
use sim_ai::{
    check_eligibility, resolve_policy, select, CapacityOutlook, Ineligibility, ScoredCandidate,
    ScoringBoard, SelectionError,
};
use sim_core::{AgentId, CandidatePlant, Market, MarketId, PlantId, Producer, TechnologyId, Tick};
use sim_econ::{
    dispatch_cost, emission_intensity, marginal_cost, merton_cost_of_debt, operating_outlook,
    value_project, wacc, EconError, Forecast, Forecaster, MarketConditions, MarketOutlook,
    MertonInputs, MeritOrder, MeritUnit, MIN_DEBT,
};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failure of one agent's decision; other agents are unaffected.
#[derive(Debug, Error, PartialEq)]
pub enum DecisionError {
    #[error("unknown investor market {0}")]
    UnknownMarket(MarketId),
    #[error("unknown technology {0}")]
    UnknownTechnology(TechnologyId),
    #[error(transparent)]
    Econ(#[from] EconError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Why a technology did not reach the scoring board.
#[derive(Clone, Debug, PartialEq)]
pub enum RejectionReason {
    Ineligible(Ineligibility),
    TooFewRunningHours { expected: f64, required: f64 },
    Unprofitable { project_value: f64 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Rejection {
    pub technology: TechnologyId,
    pub reason: RejectionReason,
}

/// Outcome of one agent's decision in one tick.
#[derive(Clone, Debug)]
pub struct Decision {
    pub agent: AgentId,
    pub tick: Tick,
    pub policy: &'static str,
    pub cost_of_debt: f64,
    pub outlook: MarketOutlook,
    pub board: ScoringBoard,
    pub rejections: Vec<Rejection>,
    pub choice: Option<TechnologyId>,
    pub order: Option<InvestmentOrder>,
}

impl Decision {
    pub fn chosen(&self) -> Option<&ScoredCandidate> {
        self.choice.as_ref().and_then(|id| self.board.get(id))
    }
}

/// Outcomes of every producer in one tick.
#[derive(Debug, Default)]
pub struct TickReport {
    pub tick: Tick,
    pub decisions: Vec<Decision>,
    pub committed: Vec<(AgentId, PlantId)>,
    /// Producers sitting out this round.
    pub skipped: Vec<AgentId>,
    pub failures: Vec<(AgentId, DecisionError)>,
}

/// Seed of the generator used by `agent` at `tick`.
///
/// Independent of the order in which agents are processed.
pub fn decision_seed(seed: u64, agent: &AgentId, tick: Tick) -> u64 {
    // FNV-1a
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for b in agent.0.as_bytes() {
        h ^= u64::from(*b);
        h = h.wrapping_mul(0x0100_0000_01b3);
    }
    seed ^ h ^ (tick as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15)
}

/// Expected merit order of `market` at the forecast tick.
///
/// Plants without a recorded fuel mix burn their technology's cheapest fuel.
/// Capacity targets not yet met are filled with phantom units that run at
/// zero marginal cost.
pub fn market_outlook<W: WorldView>(
    world: &W,
    market: &Market,
    forecast: &Forecast,
) -> Result<MarketOutlook, DecisionError> {
    let future = forecast.future_tick;
    let fuels = world.fuels();
    let mut units = Vec::new();

    for plant in world.expected_plants_in_market(&market.id, future) {
        let tech = world
            .technology(&plant.technology)
            .ok_or_else(|| DecisionError::UnknownTechnology(plant.technology.clone()))?;
        let cost = if plant.fuel_mix.is_empty() {
            dispatch_cost(tech, plant.efficiency, fuels, forecast)?.marginal_cost
        } else {
            let emissions = emission_intensity(&plant.fuel_mix, fuels, tech.co2_capture_efficiency)?;
            marginal_cost(&plant.fuel_mix, &forecast.fuel_prices, emissions, forecast.co2_price)?
        };
        units.push(MeritUnit {
            marginal_cost: cost,
            capacity_mw: plant.nominal_capacity_mw,
            peak_availability: tech.peak_segment_availability,
            base_availability: tech.base_segment_availability,
        });
    }

    for target in world.targets_in_market(&market.id) {
        let tech = world
            .technology(&target.technology)
            .ok_or_else(|| DecisionError::UnknownTechnology(target.technology.clone()))?;
        let expected = world.expected_capacity_of_technology_in_market(&market.id, &tech.id, future);
        let gap = target.trend.value(future) - expected;
        if gap > 0.0 {
            units.push(MeritUnit {
                marginal_cost: 0.0,
                capacity_mw: gap,
                peak_availability: tech.peak_segment_availability,
                base_availability: tech.base_segment_availability,
            });
        }
    }

    let conditions = MarketConditions {
        segments: &market.load_duration_curve,
        demand_factor: forecast.demand_factor,
        value_of_lost_load: market.value_of_lost_load,
        reserve: world.reserve_in_zone(&market.zone),
    };
    Ok(MeritOrder::new(units).clear(&conditions))
}

/// Flat loan rate, or the structural cost of debt with credit risk on.
pub fn cost_of_debt<W: WorldView>(world: &W, producer: &Producer, tick: Tick) -> Result<f64, DecisionError> {
    let Some(cr) = &producer.traits.credit_risk else {
        return Ok(producer.loan_interest_rate);
    };
    let cash = producer.cash.to_f64().ok_or(EconError::NonFinite)?;
    let assets = cash + world.book_value_of_owner(&producer.id, tick);
    let debt = world.remaining_debt_of_owner_f64(&producer.id)?.max(MIN_DEBT) + cr.debt_bias;
    let rate = merton_cost_of_debt(&MertonInputs {
        assets,
        debt,
        volatility: cr.asset_value_deviation,
        risk_free_rate: cr.loan_interest_free_rate,
        maturity: cr.time_to_maturity,
    })?;
    debug!(agent = %producer.id, assets, debt, rate, "credit-risk cost of debt");
    Ok(rate)
}

/// Start a new investment round: every producer may decide again.
pub fn open_round(producers: &mut [Producer]) {
    for p in producers.iter_mut().filter(|p| !p.willing_to_invest) {
        debug!(agent = %p.id, "rejoining investment round");
        p.willing_to_invest = true;
    }
}

/// Runs the forecast, screening, valuation and selection pipeline.
#[derive(Clone, Debug, Default)]
pub struct InvestmentEngine {
    pub config: EngineConfig,
    pub seed: u64,
}

impl InvestmentEngine {
    pub fn new(config: EngineConfig, seed: u64) -> Self {
        Self { config, seed }
    }

    /// Decide what, if anything, `producer` builds at `tick`.
    pub fn decide<W: WorldView>(
        &self,
        world: &W,
        producer: &Producer,
        tick: Tick,
    ) -> Result<Decision, DecisionError> {
        let market = world
            .market(&producer.investor_market)
            .ok_or_else(|| DecisionError::UnknownMarket(producer.investor_market.clone()))?;

        let cash = producer.cash.to_f64().ok_or(EconError::NonFinite)?;
        let forecaster = Forecaster::new(tick, producer.forecast_lookback, producer.investment_horizon);
        let forecast = forecaster.forecast(world.history(), market)?;
        let future = forecast.future_tick;
        let outlook = market_outlook(world, market, &forecast)?;
        debug!(
            agent = %producer.id,
            tick,
            future,
            co2 = forecast.co2_price,
            demand = forecast.demand_factor,
            prices = ?outlook.segment_prices,
            "market outlook"
        );

        let debt_rate = cost_of_debt(world, producer, tick)?;
        let own_operational = world.operational_capacity_of_owner(&producer.id, tick);
        let policy = resolve_policy(&producer.traits, own_operational);

        let mut board = ScoringBoard::new();
        let mut candidates: BTreeMap<TechnologyId, CandidatePlant> = BTreeMap::new();
        let mut rejections = Vec::new();
        let mut reject = |technology: &TechnologyId, reason: RejectionReason| {
            debug!(agent = %producer.id, %technology, ?reason, "technology rejected");
            rejections.push(Rejection {
                technology: technology.clone(),
                reason,
            });
        };

        for tech in world.technologies() {
            let mut candidate = CandidatePlant::specify(tech, &producer.id, &market.node, tick);

            let mut in_market = world.expected_capacity_of_technology_in_market(&market.id, &tech.id, future);
            if let Some(target) = world.capacity_target(&market.id, &tech.id) {
                in_market = in_market.max(target.trend.value(future));
            }
            let capacity = CapacityOutlook {
                technology_in_market: in_market,
                technology_at_node: world.expected_capacity_of_technology_at_node(&market.node, &tech.id, future),
                node_limit: world
                    .node_limit(&market.node, &tech.id)
                    .map(|l| l.upper_limit.value(future)),
                own_technology_in_market: world.expected_capacity_of_owner_technology_in_market(
                    &market.id,
                    &producer.id,
                    &tech.id,
                    future,
                ),
                own_total_in_market: world.expected_capacity_of_owner_in_market(&market.id, &producer.id, future),
                market_pipeline: world.pipeline_capacity_in_market(&market.id, tick),
                technology_pipeline: world.pipeline_capacity_of_technology(&tech.id, tick),
                technology_operational: world.operational_capacity_of_technology(&tech.id, tick),
                max_expected_load: outlook.max_expected_load,
            };
            if let Err(why) = check_eligibility(&candidate, tech, &capacity, producer, cash, &self.config.eligibility) {
                reject(&tech.id, RejectionReason::Ineligible(why));
                continue;
            }

            let dispatch = dispatch_cost(tech, candidate.efficiency, world.fuels(), &forecast)?;
            candidate.fuel_mix = dispatch.fuel_mix;
            candidate.emission_intensity = dispatch.emission_intensity;

            let operation = operating_outlook(
                dispatch.marginal_cost,
                &market.load_duration_curve,
                &outlook,
                |segment, segments| candidate.available_capacity(tech, segment, segments),
            );
            if operation.running_hours < tech.minimum_running_hours {
                reject(
                    &tech.id,
                    RejectionReason::TooFewRunningHours {
                        expected: operation.running_hours,
                        required: tech.minimum_running_hours,
                    },
                );
                continue;
            }

            let fixed_om = tech.fixed_om_cost_per_mw.value(tick) * candidate.nominal_capacity_mw;
            let operating_profit = operation.gross_profit - fixed_om;
            let premium = producer
                .traits
                .risk_premiums
                .as_ref()
                .map_or(0.0, |rp| rp.for_category(tech.category));
            let rate = wacc(
                producer.debt_ratio_of_investments,
                producer.equity_interest_rate,
                debt_rate,
                premium,
            );
            let valuation = value_project(
                candidate.invested_capital,
                candidate.lead_time,
                tech.depreciation_time,
                operating_profit,
                rate,
            )?;
            if !valuation.is_profitable() {
                reject(
                    &tech.id,
                    RejectionReason::Unprofitable {
                        project_value: valuation.project_value,
                    },
                );
                continue;
            }

            board.insert(ScoredCandidate {
                technology: tech.id.clone(),
                npv_per_mw: valuation.project_value / candidate.nominal_capacity_mw,
                project_value: valuation.project_value,
                wacc: rate,
                emission_intensity: candidate.emission_intensity,
                efficiency: candidate.efficiency,
                invested_capital: candidate.invested_capital,
                lifetime: f64::from(candidate.lifetime),
                own_capacity_mw: world.operational_capacity_of_owner_technology(&producer.id, &tech.id, tick),
                propensity: 0.0,
                normalised_propensity: 0.0,
                probability: 0.0,
            });
            candidates.insert(tech.id.clone(), candidate);
        }

        let mut rng = ChaCha8Rng::seed_from_u64(decision_seed(self.seed, &producer.id, tick));
        let choice = select(&mut board, &policy, &mut rng)?;

        let order = match &choice {
            Some(id) => {
                let tech = world
                    .technology(id)
                    .ok_or_else(|| DecisionError::UnknownTechnology(id.clone()))?;
                let candidate = candidates
                    .get(id)
                    .ok_or_else(|| DecisionError::UnknownTechnology(id.clone()))?;
                Some(InvestmentOrder::new(candidate, tech, producer, debt_rate)?)
            }
            None => None,
        };

        Ok(Decision {
            agent: producer.id.clone(),
            tick,
            policy: policy.name(),
            cost_of_debt: debt_rate,
            outlook,
            board,
            rejections,
            choice,
            order,
        })
    }

    /// Let every willing producer decide against the same snapshot and
    /// commit the chosen investments.
    ///
    /// A producer that finds nothing worth building sits out the rest of
    /// this round; [`open_round`] lets it decide again. A producer whose
    /// decision fails is reported and left unchanged.
    pub fn run_tick<W, E>(
        &self,
        world: &W,
        producers: &mut [Producer],
        tick: Tick,
        executor: &mut E,
    ) -> TickReport
    where
        W: WorldView,
        E: InvestmentExecutor,
    {
        let mut report = TickReport {
            tick,
            ..TickReport::default()
        };
        for producer in producers.iter_mut() {
            if !producer.willing_to_invest {
                report.skipped.push(producer.id.clone());
                continue;
            }
            let mut decision = match self.decide(world, producer, tick) {
                Ok(d) => d,
                Err(e) => {
                    warn!(agent = %producer.id, tick, error = %e, "investment decision failed");
                    report.failures.push((producer.id.clone(), e));
                    continue;
                }
            };
            match decision.order.take() {
                Some(order) => match executor.commit(order.clone()) {
                    Ok(plant) => {
                        if let Some(c) = decision.chosen() {
                            info!(
                                agent = %producer.id,
                                tick,
                                technology = %c.technology,
                                policy = decision.policy,
                                wacc = c.wacc,
                                npv_per_mw = c.npv_per_mw,
                                plant = plant.0,
                                "investment committed"
                            );
                        }
                        report.committed.push((producer.id.clone(), plant));
                        decision.order = Some(order);
                    }
                    Err(e) => {
                        warn!(agent = %producer.id, tick, error = %e, "investment commit failed");
                        report.failures.push((producer.id.clone(), e.into()));
                    }
                },
                None => {
                    info!(
                        agent = %producer.id,
                        tick,
                        rejected = decision.rejections.len(),
                        "no technology worth building, leaving the investment round"
                    );
                    producer.willing_to_invest = false;
                }
            }
            report.decisions.push(decision);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Ledger;
    use crate::snapshot::fixtures::{plant, producer, world};
    use crate::snapshot::WorldSnapshot;
    use sim_core::{
        CapacityTarget, CreditRiskParams, DiversificationParams, McdaChoice, McdaParams,
        McdaWeights, StrategicReserve, Trend, ZoneId,
    };

    fn id(s: &str) -> TechnologyId {
        TechnologyId(s.to_string())
    }

    fn engine() -> InvestmentEngine {
        InvestmentEngine::new(EngineConfig::default(), 42)
    }

    fn forecast_for(w: &WorldSnapshot, tick: Tick) -> Forecast {
        Forecaster::new(tick, 5, 5)
            .forecast(&w.history, &w.markets[0])
            .unwrap()
    }

    #[test]
    fn scarce_peak_prices_at_value_of_lost_load() {
        let w = world();
        let out = market_outlook(&w, &w.markets[0], &forecast_for(&w, 4)).unwrap();
        assert_eq!(out.segment_prices, vec![2_000.0, 0.0]);
        assert_eq!(out.max_expected_load, 9_000.0);
        assert_eq!(out.capacity_sum, 8_000.0);
    }

    #[test]
    fn unmet_capacity_target_adds_phantom_unit() {
        let mut w = world();
        w.capacity_targets.push(CapacityTarget {
            market: MarketId("NL".to_string()),
            technology: id("CCGT"),
            trend: Trend::Constant { value: 2_000.0 },
        });
        let out = market_outlook(&w, &w.markets[0], &forecast_for(&w, 4)).unwrap();
        // The 2000 MW gap covers the peak without any gas or CO2 cost.
        assert_eq!(out.segment_prices, vec![0.0, 0.0]);
        assert_eq!(out.capacity_sum, 10_000.0);
    }

    #[test]
    fn met_capacity_target_adds_nothing() {
        let mut w = world();
        w.capacity_targets.push(CapacityTarget {
            market: MarketId("NL".to_string()),
            technology: id("Wind"),
            trend: Trend::Constant { value: 8_000.0 },
        });
        let out = market_outlook(&w, &w.markets[0], &forecast_for(&w, 4)).unwrap();
        assert_eq!(out.segment_prices, vec![2_000.0, 0.0]);
        assert_eq!(out.capacity_sum, 8_000.0);
    }

    #[test]
    fn tight_margin_releases_reserve_price() {
        let mut w = world();
        w.plants.push(plant(2, "Incumbent", "CCGT", 1_500.0, -10));
        w.strategic_reserves.push(StrategicReserve {
            zone: ZoneId("nl".to_string()),
            reserve_price: 700.0,
            reserve_volume_mw: 600.0,
        });
        let out = market_outlook(&w, &w.markets[0], &forecast_for(&w, 4)).unwrap();
        // Peak margin 9500 - 9000 = 500 <= 600.
        assert_eq!(out.segment_prices[0], 700.0);
        assert_eq!(out.segment_prices[1], 0.0);
    }

    #[test]
    fn profit_max_builds_best_npv_per_mw() {
        let w = world();
        let d = engine().decide(&w, &producer("A"), 4).unwrap();
        assert_eq!(d.policy, "profit_max");
        assert_eq!(d.board.len(), 2);
        assert_eq!(d.choice, Some(id("Wind")));
        assert_eq!(d.cost_of_debt, 0.06);
        let order = d.order.unwrap();
        assert_eq!(order.technology, id("Wind"));
        assert_eq!(order.down_payments.len(), 3);
    }

    #[test]
    fn ineligible_technology_is_reported() {
        let mut w = world();
        w.technologies[1].max_fraction_in_country = 0.5;
        let d = engine().decide(&w, &producer("A"), 4).unwrap();
        assert_eq!(d.choice, Some(id("CCGT")));
        assert!(matches!(
            d.rejections.as_slice(),
            [Rejection {
                reason: RejectionReason::Ineligible(Ineligibility::CountryShare { .. }),
                ..
            }]
        ));
    }

    #[test]
    fn running_hours_below_minimum_reject() {
        let mut w = world();
        for t in &mut w.technologies {
            t.minimum_running_hours = 8_000.0;
        }
        let d = engine().decide(&w, &producer("A"), 4).unwrap();
        // Wind runs all 8760 hours, CCGT only in the peak.
        assert_eq!(d.choice, Some(id("Wind")));
        assert!(matches!(
            d.rejections[0].reason,
            RejectionReason::TooFewRunningHours { required, .. } if required == 8_000.0
        ));
    }

    #[test]
    fn credit_risk_prices_debt_above_risk_free() {
        let w = world();
        let mut p = producer("A");
        p.traits.credit_risk = Some(CreditRiskParams {
            loan_interest_free_rate: 0.03,
            asset_value_deviation: 0.3,
            time_to_maturity: 5.0,
            debt_bias: 0.0,
        });
        let d = engine().decide(&w, &p, 4).unwrap();
        assert!(d.cost_of_debt >= 0.03);
        assert_eq!(d.order.unwrap().loan.unwrap().interest_rate, d.cost_of_debt);
    }

    #[test]
    fn market_giant_diversifies() {
        let mut w = world();
        w.plants.push(plant(2, "Giant", "Wind", 500.0, -10));
        let mut p = producer("Giant");
        p.traits.diversification = Some(DiversificationParams {
            market_giant_capacity: 400.0,
        });
        let d = engine().decide(&w, &p, 4).unwrap();
        assert_eq!(d.policy, "diversify");
        assert_eq!(d.choice, Some(id("CCGT")));
    }

    #[test]
    fn stochastic_choice_does_not_depend_on_agent_order() {
        let w = world();
        let mut a = producer("A");
        a.traits.mcda = Some(McdaParams {
            weights: McdaWeights {
                profit: 1.0,
                emission: 1.0,
                ..McdaWeights::default()
            },
            normalisation_slack: 1.5,
            choice: McdaChoice::Stochastic,
        });
        let mut b = a.clone();
        b.id = AgentId("B".to_string());

        let forward = engine().run_tick(&w, &mut [a.clone(), b.clone()], 4, &mut Ledger::default());
        let backward = engine().run_tick(&w, &mut [b, a], 4, &mut Ledger::default());
        let pick = |r: &TickReport, agent: &str| {
            r.decisions
                .iter()
                .find(|d| d.agent.0 == agent)
                .and_then(|d| d.choice.clone())
        };
        assert_eq!(pick(&forward, "A"), pick(&backward, "A"));
        assert_eq!(pick(&forward, "B"), pick(&backward, "B"));
        assert!(pick(&forward, "A").is_some());
    }

    #[test]
    fn failures_stay_with_their_agent() {
        let w = world();
        let mut lost = producer("Lost");
        lost.investor_market = MarketId("DE".to_string());
        let mut producers = vec![lost, producer("A")];
        let mut ledger = Ledger::for_world(&w);
        let report = engine().run_tick(&w, &mut producers, 4, &mut ledger);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(
            report.failures[0].1,
            DecisionError::UnknownMarket(MarketId("DE".to_string()))
        );
        assert_eq!(report.committed, vec![(AgentId("A".to_string()), PlantId(2))]);
        assert!(producers[0].willing_to_invest);
        assert_eq!(ledger.pending().len(), 1);
    }

    #[test]
    fn missing_co2_history_fails_the_agent() {
        let mut w = world();
        w.history.co2_prices = Default::default();
        let err = engine().decide(&w, &producer("A"), 4).unwrap_err();
        assert!(matches!(err, DecisionError::Econ(EconError::InsufficientData(_))));
    }

    #[test]
    fn nothing_worth_building_sits_out_the_round() {
        let mut w = world();
        for t in &mut w.technologies {
            t.investment_cost_per_mw = Trend::Constant { value: 1e12 };
        }
        let mut producers = vec![producer("A")];
        let mut ledger = Ledger::default();
        let report = engine().run_tick(&w, &mut producers, 4, &mut ledger);
        assert!(report.committed.is_empty());
        assert_eq!(report.decisions.len(), 1);
        assert!(!producers[0].willing_to_invest);

        let same_round = engine().run_tick(&w, &mut producers, 4, &mut ledger);
        assert_eq!(same_round.skipped, vec![AgentId("A".to_string())]);
        assert!(same_round.decisions.is_empty());

        // Costs fall back to normal before the next round.
        for t in &mut w.technologies {
            t.investment_cost_per_mw = Trend::Constant { value: 600_000.0 };
        }
        open_round(&mut producers);
        let next = engine().run_tick(&w, &mut producers, 5, &mut ledger);
        assert!(next.skipped.is_empty());
        assert_eq!(next.committed.len(), 1);
        assert!(producers[0].willing_to_invest);
    }

    #[test]
    fn decision_seed_varies_by_agent_and_tick() {
        let a = AgentId("A".to_string());
        let b = AgentId("B".to_string());
        assert_eq!(decision_seed(1, &a, 3), decision_seed(1, &a, 3));
        assert_ne!(decision_seed(1, &a, 3), decision_seed(1, &b, 3));
        assert_ne!(decision_seed(1, &a, 3), decision_seed(1, &a, 4));
        assert_ne!(decision_seed(1, &a, 3), decision_seed(2, &a, 3));
    }
}
