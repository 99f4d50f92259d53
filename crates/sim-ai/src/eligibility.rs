//! Screening of catalog technologies before they are valued.

use serde::{Deserialize, Serialize};
use sim_core::{CandidatePlant, Producer, Technology};
use thiserror::Error;

/// Congestion thresholds of the screening rules.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EligibilityLimits {
    /// Largest market pipeline as a share of the maximum expected load.
    pub market_pipeline_share: f64,
    /// Pipeline-to-operational ratio above which a technology is congested.
    pub technology_pipeline_ratio: f64,
    /// Pipeline in MW below which a technology is never congested.
    pub technology_pipeline_floor_mw: f64,
}

impl Default for EligibilityLimits {
    fn default() -> Self {
        Self {
            market_pipeline_share: 0.2,
            technology_pipeline_ratio: 2.0,
            technology_pipeline_floor_mw: 9000.0,
        }
    }
}

/// Capacities seen by the rules, in MW.
///
/// "Expected" figures are taken at the forecast tick, pipeline and
/// operational figures at the decision tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CapacityOutlook {
    /// Expected capacity of the technology in the market, raised to its
    /// capacity target when one is set.
    pub technology_in_market: f64,
    pub technology_at_node: f64,
    /// Upper limit of the technology at the candidate's node, if any.
    pub node_limit: Option<f64>,
    pub own_technology_in_market: f64,
    pub own_total_in_market: f64,
    pub market_pipeline: f64,
    pub technology_pipeline: f64,
    pub technology_operational: f64,
    pub max_expected_load: f64,
}

/// Why a technology was screened out; variants follow rule order.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Ineligibility {
    #[error("technology would cover {share:.3} of peak load, above its country limit {limit:.3}")]
    CountryShare { share: f64, limit: f64 },
    #[error("node capacity would reach {expected:.1} MW, above the node limit {limit:.1} MW")]
    NodeLimit { expected: f64, limit: f64 },
    #[error("own capacity {own:.1} MW already exceeds the {limit:.1} MW allowed per agent")]
    AgentShare { own: f64, limit: f64 },
    #[error("market pipeline {pipeline:.1} MW exceeds {limit:.1} MW")]
    MarketPipeline { pipeline: f64, limit: f64 },
    #[error("technology pipeline {pipeline:.1} MW is congested against {operational:.1} MW operational")]
    TechnologyPipeline { pipeline: f64, operational: f64 },
    #[error("down payment {required:.0} exceeds the {available:.0} available")]
    DownPayment { required: f64, available: f64 },
}

/// Apply the screening rules in order; the first failing rule is reported.
///
/// `cash` is the producer's cash already converted by the caller.
pub fn check_eligibility(
    candidate: &CandidatePlant,
    technology: &Technology,
    outlook: &CapacityOutlook,
    producer: &Producer,
    cash: f64,
    limits: &EligibilityLimits,
) -> Result<(), Ineligibility> {
    let cap = candidate.nominal_capacity_mw;

    let share = (outlook.technology_in_market + cap) / (outlook.max_expected_load + cap);
    if share > technology.max_fraction_in_country {
        return Err(Ineligibility::CountryShare {
            share,
            limit: technology.max_fraction_in_country,
        });
    }

    if let Some(limit) = outlook.node_limit {
        let expected = outlook.technology_at_node + cap;
        if expected > limit {
            return Err(Ineligibility::NodeLimit { expected, limit });
        }
    }

    let own_limit = outlook.own_total_in_market * technology.max_fraction_per_agent;
    if outlook.own_technology_in_market > own_limit {
        return Err(Ineligibility::AgentShare {
            own: outlook.own_technology_in_market,
            limit: own_limit,
        });
    }

    let market_limit = limits.market_pipeline_share * outlook.max_expected_load;
    if outlook.market_pipeline > market_limit {
        return Err(Ineligibility::MarketPipeline {
            pipeline: outlook.market_pipeline,
            limit: market_limit,
        });
    }

    if outlook.technology_pipeline > limits.technology_pipeline_ratio * outlook.technology_operational
        && outlook.technology_pipeline > limits.technology_pipeline_floor_mw
    {
        return Err(Ineligibility::TechnologyPipeline {
            pipeline: outlook.technology_pipeline,
            operational: outlook.technology_operational,
        });
    }

    // With credit risk on, the bank prices leverage instead.
    if producer.traits.credit_risk.is_none() {
        let required = candidate.invested_capital * (1.0 - producer.debt_ratio_of_investments);
        let available = producer.downpayment_fraction_of_cash * cash;
        if required > available {
            return Err(Ineligibility::DownPayment { required, available });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::ToPrimitive;
    use rust_decimal::Decimal;
    use sim_core::{
        AgentId, CreditRiskParams, MarketId, NodeId, TechnologyCategory, TechnologyId,
        TraitConfig, Trend,
    };

    fn technology() -> Technology {
        Technology {
            id: TechnologyId("CCGT".to_string()),
            category: TechnologyCategory::Gas,
            fuels: vec![],
            capacity_mw: 500.0,
            investment_cost_per_mw: Trend::Constant { value: 1_000.0 },
            fixed_om_cost_per_mw: Trend::Constant { value: 10.0 },
            efficiency: Trend::Constant { value: 0.55 },
            co2_capture_efficiency: 0.0,
            depreciation_time: 15,
            expected_lead_time: 2,
            expected_permit_time: 1,
            expected_lifetime: 30,
            minimum_running_hours: 0.0,
            max_fraction_in_country: 0.5,
            max_fraction_per_agent: 0.6,
            peak_segment_availability: 1.0,
            base_segment_availability: 1.0,
        }
    }

    fn producer() -> Producer {
        Producer {
            id: AgentId("A".to_string()),
            cash: Decimal::new(1_000_000, 0),
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

    fn candidate(t: &Technology) -> CandidatePlant {
        CandidatePlant::specify(t, &AgentId("A".to_string()), &NodeId("n".to_string()), 0)
    }

    fn roomy() -> CapacityOutlook {
        CapacityOutlook {
            technology_in_market: 1_000.0,
            technology_at_node: 1_000.0,
            node_limit: None,
            own_technology_in_market: 100.0,
            own_total_in_market: 1_000.0,
            market_pipeline: 0.0,
            technology_pipeline: 0.0,
            technology_operational: 1_000.0,
            max_expected_load: 10_000.0,
        }
    }

    fn check(outlook: &CapacityOutlook, p: &Producer) -> Result<(), Ineligibility> {
        let t = technology();
        let cash = p.cash.to_f64().unwrap();
        check_eligibility(&candidate(&t), &t, outlook, p, cash, &EligibilityLimits::default())
    }

    #[test]
    fn roomy_market_passes() {
        assert_eq!(check(&roomy(), &producer()), Ok(()));
    }

    #[test]
    fn country_share_counts_the_candidate() {
        let mut o = roomy();
        // (4800 + 500) / (10000 + 500) > 0.5
        o.technology_in_market = 4_800.0;
        assert!(matches!(check(&o, &producer()), Err(Ineligibility::CountryShare { .. })));
        o.technology_in_market = 4_700.0;
        assert_eq!(check(&o, &producer()), Ok(()));
    }

    #[test]
    fn node_limit_applies_only_when_set() {
        let mut o = roomy();
        o.node_limit = Some(1_200.0);
        assert_eq!(
            check(&o, &producer()),
            Err(Ineligibility::NodeLimit {
                expected: 1_500.0,
                limit: 1_200.0
            })
        );
        o.node_limit = Some(1_500.0);
        assert_eq!(check(&o, &producer()), Ok(()));
    }

    #[test]
    fn agent_share_rule() {
        let mut o = roomy();
        o.own_technology_in_market = 700.0;
        assert!(matches!(check(&o, &producer()), Err(Ineligibility::AgentShare { .. })));
    }

    #[test]
    fn congested_market_pipeline() {
        let mut o = roomy();
        o.market_pipeline = 2_001.0;
        assert!(matches!(check(&o, &producer()), Err(Ineligibility::MarketPipeline { .. })));
    }

    #[test]
    fn technology_pipeline_needs_both_conditions() {
        let mut o = roomy();
        o.max_expected_load = 100_000.0;
        o.technology_pipeline = 9_500.0;
        o.technology_operational = 4_000.0;
        assert!(matches!(
            check(&o, &producer()),
            Err(Ineligibility::TechnologyPipeline { .. })
        ));
        // Large operational base: the ratio condition fails.
        o.technology_operational = 5_000.0;
        assert_eq!(check(&o, &producer()), Ok(()));
        // Small absolute pipeline cannot be congested.
        o.technology_operational = 0.0;
        o.technology_pipeline = 8_000.0;
        assert_eq!(check(&o, &producer()), Ok(()));
    }

    #[test]
    fn down_payment_only_without_credit_risk() {
        let mut p = producer();
        p.cash = Decimal::new(100_000, 0);
        // 500 MW * 1000 * 0.3 = 150000 > 0.5 * 100000
        assert!(matches!(check(&roomy(), &p), Err(Ineligibility::DownPayment { .. })));
        p.traits.credit_risk = Some(CreditRiskParams {
            loan_interest_free_rate: 0.03,
            asset_value_deviation: 0.3,
            time_to_maturity: 5.0,
            debt_bias: 0.0,
        });
        assert_eq!(check(&roomy(), &p), Ok(()));
    }

    #[test]
    fn down_payment_uses_the_given_cash() {
        let t = technology();
        let p = producer();
        let limits = EligibilityLimits::default();
        // 150000 required against half of the cash handed in.
        assert!(matches!(
            check_eligibility(&candidate(&t), &t, &roomy(), &p, 200_000.0, &limits),
            Err(Ineligibility::DownPayment { available, .. }) if available == 100_000.0
        ));
        assert_eq!(check_eligibility(&candidate(&t), &t, &roomy(), &p, 300_000.0, &limits), Ok(()));
    }

    #[test]
    fn first_failing_rule_wins() {
        let mut o = roomy();
        o.technology_in_market = 9_000.0;
        o.market_pipeline = 5_000.0;
        let mut p = producer();
        p.cash = Decimal::ZERO;
        assert!(matches!(check(&o, &p), Err(Ineligibility::CountryShare { .. })));
    }
}
