//! Energy producers and their behavioural traits.

use crate::technology::TechnologyCategory;
use crate::{AgentId, MarketId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An energy-producer agent deciding on new capacity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Producer {
    pub id: AgentId,
    /// Cash at hand.
    pub cash: Decimal,
    /// Market the producer invests in.
    pub investor_market: MarketId,
    /// Share of an investment financed by debt, in [0, 1].
    pub debt_ratio_of_investments: f64,
    /// Expected return on equity.
    pub equity_interest_rate: f64,
    /// Flat interest rate offered on loans.
    pub loan_interest_rate: f64,
    /// Share of cash that may be spent on down payments, in [0, 1].
    pub downpayment_fraction_of_cash: f64,
    /// Ticks ahead at which market conditions are forecast.
    pub investment_horizon: u32,
    /// Ticks of history used for forecasting (>= 1), current tick included.
    pub forecast_lookback: u32,
    /// Cleared once the producer finds nothing worth building.
    #[serde(default = "willing")]
    pub willing_to_invest: bool,
    #[serde(default)]
    pub traits: TraitConfig,
}

fn willing() -> bool {
    true
}

/// Independently switchable behavioural traits; `None` means off.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TraitConfig {
    /// Price debt with a structural credit-risk model.
    #[serde(default)]
    pub credit_risk: Option<CreditRiskParams>,
    /// Score technologies on multiple criteria instead of profit alone.
    #[serde(default)]
    pub mcda: Option<McdaParams>,
    /// Add technology-specific risk premiums to the discount rate.
    #[serde(default)]
    pub risk_premiums: Option<RiskPremiums>,
    /// Diversify the portfolio once the producer is a market giant.
    #[serde(default)]
    pub diversification: Option<DiversificationParams>,
}

impl TraitConfig {
    /// MCDA parameters, unless absent or every weight is zero.
    pub fn active_mcda(&self) -> Option<&McdaParams> {
        self.mcda.as_ref().filter(|p| !p.weights.all_zero())
    }
}

/// Inputs of the Merton-style debt pricing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreditRiskParams {
    /// Risk-free interest rate.
    pub loan_interest_free_rate: f64,
    /// Volatility of the asset value path (> 0).
    pub asset_value_deviation: f64,
    /// Debt maturity in ticks (> 0).
    pub time_to_maturity: f64,
    /// Extra debt added to the outstanding loans.
    #[serde(default)]
    pub debt_bias: f64,
}

/// How the MCDA probability distribution turns into a choice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McdaChoice {
    /// Draw from the distribution with the seeded generator.
    #[default]
    Stochastic,
    /// Take the most probable technology.
    Greedy,
}

/// Multi-criteria scoring configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct McdaParams {
    pub weights: McdaWeights,
    /// Widens the propensity range before normalisation (>= 1).
    pub normalisation_slack: f64,
    #[serde(default)]
    pub choice: McdaChoice,
}

/// Weight factors of the multi-criteria score, each in [0, 5].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct McdaWeights {
    #[serde(default)]
    pub profit: f64,
    #[serde(default)]
    pub emission: f64,
    #[serde(default)]
    pub efficiency: f64,
    #[serde(default)]
    pub investment_cost: f64,
    #[serde(default)]
    pub lifetime: f64,
    /// Not scored; accepted so profiles keep one schema.
    #[serde(default)]
    pub minimum_running_hours: f64,
}

impl McdaWeights {
    /// True when no scored criterion carries weight.
    pub fn all_zero(&self) -> bool {
        self.scored().iter().all(|&w| w == 0.0)
    }

    /// Weights entering the propensity: profit, emission, efficiency,
    /// investment cost and lifetime.
    pub fn scored(&self) -> [f64; 5] {
        [
            self.profit,
            self.emission,
            self.efficiency,
            self.investment_cost,
            self.lifetime,
        ]
    }

    pub fn as_array(&self) -> [f64; 6] {
        [
            self.profit,
            self.emission,
            self.efficiency,
            self.investment_cost,
            self.lifetime,
            self.minimum_running_hours,
        ]
    }
}

/// Discount-rate premiums per technology family.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskPremiums {
    #[serde(default)]
    pub nuclear: f64,
    #[serde(default)]
    pub coal: f64,
    #[serde(default)]
    pub gas: f64,
    #[serde(default)]
    pub renewable: f64,
}

impl RiskPremiums {
    pub fn for_category(&self, category: TechnologyCategory) -> f64 {
        match category {
            TechnologyCategory::Nuclear => self.nuclear,
            TechnologyCategory::CoalFamily => self.coal,
            TechnologyCategory::Gas => self.gas,
            TechnologyCategory::Renewable => self.renewable,
        }
    }
}

/// Portfolio diversification configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiversificationParams {
    /// Operational capacity in MW from which the producer diversifies.
    pub market_giant_capacity: f64,
}
