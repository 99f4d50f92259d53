//! Ephemeral scoring board of the valued candidates of one agent in one tick.

use serde::{Deserialize, Serialize};
use sim_core::{McdaWeights, TechnologyId};

/// A profitable candidate with the attributes the selection policies look at.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub technology: TechnologyId,
    /// Project value divided by nominal capacity.
    pub npv_per_mw: f64,
    pub project_value: f64,
    pub wacc: f64,
    /// Tonnes CO2 per MWh.
    pub emission_intensity: f64,
    pub efficiency: f64,
    pub invested_capital: f64,
    pub lifetime: f64,
    /// The agent's operational capacity of this technology.
    pub own_capacity_mw: f64,
    #[serde(default)]
    pub propensity: f64,
    #[serde(default)]
    pub normalised_propensity: f64,
    #[serde(default)]
    pub probability: f64,
}

/// Candidates in catalog order, at most one per technology.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ScoringBoard {
    entries: Vec<ScoredCandidate>,
}

impl ScoringBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a candidate, replacing any earlier entry for the same technology.
    pub fn insert(&mut self, candidate: ScoredCandidate) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.technology == candidate.technology)
        {
            Some(slot) => *slot = candidate,
            None => self.entries.push(candidate),
        }
    }

    pub fn get(&self, technology: &TechnologyId) -> Option<&ScoredCandidate> {
        self.entries.iter().find(|e| &e.technology == technology)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredCandidate> {
        self.entries.iter()
    }

    /// Compute MCDA propensities, normalised propensities and probabilities.
    ///
    /// Each criterion contributes `weight * value / total`, rewarding profit
    /// and efficiency and penalising emissions, investment cost and lifetime;
    /// a criterion whose total is zero is skipped. The propensity range is
    /// widened by `slack` before normalisation. If the normalised values do
    /// not form a distribution every candidate gets the same probability.
    pub fn score_mcda(&mut self, weights: &McdaWeights, slack: f64) {
        let n = self.entries.len();
        if n == 0 {
            return;
        }
        if n == 1 {
            let only = &mut self.entries[0];
            only.propensity = 0.0;
            only.normalised_propensity = 1.0;
            only.probability = 1.0;
            return;
        }

        let total = |f: fn(&ScoredCandidate) -> f64| -> f64 { self.entries.iter().map(f).sum() };
        let npv_total = total(|c| c.npv_per_mw);
        let emission_total = total(|c| c.emission_intensity);
        let efficiency_total = total(|c| c.efficiency);
        let investment_total = total(|c| c.invested_capital);
        let lifetime_total = total(|c| c.lifetime);

        for c in &mut self.entries {
            let mut p = 0.0;
            if npv_total != 0.0 {
                p += c.npv_per_mw * weights.profit / npv_total;
            }
            if emission_total != 0.0 {
                p -= c.emission_intensity * weights.emission / emission_total;
            }
            if efficiency_total != 0.0 {
                p += c.efficiency * weights.efficiency / efficiency_total;
            }
            if investment_total != 0.0 {
                p -= c.invested_capital * weights.investment_cost / investment_total;
            }
            if lifetime_total != 0.0 {
                p -= c.lifetime * weights.lifetime / lifetime_total;
            }
            c.propensity = p;
        }

        let (low, high) = self
            .entries
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
                (lo.min(c.propensity), hi.max(c.propensity))
            });
        let high = widen_high(high, slack);
        let low = widen_low(low, slack);
        let range = high - low;

        let mut sum = 0.0;
        if range > 0.0 && range.is_finite() {
            for c in &mut self.entries {
                c.normalised_propensity = (c.propensity - low) / range;
                sum += c.normalised_propensity;
            }
        }
        if sum > 0.0 && sum.is_finite() {
            for c in &mut self.entries {
                c.probability = c.normalised_propensity / sum;
            }
        } else {
            // Nothing separates the candidates.
            let uniform = 1.0 / n as f64;
            for c in &mut self.entries {
                c.normalised_propensity = 1.0;
                c.probability = uniform;
            }
        }
    }
}

fn widen_high(high: f64, slack: f64) -> f64 {
    if high < 0.0 {
        high / slack
    } else if high == 0.0 {
        slack
    } else {
        high * slack
    }
}

fn widen_low(low: f64, slack: f64) -> f64 {
    if low < 0.0 {
        low * slack
    } else if low == 0.0 {
        -slack
    } else {
        low / slack
    }
}
