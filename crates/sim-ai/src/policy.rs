//! Choice of at most one technology from the scoring board.

use crate::scoring::{ScoredCandidate, ScoringBoard};
use rand::distributions::{Distribution, WeightedError, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sim_core::{McdaChoice, McdaParams, TechnologyId, TraitConfig};
use thiserror::Error;
use tracing::debug;

/// Selection rule in force for one agent in one tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Highest project value per MW.
    ProfitMax,
    /// Multi-criteria scoring, drawn or taken greedily.
    Mcda(McdaParams),
    /// Smallest share of the agent's own operational portfolio.
    Diversify {
        /// Operational capacity the shares are taken of.
        own_total_mw: f64,
    },
}

impl SelectionPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            SelectionPolicy::ProfitMax => "profit_max",
            SelectionPolicy::Mcda(p) if p.choice == McdaChoice::Greedy => "mcda_greedy",
            SelectionPolicy::Mcda(_) => "mcda_stochastic",
            SelectionPolicy::Diversify { .. } => "diversify",
        }
    }
}

/// Pick the policy for an agent with `own_operational_mw` running capacity.
///
/// MCDA wins when active. Otherwise a market giant with the diversification
/// trait diversifies. Everyone else maximises profit.
pub fn resolve_policy(traits: &TraitConfig, own_operational_mw: f64) -> SelectionPolicy {
    if let Some(mcda) = traits.active_mcda() {
        return SelectionPolicy::Mcda(mcda.clone());
    }
    match &traits.diversification {
        Some(d) if own_operational_mw >= d.market_giant_capacity => SelectionPolicy::Diversify {
            own_total_mw: own_operational_mw,
        },
        _ => SelectionPolicy::ProfitMax,
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SelectionError {
    #[error("MCDA probabilities do not form a distribution: {0}")]
    Distribution(#[from] WeightedError),
}

/// First candidate maximising `key`; later equal keys do not displace it.
fn first_max_by<'a, F>(board: &'a ScoringBoard, key: F) -> Option<&'a ScoredCandidate>
where
    F: Fn(&ScoredCandidate) -> f64,
{
    board.iter().fold(None, |best, c| match best {
        Some(b) if key(c) <= key(b) => Some(b),
        _ => Some(c),
    })
}

/// Own share of a technology; zero when the agent owns nothing yet.
pub fn own_share(candidate: &ScoredCandidate, own_total_mw: f64) -> f64 {
    if own_total_mw > 0.0 {
        candidate.own_capacity_mw / own_total_mw
    } else {
        0.0
    }
}

/// Apply `policy` to the board; `None` when the board is empty.
///
/// MCDA scores are written back onto the board so callers can report them.
pub fn select<R: Rng + ?Sized>(
    board: &mut ScoringBoard,
    policy: &SelectionPolicy,
    rng: &mut R,
) -> Result<Option<TechnologyId>, SelectionError> {
    if board.is_empty() {
        return Ok(None);
    }
    let chosen = match policy {
        SelectionPolicy::ProfitMax => first_max_by(board, |c| c.npv_per_mw).map(|c| c.technology.clone()),
        SelectionPolicy::Diversify { own_total_mw } => {
            first_max_by(board, |c| -own_share(c, *own_total_mw)).map(|c| c.technology.clone())
        }
        SelectionPolicy::Mcda(params) => {
            board.score_mcda(&params.weights, params.normalisation_slack);
            for c in board.iter() {
                debug!(
                    technology = %c.technology,
                    propensity = c.propensity,
                    probability = c.probability,
                    "mcda score"
                );
            }
            match params.choice {
                McdaChoice::Greedy => {
                    first_max_by(board, |c| c.probability).map(|c| c.technology.clone())
                }
                McdaChoice::Stochastic => {
                    let dist = WeightedIndex::new(board.iter().map(|c| c.probability))?;
                    let index = dist.sample(rng);
                    board.iter().nth(index).map(|c| c.technology.clone())
                }
            }
        }
    };
    Ok(chosen)
}
