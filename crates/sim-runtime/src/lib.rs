#![deny(warnings)]

//! Tick driver for producer investment decisions.
//!
//! Every willing producer decides against the same read-only
//! [`WorldSnapshot`]; committed plants are buffered in a [`Ledger`] and merged
//! into the world between ticks.

pub mod config;
pub mod engine;
pub mod executor;
pub mod repository;
pub mod snapshot;

pub use config::{ConfigError, EngineConfig, Scenario};
pub use engine::{
    cost_of_debt, decision_seed, market_outlook, open_round, Decision, DecisionError, InvestmentEngine,
    Rejection, RejectionReason, TickReport,
};
pub use executor::{ExecError, InvestmentExecutor, InvestmentOrder, Ledger};
pub use repository::{
    CatalogRepository, HistoryRepository, MarketRepository, PlantRepository, WorldView,
};
pub use snapshot::WorldSnapshot;

use sim_core::{Producer, Tick};
use tracing::info;

/// Run `ticks` investment rounds from `start`, one round per tick, merging
/// and settling after each one.
pub fn run_ticks(
    engine: &InvestmentEngine,
    world: &mut WorldSnapshot,
    producers: &mut [Producer],
    ledger: &mut Ledger,
    start: Tick,
    ticks: u32,
) -> Vec<TickReport> {
    let mut reports = Vec::with_capacity(ticks as usize);
    for tick in (0..ticks).map(|i| start + Tick::from(i)) {
        open_round(producers);
        let report = engine.run_tick(world, producers, tick, ledger);
        let built = ledger.merge_into(world);
        ledger.settle(producers, tick);
        info!(
            tick,
            built,
            failures = report.failures.len(),
            sitting_out = producers.iter().filter(|p| !p.willing_to_invest).count(),
            "tick complete"
        );
        reports.push(report);
    }
    reports
}
