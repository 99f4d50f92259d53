#![deny(warnings)]

//! Headless CLI running investment rounds over a YAML scenario.

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use sim_core::Tick;
use sim_runtime::{run_ticks, InvestmentEngine, Ledger, Scenario, TickReport};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    scenario: Option<PathBuf>,
    ticks: Option<u32>,
    report: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--scenario" => args.scenario = it.next().map(PathBuf::from),
            "--ticks" => {
                let v = it.next().context("--ticks needs a value")?;
                args.ticks = Some(v.parse().with_context(|| format!("invalid --ticks {v}"))?);
            }
            "--report" => args.report = it.next().map(PathBuf::from),
            other => bail!("unknown argument {other}"),
        }
    }
    Ok(args)
}

#[derive(Serialize)]
struct Investment {
    agent: String,
    technology: String,
    policy: &'static str,
    npv_per_mw: f64,
    cost_of_debt: f64,
}

#[derive(Serialize)]
struct TickSummary {
    tick: Tick,
    investments: Vec<Investment>,
    stopped: Vec<String>,
    failures: Vec<(String, String)>,
}

impl From<&TickReport> for TickSummary {
    fn from(r: &TickReport) -> Self {
        let investments = r
            .decisions
            .iter()
            .filter(|d| d.order.is_some())
            .filter_map(|d| {
                d.chosen().map(|c| Investment {
                    agent: d.agent.to_string(),
                    technology: c.technology.to_string(),
                    policy: d.policy,
                    npv_per_mw: c.npv_per_mw,
                    cost_of_debt: d.cost_of_debt,
                })
            })
            .collect();
        let stopped = r
            .decisions
            .iter()
            .filter(|d| d.choice.is_none())
            .map(|d| d.agent.to_string())
            .collect();
        let failures = r
            .failures
            .iter()
            .map(|(agent, e)| (agent.to_string(), e.to_string()))
            .collect();
        Self {
            tick: r.tick,
            investments,
            stopped,
            failures,
        }
    }
}

#[derive(Serialize)]
struct ProducerSummary {
    agent: String,
    cash: Decimal,
    willing_to_invest: bool,
}

#[derive(Serialize)]
struct RunReport {
    ticks: Vec<TickSummary>,
    producers: Vec<ProducerSummary>,
    plants: usize,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = parse_args()?;
    let path = args
        .scenario
        .clone()
        .unwrap_or_else(|| PathBuf::from("scenarios/baseline.yaml"));
    info!(scenario = %path.display(), ticks = ?args.ticks, "starting CLI");

    let scenario = Scenario::from_file(&path)?;
    scenario
        .validate()
        .with_context(|| format!("scenario {}", path.display()))?;

    let Scenario {
        sim,
        engine,
        mut world,
        mut producers,
    } = scenario;
    let ticks = args.ticks.unwrap_or(sim.ticks);
    let engine = InvestmentEngine::new(engine, sim.rng_seed);
    let mut ledger = Ledger::for_world(&world);

    let reports = run_ticks(
        &engine,
        &mut world,
        &mut producers,
        &mut ledger,
        sim.start_tick,
        ticks,
    );

    let summary = RunReport {
        ticks: reports.iter().map(TickSummary::from).collect(),
        producers: producers
            .iter()
            .map(|p| ProducerSummary {
                agent: p.id.to_string(),
                cash: p.cash,
                willing_to_invest: p.willing_to_invest,
            })
            .collect(),
        plants: world.plants.len(),
    };

    for t in &summary.ticks {
        let built: Vec<String> = t
            .investments
            .iter()
            .map(|i| format!("{} -> {} ({})", i.agent, i.technology, i.policy))
            .collect();
        println!(
            "Tick {} | built: {} | stopped: {} | failures: {}",
            t.tick,
            if built.is_empty() { "-".to_string() } else { built.join(", ") },
            t.stopped.len(),
            t.failures.len()
        );
    }
    for p in &summary.producers {
        println!(
            "Producer {} | cash: {} | investing: {}",
            p.agent, p.cash, p.willing_to_invest
        );
    }
    println!("Plants | total: {}", summary.plants);

    if let Some(out) = &args.report {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(out, json).with_context(|| format!("writing report {}", out.display()))?;
        info!(report = %out.display(), "report written");
    }

    Ok(())
}
