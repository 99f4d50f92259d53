use criterion::{criterion_group, criterion_main, Criterion};
use sim_runtime::{InvestmentEngine, Ledger, Scenario};

const SCENARIO: &str = include_str!("../../../scenarios/baseline.yaml");

fn bench_decisions(c: &mut Criterion) {
    let scenario = Scenario::from_yaml_str(SCENARIO).expect("baseline scenario parses");
    let engine = InvestmentEngine::new(scenario.engine.clone(), scenario.sim.rng_seed);
    let tick = scenario.sim.start_tick;
    c.bench_function("run_tick", |b| {
        b.iter(|| {
            let mut producers = scenario.producers.clone();
            let mut ledger = Ledger::for_world(&scenario.world);
            engine.run_tick(&scenario.world, &mut producers, tick, &mut ledger)
        })
    });
}

criterion_group!(benches, bench_decisions);
criterion_main!(benches);
