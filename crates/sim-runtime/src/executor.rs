//! Turning a chosen candidate into a plant, down payments and a loan.

use crate::snapshot::WorldSnapshot;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::{
    AgentId, CandidatePlant, CashFlow, Counterparty, FuelShare, Loan, MarketId, NodeId, PlantId,
    PowerPlant, Producer, Technology, TechnologyId, Tick,
};
use sim_econ::{loan_annuity, to_money, EconError};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq)]
pub enum ExecError {
    #[error("cannot price investment: {0}")]
    Pricing(#[from] EconError),
}

/// Everything needed to persist one investment, before a plant id exists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvestmentOrder {
    pub owner: AgentId,
    pub technology: TechnologyId,
    pub market: MarketId,
    pub node: NodeId,
    pub tick: Tick,
    pub lead_time: u32,
    pub lifetime: u32,
    pub nominal_capacity_mw: f64,
    pub invested_capital: Decimal,
    pub efficiency: f64,
    pub fuel_mix: Vec<FuelShare>,
    /// Equity installments to the manufacturer as (due tick, amount).
    pub down_payments: Vec<(Tick, Decimal)>,
    /// Bank loan over the debt share; `None` without debt.
    pub loan: Option<Loan>,
}

impl InvestmentOrder {
    /// Finance `candidate` with the producer's debt ratio at `cost_of_debt`.
    ///
    /// Equity is paid in equal installments over the lead time (at least
    /// one). The debt share is an annuity over the depreciation time.
    pub fn new(
        candidate: &CandidatePlant,
        technology: &Technology,
        producer: &Producer,
        cost_of_debt: f64,
    ) -> Result<Self, ExecError> {
        let d = producer.debt_ratio_of_investments;
        let building = candidate.lead_time.max(1);
        let installment = to_money(candidate.invested_capital * (1.0 - d) / building as f64)?;
        let down_payments = (0..building)
            .map(|i| (candidate.decision_tick + i as Tick, installment))
            .collect();

        let principal = candidate.invested_capital * d;
        let loan = if principal > 0.0 {
            let periods = technology.depreciation_time;
            let payment = loan_annuity(principal, periods, cost_of_debt)?;
            Some(Loan {
                lender: Counterparty::Bank,
                principal: to_money(principal)?,
                interest_rate: cost_of_debt,
                amount_per_payment: to_money(payment)?,
                total_payments: periods,
                payments_done: 0,
                start_tick: candidate.decision_tick,
            })
        } else {
            None
        };

        Ok(Self {
            owner: candidate.owner.clone(),
            technology: candidate.technology.clone(),
            market: producer.investor_market.clone(),
            node: candidate.node.clone(),
            tick: candidate.decision_tick,
            lead_time: candidate.lead_time,
            lifetime: candidate.lifetime,
            nominal_capacity_mw: candidate.nominal_capacity_mw,
            invested_capital: to_money(candidate.invested_capital)?,
            efficiency: candidate.efficiency,
            fuel_mix: candidate.fuel_mix.clone(),
            down_payments,
            loan,
        })
    }

    pub fn total_down_payment(&self) -> Decimal {
        self.down_payments.iter().map(|(_, amount)| *amount).sum()
    }
}

/// Unit of work persisting an investment order.
pub trait InvestmentExecutor {
    fn commit(&mut self, order: InvestmentOrder) -> Result<PlantId, ExecError>;
}

/// In-memory executor keeping plants, loans and cash flows.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Ledger {
    next_id: u64,
    /// Plants committed since the last merge.
    pending: Vec<PowerPlant>,
    cash_flows: Vec<CashFlow>,
}

impl Ledger {
    /// A ledger handing out plant ids from `first`.
    pub fn new(first: PlantId) -> Self {
        Self {
            next_id: first.0,
            ..Self::default()
        }
    }

    /// A ledger whose ids follow the plants already in `world`.
    pub fn for_world(world: &WorldSnapshot) -> Self {
        Self::new(world.next_plant_id())
    }

    pub fn pending(&self) -> &[PowerPlant] {
        &self.pending
    }

    pub fn cash_flows(&self) -> &[CashFlow] {
        &self.cash_flows
    }

    /// Move plants committed during a tick into the world.
    ///
    /// Called between ticks so that decisions within a tick all see the
    /// same snapshot.
    pub fn merge_into(&mut self, world: &mut WorldSnapshot) -> usize {
        let n = self.pending.len();
        world.plants.append(&mut self.pending);
        n
    }

    /// Installments due from `owner` at `tick`.
    pub fn due(&self, owner: &AgentId, tick: Tick) -> Decimal {
        self.cash_flows
            .iter()
            .filter(|cf| &cf.payer == owner && cf.tick == tick)
            .map(|cf| cf.amount)
            .sum()
    }

    /// Pay the installments due at `tick` out of each producer's cash.
    pub fn settle(&self, producers: &mut [Producer], tick: Tick) {
        for p in producers {
            let due = self.due(&p.id, tick);
            if due > Decimal::ZERO {
                p.cash -= due;
                debug!(agent = %p.id, tick, %due, cash = %p.cash, "down payment settled");
            }
        }
    }
}

impl InvestmentExecutor for Ledger {
    fn commit(&mut self, order: InvestmentOrder) -> Result<PlantId, ExecError> {
        let id = PlantId(self.next_id);
        self.next_id += 1;

        for &(tick, amount) in &order.down_payments {
            self.cash_flows.push(CashFlow {
                payer: order.owner.clone(),
                payee: Counterparty::Manufacturer,
                amount,
                tick,
                plant: id,
            });
        }
        self.pending.push(PowerPlant {
            id,
            owner: order.owner,
            technology: order.technology,
            market: order.market,
            node: order.node,
            construction_start: order.tick,
            lead_time: order.lead_time,
            lifetime: order.lifetime,
            nominal_capacity_mw: order.nominal_capacity_mw,
            invested_capital: order.invested_capital,
            efficiency: order.efficiency,
            fuel_mix: order.fuel_mix,
            loan: order.loan,
        });
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::fixtures::{producer, tech, world};
    use sim_core::TechnologyCategory;

    fn order(debt_ratio: f64, rate: f64) -> InvestmentOrder {
        let t = tech("CCGT", TechnologyCategory::Gas, &["gas"]);
        let mut p = producer("A");
        p.debt_ratio_of_investments = debt_ratio;
        let c = CandidatePlant::specify(&t, &p.id, &NodeId("nl".to_string()), 4);
        InvestmentOrder::new(&c, &t, &p, rate).unwrap()
    }

    #[test]
    fn equity_is_spread_over_the_lead_time() {
        let o = order(0.7, 0.05);
        // 500 MW * 600k = 300M, 30% equity over 3 ticks.
        assert_eq!(
            o.down_payments,
            vec![
                (4, Decimal::new(30_000_000, 0)),
                (5, Decimal::new(30_000_000, 0)),
                (6, Decimal::new(30_000_000, 0)),
            ]
        );
        assert_eq!(o.total_down_payment(), Decimal::new(90_000_000, 0));
    }

    #[test]
    fn debt_share_becomes_an_annuity() {
        let o = order(0.7, 0.05);
        let loan = o.loan.unwrap();
        assert_eq!(loan.principal, Decimal::new(210_000_000, 0));
        assert_eq!(loan.total_payments, 20);
        assert_eq!(loan.interest_rate, 0.05);
        let expected = to_money(loan_annuity(210_000_000.0, 20, 0.05).unwrap()).unwrap();
        assert_eq!(loan.amount_per_payment, expected);
        assert!(loan.remaining_payments() > loan.principal);
    }

    #[test]
    fn all_equity_has_no_loan() {
        assert!(order(0.0, 0.05).loan.is_none());
    }

    #[test]
    fn commit_assigns_fresh_ids_and_records_cash_flows() {
        let w = world();
        let mut ledger = Ledger::for_world(&w);
        let a = ledger.commit(order(0.7, 0.05)).unwrap();
        let b = ledger.commit(order(0.7, 0.05)).unwrap();
        assert_eq!(a, PlantId(2));
        assert_eq!(b, PlantId(3));
        assert_eq!(ledger.cash_flows().len(), 6);
        assert!(ledger.cash_flows().iter().all(|cf| cf.payee == Counterparty::Manufacturer));
    }

    #[test]
    fn merge_moves_pending_plants_into_world() {
        let mut w = world();
        let mut ledger = Ledger::for_world(&w);
        ledger.commit(order(0.7, 0.05)).unwrap();
        assert_eq!(ledger.merge_into(&mut w), 1);
        assert_eq!(w.plants.len(), 2);
        assert!(ledger.pending().is_empty());
        w.validate().unwrap();
    }

    #[test]
    fn settle_pays_due_installments() {
        let mut ledger = Ledger::new(PlantId(10));
        ledger.commit(order(0.7, 0.05)).unwrap();
        let mut producers = vec![producer("A"), producer("B")];
        ledger.settle(&mut producers, 5);
        assert_eq!(producers[0].cash, Decimal::new(1_970_000_000, 0));
        assert_eq!(producers[1].cash, Decimal::new(2_000_000_000, 0));
        ledger.settle(&mut producers, 7);
        assert_eq!(producers[0].cash, Decimal::new(1_970_000_000, 0));
    }
}
