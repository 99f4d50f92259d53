//! Discounted cash-flow valuation of a candidate plant.

use crate::merit::MarketOutlook;
use crate::EconError;
use serde::{Deserialize, Serialize};
use sim_core::Segment;

/// Amounts indexed by period (0 = decision tick).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CashFlowSchedule {
    entries: Vec<(u32, f64)>,
}

impl CashFlowSchedule {
    pub fn from_entries(entries: Vec<(u32, f64)>) -> Self {
        Self { entries }
    }

    /// Investment spread evenly over the build, then operating profit over
    /// the depreciation time.
    ///
    /// A zero building time is floored to one period so the investment is
    /// paid up front instead of divided by zero.
    pub fn investment(
        depreciation_time: u32,
        building_time: u32,
        total_investment: f64,
        operating_profit: f64,
    ) -> Self {
        let building = building_time.max(1);
        let installment = total_investment / building as f64;
        let mut entries = Vec::with_capacity((building + depreciation_time) as usize);
        entries.extend((0..building).map(|i| (i, -installment)));
        entries.extend((building..building + depreciation_time).map(|i| (i, operating_profit)));
        Self { entries }
    }

    pub fn entries(&self) -> &[(u32, f64)] {
        &self.entries
    }

    /// Net present value at `rate`.
    pub fn npv(&self, rate: f64) -> f64 {
        self.entries
            .iter()
            .map(|&(period, amount)| amount / (1.0 + rate).powi(period as i32))
            .sum()
    }
}

/// Hours and gross margin a unit expects to earn across the segments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatingOutlook {
    pub running_hours: f64,
    pub gross_profit: f64,
}

/// Accrue hours and margin over every segment whose expected price covers
/// `marginal_cost`. `available(segment, segments)` gives the unit's capacity.
pub fn operating_outlook<F>(
    marginal_cost: f64,
    segments: &[Segment],
    outlook: &MarketOutlook,
    available: F,
) -> OperatingOutlook
where
    F: Fn(usize, usize) -> f64,
{
    let n = segments.len();
    let mut result = OperatingOutlook::default();
    for (i, (segment, &price)) in segments.iter().zip(&outlook.segment_prices).enumerate() {
        if marginal_cost <= price {
            result.running_hours += segment.length_hours;
            result.gross_profit += (price - marginal_cost) * segment.length_hours * available(i, n);
        }
    }
    result
}

/// Weighted average cost of capital plus a technology risk premium.
pub fn wacc(debt_ratio: f64, equity_rate: f64, cost_of_debt: f64, risk_premium: f64) -> f64 {
    (1.0 - debt_ratio) * equity_rate + debt_ratio * cost_of_debt + risk_premium
}

/// Discounted capital outlay, discounted operating profit, and their sum.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectValuation {
    pub wacc: f64,
    /// Negative: the discounted investment.
    pub discounted_capital: f64,
    pub discounted_operating_profit: f64,
    pub project_value: f64,
}

impl ProjectValuation {
    pub fn is_profitable(&self) -> bool {
        self.project_value > 0.0
    }
}

/// Value a plant costing `invested_capital`, built over `building_time`
/// ticks, earning `operating_profit` per tick for `depreciation_time` ticks.
pub fn value_project(
    invested_capital: f64,
    building_time: u32,
    depreciation_time: u32,
    operating_profit: f64,
    wacc: f64,
) -> Result<ProjectValuation, EconError> {
    if !(wacc > -1.0 && wacc.is_finite()) {
        return Err(EconError::InvalidParameter("wacc"));
    }
    let outflow = CashFlowSchedule::investment(depreciation_time, building_time, invested_capital, 0.0);
    let inflow =
        CashFlowSchedule::investment(depreciation_time, building_time, 0.0, operating_profit);
    let discounted_capital = outflow.npv(wacc);
    let discounted_operating_profit = inflow.npv(wacc);
    let project_value = discounted_capital + discounted_operating_profit;
    if !project_value.is_finite() {
        return Err(EconError::NonFinite);
    }
    Ok(ProjectValuation {
        wacc,
        discounted_capital,
        discounted_operating_profit,
        project_value,
    })
}

/// Fixed payment per period repaying `principal` over `periods` at `rate`.
pub fn loan_annuity(principal: f64, periods: u32, rate: f64) -> Result<f64, EconError> {
    if periods == 0 {
        return Err(EconError::InvalidParameter("loan periods"));
    }
    if !(rate > -1.0 && rate.is_finite()) {
        return Err(EconError::InvalidParameter("loan rate"));
    }
    if rate == 0.0 {
        return Ok(principal / periods as f64);
    }
    let payment = principal * rate / (1.0 - (1.0 + rate).powi(-(periods as i32)));
    if !payment.is_finite() {
        return Err(EconError::NonFinite);
    }
    Ok(payment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn schedule_layout() {
        let s = CashFlowSchedule::investment(3, 2, 100.0, 10.0);
        assert_eq!(
            s.entries(),
            &[(0, -50.0), (1, -50.0), (2, 10.0), (3, 10.0), (4, 10.0)]
        );
    }

    #[test]
    fn zero_building_time_pays_up_front() {
        let s = CashFlowSchedule::investment(2, 0, 100.0, 10.0);
        assert_eq!(s.entries(), &[(0, -100.0), (1, 10.0), (2, 10.0)]);
    }

    #[test]
    fn npv_at_zero_rate_is_plain_sum() {
        let s = CashFlowSchedule::investment(10, 2, 100.0, 15.0);
        assert!((s.npv(0.0) - 50.0).abs() < 1e-12);
    }

    #[test]
    fn npv_discounts_later_periods() {
        let s = CashFlowSchedule::from_entries(vec![(0, 100.0), (1, 110.0)]);
        assert!((s.npv(0.1) - 200.0).abs() < 1e-9);
    }

    #[test]
    fn operating_outlook_skips_out_of_merit_segments() {
        let segments = vec![
            Segment {
                base_load_mw: 900.0,
                length_hours: 1000.0,
            },
            Segment {
                base_load_mw: 500.0,
                length_hours: 7000.0,
            },
        ];
        let outlook = MarketOutlook {
            segment_prices: vec![80.0, 30.0],
            segment_loads: vec![900.0, 500.0],
            max_expected_load: 900.0,
            capacity_sum: 1200.0,
        };
        let o = operating_outlook(40.0, &segments, &outlook, |_, _| 100.0);
        assert_eq!(o.running_hours, 1000.0);
        assert!((o.gross_profit - 40.0 * 1000.0 * 100.0).abs() < 1e-9);
        let o = operating_outlook(30.0, &segments, &outlook, |_, _| 100.0);
        assert_eq!(o.running_hours, 8000.0);
    }

    #[test]
    fn wacc_blends_equity_and_debt() {
        assert!((wacc(0.7, 0.12, 0.09, 0.0) - 0.099).abs() < 1e-12);
        assert!((wacc(0.7, 0.12, 0.09, 0.02) - 0.119).abs() < 1e-12);
    }

    #[test]
    fn project_value_sign_follows_profit() {
        let good = value_project(1000.0, 2, 20, 200.0, 0.08).unwrap();
        assert!(good.is_profitable());
        assert!(good.discounted_capital < 0.0);
        let bad = value_project(1000.0, 2, 20, 10.0, 0.08).unwrap();
        assert!(!bad.is_profitable());
    }

    #[test]
    fn annuity_repays_principal() {
        let p = loan_annuity(1000.0, 10, 0.05).unwrap();
        assert!((p - 129.504_574_965_457_5).abs() < 1e-9);
        assert_eq!(loan_annuity(1000.0, 10, 0.0).unwrap(), 100.0);
        assert!(loan_annuity(1000.0, 0, 0.05).is_err());
    }

    proptest! {
        #[test]
        fn npv_is_order_independent(entries in proptest::collection::vec((0u32..40, -1e6f64..1e6), 1..30),
                                    rate in 0.0f64..0.3,
                                    rot in 0usize..30) {
            let forward = CashFlowSchedule::from_entries(entries.clone());
            let mut shuffled = entries.clone();
            shuffled.reverse();
            let k = rot % shuffled.len();
            shuffled.rotate_left(k);
            let back = CashFlowSchedule::from_entries(shuffled);
            let a = forward.npv(rate);
            let b = back.npv(rate);
            prop_assert!((a - b).abs() <= 1e-6 * (1.0 + a.abs()));
        }
    }
}
