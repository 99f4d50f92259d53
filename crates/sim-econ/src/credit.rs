//! Structural (Merton) pricing of a producer's cost of debt.

use crate::EconError;
use serde::{Deserialize, Serialize};

/// Standard normal CDF, Abramowitz & Stegun 26.2.17 (|error| < 7.5e-8).
///
/// Evaluated on |x| and mirrored, so `N(-x) == 1 - N(x)` holds exactly for
/// every `x != 0`.
pub fn cumulative_normal(x: f64) -> f64 {
    const P: f64 = 0.231_641_9;
    const B: [f64; 5] = [
        0.319_381_530,
        -0.356_563_782,
        1.781_477_937,
        -1.821_255_978,
        1.330_274_429,
    ];
    const INV_SQRT_2PI: f64 = 0.398_942_280_401;

    let z = x.abs();
    let k = 1.0 / (1.0 + P * z);
    let poly = k * (B[0] + k * (B[1] + k * (B[2] + k * (B[3] + k * B[4]))));
    let upper = 1.0 - INV_SQRT_2PI * (-0.5 * z * z).exp() * poly;
    if x < 0.0 {
        1.0 - upper
    } else {
        upper
    }
}

/// Balance-sheet inputs of the Merton model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MertonInputs {
    /// Total asset value A.
    pub assets: f64,
    /// Face value of debt D; floored at 1.
    pub debt: f64,
    /// Asset volatility σ.
    pub volatility: f64,
    /// Risk-free rate r.
    pub risk_free_rate: f64,
    /// Maturity T in ticks.
    pub maturity: f64,
}

/// Outcome of pricing the debt as a short put on the assets.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MertonPricing {
    pub d1: f64,
    pub d2: f64,
    pub equity_value: f64,
    pub risky_debt_value: f64,
    pub cost_of_debt: f64,
}

/// Smallest debt face value used in the pricing.
pub const MIN_DEBT: f64 = 1.0;

/// Price the debt with a Black–Scholes call on the assets.
///
/// `d1 = (ln(A/D) + (r + σ²/2)T) / (σ√T)`, `d2 = d1 − σ√T`,
/// `E = A·N(d1) − D·e^(−rT)·N(d2)`, risky debt `A − E`, and cost of debt
/// `−ln((A − E)/D) / T`. The cost of debt never drops below `r`.
pub fn merton_pricing(inputs: &MertonInputs) -> Result<MertonPricing, EconError> {
    let MertonInputs {
        assets,
        debt,
        volatility,
        risk_free_rate: r,
        maturity: t,
    } = *inputs;
    if !(assets > 0.0 && assets.is_finite()) {
        return Err(EconError::InvalidParameter("assets must be positive"));
    }
    if !(volatility > 0.0 && volatility.is_finite()) {
        return Err(EconError::InvalidParameter("asset volatility must be positive"));
    }
    if !(t > 0.0 && t.is_finite()) {
        return Err(EconError::InvalidParameter("maturity must be positive"));
    }
    if !r.is_finite() || !debt.is_finite() {
        return Err(EconError::NonFinite);
    }
    let debt = debt.max(MIN_DEBT);

    let sig_sqrt_t = volatility * t.sqrt();
    let d1 = ((assets / debt).ln() + (r + volatility * volatility / 2.0) * t) / sig_sqrt_t;
    let d2 = d1 - sig_sqrt_t;
    let discounted_debt = debt * (-r * t).exp();
    let equity_value = assets * cumulative_normal(d1) - discounted_debt * cumulative_normal(d2);
    let risky_debt_value = assets - equity_value;
    if !(risky_debt_value > 0.0 && risky_debt_value.is_finite()) {
        return Err(EconError::NonFinite);
    }
    // approximation error in N(.) can push the yield a hair below r
    let cost_of_debt = (-(risky_debt_value / debt).ln() / t).max(r);
    Ok(MertonPricing {
        d1,
        d2,
        equity_value,
        risky_debt_value,
        cost_of_debt,
    })
}

/// Credit-risk-adjusted cost of debt.
pub fn merton_cost_of_debt(inputs: &MertonInputs) -> Result<f64, EconError> {
    merton_pricing(inputs).map(|p| p.cost_of_debt)
}
