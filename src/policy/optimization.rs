// src/policy/optimization.rs

//! Newsvendor-style analytic starting points and simulation-based gradient
//! descent on base-stock levels.

use crate::error::{Result, SupplyChainError};
use crate::model::demand::SIGMA_FLOOR;
use crate::model::network::NetworkGraph;
use crate::policy::base_stock::BaseStockPolicy;
use crate::simulation::network::simulate_base_stock_network;
use crate::simulation::single::{simulate_base_stock, SingleStageParams};

/// Calculates the critical ratio (target no-stockout probability).
///
/// CR = BackorderCost / (BackorderCost + HoldingCost): the service level at
/// which the marginal cost of overstocking balances understocking.
pub fn critical_ratio(backorder_cost: f64, holding_cost: f64) -> f64 {
    if backorder_cost + holding_cost == 0.0 {
        return 0.0;
    }
    backorder_cost / (backorder_cost + holding_cost)
}

/// Approximate inverse CDF (quantile function) of the standard normal.
///
/// Abramowitz and Stegun formula 26.2.23; absolute error below 4.5e-4.
pub fn inverse_normal_cdf(p: f64) -> f64 {
    // Cap the tails at a reasonable sigma.
    if p >= 1.0 {
        return 5.0;
    }
    if p <= 0.0 {
        return -5.0;
    }
    if p == 0.5 {
        return 0.0;
    }

    // The rational approximation covers 0 < p <= 0.5; mirror for p > 0.5.
    let q = if p < 0.5 { p } else { 1.0 - p };

    let t = (-2.0 * q.ln()).sqrt();

    let c0 = 2.515517;
    let c1 = 0.802853;
    let c2 = 0.010328;

    let d1 = 1.432788;
    let d2 = 0.189269;
    let d3 = 0.001308;

    let numerator = c0 + c1 * t + c2 * t * t;
    let denominator = 1.0 + d1 * t + d2 * t * t + d3 * t * t * t;

    let x = t - (numerator / denominator);

    if p < 0.5 {
        -x
    } else {
        x
    }
}

/// Newsvendor order-up-to level over the lead-time horizon:
/// `S = mu * LT + z * sigma * sqrt(LT)` with z from the critical ratio.
pub fn newsvendor_base_stock(
    mean: f64,
    std: f64,
    lead_time: usize,
    backorder_cost: f64,
    holding_cost: f64,
) -> f64 {
    let z = inverse_normal_cdf(critical_ratio(backorder_cost, holding_cost));
    let horizon = lead_time as f64;
    (mean * horizon + z * std * horizon.sqrt()).max(0.0)
}

/// Power-approximation (s, S) levels for a fixed-ordering-cost system.
///
/// Regression fit for the reorder point and order quantity; when the fitted
/// batch is small relative to mean demand the reorder point is capped by the
/// plain newsvendor level. The small additive floors keep the expressions
/// defined when sigma or the fitted z degenerate to zero.
pub fn approximate_ss(
    mean: f64,
    std: f64,
    lead_time: usize,
    backorder_cost: f64,
    holding_cost: f64,
    fixed_cost: f64,
) -> (f64, f64) {
    let sigma_l = std * ((lead_time + 1) as f64).sqrt() + SIGMA_FLOOR;
    let mu_l = mean * (lead_time + 1) as f64;
    let q = 1.3
        * mean.powf(0.494)
        * (fixed_cost / holding_cost).powf(0.506)
        * (1.0 + sigma_l * sigma_l / (mean * mean)).powf(0.116);
    let z = (q * holding_cost / sigma_l / backorder_cost).sqrt() + 1e-7;
    let mut s = 0.973 * mu_l + sigma_l * (0.183 / z + 1.063 - 2.192 * z);
    let mut big_s = s + q;

    if q <= mean * 1.5 {
        let omega = critical_ratio(backorder_cost, holding_cost);
        let s0 = mu_l + inverse_normal_cdf(omega) * sigma_l;
        s = s.min(s0);
        big_s = (s + q).min(s0);
    }
    (s, big_s)
}

/// Knobs for the simulation-based gradient descent.
#[derive(Debug, Clone)]
pub struct GradientSearchParams {
    /// Step applied to the gradient on the first iteration.
    pub step_size: f64,
    /// Multiplicative decay applied to the step after every iteration.
    pub decay: f64,
    /// Convergence threshold on the base-stock change per node.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for GradientSearchParams {
    fn default() -> Self {
        Self {
            step_size: 1.0,
            decay: 1.0,
            tolerance: 0.01,
            max_iterations: 100,
        }
    }
}

impl GradientSearchParams {
    fn validate(&self) -> Result<()> {
        if self.step_size <= 0.0 {
            return Err(SupplyChainError::InvalidValue {
                parameter: "step_size",
                value: self.step_size,
            });
        }
        if self.decay <= 0.0 {
            return Err(SupplyChainError::InvalidValue {
                parameter: "decay",
                value: self.decay,
            });
        }
        if self.tolerance < 0.0 {
            return Err(SupplyChainError::InvalidValue {
                parameter: "tolerance",
                value: self.tolerance,
            });
        }
        Ok(())
    }
}

/// Result of a gradient search: the final levels and the cost observed at
/// each iteration.
#[derive(Debug, Clone)]
pub struct SearchOutcome<P> {
    pub policy: P,
    pub cost_trace: Vec<f64>,
}

/// Gradient descent on a single stocking point's base-stock level.
///
/// Each iteration re-simulates the fixed demand paths (common random numbers,
/// so successive cost estimates are comparable), moves against the pathwise
/// gradient, clips at zero, and decays the step. Stops when the level moves
/// less than the tolerance or the iteration cap is reached.
pub fn optimize_base_stock(
    params: &SingleStageParams,
    demand: &[Vec<f64>],
    initial: f64,
    search: &GradientSearchParams,
) -> Result<SearchOutcome<f64>> {
    search.validate()?;
    let mut level = initial.max(0.0);
    let mut step = search.step_size;
    let mut cost_trace = Vec::new();

    for _ in 0..search.max_iterations {
        let outcome = simulate_base_stock(params, demand, level)?;
        cost_trace.push(outcome.average_cost);

        let next = (level - step * outcome.gradient).max(0.0);
        let moved = (next - level).abs();
        level = next;
        step *= search.decay;
        if moved < search.tolerance {
            break;
        }
    }
    Ok(SearchOutcome { policy: level, cost_trace })
}

/// Gradient descent on every node's base-stock level simultaneously.
///
/// Same scheme as [`optimize_base_stock`], with the full gradient vector from
/// the network simulator. Converges when every node's level moves less than
/// the tolerance in one iteration.
pub fn optimize_base_stock_network(
    graph: &NetworkGraph,
    initial: &BaseStockPolicy,
    demand: &[Vec<Vec<f64>>],
    search: &GradientSearchParams,
) -> Result<SearchOutcome<BaseStockPolicy>> {
    search.validate()?;
    let mut levels: Vec<f64> = initial.levels().iter().map(|&s| s.max(0.0)).collect();
    let mut step = search.step_size;
    let mut cost_trace = Vec::new();

    for _ in 0..search.max_iterations {
        let policy = BaseStockPolicy::new(levels.clone())?;
        let outcome = simulate_base_stock_network(graph, &policy, demand)?;
        cost_trace.push(outcome.average_cost);

        let mut max_move = 0.0f64;
        for (level, g) in levels.iter_mut().zip(&outcome.gradient) {
            let next = (*level - step * g).max(0.0);
            max_move = max_move.max((next - *level).abs());
            *level = next;
        }
        step *= search.decay;
        if max_move < search.tolerance {
            break;
        }
    }
    Ok(SearchOutcome {
        policy: BaseStockPolicy::new(levels)?,
        cost_trace,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_ratio_balances_costs() {
        assert!((critical_ratio(100.0, 10.0) - 100.0 / 110.0).abs() < 1e-12);
        assert_eq!(critical_ratio(0.0, 0.0), 0.0);
    }

    #[test]
    fn inverse_cdf_matches_tabulated_quantiles() {
        assert_eq!(inverse_normal_cdf(0.5), 0.0);
        // Tolerances follow the approximation's published error bound.
        assert!((inverse_normal_cdf(0.95) - 1.6449).abs() < 5e-4);
        assert!((inverse_normal_cdf(0.05) + 1.6449).abs() < 5e-4);
        assert!(inverse_normal_cdf(1.0) >= 5.0);
        assert!(inverse_normal_cdf(0.0) <= -5.0);
    }

    #[test]
    fn newsvendor_level_for_reference_case() {
        // mu=100, sigma=10, LT=3, b=100, h=10.
        let s = newsvendor_base_stock(100.0, 10.0, 3, 100.0, 10.0);
        assert!((s - 323.126).abs() < 0.01);
    }

    #[test]
    fn power_approximation_orders_reorder_point_below_order_up_to() {
        let (s, big_s) = approximate_ss(100.0, 10.0, 0, 100.0, 1.0, 10000.0);
        assert!(s < big_s);
        assert!(s > 0.0);
    }

    #[test]
    fn power_approximation_survives_zero_sigma() {
        let (s, big_s) = approximate_ss(100.0, 0.0, 2, 100.0, 1.0, 500.0);
        assert!(s.is_finite() && big_s.is_finite());
        assert!(s <= big_s);
    }

    #[test]
    fn zero_step_size_rejected() {
        let params = SingleStageParams {
            capacity: f64::INFINITY,
            lead_time: 1,
            backorder_cost: 100.0,
            holding_cost: 1.0,
        };
        let search = GradientSearchParams { step_size: 0.0, ..Default::default() };
        let demand = vec![vec![10.0; 5]];
        assert!(matches!(
            optimize_base_stock(&params, &demand, 50.0, &search),
            Err(SupplyChainError::InvalidValue { parameter: "step_size", .. })
        ));
    }

    #[test]
    fn descent_on_deterministic_demand_reduces_cost() {
        // Constant demand 10, lead time 2: the cost-minimizing level is near
        // 2 * 10 given the steep backorder cost, far below the start.
        let params = SingleStageParams {
            capacity: f64::INFINITY,
            lead_time: 2,
            backorder_cost: 9.0,
            holding_cost: 1.0,
        };
        let demand = vec![vec![10.0; 60]];
        let search = GradientSearchParams {
            step_size: 2.0,
            max_iterations: 200,
            ..Default::default()
        };
        let out = optimize_base_stock(&params, &demand, 100.0, &search).unwrap();
        let first = out.cost_trace.first().copied().unwrap();
        let last = out.cost_trace.last().copied().unwrap();
        assert!(last < first);
        assert!(out.policy < 100.0);
    }
}
