// src/simulation/single.rs

use crate::error::{Result, SupplyChainError};
use rand::rngs::StdRng;

use crate::model::demand::sample_normal_paths;

/// Cost and capacity parameters for a single stocking point.
#[derive(Debug, Clone)]
pub struct SingleStageParams {
    /// Production bound per period.
    pub capacity: f64,
    /// Periods between ordering and arrival.
    pub lead_time: usize,
    /// Cost per unit short per period.
    pub backorder_cost: f64,
    /// Cost per unit held per period.
    pub holding_cost: f64,
}

/// Aggregate result of one base-stock simulation run.
#[derive(Debug, Clone)]
pub struct SingleStageOutcome {
    /// Pathwise derivative of the average cost with respect to the
    /// base-stock level.
    pub gradient: f64,
    /// Expected holding-plus-backorder cost per period.
    pub average_cost: f64,
    /// Inventory trajectory per sample (`n_periods + 1` entries each).
    pub inventory: Vec<Vec<f64>>,
}

fn check_non_negative(parameter: &'static str, value: f64) -> Result<()> {
    if value < 0.0 {
        return Err(SupplyChainError::InvalidValue { parameter, value });
    }
    Ok(())
}

fn check_paths(demand: &[Vec<f64>]) -> Result<usize> {
    let n_periods = demand.first().map(|p| p.len()).unwrap_or(0);
    if n_periods == 0 || demand.iter().any(|p| p.len() != n_periods) {
        return Err(SupplyChainError::EmptyDemand);
    }
    Ok(n_periods)
}

/// Simulates a base-stock (order-up-to) policy at a single stocking point.
///
/// Per period: production is the gap to the order-up-to target, clipped by
/// capacity; the pipeline releases what was produced `lead_time` periods ago.
/// The returned gradient is the infinitesimal-perturbation estimate: each
/// period contributes `+h` while inventory is non-negative and `-b` while it
/// is backordered. Production is piecewise-linear in the base-stock level
/// with unit slope except where clipped, so the sample path itself is
/// differentiable almost everywhere under continuous demand.
///
/// # Arguments
/// * `params` - Capacity, lead time, and unit costs.
/// * `demand` - `n_samples x n_periods` demand paths.
/// * `base_stock` - Order-up-to level S.
pub fn simulate_base_stock(
    params: &SingleStageParams,
    demand: &[Vec<f64>],
    base_stock: f64,
) -> Result<SingleStageOutcome> {
    check_non_negative("capacity", params.capacity)?;
    check_non_negative("backorder_cost", params.backorder_cost)?;
    check_non_negative("holding_cost", params.holding_cost)?;
    let n_periods = check_paths(demand)?;
    let n_samples = demand.len();

    let b = params.backorder_cost;
    let h = params.holding_cost;
    // A zero lead time still needs one pipeline slot: orders placed this
    // period arrive at the start of the next.
    let buf_len = params.lead_time.max(1);

    let mut inventory = Vec::with_capacity(n_samples);
    let mut sum_gradient = 0.0;
    let mut sum_cost = 0.0;

    for path in demand {
        let mut level = vec![0.0; n_periods + 1];
        level[0] = base_stock;
        let mut in_transit = 0.0;
        let mut pipeline = vec![0.0; buf_len];

        for t in 0..n_periods {
            // The slot holds what was produced `buf_len` periods ago; read it
            // before this period's production overwrites it.
            let arrival = pipeline[t % buf_len];
            level[t + 1] = level[t] - path[t] + arrival;

            let production = (base_stock + path[t] - level[t] - in_transit).min(params.capacity);
            in_transit += production - arrival;
            pipeline[t % buf_len] = production;

            sum_gradient += if level[t] < 0.0 { -b } else { h };
        }

        for &inv in &level {
            sum_cost += if inv < 0.0 { -b * inv } else { h * inv };
        }
        inventory.push(level);
    }

    let scale = (n_samples * n_periods) as f64;
    Ok(SingleStageOutcome {
        gradient: sum_gradient / scale,
        average_cost: sum_cost / scale,
        inventory,
    })
}

/// Replenishment rule for [`simulate_reorder_point`].
#[derive(Debug, Clone, Copy)]
pub enum ReorderPolicy {
    /// (Q,R): order a fixed quantity whenever the position drops below R.
    OrderQuantity(f64),
    /// (s,S): order up to S whenever the position drops below R.
    OrderUpTo(f64),
}

/// Parameters for the reorder-point simulation.
#[derive(Debug, Clone)]
pub struct ReorderPointParams {
    pub reorder_point: f64,
    pub lead_time: usize,
    pub backorder_cost: f64,
    pub holding_cost: f64,
    /// Fixed cost charged on every period that places an order.
    pub fixed_cost: f64,
}

/// Result of a reorder-point simulation.
#[derive(Debug, Clone)]
pub struct ReorderOutcome {
    /// Average cost per period, one entry per sample.
    pub sample_costs: Vec<f64>,
    /// Inventory trajectory per sample.
    pub inventory: Vec<Vec<f64>>,
}

/// Simulates a (Q,R) or (s,S) policy with demand drawn from a clipped normal.
///
/// With zero lead time an order placed in a period arrives within it, so an
/// order-up-to level equal to the mean keeps on-hand inventory pinned at zero
/// and the cost vanishes. Demand paths are drawn from the passed-in seeded
/// generator; negative draws are clipped at generation.
pub fn simulate_reorder_point(
    params: &ReorderPointParams,
    policy: ReorderPolicy,
    mean: f64,
    std: f64,
    n_samples: usize,
    n_periods: usize,
    rng: &mut StdRng,
) -> Result<ReorderOutcome> {
    check_non_negative("backorder_cost", params.backorder_cost)?;
    check_non_negative("holding_cost", params.holding_cost)?;
    check_non_negative("fixed_cost", params.fixed_cost)?;
    check_non_negative("demand_std", std)?;
    if n_samples == 0 || n_periods == 0 {
        return Err(SupplyChainError::EmptyDemand);
    }

    let demand = sample_normal_paths(mean, std, n_samples, n_periods, rng);
    let r = params.reorder_point;
    let b = params.backorder_cost;
    let h = params.holding_cost;

    let mut sample_costs = Vec::with_capacity(n_samples);
    let mut inventory = Vec::with_capacity(n_samples);

    for path in &demand {
        let mut level = vec![0.0; n_periods + 1];
        let mut production = vec![0.0; n_periods + 1];
        let mut fixed = vec![0.0; n_periods + 1];

        // With an instantaneous pipeline the run starts empty and the
        // position starts at the mean; otherwise on-hand starts at R.
        let mut position;
        if params.lead_time == 0 {
            level[0] = 0.0;
            position = mean;
        } else {
            level[0] = r;
            position = r - 1.0;
        }

        for t in 1..n_periods {
            position -= path[t];
            if position < r {
                production[t] = match policy {
                    ReorderPolicy::OrderQuantity(q) => q,
                    ReorderPolicy::OrderUpTo(s) => s - position,
                };
                fixed[t] = params.fixed_cost;
            }
            position += production[t];

            level[t] = level[t - 1] - path[t]
                + if t >= params.lead_time {
                    production[t - params.lead_time]
                } else {
                    0.0
                };
        }

        let cost: f64 = level
            .iter()
            .zip(&fixed)
            .map(|(&inv, &fc)| fc + if inv < 0.0 { -b * inv } else { h * inv })
            .sum();
        sample_costs.push(cost / n_periods as f64);
        inventory.push(level);
    }

    Ok(ReorderOutcome { sample_costs, inventory })
}
