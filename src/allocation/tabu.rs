// src/allocation/tabu.rs

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Result, SupplyChainError};
use crate::model::demand::DemandModel;
use crate::model::network::NetworkGraph;

/// Knobs for the heuristic solver.
#[derive(Debug, Clone)]
pub struct TabuParams {
    pub max_iterations: usize,
    /// Initial bounds on the tabu tenure drawn after each accepted move.
    pub tenure_lower: usize,
    pub tenure_upper: usize,
    pub seed: u64,
}

impl Default for TabuParams {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tenure_lower: 1,
            tenure_upper: 10,
            seed: 1,
        }
    }
}

/// Best allocation found by the tabu search.
#[derive(Debug, Clone)]
pub struct TabuSolution {
    pub best_cost: f64,
    /// Which nodes hold decoupling safety stock. Demand points always do;
    /// stages whose net replenishment vanished are reported as unstocked.
    pub stocked: Vec<bool>,
    pub net_replenishment: Vec<f64>,
    /// Worst guaranteed inbound delay each node sees.
    pub max_lead_in: Vec<f64>,
    /// Tightest service time each node must honor downstream.
    pub min_lead_time: Vec<f64>,
}

/// One evaluation of the binary decoupling model.
struct Evaluation {
    max_lead_in: Vec<f64>,
    min_lead_time: Vec<f64>,
    net_replenishment: Vec<f64>,
    cost: f64,
}

/// Computes lead-in/lead-out times and cost for one stocked/unstocked vector.
///
/// A stocked stage absorbs its upstream delay, so only unstocked predecessors
/// propagate theirs. The backward pass finds the slack each stage inherits
/// from downstream promises; net replenishment is the uncovered gap, floored
/// at zero.
fn evaluate(
    graph: &NetworkGraph,
    demand: &DemandModel,
    down_order: &[usize],
    up_order: &[usize],
    stocked: &[bool],
) -> Evaluation {
    let n = graph.len();
    let mut max_lead_in = vec![0.0; n];
    let mut min_lead_time = vec![0.0; n];
    let mut net_replenishment = vec![0.0; n];

    for &i in down_order {
        let proc = graph.node(i).processing_time as f64;
        if graph.predecessors(i).is_empty() {
            max_lead_in[i] = proc;
        } else {
            let mut worst = 0.0f64;
            for link in graph.predecessors(i) {
                if !stocked[link.node] {
                    worst = worst.max(max_lead_in[link.node]);
                }
            }
            max_lead_in[i] = proc + worst;
        }
    }

    for &i in up_order {
        if graph.is_demand_node(i) {
            min_lead_time[i] = graph.node(i).lead_time_upper as f64;
        } else {
            let mut tightest = f64::INFINITY;
            for link in graph.successors(i) {
                let j = link.node;
                let slack =
                    net_replenishment[j] + min_lead_time[j] - graph.node(j).processing_time as f64;
                tightest = tightest.min(slack);
            }
            min_lead_time[i] = tightest;
        }
        net_replenishment[i] = (max_lead_in[i] - min_lead_time[i]).max(0.0);
    }

    let cost = (0..n)
        .map(|i| {
            graph.node(i).holding_cost
                * demand.safety_factor(i)
                * demand.std(i)
                * net_replenishment[i].sqrt()
        })
        .sum();

    Evaluation { max_lead_in, min_lead_time, net_replenishment, cost }
}

/// Tabu search over which stages hold decoupling safety stock.
///
/// Works on any DAG, not just trees. The neighborhood is all single-bit flips
/// of the non-demand stages, enumerated in ascending node id; a flip stays
/// tabu until its recorded expiry iteration unless it beats the incumbent
/// (aspiration). A long-term frequency penalty breaks plateau cycling, the
/// tenure bounds widen by one when the search revisits the previous solution,
/// and a pass with no eligible move shrinks both bounds (floors 1 and 2) and
/// clears the tabu list.
pub fn solve_safety_stock_heuristic(
    graph: &NetworkGraph,
    demand: &DemandModel,
    params: &TabuParams,
) -> Result<TabuSolution> {
    graph.validate()?;
    demand.validate_for(graph)?;
    if params.tenure_lower < 1 || params.tenure_lower > params.tenure_upper {
        return Err(SupplyChainError::InvalidValue {
            parameter: "tenure_lower",
            value: params.tenure_lower as f64,
        });
    }

    let n = graph.len();
    let down_order = graph.down_order();
    let up_order = graph.up_order();
    let mut rng = StdRng::seed_from_u64(params.seed);

    let mut stocked: Vec<bool> = (0..n).map(|_| rng.gen_range(0..2u8) == 1).collect();
    let mut candidates = Vec::new();
    for i in 0..n {
        if graph.is_demand_node(i) {
            stocked[i] = true;
        } else {
            candidates.push(i);
        }
    }
    let m = candidates.len();

    let initial = evaluate(graph, demand, &down_order, &up_order, &stocked);
    let mut best_cost = initial.cost;
    let mut prev_cost = initial.cost;
    let mut best = TabuSolution {
        best_cost: initial.cost,
        stocked: stocked.clone(),
        net_replenishment: initial.net_replenishment,
        max_lead_in: initial.max_lead_in,
        min_lead_time: initial.min_lead_time,
    };
    let mut prev_stocked = stocked.clone();

    let mut tenure_lower = params.tenure_lower;
    let mut tenure_upper = params.tenure_upper;
    let mut tabu_until = vec![0usize; m];
    let mut frequency = vec![0u64; m];
    let mut penalty_factor = 0.0;
    let penalty_step = if n * params.max_iterations > 0 {
        initial.cost / (n * params.max_iterations) as f64 / 10.0
    } else {
        0.0
    };

    for iteration in 0..params.max_iterations {
        let mut chosen: Option<usize> = None;
        let mut chosen_eval: Option<Evaluation> = None;
        let mut min_score = f64::INFINITY;

        for (idx, &node) in candidates.iter().enumerate() {
            let mut neighbor = stocked.clone();
            neighbor[node] = !neighbor[node];
            let eval = evaluate(graph, demand, &down_order, &up_order, &neighbor);

            if iteration >= tabu_until[idx] {
                let score = eval.cost + penalty_factor * frequency[idx] as f64;
                if score < min_score {
                    min_score = score;
                    chosen = Some(idx);
                    chosen_eval = Some(eval);
                }
            } else if eval.cost < best_cost && eval.cost < min_score {
                min_score = eval.cost;
                chosen = Some(idx);
                chosen_eval = Some(eval);
            }
        }

        match (chosen, chosen_eval) {
            (None, _) | (_, None) => {
                // Every move is tabu and none aspirates: relax the tenure
                // range and forget the list.
                tenure_lower = tenure_lower.saturating_sub(1).max(1);
                tenure_upper = tenure_upper.saturating_sub(1).max(2);
                tabu_until.fill(0);
            }
            (Some(idx), Some(eval)) => {
                stocked[candidates[idx]] = !stocked[candidates[idx]];
                frequency[idx] += 1;
                if stocked == prev_stocked {
                    tenure_lower += 1;
                    tenure_upper += 1;
                } else if prev_cost == eval.cost {
                    penalty_factor += penalty_step;
                }
                prev_stocked = stocked.clone();
                prev_cost = eval.cost;
                tabu_until[idx] = iteration + rng.gen_range(tenure_lower..=tenure_upper);

                if eval.cost < best_cost {
                    best_cost = eval.cost;
                    best = TabuSolution {
                        best_cost: eval.cost,
                        stocked: stocked.clone(),
                        net_replenishment: eval.net_replenishment,
                        max_lead_in: eval.max_lead_in,
                        min_lead_time: eval.min_lead_time,
                    };
                }
            }
        }
    }

    // A stage whose net replenishment collapsed holds nothing in practice.
    for i in 0..n {
        if best.net_replenishment[i] <= 1e-5 {
            best.stocked[i] = false;
        }
    }
    Ok(best)
}
