// src/allocation/dp.rs

use crate::allocation::coverage::CoverageTable;
use crate::error::{Result, SupplyChainError};
use crate::model::demand::DemandModel;
use crate::model::network::NetworkGraph;

/// Costs at or above this value mark a (service-time, inbound) pair that no
/// feasible assignment reaches.
const UNREACHABLE: f64 = 999_999.0;

/// Optimal guaranteed-service allocation on a tree skeleton.
#[derive(Debug, Clone)]
pub struct ExactAllocation {
    /// Minimal total safety-stock holding cost.
    pub total_cost: f64,
    /// Guaranteed service time promised downstream by each node.
    pub service_time: Vec<usize>,
    /// Guaranteed inbound service time each node receives from upstream.
    pub inbound_service_time: Vec<usize>,
    /// Net replenishment time per node: `inbound + processing - service`.
    pub net_replenishment: Vec<usize>,
}

/// Exact dynamic program for safety stock placement on tree skeletons.
///
/// Nodes are processed in leaf-peeling order so each node sees at most one
/// unprocessed neighbor. Two value tables are kept per node: `f[L]` is the
/// best subtree cost given the node promises service time `L` downstream, and
/// `g[LI]` given it receives inbound service `LI`; `fmin`/`gmin` are their
/// running minima over smaller `L` (resp. larger `LI`), which is what the
/// neighbor still being processed actually needs. A backward pass over the
/// reversed order fixes each node's pair and pushes the decision to its
/// not-yet-fixed neighbors.
pub fn solve_safety_stock_exact(
    graph: &NetworkGraph,
    demand: &DemandModel,
) -> Result<ExactAllocation> {
    let order = graph.dp_order()?;
    let table = CoverageTable::build(graph, demand)?;
    let n = graph.len();
    let lmax = table.horizon();

    // c[k][L][LI]: cost of node k plus all processed neighbors' subtrees.
    let mut c = vec![vec![vec![f64::INFINITY; lmax]; lmax]; n];
    let mut f = vec![vec![f64::INFINITY; lmax]; n];
    let mut fmin = vec![vec![f64::INFINITY; lmax]; n];
    let mut g = vec![vec![f64::INFINITY; lmax]; n];
    let mut gmin = vec![vec![f64::INFINITY; lmax]; n];
    // Argmins carried alongside the running minima.
    let mut min_li = vec![vec![0usize; lmax]; n];
    let mut min_l = vec![vec![0usize; lmax]; n];

    let mut searched = vec![false; n];
    for &k in &order {
        searched[k] = true;
        let proc = graph.node(k).processing_time;
        let ltlb = graph.node(k).lead_time_lower;
        let ltub = table.lead_time_upper(k);

        let feasible = |l: usize, li: usize| li + proc >= l && li + proc - l < lmax;

        for l in ltlb..=ltub {
            for li in 0..lmax {
                if !feasible(l, li) {
                    continue;
                }
                let mut sum = table.safety_cost(k, li + proc - l);
                for link in graph.predecessors(k) {
                    if searched[link.node] {
                        sum += fmin[link.node][li];
                    }
                }
                for link in graph.successors(k) {
                    if searched[link.node] {
                        sum += gmin[link.node][l];
                    }
                }
                c[k][l][li] = sum;
            }
        }

        for l in ltlb..=ltub {
            let mut min_cost = UNREACHABLE;
            for li in 0..lmax {
                if feasible(l, li) && c[k][l][li] < min_cost {
                    min_cost = c[k][l][li];
                    min_li[k][l] = li;
                }
            }
            f[k][l] = min_cost;
        }

        // fmin[L] = best f over promises up to L (a shorter promise always
        // satisfies a downstream neighbor that accepts L).
        for l in ltlb..lmax {
            let mut min_cost = f[k][l];
            for x in ltlb..l {
                if min_li[k][x] + proc >= x && f[k][x] < min_cost {
                    min_cost = f[k][x];
                    min_li[k][l] = min_li[k][x];
                }
            }
            fmin[k][l] = min_cost;
        }

        for li in 0..lmax {
            let mut min_cost = UNREACHABLE;
            for l in ltlb..=ltub {
                if feasible(l, li) && c[k][l][li] < min_cost {
                    min_cost = c[k][l][li];
                    min_l[k][li] = l;
                }
            }
            g[k][li] = min_cost;
        }

        // gmin[LI] = best g over inbound times of at least LI (more inbound
        // delay never helps, so the minimum runs upward).
        for li in 0..lmax {
            if g[k][li] < UNREACHABLE {
                let mut min_cost = UNREACHABLE;
                for x in li..lmax {
                    if x + proc >= min_l[k][x] && g[k][x] < min_cost {
                        min_cost = g[k][x];
                        min_l[k][li] = min_l[k][x];
                    }
                }
                gmin[k][li] = min_cost;
            } else {
                gmin[k][li] = UNREACHABLE;
            }
        }
    }

    // Backward reconstruction: fix each node's pair, then inform the
    // neighbors that are still unresolved.
    let mut l_star = vec![-1i64; n];
    let mut li_star = vec![-1i64; n];
    let mut resolved = vec![false; n];

    for &i in order.iter().rev() {
        resolved[i] = true;
        let proc = graph.node(i).processing_time;
        let ltlb = graph.node(i).lead_time_lower;
        let ltub = table.lead_time_upper(i);
        let feasible = |l: usize, li: usize| li + proc >= l && li + proc - l < lmax;

        if li_star[i] >= 0 {
            let li = li_star[i] as usize;
            let mut min_cost = UNREACHABLE;
            for l in ltlb..=ltub {
                if feasible(l, li) && c[i][l][li] < min_cost {
                    min_cost = c[i][l][li];
                    l_star[i] = l as i64;
                }
            }
        } else if l_star[i] >= 0 {
            let l = l_star[i] as usize;
            let mut min_cost = UNREACHABLE;
            for li in 0..lmax {
                if feasible(l, li) && c[i][l][li] < min_cost {
                    min_cost = c[i][l][li];
                    li_star[i] = li as i64;
                }
            }
        } else {
            let mut min_cost = UNREACHABLE;
            for li in 0..lmax {
                for l in ltlb..=ltub {
                    if feasible(l, li) && c[i][l][li] < min_cost {
                        min_cost = c[i][l][li];
                        l_star[i] = l as i64;
                        li_star[i] = li as i64;
                    }
                }
            }
        }

        if l_star[i] < 0 || li_star[i] < 0 {
            return Err(SupplyChainError::NoFeasibleServiceTime { node: i });
        }

        for link in graph.successors(i) {
            if !resolved[link.node] {
                li_star[link.node] = l_star[i];
            }
        }
        for link in graph.predecessors(i) {
            if !resolved[link.node] {
                l_star[link.node] = li_star[i];
            }
        }
    }

    let mut service_time = Vec::with_capacity(n);
    let mut inbound_service_time = Vec::with_capacity(n);
    let mut net_replenishment = Vec::with_capacity(n);
    let mut total_cost = 0.0;
    for i in 0..n {
        let l = l_star[i] as usize;
        let li = li_star[i] as usize;
        let nrt = li + graph.node(i).processing_time - l;
        total_cost += table.safety_cost(i, nrt);
        service_time.push(l);
        inbound_service_time.push(li);
        net_replenishment.push(nrt);
    }

    Ok(ExactAllocation {
        total_cost,
        service_time,
        inbound_service_time,
        net_replenishment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::network::StockPoint;

    fn two_stage(ltub: [usize; 2], h: [f64; 2]) -> (NetworkGraph, DemandModel) {
        let mut nodes = Vec::new();
        for (i, &cost) in h.iter().enumerate() {
            let mut node = StockPoint::new(format!("n{i}"));
            node.processing_time = 1;
            node.lead_time_upper = ltub[i];
            node.holding_cost = cost;
            nodes.push(node);
        }
        let mut g = NetworkGraph::new(nodes);
        g.link(0, 1).unwrap();
        let demand = DemandModel::new(vec![100.0; 2], vec![1.0; 2], vec![1.0; 2]).unwrap();
        (g, demand)
    }

    #[test]
    fn prefers_pooling_when_downstream_holding_is_expensive() {
        // Promising L=1 upstream drops its own stock and pushes two periods
        // of coverage downstream: 2*sqrt(2) < 1 + 2, so pooling wins.
        let (g, demand) = two_stage([1, 0], [1.0, 2.0]);
        let out = solve_safety_stock_exact(&g, &demand).unwrap();
        assert_eq!(out.service_time, vec![1, 0]);
        assert_eq!(out.net_replenishment, vec![0, 2]);
        assert!((out.total_cost - 2.0 * 2.0f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn forced_immediate_service_decouples_every_stage() {
        // With every promise pinned at zero each node covers exactly its own
        // processing time.
        let (g, demand) = two_stage([0, 0], [1.0, 2.0]);
        let out = solve_safety_stock_exact(&g, &demand).unwrap();
        assert_eq!(out.net_replenishment, vec![1, 1]);
        assert!((out.total_cost - 3.0).abs() < 1e-9);
    }

    #[test]
    fn total_cost_round_trips_from_allocation() {
        let (g, demand) = two_stage([1, 0], [1.0, 2.0]);
        let out = solve_safety_stock_exact(&g, &demand).unwrap();
        let recomputed: f64 = (0..g.len())
            .map(|i| {
                g.node(i).holding_cost
                    * demand.safety_factor(i)
                    * demand.std(i)
                    * (out.net_replenishment[i] as f64).sqrt()
            })
            .sum();
        assert!((out.total_cost - recomputed).abs() < 1e-12);
    }

    #[test]
    fn non_tree_skeleton_rejected() {
        let mut nodes: Vec<StockPoint> =
            (0..4).map(|i| StockPoint::new(format!("n{i}"))).collect();
        for node in &mut nodes {
            node.processing_time = 1;
        }
        let mut g = NetworkGraph::new(nodes);
        g.link(0, 1).unwrap();
        g.link(0, 2).unwrap();
        g.link(1, 3).unwrap();
        g.link(2, 3).unwrap();
        let demand = DemandModel::new(vec![1.0; 4], vec![1.0; 4], vec![1.0; 4]).unwrap();
        assert!(matches!(
            solve_safety_stock_exact(&g, &demand),
            Err(SupplyChainError::NotATree)
        ));
    }
}
