// src/allocation/coverage.rs

use crate::error::Result;
use crate::model::demand::DemandModel;
use crate::model::network::NetworkGraph;

/// Precomputed per-node coverage tables shared by the allocation solvers.
///
/// The horizon `Lmax` is one past the largest net replenishment time any node
/// can experience: a forward pass propagates each node's worst guaranteed
/// inbound delay (capped by the upstream service-time promise) and adds its
/// own processing time. Source nodes count toward the horizon too, so a
/// network whose only stages are sources still gets a usable table.
///
/// For every coverage length `t < Lmax`:
///   `safety_cost[i][t] = h_i * z_i * sigma_i * sqrt(t)`
///   `max_demand[i][t]  = mu_i * t + z_i * sigma_i * sqrt(t)`
#[derive(Debug, Clone)]
pub struct CoverageTable {
    horizon: usize,
    lead_time_upper: Vec<usize>,
    safety_cost: Vec<Vec<f64>>,
    max_demand: Vec<Vec<f64>>,
}

impl CoverageTable {
    pub fn build(graph: &NetworkGraph, demand: &DemandModel) -> Result<Self> {
        graph.validate()?;
        demand.validate_for(graph)?;

        let n = graph.len();
        let mut max_nrt = vec![0usize; n];
        for i in graph.down_order() {
            let node = graph.node(i);
            if graph.predecessors(i).is_empty() {
                max_nrt[i] = node.processing_time;
            } else {
                let worst_inbound = graph
                    .predecessors(i)
                    .iter()
                    .map(|link| {
                        max_nrt[link.node].min(graph.node(link.node).lead_time_upper)
                    })
                    .max()
                    .unwrap_or(0);
                max_nrt[i] = worst_inbound + node.processing_time;
            }
        }
        let horizon = max_nrt.iter().copied().max().unwrap_or(0) + 1;

        // A service-time promise beyond the horizon can never bind.
        let lead_time_upper: Vec<usize> = (0..n)
            .map(|i| graph.node(i).lead_time_upper.min(horizon - 1))
            .collect();

        let mut safety_cost = Vec::with_capacity(n);
        let mut max_demand = Vec::with_capacity(n);
        for i in 0..n {
            let h = graph.node(i).holding_cost;
            let z = demand.safety_factor(i);
            let sigma = demand.std(i);
            let mu = demand.mean(i);
            let mut costs = Vec::with_capacity(horizon);
            let mut demands = Vec::with_capacity(horizon);
            for t in 0..horizon {
                let window = (t as f64).sqrt();
                costs.push(h * z * sigma * window);
                demands.push(mu * t as f64 + z * sigma * window);
            }
            safety_cost.push(costs);
            max_demand.push(demands);
        }

        Ok(Self { horizon, lead_time_upper, safety_cost, max_demand })
    }

    /// One past the largest feasible net replenishment time.
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Service-time upper bound for node `i`, clipped to the horizon.
    pub fn lead_time_upper(&self, i: usize) -> usize {
        self.lead_time_upper[i]
    }

    /// Safety stock holding cost at node `i` for a coverage of `t` periods.
    pub fn safety_cost(&self, i: usize, t: usize) -> f64 {
        self.safety_cost[i][t]
    }

    /// Maximum reasonable demand at node `i` over `t` periods.
    pub fn max_demand(&self, i: usize, t: usize) -> f64 {
        self.max_demand[i][t]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::network::StockPoint;

    fn chain(proc_times: &[usize], ltub: &[usize]) -> NetworkGraph {
        let n = proc_times.len();
        let mut nodes = Vec::with_capacity(n);
        for (i, (&p, &u)) in proc_times.iter().zip(ltub).enumerate() {
            let mut node = StockPoint::new(format!("n{i}"));
            node.processing_time = p;
            node.lead_time_upper = u;
            node.holding_cost = 1.0;
            nodes.push(node);
        }
        let mut g = NetworkGraph::new(nodes);
        for i in 0..n - 1 {
            g.link(i, i + 1).unwrap();
        }
        g
    }

    #[test]
    fn horizon_accumulates_unpromised_delays() {
        // 0 -> 1 -> 2 with free promises: delays stack up, 2+3+4 = 9.
        let g = chain(&[2, 3, 4], &[10, 10, 10]);
        let demand = DemandModel::new(vec![100.0; 3], vec![10.0; 3], vec![1.65; 3]).unwrap();
        let table = CoverageTable::build(&g, &demand).unwrap();
        assert_eq!(table.horizon(), 10);
        // Free upper bounds get clipped back to the horizon.
        assert_eq!(table.lead_time_upper(0), 9);
    }

    #[test]
    fn zero_promises_keep_horizon_local() {
        // Immediate service everywhere: each node only sees its own delay.
        let g = chain(&[2, 3, 4], &[0, 0, 0]);
        let demand = DemandModel::new(vec![100.0; 3], vec![10.0; 3], vec![1.65; 3]).unwrap();
        let table = CoverageTable::build(&g, &demand).unwrap();
        assert_eq!(table.horizon(), 5);
    }

    #[test]
    fn tables_follow_square_root_coverage() {
        let g = chain(&[1, 1], &[0, 0]);
        let demand = DemandModel::new(vec![100.0; 2], vec![10.0; 2], vec![2.0; 2]).unwrap();
        let table = CoverageTable::build(&g, &demand).unwrap();
        assert_eq!(table.safety_cost(0, 0), 0.0);
        assert!((table.safety_cost(0, 1) - 20.0).abs() < 1e-12);
        assert!((table.max_demand(0, 1) - 120.0).abs() < 1e-12);
        // Single-source horizon still counts the source's own delay.
        assert_eq!(table.horizon(), 2);
    }
}
