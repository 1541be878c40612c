// src/policy/base_stock.rs

use crate::error::{Result, SupplyChainError};
use crate::model::demand::DemandModel;
use crate::model::network::NetworkGraph;

/// Per-node order-up-to levels for the network simulator and optimizer.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseStockPolicy {
    levels: Vec<f64>,
}

impl BaseStockPolicy {
    pub fn new(levels: Vec<f64>) -> Result<Self> {
        for (node, &s) in levels.iter().enumerate() {
            if !s.is_finite() {
                return Err(SupplyChainError::NonFiniteLevel { node, value: s });
            }
        }
        Ok(Self { levels })
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level(&self, i: usize) -> f64 {
        self.levels[i]
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    /// Checks that this policy covers every node of `graph`.
    pub fn validate_for(&self, graph: &NetworkGraph) -> Result<()> {
        if self.len() != graph.len() {
            return Err(SupplyChainError::DimensionMismatch {
                expected: graph.len(),
                got: self.len(),
            });
        }
        Ok(())
    }
}

/// Echelon lead time per node: a demand point sees its own delay, an upstream
/// node sees its slowest successor's echelon plus its own delay plus one
/// review period.
pub fn echelon_lead_times(graph: &NetworkGraph) -> Vec<f64> {
    let n = graph.len();
    let mut elt = vec![0.0; n];
    for i in graph.up_order() {
        let own = graph.node(i).processing_time as f64;
        if graph.is_demand_node(i) {
            elt[i] = own;
        } else {
            let max_succ = graph
                .successors(i)
                .iter()
                .map(|link| elt[link.node])
                .fold(0.0, f64::max);
            elt[i] = max_succ + own + 1.0;
        }
    }
    elt
}

/// Starting policy for the gradient search: newsvendor levels over each
/// node's echelon lead time, `S = ELT * mu + z * sigma * sqrt(ELT)`.
pub fn initial_base_stock(graph: &NetworkGraph, demand: &DemandModel) -> Result<BaseStockPolicy> {
    demand.validate_for(graph)?;
    let elt = echelon_lead_times(graph);
    let levels = (0..graph.len())
        .map(|i| {
            elt[i] * demand.mean(i) + demand.safety_factor(i) * demand.std(i) * elt[i].sqrt()
        })
        .collect();
    BaseStockPolicy::new(levels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::network::StockPoint;

    fn serial_chain() -> NetworkGraph {
        // 2 -> 1 -> 0, one period of processing everywhere.
        let mut nodes: Vec<StockPoint> =
            (0..3).map(|i| StockPoint::new(format!("n{i}"))).collect();
        for node in &mut nodes {
            node.processing_time = 1;
        }
        let mut g = NetworkGraph::new(nodes);
        g.link(2, 1).unwrap();
        g.link(1, 0).unwrap();
        g
    }

    #[test]
    fn echelon_lead_times_accumulate_upstream() {
        let elt = echelon_lead_times(&serial_chain());
        assert_eq!(elt, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn initial_levels_follow_newsvendor_over_echelon_horizon() {
        let graph = serial_chain();
        let demand =
            DemandModel::new(vec![100.0; 3], vec![10.0; 3], vec![1.33; 3]).unwrap();
        let policy = initial_base_stock(&graph, &demand).unwrap();
        assert!((policy.level(0) - 113.3).abs() < 1e-9);
        assert!((policy.level(1) - 323.035).abs() < 1e-2);
        assert!((policy.level(2) - 529.74).abs() < 1e-2);
    }

    #[test]
    fn non_finite_level_rejected() {
        assert!(matches!(
            BaseStockPolicy::new(vec![10.0, f64::NAN]),
            Err(SupplyChainError::NonFiniteLevel { node: 1, .. })
        ));
        assert!(matches!(
            BaseStockPolicy::new(vec![f64::INFINITY]),
            Err(SupplyChainError::NonFiniteLevel { node: 0, .. })
        ));
    }
}
