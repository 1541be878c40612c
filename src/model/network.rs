// src/model/network.rs

use crate::error::{Result, SupplyChainError};
use serde::Serialize;

/// A single stocking point in the supply chain network.
#[derive(Debug, Clone, Serialize)]
pub struct StockPoint {
    pub name: String,

    /// Intrinsic replenishment delay in periods (production/transport time).
    pub processing_time: usize,
    /// Feasible window for the guaranteed service time promised downstream.
    pub lead_time_lower: usize,
    pub lead_time_upper: usize,

    /// Cost per unit held per period.
    pub holding_cost: f64,
    /// Cost per unit short per period (used by the simulators).
    pub backorder_cost: f64,
    /// Production/throughput bound per period (simulation only).
    pub capacity: f64,
}

impl StockPoint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            processing_time: 0,
            lead_time_lower: 0,
            lead_time_upper: 0,
            holding_cost: 0.0,
            backorder_cost: 0.0,
            capacity: f64::INFINITY,
        }
    }
}

/// A directed precedence edge with its material-flow parameters.
///
/// `bom` is the units of the upstream item consumed per unit produced
/// downstream; `alloc` is the fraction of upstream on-hand inventory the
/// downstream node may draw. Both default to 1.
#[derive(Debug, Clone, Copy)]
pub struct Link {
    pub node: usize,
    pub bom: f64,
    pub alloc: f64,
}

/// Immutable directed-acyclic network of stocking points, keyed by dense
/// integer indices.
///
/// Material flows along edge direction (upstream -> downstream); a guaranteed
/// service time is promised along each edge. The graph is built once from
/// configuration, validated, and read-only afterwards.
#[derive(Debug, Clone)]
pub struct NetworkGraph {
    nodes: Vec<StockPoint>,
    /// Outgoing links per node (downstream side).
    succs: Vec<Vec<Link>>,
    /// Incoming links per node; `Link::node` is the predecessor and the
    /// bom/alloc values mirror the corresponding outgoing link.
    preds: Vec<Vec<Link>>,
    edge_count: usize,
}

impl NetworkGraph {
    pub fn new(nodes: Vec<StockPoint>) -> Self {
        let n = nodes.len();
        Self {
            nodes,
            succs: vec![Vec::new(); n],
            preds: vec![Vec::new(); n],
            edge_count: 0,
        }
    }

    /// Adds an edge `from -> to` with unit BOM coefficient and allocation.
    pub fn link(&mut self, from: usize, to: usize) -> Result<()> {
        self.link_with(from, to, 1.0, 1.0)
    }

    /// Adds an edge `from -> to` with explicit BOM coefficient and
    /// allocation ratio.
    pub fn link_with(&mut self, from: usize, to: usize, bom: f64, alloc: f64) -> Result<()> {
        if from >= self.nodes.len() || to >= self.nodes.len() {
            return Err(SupplyChainError::UnknownNode { from, to });
        }
        self.succs[from].push(Link { node: to, bom, alloc });
        self.preds[to].push(Link { node: from, bom, alloc });
        self.edge_count += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, i: usize) -> &StockPoint {
        &self.nodes[i]
    }

    pub fn nodes(&self) -> &[StockPoint] {
        &self.nodes
    }

    pub fn successors(&self, i: usize) -> &[Link] {
        &self.succs[i]
    }

    pub fn predecessors(&self, i: usize) -> &[Link] {
        &self.preds[i]
    }

    /// True for final demand points (no downstream successors).
    pub fn is_demand_node(&self, i: usize) -> bool {
        self.succs[i].is_empty()
    }

    /// Validates the graph shape and node parameters.
    ///
    /// Checks, in order: acyclicity, lead-time windows, and non-negativity of
    /// processing time, holding cost, backorder cost, and capacity. Solvers
    /// call this before touching any table, so invalid input never reaches an
    /// inner loop.
    pub fn validate(&self) -> Result<()> {
        // Kahn's algorithm must consume every node, otherwise a cycle exists.
        if self.down_order().len() != self.len() {
            return Err(SupplyChainError::CyclicNetwork);
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if node.lead_time_lower > node.lead_time_upper {
                return Err(SupplyChainError::LeadTimeWindow {
                    node: i,
                    lower: node.lead_time_lower,
                    upper: node.lead_time_upper,
                });
            }
            if node.holding_cost < 0.0 {
                return Err(SupplyChainError::NegativeParameter {
                    node: i,
                    parameter: "holding_cost",
                    value: node.holding_cost,
                });
            }
            if node.backorder_cost < 0.0 {
                return Err(SupplyChainError::NegativeParameter {
                    node: i,
                    parameter: "backorder_cost",
                    value: node.backorder_cost,
                });
            }
            if node.capacity < 0.0 {
                return Err(SupplyChainError::NegativeParameter {
                    node: i,
                    parameter: "capacity",
                    value: node.capacity,
                });
            }
        }
        Ok(())
    }

    /// Topological order, sources first (Kahn's algorithm).
    ///
    /// Ties are broken by ascending node id so every traversal is
    /// deterministic. Returns fewer than `len()` nodes if a cycle exists.
    pub fn down_order(&self) -> Vec<usize> {
        let n = self.len();
        let mut indegree: Vec<usize> = (0..n).map(|i| self.preds[i].len()).collect();
        let mut ready: Vec<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);

        while let Some(&next) = ready.iter().min() {
            ready.retain(|&x| x != next);
            order.push(next);
            for link in &self.succs[next] {
                indegree[link.node] -= 1;
                if indegree[link.node] == 0 {
                    ready.push(link.node);
                }
            }
        }
        order
    }

    /// Reverse topological order: demand points first, sources last.
    pub fn up_order(&self) -> Vec<usize> {
        let mut order = self.down_order();
        order.reverse();
        order
    }

    /// True when the undirected skeleton is a tree: connected with exactly
    /// `n - 1` edges (so there is exactly one path between any two nodes).
    pub fn is_tree_skeleton(&self) -> bool {
        let n = self.len();
        if n == 0 || self.edge_count != n - 1 {
            return false;
        }
        // Undirected reachability from node 0.
        let mut seen = vec![false; n];
        let mut stack = vec![0usize];
        seen[0] = true;
        while let Some(v) = stack.pop() {
            for link in self.succs[v].iter().chain(self.preds[v].iter()) {
                if !seen[link.node] {
                    seen[link.node] = true;
                    stack.push(link.node);
                }
            }
        }
        seen.into_iter().all(|s| s)
    }

    /// Processing order for the exact tree solver.
    ///
    /// Peels leaves of the undirected skeleton one at a time (smallest id
    /// first), so each node is emitted while at most one of its neighbors is
    /// still unprocessed. Fails if the skeleton is not a tree.
    pub fn dp_order(&self) -> Result<Vec<usize>> {
        if !self.is_tree_skeleton() {
            return Err(SupplyChainError::NotATree);
        }
        let n = self.len();
        let mut degree: Vec<usize> = (0..n)
            .map(|i| self.succs[i].len() + self.preds[i].len())
            .collect();
        let mut removed = vec![false; n];
        let mut order = Vec::with_capacity(n);

        for _ in 0..n {
            let next = (0..n)
                .find(|&i| !removed[i] && degree[i] <= 1)
                .expect("tree always has a leaf");
            removed[next] = true;
            order.push(next);
            for link in self.succs[next].iter().chain(self.preds[next].iter()) {
                if !removed[link.node] {
                    degree[link.node] -= 1;
                }
            }
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> NetworkGraph {
        // 0 -> {1, 2} -> 3
        let mut g = NetworkGraph::new((0..4).map(|i| StockPoint::new(format!("n{i}"))).collect());
        g.link(0, 1).unwrap();
        g.link(0, 2).unwrap();
        g.link(1, 3).unwrap();
        g.link(2, 3).unwrap();
        g
    }

    #[test]
    fn down_order_is_topological_and_deterministic() {
        let g = diamond();
        assert_eq!(g.down_order(), vec![0, 1, 2, 3]);
        assert_eq!(g.up_order(), vec![3, 2, 1, 0]);
    }

    #[test]
    fn diamond_is_not_a_tree() {
        let g = diamond();
        assert!(!g.is_tree_skeleton());
        assert!(matches!(g.dp_order(), Err(SupplyChainError::NotATree)));
    }

    #[test]
    fn star_is_a_tree_and_peels_leaves_first() {
        let mut g = NetworkGraph::new((0..3).map(|i| StockPoint::new(format!("n{i}"))).collect());
        g.link(0, 1).unwrap();
        g.link(0, 2).unwrap();
        assert!(g.is_tree_skeleton());
        // Node 0 starts with degree 2, so leaf 1 goes first; peeling it drops
        // node 0 to one live neighbor, and the smallest-id scan emits it
        // before leaf 2. Every node still sees at most one unprocessed
        // neighbor when emitted.
        assert_eq!(g.dp_order().unwrap(), vec![1, 0, 2]);
    }

    #[test]
    fn cycle_detected_by_validate() {
        let mut g = NetworkGraph::new((0..2).map(|i| StockPoint::new(format!("n{i}"))).collect());
        g.link(0, 1).unwrap();
        g.link(1, 0).unwrap();
        assert!(matches!(g.validate(), Err(SupplyChainError::CyclicNetwork)));
    }

    #[test]
    fn inverted_lead_time_window_rejected() {
        let mut node = StockPoint::new("bad");
        node.lead_time_lower = 3;
        node.lead_time_upper = 1;
        let g = NetworkGraph::new(vec![node]);
        assert!(matches!(
            g.validate(),
            Err(SupplyChainError::LeadTimeWindow { node: 0, .. })
        ));
    }

    #[test]
    fn negative_holding_cost_rejected() {
        let mut node = StockPoint::new("bad");
        node.holding_cost = -1.0;
        let g = NetworkGraph::new(vec![node]);
        assert!(matches!(
            g.validate(),
            Err(SupplyChainError::NegativeParameter { parameter: "holding_cost", .. })
        ));
    }
}
