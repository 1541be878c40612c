// src/error.rs

use thiserror::Error;

/// Errors surfaced by the solvers and simulators.
///
/// Two families exist: structural errors (the network shape rules out the
/// requested algorithm) and configuration errors (a parameter is invalid).
/// Both are detected before any solver loop starts; nothing is retried.
#[derive(Debug, Error)]
pub enum SupplyChainError {
    /// The network contains a directed cycle.
    #[error("network contains a directed cycle")]
    CyclicNetwork,

    /// The undirected skeleton is not a tree. The exact dynamic-programming
    /// solver requires a tree; callers should fall back to the tabu solver.
    #[error("network skeleton is not a tree; use the heuristic solver")]
    NotATree,

    /// A node's guaranteed service-time window is inverted.
    #[error("node {node}: lead time window [{lower}, {upper}] is inverted")]
    LeadTimeWindow {
        node: usize,
        lower: usize,
        upper: usize,
    },

    /// A parameter that must be non-negative is negative.
    #[error("node {node}: {parameter} must be non-negative, got {value}")]
    NegativeParameter {
        node: usize,
        parameter: &'static str,
        value: f64,
    },

    /// A scalar simulation parameter that must be non-negative is negative.
    #[error("{parameter} must be non-negative, got {value}")]
    InvalidValue { parameter: &'static str, value: f64 },

    /// A base-stock level is NaN or infinite.
    #[error("node {node}: base-stock level must be finite, got {value}")]
    NonFiniteLevel { node: usize, value: f64 },

    /// Vector input whose length does not match the node count.
    #[error("expected {expected} entries, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Demand paths are empty or ragged.
    #[error("demand paths must be non-empty and rectangular")]
    EmptyDemand,

    /// An edge references a node outside the graph.
    #[error("edge {from} -> {to} references an unknown node")]
    UnknownNode { from: usize, to: usize },

    /// The DP reconstruction found no service time inside the coverage
    /// horizon for some node.
    #[error("node {node}: no feasible service time within the coverage horizon")]
    NoFeasibleServiceTime { node: usize },
}

pub type Result<T> = std::result::Result<T, SupplyChainError>;
