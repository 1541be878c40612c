//! Multi-echelon safety stock placement and base-stock optimization.
//!
//! Two families of tools share one network model:
//!
//! - **Allocation** (guaranteed-service model): where to hold safety stock
//!   and how much time each stage must cover. [`solve_safety_stock_exact`]
//!   is a dynamic program for tree-shaped networks;
//!   [`solve_safety_stock_heuristic`] is a tabu search for general DAGs.
//! - **Simulation-based optimization**: sample-path simulation of base-stock
//!   control with pathwise cost gradients, single stage or whole network,
//!   plus gradient descent on the order-up-to levels.

pub mod allocation;
pub mod error;
pub mod io;
pub mod model;
pub mod policy;
pub mod simulation;

pub use allocation::coverage::CoverageTable;
pub use allocation::dp::{solve_safety_stock_exact, ExactAllocation};
pub use allocation::tabu::{solve_safety_stock_heuristic, TabuParams, TabuSolution};
pub use error::{Result, SupplyChainError};
pub use model::demand::DemandModel;
pub use model::network::{Link, NetworkGraph, StockPoint};
pub use policy::base_stock::{echelon_lead_times, initial_base_stock, BaseStockPolicy};
pub use policy::optimization::{
    approximate_ss, critical_ratio, inverse_normal_cdf, newsvendor_base_stock,
    optimize_base_stock, optimize_base_stock_network, GradientSearchParams, SearchOutcome,
};
pub use simulation::network::{simulate_base_stock_network, NetworkOutcome};
pub use simulation::single::{
    simulate_base_stock, simulate_reorder_point, ReorderOutcome, ReorderPointParams,
    ReorderPolicy, SingleStageOutcome, SingleStageParams,
};
