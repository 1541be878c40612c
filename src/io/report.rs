// src/io/report.rs

use serde::Serialize;
use std::error::Error;
use std::path::Path;

use crate::allocation::tabu::TabuSolution;
use crate::model::network::NetworkGraph;

/// One row of an allocation result, flattened for CSV export.
#[derive(Debug, Serialize)]
pub struct AllocationRecord {
    pub node: usize,
    pub name: String,
    pub stocked: bool,
    pub net_replenishment: f64,
    pub safety_stock_cost: f64,
}

/// One row of an optimizer cost trace.
#[derive(Debug, Serialize)]
pub struct CostTraceRecord {
    pub iteration: usize,
    pub average_cost: f64,
}

/// Writes the per-node allocation result to a CSV file.
///
/// # Arguments
/// * `file_path` - The path to save the file (e.g., "results/allocation.csv").
/// * `graph` - The network the solution was computed on.
/// * `solution` - The allocation returned by the heuristic solver.
/// * `unit_costs` - Per-node safety stock cost `h * z * sigma` (the sqrt(NRT)
///   factor is applied here).
pub fn write_allocation(
    file_path: &str,
    graph: &NetworkGraph,
    solution: &TabuSolution,
    unit_costs: &[f64],
) -> Result<(), Box<dyn Error>> {
    let path = Path::new(file_path);
    let mut wtr = csv::Writer::from_path(path)?;

    for i in 0..graph.len() {
        wtr.serialize(AllocationRecord {
            node: i,
            name: graph.node(i).name.clone(),
            stocked: solution.stocked[i],
            net_replenishment: solution.net_replenishment[i],
            safety_stock_cost: unit_costs[i] * solution.net_replenishment[i].sqrt(),
        })?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes an optimizer cost trace to a CSV file, one row per iteration.
pub fn write_cost_trace(file_path: &str, trace: &[f64]) -> Result<(), Box<dyn Error>> {
    let path = Path::new(file_path);
    let mut wtr = csv::Writer::from_path(path)?;

    for (iteration, &average_cost) in trace.iter().enumerate() {
        wtr.serialize(CostTraceRecord { iteration, average_cost })?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::tabu::{solve_safety_stock_heuristic, TabuParams};
    use crate::model::demand::DemandModel;
    use crate::model::network::StockPoint;
    use std::fs;

    #[test]
    fn allocation_csv_has_one_row_per_node_plus_header() {
        let mut nodes: Vec<StockPoint> =
            (0..2).map(|i| StockPoint::new(format!("n{i}"))).collect();
        for node in &mut nodes {
            node.processing_time = 1;
            node.holding_cost = 1.0;
        }
        let mut g = NetworkGraph::new(nodes);
        g.link(0, 1).unwrap();
        let demand = DemandModel::new(vec![100.0; 2], vec![10.0; 2], vec![1.65; 2]).unwrap();
        let solution =
            solve_safety_stock_heuristic(&g, &demand, &TabuParams::default()).unwrap();

        let dir = std::env::temp_dir().join("ssa_report_test");
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("allocation.csv");
        let unit_costs: Vec<f64> =
            (0..2).map(|i| demand.safety_factor(i) * demand.std(i)).collect();
        write_allocation(file.to_str().unwrap(), &g, &solution, &unit_costs).unwrap();

        let contents = fs::read_to_string(&file).unwrap();
        assert_eq!(contents.lines().count(), 3);
        assert!(contents.starts_with("node,name,stocked,net_replenishment,safety_stock_cost"));
        fs::remove_file(&file).unwrap();
    }

    #[test]
    fn cost_trace_round_trips_through_csv() {
        let dir = std::env::temp_dir().join("ssa_report_test");
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("trace.csv");
        write_cost_trace(file.to_str().unwrap(), &[500.0, 450.0, 420.5]).unwrap();

        let contents = fs::read_to_string(&file).unwrap();
        assert!(contents.contains("2,420.5"));
        fs::remove_file(&file).unwrap();
    }
}
