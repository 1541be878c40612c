// src/model/demand.rs

use crate::error::{Result, SupplyChainError};
use crate::model::network::NetworkGraph;
use crate::policy::optimization::{critical_ratio, inverse_normal_cdf};
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

/// Floor applied to a zero standard deviation wherever a formula would
/// otherwise divide by it.
pub const SIGMA_FLOOR: f64 = 1e-6;

/// Per-node demand statistics and safety factors.
///
/// Demand at each node is modelled as i.i.d. normal per period, clipped at
/// zero when sampled. The safety factor z is either supplied directly or
/// derived from a target service level via the inverse normal CDF.
#[derive(Debug, Clone)]
pub struct DemandModel {
    mean: Vec<f64>,
    std: Vec<f64>,
    safety_factor: Vec<f64>,
}

impl DemandModel {
    /// Builds a model from explicit means, standard deviations, and safety
    /// factors. All three vectors must have the same length and standard
    /// deviations must be non-negative.
    pub fn new(mean: Vec<f64>, std: Vec<f64>, safety_factor: Vec<f64>) -> Result<Self> {
        if std.len() != mean.len() || safety_factor.len() != mean.len() {
            return Err(SupplyChainError::DimensionMismatch {
                expected: mean.len(),
                got: std.len().max(safety_factor.len()),
            });
        }
        for (i, &s) in std.iter().enumerate() {
            if s < 0.0 {
                return Err(SupplyChainError::NegativeParameter {
                    node: i,
                    parameter: "demand_std",
                    value: s,
                });
            }
        }
        Ok(Self { mean, std, safety_factor })
    }

    /// Derives every node's safety factor from one target service level,
    /// z = Phi^-1(service_level).
    pub fn from_service_level(mean: Vec<f64>, std: Vec<f64>, service_level: f64) -> Result<Self> {
        let z = inverse_normal_cdf(service_level);
        let n = mean.len();
        Self::new(mean, std, vec![z; n])
    }

    /// Derives every node's safety factor from the critical ratio
    /// omega = b / (b + h), z = Phi^-1(omega).
    pub fn from_costs(mean: Vec<f64>, std: Vec<f64>, backorder_cost: f64, holding_cost: f64) -> Result<Self> {
        let z = inverse_normal_cdf(critical_ratio(backorder_cost, holding_cost));
        let n = mean.len();
        Self::new(mean, std, vec![z; n])
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    pub fn mean(&self, i: usize) -> f64 {
        self.mean[i]
    }

    pub fn std(&self, i: usize) -> f64 {
        self.std[i]
    }

    pub fn safety_factor(&self, i: usize) -> f64 {
        self.safety_factor[i]
    }

    /// Standard deviation floored away from zero, for formulas that divide
    /// by sigma.
    pub fn std_floored(&self, i: usize) -> f64 {
        self.std[i].max(SIGMA_FLOOR)
    }

    /// Checks that this model covers every node of `graph`.
    pub fn validate_for(&self, graph: &NetworkGraph) -> Result<()> {
        if self.len() != graph.len() {
            return Err(SupplyChainError::DimensionMismatch {
                expected: graph.len(),
                got: self.len(),
            });
        }
        Ok(())
    }

    /// Samples `n_samples x n_periods` demand paths for one node.
    ///
    /// Negative draws are clipped to zero at generation time; they are not an
    /// error. The generator is passed in by the caller so repeated calls with
    /// the same seed are bit-reproducible.
    pub fn sample_paths(
        &self,
        node: usize,
        n_samples: usize,
        n_periods: usize,
        rng: &mut StdRng,
    ) -> Vec<Vec<f64>> {
        sample_normal_paths(self.mean[node], self.std[node], n_samples, n_periods, rng)
    }

    /// Samples demand paths for every node of `graph`; non-demand nodes get
    /// empty paths since only final demand points see external demand.
    pub fn sample_network_paths(
        &self,
        graph: &NetworkGraph,
        n_samples: usize,
        n_periods: usize,
        rng: &mut StdRng,
    ) -> Vec<Vec<Vec<f64>>> {
        (0..graph.len())
            .map(|i| {
                if graph.is_demand_node(i) {
                    self.sample_paths(i, n_samples, n_periods, rng)
                } else {
                    Vec::new()
                }
            })
            .collect()
    }
}

/// Draws normal demand paths clipped at zero.
pub fn sample_normal_paths(
    mean: f64,
    std: f64,
    n_samples: usize,
    n_periods: usize,
    rng: &mut StdRng,
) -> Vec<Vec<f64>> {
    // Normal::new only fails for a negative or non-finite std, which
    // DemandModel::new has already ruled out.
    let normal = Normal::new(mean, std).expect("validated demand parameters");
    (0..n_samples)
        .map(|_| {
            (0..n_periods)
                .map(|_| {
                    let draw: f64 = normal.sample(rng);
                    draw.max(0.0)
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn negative_std_rejected() {
        let err = DemandModel::new(vec![100.0], vec![-1.0], vec![1.65]);
        assert!(matches!(
            err,
            Err(SupplyChainError::NegativeParameter { parameter: "demand_std", .. })
        ));
    }

    #[test]
    fn mismatched_lengths_rejected() {
        let err = DemandModel::new(vec![100.0, 50.0], vec![10.0], vec![1.65, 1.65]);
        assert!(matches!(err, Err(SupplyChainError::DimensionMismatch { .. })));
    }

    #[test]
    fn sampling_is_seed_reproducible_and_non_negative() {
        let model = DemandModel::new(vec![10.0], vec![20.0], vec![1.65]).unwrap();
        let mut rng_a = StdRng::seed_from_u64(7);
        let mut rng_b = StdRng::seed_from_u64(7);
        let a = model.sample_paths(0, 4, 50, &mut rng_a);
        let b = model.sample_paths(0, 4, 50, &mut rng_b);
        assert_eq!(a, b);
        assert!(a.iter().flatten().all(|&d| d >= 0.0));
        // With sigma twice the mean, some draws must have been clipped.
        assert!(a.iter().flatten().any(|&d| d == 0.0));
    }

    #[test]
    fn service_level_sets_safety_factor() {
        let model = DemandModel::from_service_level(vec![100.0], vec![10.0], 0.95).unwrap();
        assert!((model.safety_factor(0) - 1.6449).abs() < 1e-3);
    }

    #[test]
    fn zero_sigma_is_floored_for_divisions() {
        let model = DemandModel::new(vec![100.0], vec![0.0], vec![1.65]).unwrap();
        assert_eq!(model.std(0), 0.0);
        assert!(model.std_floored(0) > 0.0);
    }
}
