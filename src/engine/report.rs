//! Report data assembled from a finished run, ready for rendering

use crate::engine::cluster::Cluster;
use serde::Serialize;

/// Per-cluster numbers in original units
#[derive(Debug, Clone, Serialize)]
pub struct ClusterSummary {
    pub id: usize,
    pub population: usize,
    pub center: Vec<f64>,
    pub dispersion: f64,
}

/// Everything a human-readable or machine-readable report needs
#[derive(Debug, Clone, Serialize)]
pub struct ClusterReport {
    pub dimensions: usize,
    pub total_points: usize,
    pub converged: bool,
    pub iterations: usize,
    pub clusters: Vec<ClusterSummary>,
    /// Pairwise Euclidean distances between cluster centers,
    /// `center_distances[i][j]` for all i, j
    pub center_distances: Vec<Vec<f64>>,
}

impl ClusterReport {
    /// Assemble a report from the final cluster set
    #[must_use]
    pub fn build(
        clusters: &[Cluster],
        dimensions: usize,
        converged: bool,
        iterations: usize,
    ) -> Self {
        let summaries: Vec<ClusterSummary> = clusters
            .iter()
            .enumerate()
            .map(|(id, c)| ClusterSummary {
                id,
                population: c.population(),
                center: c.center().position().to_vec(),
                dispersion: c.center().dispersion(),
            })
            .collect();

        let k = clusters.len();
        let mut center_distances = vec![vec![0.0; k]; k];
        for i in 0..k {
            for j in (i + 1)..k {
                let d = euclidean_distance(
                    clusters[i].center().position(),
                    clusters[j].center().position(),
                );
                center_distances[i][j] = d;
                center_distances[j][i] = d;
            }
        }

        let total_points = summaries.iter().map(|s| s.population).sum();

        Self {
            dimensions,
            total_points,
            converged,
            iterations,
            clusters: summaries,
            center_distances,
        }
    }
}

/// Euclidean distance between two points
fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}
