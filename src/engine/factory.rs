//! The clustering engine: normalization, seeding, iterative refinement,
//! and the adaptive search over cluster count.
//!
//! The engine owns the full dataset and is constructed once per run. The
//! per-dimension normalization is computed exactly once from the dataset
//! range, applied destructively to all points and the global center, and
//! inverted on every result before it is returned.

use crate::engine::cluster::{weighted_sq_distance, Cluster};
use crate::engine::config::{EngineConfig, RefinementStrategy, SeedingStrategy};
use crate::engine::point::{CenterOfMass, Point};
use crate::engine::report::ClusterReport;
use crate::error::{KlustError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;

/// Floor for the distance-seeding separation threshold. Below it seeds
/// are taken in sorted order, which bounds the halving loop on
/// duplicate-heavy data.
const MIN_SEED_SEPARATION: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    Uninitialized,
    Normalized,
    Seeded,
    Refining,
    Converged,
    MaxIterReached,
    SearchingClusterCount,
    Done,
}

/// What the refinement loop ended with
#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    pub converged: bool,
    pub iterations: usize,
    /// Largest per-cluster center displacement of the final pass
    pub final_displacement: f64,
}

#[derive(Debug)]
pub struct ClusteringEngine {
    points: Vec<Point>,
    dim: usize,
    global_center: CenterOfMass,
    ranges: Vec<f64>,
    clusters: Vec<Cluster>,
    default_weights: Vec<f64>,
    weight_overrides: HashMap<usize, Vec<f64>>,
    config: EngineConfig,
    rng: StdRng,
    state: EngineState,
    outcome: Option<RefinementOutcome>,
}

impl ClusteringEngine {
    /// Create an engine over the dataset.
    ///
    /// # Errors
    /// Returns `DegenerateInput` for an empty dataset, zero-dimensional
    /// points, or mixed dimensionality.
    pub fn new(points: Vec<Point>, config: EngineConfig) -> Result<Self> {
        let Some(first) = points.first() else {
            return Err(KlustError::DegenerateInput("empty dataset".into()));
        };
        let dim = first.dim();
        if dim == 0 {
            return Err(KlustError::DegenerateInput(
                "points must have at least one dimension".into(),
            ));
        }
        if let Some(bad) = points.iter().find(|p| p.dim() != dim) {
            return Err(KlustError::DegenerateInput(format!(
                "mixed dimensionality: expected {dim}, found {}",
                bad.dim()
            )));
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            global_center: CenterOfMass::new(dim),
            ranges: Vec::new(),
            clusters: Vec::new(),
            default_weights: vec![1.0; dim],
            weight_overrides: HashMap::new(),
            config,
            rng,
            state: EngineState::Uninitialized,
            outcome: None,
            points,
            dim,
        })
    }

    /// Replace the engine-wide metric weight vector (defaults to all ones)
    ///
    /// # Errors
    /// Returns `Config` if the length does not match the dimensionality or
    /// any entry is not strictly positive.
    pub fn set_default_weights(&mut self, weights: Vec<f64>) -> Result<()> {
        validate_weights(&weights, self.dim)?;
        self.default_weights = weights;
        Ok(())
    }

    /// Register a metric weight override for one cluster index
    ///
    /// # Errors
    /// Returns `Config` if the length does not match the dimensionality or
    /// any entry is not strictly positive.
    pub fn set_cluster_weights(&mut self, index: usize, weights: Vec<f64>) -> Result<()> {
        validate_weights(&weights, self.dim)?;
        self.weight_overrides.insert(index, weights);
        Ok(())
    }

    #[must_use]
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    #[must_use]
    pub fn global_center(&self) -> &CenterOfMass {
        &self.global_center
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&RefinementOutcome> {
        self.outcome.as_ref()
    }

    /// Nearest final cluster for an original-unit point, with its weighted
    /// squared distance in the run's normalized metric. Ties keep the
    /// first minimum in cluster order, like the refinement itself.
    ///
    /// # Errors
    /// `Engine` before a completed run, `DegenerateInput` on a
    /// dimensionality mismatch.
    pub fn assign(&self, p: &Point) -> Result<(usize, f64)> {
        if self.state != EngineState::Done {
            return Err(KlustError::Engine(
                "assignment is only defined after a completed run".into(),
            ));
        }
        if p.dim() != self.dim {
            return Err(KlustError::DegenerateInput(format!(
                "point has {} dimensions, dataset has {}",
                p.dim(),
                self.dim
            )));
        }

        let mut best = 0;
        let mut best_distance = f64::MAX;
        for (ci, cluster) in self.clusters.iter().enumerate() {
            // weight * range reproduces the normalized-space metric in
            // original units
            let effective: Vec<f64> = cluster
                .weights()
                .iter()
                .zip(&self.ranges)
                .map(|(w, r)| w * r)
                .collect();
            let d = weighted_sq_distance(cluster.center().position(), p.values(), &effective);
            if d < best_distance {
                best_distance = d;
                best = ci;
            }
        }
        Ok((best, best_distance))
    }

    /// Assemble the run report in original units. Call after `run`.
    #[must_use]
    pub fn report(&self) -> ClusterReport {
        let (converged, iterations) = self
            .outcome
            .as_ref()
            .map_or((false, 0), |o| (o.converged, o.iterations));
        ClusterReport::build(&self.clusters, self.dim, converged, iterations)
    }

    /// Drive the full sequence: shuffle, normalize, seed, refine, and
    /// optionally search the cluster count; results come back in original
    /// units.
    ///
    /// # Errors
    /// `DegenerateInput` on fewer points than requested clusters, a
    /// zero-range dimension, or a cluster stranded without members at a
    /// fixed cluster count. `Engine` if called twice.
    pub fn run(&mut self) -> Result<()> {
        if self.state != EngineState::Uninitialized {
            return Err(KlustError::Engine(
                "engine already ran; construct a new one per run".into(),
            ));
        }

        let initial = self.config.initial_clusters.max(1);
        if self.points.len() < initial {
            return Err(KlustError::DegenerateInput(format!(
                "{} points cannot populate {initial} clusters",
                self.points.len()
            )));
        }

        // Ordering bias from the upstream source is removed up front
        self.points.shuffle(&mut self.rng);

        self.normalize_dataset()?;
        if self.config.verbose {
            eprintln!(
                "Normalized {} points over {} dimensions",
                self.points.len(),
                self.dim
            );
        }

        if self.config.adaptive {
            self.adaptive_search(initial)?;
        } else {
            self.build_clusters(initial);
            self.seed_clusters();
            let outcome = self.refine()?;
            self.outcome = Some(outcome);
        }

        // Back to original units: normalize with the reciprocal vector
        let reciprocal: Vec<f64> = self.ranges.iter().map(|r| 1.0 / r).collect();
        for cluster in &mut self.clusters {
            cluster.normalize(&reciprocal);
        }
        self.global_center.normalize(&reciprocal);
        for p in &mut self.points {
            p.normalize(&reciprocal);
        }
        self.state = EngineState::Done;

        Ok(())
    }

    /// Compute the per-dimension range once and rescale every point and
    /// the global center by it.
    fn normalize_dataset(&mut self) -> Result<()> {
        let mut global = CenterOfMass::new(self.dim);
        for p in &self.points {
            global.attach(p);
        }

        let mut ranges = vec![0.0_f64; self.dim];
        for i in 0..self.dim {
            let mut min = f64::MAX;
            let mut max = f64::MIN;
            for p in &self.points {
                min = min.min(p.value(i));
                max = max.max(p.value(i));
            }
            let range = max - min;
            if range == 0.0 {
                return Err(KlustError::DegenerateInput(format!(
                    "dimension {i} has zero range; normalization would divide by zero"
                )));
            }
            ranges[i] = range;
        }

        for p in &mut self.points {
            p.normalize(&ranges);
        }
        global.normalize(&ranges);

        self.global_center = global;
        self.ranges = ranges;
        self.state = EngineState::Normalized;
        Ok(())
    }

    /// Instantiate a fresh active cluster set of the given size. Each
    /// cluster gets the engine-wide weight vector unless an override was
    /// registered for its index.
    fn build_clusters(&mut self, count: usize) {
        self.clusters = (0..count)
            .map(|i| {
                let weights = self
                    .weight_overrides
                    .get(&i)
                    .cloned()
                    .unwrap_or_else(|| self.default_weights.clone());
                Cluster::new(self.dim, weights)
            })
            .collect();
    }

    fn seed_clusters(&mut self) {
        match self.config.seeding {
            SeedingStrategy::Random => self.seed_random(),
            SeedingStrategy::Distance => self.seed_distance(),
        }
        self.state = EngineState::Seeded;
    }

    /// K distinct point indices, uniformly at random
    fn seed_random(&mut self) {
        let picked =
            rand::seq::index::sample(&mut self.rng, self.points.len(), self.clusters.len());
        for (cluster, idx) in self.clusters.iter_mut().zip(picked.iter()) {
            cluster.seed_at(self.points[idx].values());
        }
    }

    /// Greedy max-separation seeding: sort points by descending distance
    /// to the global center, accept candidates at least the threshold
    /// apart from every accepted seed, halving the threshold and
    /// rescanning whenever the pool runs out.
    fn seed_distance(&mut self) {
        let k = self.clusters.len();
        let weights = &self.default_weights;

        let mut by_distance: Vec<(usize, f64)> = self
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                (
                    i,
                    weighted_sq_distance(p.values(), self.global_center.position(), weights),
                )
            })
            .collect();
        by_distance.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        // The farthest point from the global center sets the initial
        // minimum separation between seeds.
        let mut threshold = by_distance[0].1;

        let seeds: Vec<usize> = loop {
            let mut accepted: Vec<usize> = Vec::with_capacity(k);
            for &(idx, _) in &by_distance {
                let candidate = self.points[idx].values();
                let separated = accepted.iter().all(|&s| {
                    weighted_sq_distance(self.points[s].values(), candidate, weights) >= threshold
                });
                if separated {
                    accepted.push(idx);
                    if accepted.len() == k {
                        break;
                    }
                }
            }
            if accepted.len() == k {
                break accepted;
            }

            threshold /= 2.0;
            if threshold < MIN_SEED_SEPARATION {
                // Duplicate-heavy data can never satisfy any positive
                // separation; fall back to the sorted order.
                break by_distance.iter().take(k).map(|&(idx, _)| idx).collect();
            }
        };

        for (cluster, &idx) in self.clusters.iter_mut().zip(&seeds) {
            cluster.seed_at(self.points[idx].values());
        }
    }

    /// Run assignment/update passes until the configured stop condition.
    ///
    /// Each pass assigns every point to its nearest cluster against the
    /// centers frozen at the start of the pass (ties keep the first
    /// minimum in cluster order), then rebuilds every center from its new
    /// members. Assignment completes over all points before any center
    /// moves.
    #[allow(clippy::cast_precision_loss)]
    fn refine(&mut self) -> Result<RefinementOutcome> {
        self.state = EngineState::Refining;

        let k = self.clusters.len();
        let max_allowed = self.config.max_com_var * self.dim as f64;
        let mut iterations = 0;
        let mut converged = false;
        let mut final_displacement = f64::MAX;

        for pass in 1..=self.config.max_iterations {
            let mut assignments: Vec<Vec<usize>> = vec![Vec::new(); k];
            for (pi, p) in self.points.iter().enumerate() {
                let mut best = 0;
                let mut best_distance = self.clusters[0].distance_to(p);
                for (ci, cluster) in self.clusters.iter().enumerate().skip(1) {
                    let d = cluster.distance_to(p);
                    if d < best_distance {
                        best_distance = d;
                        best = ci;
                    }
                }
                assignments[best].push(pi);
            }

            let previous: Vec<Vec<f64>> = self
                .clusters
                .iter()
                .map(|c| c.center().position().to_vec())
                .collect();

            for (ci, cluster) in self.clusters.iter_mut().enumerate() {
                if assignments[ci].is_empty() {
                    return Err(KlustError::DegenerateInput(format!(
                        "cluster {ci} was left with zero members in pass {pass}"
                    )));
                }
                cluster.clear_members();
                cluster.reset_center();
                for &pi in &assignments[ci] {
                    cluster.add_point(self.points[pi].clone());
                }
            }

            iterations = pass;
            final_displacement = self
                .clusters
                .iter()
                .zip(&previous)
                .map(|(c, prev)| c.center().displacement_from(prev))
                .fold(0.0, f64::max);

            if self.config.verbose {
                eprintln!("  pass {pass}: max center displacement {final_displacement:.6}");
            }

            if self.config.refinement == RefinementStrategy::Convergence
                && final_displacement < max_allowed
            {
                converged = true;
                break;
            }
        }

        if self.config.refinement == RefinementStrategy::Iterative {
            // Displacement is measured for reporting only
            converged = final_displacement < max_allowed;
        } else if !converged {
            eprintln!(
                "Warning: centers still moving after {iterations} passes \
                 (displacement {final_displacement:.6}, threshold {max_allowed:.6}); \
                 keeping the last iterate"
            );
        }

        self.state = if converged {
            EngineState::Converged
        } else {
            EngineState::MaxIterReached
        };

        Ok(RefinementOutcome {
            converged,
            iterations,
            final_displacement,
        })
    }

    /// Acceptability of the current cluster set: every pair of centers is
    /// separated by at least `std_dev_factor` times their combined
    /// dispersions (in the weighted squared metric), and every cluster
    /// holds at least `min_points` members.
    fn acceptable(&self) -> bool {
        if self
            .clusters
            .iter()
            .any(|c| c.population() < self.config.min_points)
        {
            return false;
        }

        let k = self.clusters.len();
        for i in 0..k {
            for j in (i + 1)..k {
                let distance =
                    self.clusters[i].distance_to_position(self.clusters[j].center().position());
                let spread = self.clusters[i].center().dispersion()
                    + self.clusters[j].center().dispersion();
                if distance < self.config.std_dev_factor * spread {
                    return false;
                }
            }
        }
        true
    }

    /// Seed and refine a fresh cluster set of size `count`, returning its
    /// acceptability. A refinement that strands a cluster without members
    /// is unacceptable rather than fatal here; the min-population
    /// criterion already rejects it.
    fn attempt(&mut self, count: usize) -> Result<bool> {
        self.build_clusters(count);
        self.seed_clusters();
        match self.refine() {
            Ok(outcome) => {
                self.outcome = Some(outcome);
                Ok(self.acceptable())
            }
            Err(KlustError::DegenerateInput(msg)) => {
                if self.config.verbose {
                    eprintln!("  attempt with {count} clusters degenerated: {msg}");
                }
                self.outcome = None;
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Monotone unit-step search over the cluster count.
    ///
    /// While acceptable, grow by one and try again; while unacceptable,
    /// shrink by one. The first flip of the acceptability verdict ends
    /// the search, rolling back to the last acceptable configuration when
    /// the flip happened while growing. Bounded by [1, N].
    fn adaptive_search(&mut self, start: usize) -> Result<()> {
        self.state = EngineState::SearchingClusterCount;

        let n = self.points.len();
        let mut count = start.clamp(1, n);
        let mut acceptable = self.attempt(count)?;
        if self.config.verbose {
            eprintln!(
                "Adaptive search: {count} clusters {}",
                verdict(acceptable)
            );
        }

        if acceptable {
            let mut kept = (self.clusters.clone(), self.outcome.clone(), count);
            while count < n {
                count += 1;
                acceptable = self.attempt(count)?;
                if self.config.verbose {
                    eprintln!("Adaptive search: {count} clusters {}", verdict(acceptable));
                }
                if acceptable {
                    kept = (self.clusters.clone(), self.outcome.clone(), count);
                } else {
                    // Crossed the transition while growing: roll back
                    let (clusters, outcome, best) = kept;
                    self.clusters = clusters;
                    self.outcome = outcome;
                    if self.config.verbose {
                        eprintln!("Adaptive search: settled on {best} clusters");
                    }
                    return Ok(());
                }
            }
            Ok(())
        } else {
            while !acceptable && count > 1 {
                count -= 1;
                acceptable = self.attempt(count)?;
                if self.config.verbose {
                    eprintln!("Adaptive search: {count} clusters {}", verdict(acceptable));
                }
            }
            if !acceptable {
                eprintln!(
                    "Warning: no acceptable cluster count found down to 1; \
                     keeping the last attempt"
                );
            }
            Ok(())
        }
    }
}

fn verdict(acceptable: bool) -> &'static str {
    if acceptable {
        "acceptable"
    } else {
        "unacceptable"
    }
}

fn validate_weights(weights: &[f64], dim: usize) -> Result<()> {
    if weights.len() != dim {
        return Err(KlustError::Config(format!(
            "weight vector length {} does not match dimensionality {dim}",
            weights.len()
        )));
    }
    if weights.iter().any(|&w| w <= 0.0) {
        return Err(KlustError::Config(
            "weight vector entries must be strictly positive".into(),
        ));
    }
    Ok(())
}
