//! A cluster owns one center of mass, its membership list, and the
//! per-dimension weight vector that parameterizes its distance metric.

use crate::engine::point::{CenterOfMass, Point};

/// Weighted squared distance between two coordinate slices.
///
/// A larger weight on a dimension flattens its contribution, modelling a
/// dimension with intrinsically larger spread.
#[must_use]
pub fn weighted_sq_distance(a: &[f64], b: &[f64], weights: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .zip(weights)
        .map(|((x, y), w)| {
            let d = (x - y) / w;
            d * d
        })
        .sum()
}

#[derive(Debug, Clone)]
pub struct Cluster {
    center: CenterOfMass,
    members: Vec<Point>,
    weights: Vec<f64>,
}

impl Cluster {
    /// Create an empty cluster with the given metric weight vector.
    ///
    /// The weight vector length must equal the dimensionality; the factory
    /// validates this before construction.
    #[must_use]
    pub fn new(dim: usize, weights: Vec<f64>) -> Self {
        debug_assert_eq!(weights.len(), dim);
        Self {
            center: CenterOfMass::new(dim),
            members: Vec::new(),
            weights,
        }
    }

    #[must_use]
    pub fn center(&self) -> &CenterOfMass {
        &self.center
    }

    #[must_use]
    pub fn members(&self) -> &[Point] {
        &self.members
    }

    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Place the center at a seed position without attaching a point
    pub fn seed_at(&mut self, values: &[f64]) {
        self.center.set_position(values);
    }

    /// Attach `p` to the center of mass and record it in the membership
    /// list. Both effects belong together.
    pub fn add_point(&mut self, p: Point) {
        self.center.attach(&p);
        self.members.push(p);
    }

    /// Weighted squared distance from the cluster center to `p`
    #[must_use]
    pub fn distance_to(&self, p: &Point) -> f64 {
        weighted_sq_distance(self.center.position(), p.values(), &self.weights)
    }

    /// Weighted squared distance from the cluster center to a raw position
    #[must_use]
    pub fn distance_to_position(&self, position: &[f64]) -> f64 {
        weighted_sq_distance(self.center.position(), position, &self.weights)
    }

    /// Cluster population: the center-of-mass attachment count
    #[must_use]
    pub fn population(&self) -> usize {
        self.center.attached()
    }

    /// Clear the membership list
    pub fn clear_members(&mut self) {
        self.members.clear();
    }

    /// Zero the center's attachment counter so the next pass re-attaches
    /// from scratch
    pub fn reset_center(&mut self) {
        self.center.reset_count();
    }

    /// Merge two clusters into a new one.
    ///
    /// The merged center is the elementwise simple average of the two
    /// centers (not weighted by population), the weight vector is the
    /// elementwise average, and the membership is the full union of both
    /// membership lists.
    #[allow(dead_code)]
    #[must_use]
    pub fn merge(a: &Self, b: &Self) -> Self {
        let weights: Vec<f64> = a
            .weights
            .iter()
            .zip(&b.weights)
            .map(|(x, y)| (x + y) / 2.0)
            .collect();

        let mut members = Vec::with_capacity(a.members.len() + b.members.len());
        members.extend(a.members.iter().cloned());
        members.extend(b.members.iter().cloned());

        Self {
            center: CenterOfMass::merged(&a.center, &b.center),
            members,
            weights,
        }
    }

    /// Rescale all member points and the center in place
    pub fn normalize(&mut self, scale: &[f64]) {
        for p in &mut self.members {
            p.normalize(scale);
        }
        self.center.normalize(scale);
    }

    /// Rescale only the center of mass
    #[allow(dead_code)]
    pub fn normalize_center(&mut self, scale: &[f64]) {
        self.center.normalize(scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_cluster(dim: usize) -> Cluster {
        Cluster::new(dim, vec![1.0; dim])
    }

    #[test]
    fn test_add_point_updates_both_effects() {
        let mut c = unit_cluster(2);
        c.add_point(Point::new(vec![1.0, 2.0]));
        c.add_point(Point::new(vec![3.0, 4.0]));

        assert_eq!(c.population(), 2);
        assert_eq!(c.members().len(), 2);
        assert!((c.center().value(0) - 2.0).abs() < 1e-12);
        assert!((c.center().value(1) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_distance_weights_flatten_dimensions() {
        let mut c = Cluster::new(2, vec![1.0, 10.0]);
        c.seed_at(&[0.0, 0.0]);

        let p = Point::new(vec![3.0, 30.0]);
        // (3/1)^2 + (30/10)^2 = 9 + 9
        assert!((c.distance_to(&p) - 18.0).abs() < 1e-12);
    }

    #[test]
    fn test_distance_symmetric_with_identical_weights() {
        let weights = vec![2.0, 0.5];
        let a = [1.0, 4.0];
        let b = [-3.0, 2.5];

        let mut ca = Cluster::new(2, weights.clone());
        ca.seed_at(&a);
        let mut cb = Cluster::new(2, weights);
        cb.seed_at(&b);

        let ab = ca.distance_to(&Point::new(b.to_vec()));
        let ba = cb.distance_to(&Point::new(a.to_vec()));
        assert!((ab - ba).abs() < 1e-12);
    }

    #[test]
    fn test_tie_distance_is_exactly_equal() {
        let mut left = unit_cluster(1);
        left.seed_at(&[-1.0]);
        let mut right = unit_cluster(1);
        right.seed_at(&[1.0]);

        let p = Point::new(vec![0.0]);
        assert!((left.distance_to(&p) - right.distance_to(&p)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_merge_takes_full_union() {
        let mut a = Cluster::new(1, vec![1.0]);
        a.add_point(Point::new(vec![0.0]));
        a.add_point(Point::new(vec![2.0]));

        let mut b = Cluster::new(1, vec![3.0]);
        b.add_point(Point::new(vec![10.0]));

        let merged = Cluster::merge(&a, &b);
        assert_eq!(merged.members().len(), 3);
        assert_eq!(merged.population(), 3);
        assert!((merged.weights()[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_merge_center_is_simple_average() {
        let mut a = Cluster::new(2, vec![1.0, 1.0]);
        for _ in 0..9 {
            a.add_point(Point::new(vec![0.0, 0.0]));
        }
        let mut b = Cluster::new(2, vec![1.0, 1.0]);
        b.add_point(Point::new(vec![4.0, 8.0]));

        let merged = Cluster::merge(&a, &b);
        // Populations 9 and 1, but the midpoint ignores them
        assert!((merged.center().value(0) - 2.0).abs() < 1e-12);
        assert!((merged.center().value(1) - 4.0).abs() < 1e-12);
        assert_eq!(merged.population(), 10);
    }

    #[test]
    fn test_normalize_rescales_members_and_center() {
        let mut c = unit_cluster(2);
        c.add_point(Point::new(vec![2.0, 30.0]));
        c.add_point(Point::new(vec![4.0, 10.0]));

        c.normalize(&[2.0, 10.0]);
        assert!((c.center().value(0) - 1.5).abs() < 1e-12);
        assert!((c.center().value(1) - 2.0).abs() < 1e-12);
        assert!((c.members()[0].value(1) - 3.0).abs() < 1e-12);

        // Undo only the center with the reciprocal vector
        c.normalize_center(&[0.5, 0.1]);
        assert!((c.center().value(0) - 3.0).abs() < 1e-12);
        assert!((c.center().value(1) - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_clear_and_reset_allow_fresh_pass() {
        let mut c = unit_cluster(1);
        c.add_point(Point::new(vec![7.0]));
        c.clear_members();
        c.reset_center();

        assert_eq!(c.population(), 0);
        assert!(c.members().is_empty());

        c.add_point(Point::new(vec![1.0]));
        assert!((c.center().value(0) - 1.0).abs() < 1e-12);
    }
}
