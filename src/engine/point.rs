//! Data points and running center-of-mass statistics

/// A D-dimensional data point with an optional scalar weight
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    values: Vec<f64>,
    weight: f64,
}

impl Point {
    /// Create a point with the default weight of 1
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            weight: 1.0,
        }
    }

    /// Create a point with an explicit weight
    #[must_use]
    pub fn with_weight(values: Vec<f64>, weight: f64) -> Self {
        Self { values, weight }
    }

    /// Number of dimensions
    #[must_use]
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Coordinate in dimension `i`
    #[must_use]
    pub fn value(&self, i: usize) -> f64 {
        self.values[i]
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[allow(dead_code)]
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Divide each coordinate by the matching entry of `scale`.
    ///
    /// Normalizing with the reciprocal vector undoes the rescaling.
    pub fn normalize(&mut self, scale: &[f64]) {
        for (v, s) in self.values.iter_mut().zip(scale) {
            *v /= s;
        }
    }
}

/// Running mean position with per-dimension mean-of-squares and an
/// attachment count, updated incrementally in O(1) per point.
#[derive(Debug, Clone, PartialEq)]
pub struct CenterOfMass {
    position: Vec<f64>,
    mean_of_squares: Vec<f64>,
    attached: usize,
}

impl CenterOfMass {
    /// Create an empty center at the origin
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            position: vec![0.0; dim],
            mean_of_squares: vec![0.0; dim],
            attached: 0,
        }
    }

    /// Number of dimensions
    #[allow(dead_code)]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.position.len()
    }

    /// Coordinate in dimension `i`
    #[must_use]
    pub fn value(&self, i: usize) -> f64 {
        self.position[i]
    }

    #[must_use]
    pub fn position(&self) -> &[f64] {
        &self.position
    }

    /// Number of points attached since the last reset
    #[must_use]
    pub fn attached(&self) -> usize {
        self.attached
    }

    /// Place the center at a fixed position, e.g. a seed point.
    ///
    /// The mean-of-squares is set consistently so the dispersion of a
    /// freshly seeded center is zero. The attachment count is untouched.
    pub fn set_position(&mut self, values: &[f64]) {
        self.position.copy_from_slice(values);
        for (ms, v) in self.mean_of_squares.iter_mut().zip(values) {
            *ms = v * v;
        }
    }

    /// Fold one point into the running mean and mean-of-squares.
    ///
    /// Each attached point counts as exactly one observation, independent
    /// of the point's own weight field.
    #[allow(clippy::cast_precision_loss)]
    pub fn attach(&mut self, p: &Point) {
        let n = self.attached as f64;
        for i in 0..self.position.len() {
            let v = p.value(i);
            self.position[i] = (self.position[i] * n + v) / (n + 1.0);
            self.mean_of_squares[i] = (self.mean_of_squares[i] * n + v * v) / (n + 1.0);
        }
        self.attached += 1;
    }

    /// Sum over dimensions of (mean of squares minus square of the mean),
    /// an intrinsic spread estimate. Non-negative up to floating error.
    #[must_use]
    pub fn dispersion(&self) -> f64 {
        self.position
            .iter()
            .zip(&self.mean_of_squares)
            .map(|(m, ms)| ms - m * m)
            .sum()
    }

    /// Zero the attachment counter so a fresh pass can re-attach without
    /// double counting. The retained mean is overwritten by the first
    /// subsequent `attach`.
    pub fn reset_count(&mut self) {
        self.attached = 0;
    }

    /// Divide the mean by `scale` and the mean-of-squares by `scale`
    /// squared, keeping `dispersion` valid in the rescaled space.
    pub fn normalize(&mut self, scale: &[f64]) {
        for i in 0..self.position.len() {
            self.position[i] /= scale[i];
            self.mean_of_squares[i] /= scale[i] * scale[i];
        }
    }

    /// Elementwise simple average of two centers, not weighted by their
    /// populations. The attachment counts are summed.
    #[allow(dead_code)]
    #[must_use]
    pub fn merged(a: &Self, b: &Self) -> Self {
        let avg = |x: &[f64], y: &[f64]| -> Vec<f64> {
            x.iter().zip(y).map(|(p, q)| (p + q) / 2.0).collect()
        };
        Self {
            position: avg(&a.position, &b.position),
            mean_of_squares: avg(&a.mean_of_squares, &b.mean_of_squares),
            attached: a.attached + b.attached,
        }
    }

    /// Sum over dimensions of absolute coordinate difference to `other`
    #[must_use]
    pub fn displacement_from(&self, other: &[f64]) -> f64 {
        self.position
            .iter()
            .zip(other)
            .map(|(a, b)| (a - b).abs())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_defaults() {
        let p = Point::new(vec![1.0, 2.0, 3.0]);
        assert_eq!(p.dim(), 3);
        assert!((p.weight() - 1.0).abs() < f64::EPSILON);
        assert!((p.value(1) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_normalize_round_trip() {
        let original = vec![4.0, -6.0, 0.5];
        let scale = vec![2.0, 3.0, 0.25];
        let reciprocal: Vec<f64> = scale.iter().map(|s| 1.0 / s).collect();

        let mut p = Point::new(original.clone());
        p.normalize(&scale);
        p.normalize(&reciprocal);

        for (a, b) in p.values().iter().zip(&original) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_attach_updates_mean() {
        let mut com = CenterOfMass::new(2);
        com.attach(&Point::new(vec![1.0, 3.0]));
        com.attach(&Point::new(vec![3.0, 5.0]));

        assert_eq!(com.attached(), 2);
        assert!((com.value(0) - 2.0).abs() < 1e-12);
        assert!((com.value(1) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_attach_ignores_point_weight() {
        let mut weighted = CenterOfMass::new(1);
        weighted.attach(&Point::with_weight(vec![0.0], 10.0));
        weighted.attach(&Point::with_weight(vec![4.0], 0.1));

        // Each point is one observation regardless of its weight field
        assert!((weighted.value(0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_dispersion_non_negative() {
        let mut com = CenterOfMass::new(2);
        com.attach(&Point::new(vec![1.0, -1.0]));
        com.attach(&Point::new(vec![2.0, 1.0]));
        com.attach(&Point::new(vec![3.0, 0.0]));

        assert!(com.dispersion() >= -1e-12);
        // var(x) = 2/3, var(y) = 2/3
        assert!((com.dispersion() - 4.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_dispersion_of_seeded_center_is_zero() {
        let mut com = CenterOfMass::new(3);
        com.set_position(&[2.0, -7.0, 0.1]);
        assert!(com.dispersion().abs() < 1e-12);
    }

    #[test]
    fn test_reset_count_restarts_mean() {
        let mut com = CenterOfMass::new(1);
        com.attach(&Point::new(vec![100.0]));
        com.reset_count();
        com.attach(&Point::new(vec![5.0]));

        assert_eq!(com.attached(), 1);
        assert!((com.value(0) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_com_normalize_keeps_dispersion_valid() {
        let mut com = CenterOfMass::new(2);
        com.attach(&Point::new(vec![2.0, 10.0]));
        com.attach(&Point::new(vec![4.0, 30.0]));

        let before = com.dispersion();
        com.normalize(&[2.0, 10.0]);
        // var scales by 1/scale^2 per dimension: 1/4 + 1/1 of the parts
        let expected = (before - 100.0) / 4.0 + 100.0 / 100.0;
        assert!((com.dispersion() - expected).abs() < 1e-9);
    }
}
