//! Typed run configuration for the clustering engine.
//!
//! Any textual option syntax is resolved here into the typed set before
//! the core ever sees it. Unrecognized keys or values are reported and
//! fall back to the documented default; they never abort a run.

/// How initial centers of mass are chosen before refinement begins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeedingStrategy {
    /// K distinct point indices drawn uniformly at random
    Random,
    /// Greedy max-separation pick over points sorted by distance to the
    /// global center
    #[default]
    Distance,
}

impl SeedingStrategy {
    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "random" => Some(Self::Random),
            "distance" => Some(Self::Distance),
            _ => None,
        }
    }
}

/// How assignment/update passes are driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefinementStrategy {
    /// Exactly `max_iterations` passes; displacement is measured only for
    /// reporting
    Iterative,
    /// Stop early once every center's displacement falls below the
    /// threshold, or after `max_iterations` passes
    #[default]
    Convergence,
}

impl RefinementStrategy {
    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "iterative" => Some(Self::Iterative),
            "convergence" | "converge" => Some(Self::Convergence),
            _ => None,
        }
    }
}

/// Scalar run parameters consumed by the engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub seeding: SeedingStrategy,
    pub refinement: RefinementStrategy,
    /// Wrap refinement in the adaptive cluster-count search
    pub adaptive: bool,
    /// Cluster count to refine at, or the starting count when adaptive
    pub initial_clusters: usize,
    pub max_iterations: usize,
    /// Maximum per-dimension center displacement for convergence
    pub max_com_var: f64,
    /// Minimum acceptable cluster population during the adaptive search
    pub min_points: usize,
    /// Separation factor against combined dispersions during the adaptive
    /// search
    pub std_dev_factor: f64,
    /// Fixed RNG seed; `None` draws from entropy
    pub seed: Option<u64>,
    pub verbose: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seeding: SeedingStrategy::default(),
            refinement: RefinementStrategy::default(),
            adaptive: false,
            initial_clusters: 1,
            max_iterations: 100,
            max_com_var: 1e-4,
            min_points: 1,
            std_dev_factor: 1.0,
            seed: None,
            verbose: false,
        }
    }
}

impl EngineConfig {
    /// Apply a free-form option string of `key=value` tokens separated by
    /// `:` or `,`, e.g. `"seeding=random:maxiter=50:adaptive=true"`.
    ///
    /// Returns a warning line for every token that was not understood;
    /// the affected setting keeps its current value.
    #[must_use]
    pub fn apply_options(&mut self, options: &str) -> Vec<String> {
        let mut warnings = Vec::new();

        for token in options.split([':', ',']) {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }

            let Some((key, value)) = token.split_once('=') else {
                warnings.push(format!("option '{token}' is not key=value, ignored"));
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "seeding" => match SeedingStrategy::parse(value) {
                    Some(s) => self.seeding = s,
                    None => warnings.push(bad_value(&key, value, "random|distance")),
                },
                "refine" => match RefinementStrategy::parse(value) {
                    Some(r) => self.refinement = r,
                    None => warnings.push(bad_value(&key, value, "iterative|convergence")),
                },
                "adaptive" => match parse_bool(value) {
                    Some(b) => self.adaptive = b,
                    None => warnings.push(bad_value(&key, value, "true|false")),
                },
                "verbose" => match parse_bool(value) {
                    Some(b) => self.verbose = b,
                    None => warnings.push(bad_value(&key, value, "true|false")),
                },
                "clusters" => match value.parse::<usize>() {
                    Ok(n) if n >= 1 => self.initial_clusters = n,
                    _ => warnings.push(bad_value(&key, value, "integer >= 1")),
                },
                "maxiter" => match value.parse::<usize>() {
                    Ok(n) if n >= 1 => self.max_iterations = n,
                    _ => warnings.push(bad_value(&key, value, "integer >= 1")),
                },
                "minpoints" => match value.parse::<usize>() {
                    Ok(n) => self.min_points = n,
                    Err(_) => warnings.push(bad_value(&key, value, "integer")),
                },
                "tolerance" => match value.parse::<f64>() {
                    Ok(x) if x > 0.0 => self.max_com_var = x,
                    _ => warnings.push(bad_value(&key, value, "positive number")),
                },
                "sepfactor" => match value.parse::<f64>() {
                    Ok(x) if x >= 0.0 => self.std_dev_factor = x,
                    _ => warnings.push(bad_value(&key, value, "non-negative number")),
                },
                "seed" => match value.parse::<u64>() {
                    Ok(s) => self.seed = Some(s),
                    Err(_) => warnings.push(bad_value(&key, value, "unsigned integer")),
                },
                _ => warnings.push(format!("unrecognized option '{key}', ignored")),
            }
        }

        warnings
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn bad_value(key: &str, value: &str, expected: &str) -> String {
    format!("invalid value '{value}' for '{key}' (expected {expected}), keeping default")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.seeding, SeedingStrategy::Distance);
        assert_eq!(config.refinement, RefinementStrategy::Convergence);
        assert!(!config.adaptive);
        assert_eq!(config.initial_clusters, 1);
        assert_eq!(config.max_iterations, 100);
    }

    #[test]
    fn test_apply_options_recognized() {
        let mut config = EngineConfig::default();
        let warnings = config.apply_options(
            "seeding=random:refine=iterative:clusters=4,maxiter=25:tolerance=0.01:seed=42",
        );

        assert!(warnings.is_empty());
        assert_eq!(config.seeding, SeedingStrategy::Random);
        assert_eq!(config.refinement, RefinementStrategy::Iterative);
        assert_eq!(config.initial_clusters, 4);
        assert_eq!(config.max_iterations, 25);
        assert!((config.max_com_var - 0.01).abs() < 1e-12);
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn test_unrecognized_key_warns_and_keeps_default() {
        let mut config = EngineConfig::default();
        let warnings = config.apply_options("frobnicate=7:clusters=3");

        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("frobnicate"));
        assert_eq!(config.initial_clusters, 3);
    }

    #[test]
    fn test_bad_value_warns_and_keeps_default() {
        let mut config = EngineConfig::default();
        let warnings = config.apply_options("seeding=fancy:maxiter=zero");

        assert_eq!(warnings.len(), 2);
        assert_eq!(config.seeding, SeedingStrategy::Distance);
        assert_eq!(config.max_iterations, 100);
    }

    #[test]
    fn test_case_insensitive_values() {
        let mut config = EngineConfig::default();
        let warnings = config.apply_options("SEEDING=Random:Adaptive=TRUE");

        assert!(warnings.is_empty());
        assert_eq!(config.seeding, SeedingStrategy::Random);
        assert!(config.adaptive);
    }
}
