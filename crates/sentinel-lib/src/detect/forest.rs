//! Isolation forest over a one-dimensional latency window
//!
//! Anomaly detection via random-partitioning trees: values that are easy to
//! isolate with random splits end up with short average path lengths and
//! score close to 1.0, while values buried in the bulk of the distribution
//! score near 0.5 or below. The model has no incremental form; it is
//! rebuilt from the full window on every retrain.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

/// Euler-Mascheroni constant, used in the average path length normalizer
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Per-tree subsample cap; small windows use the whole window
const MAX_TREE_SAMPLE: usize = 256;

#[derive(Debug, Error)]
pub enum FitError {
    #[error("cannot fit an isolation forest on an empty window")]
    EmptyWindow,
}

/// Fitted isolation forest
///
/// Fitting is deterministic for a given input slice and seed; the detector
/// re-seeds every fit so classification depends only on window contents and
/// configuration.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
    avg_path_length: f64,
}

impl IsolationForest {
    /// Fit a forest of `num_trees` trees on the given latency values
    pub fn fit(values: &[f64], num_trees: usize, seed: u64) -> Result<Self, FitError> {
        if values.is_empty() {
            return Err(FitError::EmptyWindow);
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let sample_size = values.len().min(MAX_TREE_SAMPLE);
        let max_depth = (sample_size as f64).log2().ceil().max(1.0) as usize;

        let mut trees = Vec::with_capacity(num_trees);
        for _ in 0..num_trees {
            // Subsample with replacement
            let subsample: Vec<f64> = (0..sample_size)
                .map(|_| values[rng.gen_range(0..values.len())])
                .collect();
            trees.push(IsolationTree::build(&subsample, max_depth, &mut rng));
        }

        Ok(Self {
            trees,
            sample_size,
            avg_path_length: average_path_length(sample_size),
        })
    }

    /// Anomaly score in [0, 1]; higher means easier to isolate
    pub fn score(&self, value: f64) -> f64 {
        if self.trees.is_empty() || self.avg_path_length <= 0.0 {
            return 0.5;
        }

        let total: f64 = self
            .trees
            .iter()
            .map(|tree| tree.path_length(value, 0))
            .sum();
        let avg_path = total / self.trees.len() as f64;

        2.0_f64.powf(-avg_path / self.avg_path_length)
    }

    /// Scores for a whole batch, in input order
    pub fn score_batch(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| self.score(*v)).collect()
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }
}

/// Expected path length of an unsuccessful search in a BST of `n` nodes
fn average_path_length(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let n = n as f64;
    2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
}

/// A single random-partitioning tree over scalar values
#[derive(Debug, Clone)]
struct IsolationTree {
    root: Node,
}

#[derive(Debug, Clone)]
enum Node {
    Internal {
        split: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

impl IsolationTree {
    fn build(samples: &[f64], max_depth: usize, rng: &mut StdRng) -> Self {
        Self {
            root: Self::build_node(samples, 0, max_depth, rng),
        }
    }

    fn build_node(samples: &[f64], depth: usize, max_depth: usize, rng: &mut StdRng) -> Node {
        if depth >= max_depth || samples.len() <= 1 {
            return Node::Leaf {
                size: samples.len(),
            };
        }

        let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        // A zero-range partition cannot split further
        if (max - min).abs() < f64::EPSILON {
            return Node::Leaf {
                size: samples.len(),
            };
        }

        let split = rng.gen_range(min..max);
        let (left, right): (Vec<f64>, Vec<f64>) = samples.iter().copied().partition(|v| *v < split);

        Node::Internal {
            split,
            left: Box::new(Self::build_node(&left, depth + 1, max_depth, rng)),
            right: Box::new(Self::build_node(&right, depth + 1, max_depth, rng)),
        }
    }

    fn path_length(&self, value: f64, depth: usize) -> f64 {
        Self::node_path_length(&self.root, value, depth)
    }

    fn node_path_length(node: &Node, value: f64, depth: usize) -> f64 {
        match node {
            // Leaves holding several samples get the expected remaining depth
            Node::Leaf { size } => depth as f64 + average_path_length(*size),
            Node::Internal { split, left, right } => {
                let next = if value < *split { left } else { right };
                Self::node_path_length(next, value, depth + 1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_empty_window_fails() {
        let result = IsolationForest::fit(&[], 100, 42);
        assert!(matches!(result, Err(FitError::EmptyWindow)));
    }

    #[test]
    fn test_outlier_scores_highest() {
        let mut values: Vec<f64> = (0..20).map(|i| 100.0 + (i % 5) as f64).collect();
        values.push(5000.0);

        let forest = IsolationForest::fit(&values, 100, 42).unwrap();
        let scores = forest.score_batch(&values);

        let outlier_score = *scores.last().unwrap();
        let max_score = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        assert_eq!(outlier_score, max_score);
        assert!(
            outlier_score > 0.6,
            "outlier score {} should clear the floor",
            outlier_score
        );
    }

    #[test]
    fn test_identical_values_score_half() {
        let values = vec![100.0; 30];
        let forest = IsolationForest::fit(&values, 100, 42).unwrap();

        // Every tree collapses to a single leaf, so the path length equals
        // the normalizer and the score is exactly 0.5
        let score = forest.score(100.0);
        assert!((score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_fit_is_deterministic_for_seed() {
        let values: Vec<f64> = (0..50).map(|i| 100.0 + (i % 7) as f64).collect();

        let a = IsolationForest::fit(&values, 50, 7).unwrap();
        let b = IsolationForest::fit(&values, 50, 7).unwrap();

        for v in [98.0, 103.0, 250.0, 1000.0] {
            assert_eq!(a.score(v), b.score(v));
        }
    }

    #[test]
    fn test_normal_values_score_low() {
        let values: Vec<f64> = (0..50).map(|i| 100.0 + (i % 10) as f64).collect();
        let forest = IsolationForest::fit(&values, 100, 42).unwrap();

        let score = forest.score(105.0);
        assert!(score < 0.6, "in-distribution score {} too high", score);
    }

    #[test]
    fn test_average_path_length_monotonic() {
        assert_eq!(average_path_length(1), 0.0);
        let c_10 = average_path_length(10);
        let c_100 = average_path_length(100);
        assert!(c_100 > c_10);
    }
}
