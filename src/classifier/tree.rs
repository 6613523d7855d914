//! CART decision tree with Gini impurity over sparse features.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::dataset::Label;
use crate::feature::FeatureVector;

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeConfig {
    /// Maximum depth; `None` grows until leaves are pure.
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node.
    pub min_samples_split: usize,
    /// Minimum samples on each side of a split.
    pub min_samples_leaf: usize,
    /// Non-constant candidate features examined per split.
    pub max_features: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        proba: [f64; 2],
    },
    Split {
        feature: u32,
        threshold: f64,
        left: u32,
        right: u32,
    },
}

/// A fitted decision tree. Nodes live in a flat arena; the root is node 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

fn gini(counts: [usize; 2]) -> f64 {
    let total = (counts[0] + counts[1]) as f64;
    if total == 0.0 {
        return 0.0;
    }
    let p0 = counts[0] as f64 / total;
    let p1 = counts[1] as f64 / total;
    1.0 - p0 * p0 - p1 * p1
}

fn class_counts(labels: &[Label], samples: &[usize]) -> [usize; 2] {
    let mut counts = [0, 0];
    for &i in samples {
        counts[labels[i].index()] += 1;
    }
    counts
}

fn leaf(counts: [usize; 2]) -> Node {
    let total = (counts[0] + counts[1]) as f64;
    Node::Leaf {
        proba: [counts[0] as f64 / total, counts[1] as f64 / total],
    }
}

impl DecisionTree {
    /// Grow a tree on `samples`, a list of row indices that may repeat.
    ///
    /// `rng` drives the candidate feature order at every split.
    pub fn fit(
        features: &[FeatureVector],
        labels: &[Label],
        samples: Vec<usize>,
        config: &TreeConfig,
        rng: &mut StdRng,
    ) -> Self {
        let mut nodes = vec![leaf(class_counts(labels, &samples))];
        let mut pending = vec![(0usize, samples, 0usize)];

        while let Some((node_id, samples, depth)) = pending.pop() {
            let counts = class_counts(labels, &samples);
            nodes[node_id] = leaf(counts);

            let pure = counts[0] == 0 || counts[1] == 0;
            let depth_reached = config.max_depth.is_some_and(|max| depth >= max);
            if pure || depth_reached || samples.len() < config.min_samples_split {
                continue;
            }

            let Some(split) = Self::best_split(features, labels, &samples, counts, config, rng) else {
                continue;
            };

            let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
                .iter()
                .partition(|&&i| features[i].get(split.feature) <= split.threshold);

            let left = nodes.len();
            nodes.push(leaf(class_counts(labels, &left_samples)));
            let right = nodes.len();
            nodes.push(leaf(class_counts(labels, &right_samples)));

            nodes[node_id] = Node::Split {
                feature: split.feature as u32,
                threshold: split.threshold,
                left: left as u32,
                right: right as u32,
            };

            pending.push((right, right_samples, depth + 1));
            pending.push((left, left_samples, depth + 1));
        }

        DecisionTree { nodes }
    }

    /// Search a random subset of non-constant features for the split with
    /// the lowest weighted child impurity.
    fn best_split(
        features: &[FeatureVector],
        labels: &[Label],
        samples: &[usize],
        counts: [usize; 2],
        config: &TreeConfig,
        rng: &mut StdRng,
    ) -> Option<SplitCandidate> {
        // Features that are zero for every sample are constant here.
        let mut candidates: Vec<usize> = samples
            .iter()
            .flat_map(|&i| features[i].indices().iter().map(|&j| j as usize))
            .collect();
        candidates.sort_unstable();
        candidates.dedup();
        candidates.shuffle(rng);

        let parent_impurity = gini(counts);
        let mut best: Option<SplitCandidate> = None;
        let mut visited = 0;

        for feature in candidates {
            if visited >= config.max_features {
                break;
            }
            let Some(result) = Self::scan_feature(features, labels, samples, counts, feature, config) else {
                continue;
            };
            visited += 1;

            if let Some(candidate) = result {
                if candidate.impurity < parent_impurity
                    && best.is_none_or(|b| candidate.impurity < b.impurity)
                {
                    best = Some(candidate);
                }
            }
        }

        best
    }

    /// Evaluate every threshold of one feature.
    ///
    /// Returns `None` when the feature is constant over `samples`, and
    /// `Some(None)` when no threshold satisfies `min_samples_leaf`.
    fn scan_feature(
        features: &[FeatureVector],
        labels: &[Label],
        samples: &[usize],
        counts: [usize; 2],
        feature: usize,
        config: &TreeConfig,
    ) -> Option<Option<SplitCandidate>> {
        let mut values: Vec<(f64, [usize; 2])> = Vec::new();
        let mut zero_counts = counts;
        for &i in samples {
            let value = features[i].get(feature);
            if value != 0.0 {
                let class = labels[i].index();
                zero_counts[class] -= 1;
                let mut one_hot = [0, 0];
                one_hot[class] = 1;
                values.push((value, one_hot));
            }
        }
        if zero_counts[0] + zero_counts[1] > 0 {
            values.push((0.0, zero_counts));
        }
        values.sort_by(|a, b| a.0.total_cmp(&b.0));

        if values.first()?.0 == values.last()?.0 {
            return None;
        }

        let total = samples.len();
        let mut left = [0usize; 2];
        let mut best: Option<SplitCandidate> = None;

        for pair in values.windows(2) {
            let (value, step) = pair[0];
            left[0] += step[0];
            left[1] += step[1];
            let next = pair[1].0;
            if value == next {
                continue;
            }

            let n_left = left[0] + left[1];
            let n_right = total - n_left;
            if n_left < config.min_samples_leaf || n_right < config.min_samples_leaf {
                continue;
            }

            let right = [counts[0] - left[0], counts[1] - left[1]];
            let impurity =
                (n_left as f64 * gini(left) + n_right as f64 * gini(right)) / total as f64;
            if best.is_none_or(|b| impurity < b.impurity) {
                let mut threshold = value + (next - value) / 2.0;
                // Midpoint of adjacent floats can round up to `next`.
                if threshold >= next {
                    threshold = value;
                }
                best = Some(SplitCandidate {
                    feature,
                    threshold,
                    impurity,
                });
            }
        }

        Some(best)
    }

    /// Class probabilities `[p_real, p_fake]` at the leaf reached by `features`.
    pub fn predict_proba(&self, features: &FeatureVector) -> [f64; 2] {
        let mut node = &self.nodes[0];
        loop {
            match node {
                Node::Leaf { proba } => return *proba,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let next = if features.get(*feature as usize) <= *threshold {
                        *left
                    } else {
                        *right
                    };
                    node = &self.nodes[next as usize];
                }
            }
        }
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Length of the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if let Node::Split { left, right, .. } = self.nodes[id] {
                stack.push((left as usize, depth + 1));
                stack.push((right as usize, depth + 1));
            }
        }
        deepest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn config(max_features: usize) -> TreeConfig {
        TreeConfig {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features,
        }
    }

    #[test]
    fn test_gini() {
        assert_eq!(gini([4, 0]), 0.0);
        assert!((gini([2, 2]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_single_feature_split() {
        let features = vec![
            FeatureVector::from_dense(&[0.0, 0.3]),
            FeatureVector::from_dense(&[0.0, 0.4]),
            FeatureVector::from_dense(&[0.9, 0.3]),
            FeatureVector::from_dense(&[0.8, 0.4]),
        ];
        let labels = vec![Label::Real, Label::Real, Label::Fake, Label::Fake];
        let mut rng = StdRng::seed_from_u64(0);
        let tree = DecisionTree::fit(&features, &labels, (0..4).collect(), &config(2), &mut rng);

        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict_proba(&FeatureVector::from_dense(&[0.85, 0.0])), [0.0, 1.0]);
        assert_eq!(tree.predict_proba(&FeatureVector::zeros(2)), [1.0, 0.0]);
    }

    #[test]
    fn test_pure_node_is_leaf() {
        let features = vec![FeatureVector::from_dense(&[1.0]), FeatureVector::from_dense(&[2.0])];
        let labels = vec![Label::Fake, Label::Fake];
        let mut rng = StdRng::seed_from_u64(0);
        let tree = DecisionTree::fit(&features, &labels, vec![0, 1], &config(1), &mut rng);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict_proba(&FeatureVector::zeros(1)), [0.0, 1.0]);
    }

    #[test]
    fn test_constant_features_make_leaf_with_fractions() {
        let features = vec![FeatureVector::from_dense(&[0.5]); 4];
        let labels = vec![Label::Real, Label::Fake, Label::Fake, Label::Fake];
        let mut rng = StdRng::seed_from_u64(0);
        let tree = DecisionTree::fit(&features, &labels, (0..4).collect(), &config(1), &mut rng);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict_proba(&features[0]), [0.25, 0.75]);
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let features: Vec<FeatureVector> = (0..6)
            .map(|i| FeatureVector::from_dense(&[i as f64 + 1.0]))
            .collect();
        let labels = vec![Label::Fake, Label::Real, Label::Real, Label::Real, Label::Real, Label::Real];
        let mut rng = StdRng::seed_from_u64(0);
        let tree_config = TreeConfig {
            min_samples_leaf: 2,
            ..config(1)
        };
        let tree = DecisionTree::fit(&features, &labels, (0..6).collect(), &tree_config, &mut rng);

        // Isolating sample 0 would leave a leaf of one.
        let p = tree.predict_proba(&features[0]);
        assert!(p[1] < 1.0);
    }
}
