//! Bootstrap-aggregated decision trees with gini splits.
//!
//! Every source of randomness (bootstrap sampling, per-node feature
//! subsets) flows from one seed, so a fitted forest is reproducible
//! bit-for-bit across runs.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
enum TreeNode {
    Leaf {
        /// Class probability mass in training-class order.
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct DecisionTree {
    root: TreeNode,
}

impl DecisionTree {
    fn distribution(&self, row: &[f64]) -> &[f64] {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { distribution } => return distribution,
                TreeNode::Split { feature, threshold, left, right } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }
}

/// Random forest over integer class labels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    n_estimators: usize,
    max_depth: usize,
    seed: u64,
    classes: Vec<u8>,
    trees: Vec<DecisionTree>,
    importances: Vec<f64>,
}

impl RandomForestClassifier {
    pub fn new(n_estimators: usize, max_depth: usize, seed: u64) -> Self {
        Self {
            n_estimators,
            max_depth,
            seed,
            classes: Vec::new(),
            trees: Vec::new(),
            importances: Vec::new(),
        }
    }

    /// Fits one tree per estimator on a bootstrap sample of the rows.
    pub fn fit(&mut self, features: &[Vec<f64>], labels: &[u8]) {
        let mut classes = labels.to_vec();
        classes.sort_unstable();
        classes.dedup();
        self.classes = classes;
        self.trees.clear();
        self.importances.clear();

        if features.is_empty() {
            return;
        }

        let targets: Vec<usize> = labels
            .iter()
            .map(|label| self.classes.binary_search(label).unwrap_or(0))
            .collect();
        let builder = TreeBuilder {
            features,
            targets: &targets,
            n_features: features[0].len(),
            n_classes: self.classes.len(),
            max_depth: self.max_depth,
            total_rows: features.len() as f64,
        };

        let mut importances = vec![0.0; builder.n_features];
        let mut rng = StdRng::seed_from_u64(self.seed);

        self.trees = (0..self.n_estimators)
            .map(|_| {
                let mut tree_rng = StdRng::seed_from_u64(rng.gen());
                let sample: Vec<usize> = (0..features.len())
                    .map(|_| tree_rng.gen_range(0..features.len()))
                    .collect();
                DecisionTree { root: builder.grow(&sample, 0, &mut tree_rng, &mut importances) }
            })
            .collect();

        // Impurity-decrease importances, normalized to sum to one. A fit
        // where no tree found an informative split reports none at all.
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for value in importances.iter_mut() {
                *value /= total;
            }
            self.importances = importances;
        }
    }

    /// Averaged class distribution across all trees, in class order.
    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let mut aggregate = vec![0.0; self.classes.len()];
        if self.trees.is_empty() {
            return aggregate;
        }

        for tree in &self.trees {
            for (slot, mass) in aggregate.iter_mut().zip(tree.distribution(row)) {
                *slot += mass;
            }
        }
        for slot in aggregate.iter_mut() {
            *slot /= self.trees.len() as f64;
        }
        aggregate
    }

    /// Most probable class and its probability. Probability ties resolve
    /// to the lower class label.
    pub fn predict_with_confidence(&self, row: &[f64]) -> (u8, f64) {
        let proba = self.predict_proba(row);
        let mut best = 0;
        for (index, mass) in proba.iter().enumerate() {
            if *mass > proba[best] {
                best = index;
            }
        }
        match (self.classes.get(best), proba.get(best)) {
            (Some(class), Some(mass)) => (*class, *mass),
            _ => (0, 0.0),
        }
    }

    pub fn importances(&self) -> &[f64] {
        &self.importances
    }
}

struct TreeBuilder<'a> {
    features: &'a [Vec<f64>],
    targets: &'a [usize],
    n_features: usize,
    n_classes: usize,
    max_depth: usize,
    total_rows: f64,
}

impl TreeBuilder<'_> {
    fn grow(
        &self,
        indices: &[usize],
        depth: usize,
        rng: &mut StdRng,
        importances: &mut [f64],
    ) -> TreeNode {
        let counts = self.class_counts(indices);
        if depth >= self.max_depth || indices.len() < 2 || is_pure(&counts) {
            return leaf_node(&counts);
        }

        let Some((feature, threshold, gain)) = self.best_split(indices, &counts, rng) else {
            return leaf_node(&counts);
        };

        let (left, right): (Vec<usize>, Vec<usize>) =
            indices.iter().partition(|&&index| self.features[index][feature] <= threshold);
        if left.is_empty() || right.is_empty() {
            return leaf_node(&counts);
        }

        importances[feature] += gain * indices.len() as f64 / self.total_rows;

        TreeNode::Split {
            feature,
            threshold,
            left: Box::new(self.grow(&left, depth + 1, rng, importances)),
            right: Box::new(self.grow(&right, depth + 1, rng, importances)),
        }
    }

    /// Scans a sqrt-sized feature subset for the threshold with the best
    /// gini gain. Thresholds sit midway between adjacent distinct values;
    /// zero-gain splits are rejected.
    fn best_split(
        &self,
        indices: &[usize],
        parent_counts: &[usize],
        rng: &mut StdRng,
    ) -> Option<(usize, f64, f64)> {
        let subset_len = ((self.n_features as f64).sqrt().floor() as usize).max(1);
        let mut candidates: Vec<usize> = (0..self.n_features).collect();
        candidates.shuffle(rng);
        candidates.truncate(subset_len);
        candidates.sort_unstable();

        let parent_gini = gini(parent_counts, indices.len());
        let mut best: Option<(usize, f64, f64)> = None;

        for &feature in &candidates {
            let mut ordered = indices.to_vec();
            ordered.sort_by(|&a, &b| {
                self.features[a][feature].total_cmp(&self.features[b][feature])
            });

            let mut left_counts = vec![0usize; self.n_classes];
            let mut right_counts = parent_counts.to_vec();

            for split_at in 1..ordered.len() {
                let moved = self.targets[ordered[split_at - 1]];
                left_counts[moved] += 1;
                right_counts[moved] -= 1;

                let prev = self.features[ordered[split_at - 1]][feature];
                let next = self.features[ordered[split_at]][feature];
                if prev == next {
                    continue;
                }

                let left_len = split_at;
                let right_len = ordered.len() - split_at;
                let weighted = (left_len as f64 * gini(&left_counts, left_len)
                    + right_len as f64 * gini(&right_counts, right_len))
                    / ordered.len() as f64;
                let gain = parent_gini - weighted;

                if gain > best.map(|(_, _, g)| g).unwrap_or(0.0) {
                    best = Some((feature, (prev + next) / 2.0, gain));
                }
            }
        }

        best
    }

    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &index in indices {
            counts[self.targets[index]] += 1;
        }
        counts
    }
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&count| {
            let p = count as f64 / total;
            p * p
        })
        .sum::<f64>()
}

fn is_pure(counts: &[usize]) -> bool {
    counts.iter().filter(|&&count| count > 0).count() <= 1
}

fn leaf_node(counts: &[usize]) -> TreeNode {
    let total: usize = counts.iter().sum();
    let distribution = if total == 0 {
        vec![1.0 / counts.len().max(1) as f64; counts.len()]
    } else {
        counts.iter().map(|&count| count as f64 / total as f64).collect()
    };
    TreeNode::Leaf { distribution }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threshold_data() -> (Vec<Vec<f64>>, Vec<u8>) {
        let features: Vec<Vec<f64>> =
            (0..20).map(|x| vec![x as f64, (x * 3 % 7) as f64]).collect();
        let labels: Vec<u8> = (0..20).map(|x| if x >= 10 { 2 } else { 1 }).collect();
        (features, labels)
    }

    #[test]
    fn learns_a_simple_threshold_rule() {
        let (features, labels) = threshold_data();
        let mut forest = RandomForestClassifier::new(25, 4, 7);
        forest.fit(&features, &labels);

        let (low_class, low_confidence) = forest.predict_with_confidence(&[3.0, 2.0]);
        assert_eq!(low_class, 1);
        assert!(low_confidence > 0.8, "confidence {low_confidence} should be decisive");

        let (high_class, high_confidence) = forest.predict_with_confidence(&[15.0, 3.0]);
        assert_eq!(high_class, 2);
        assert!(high_confidence > 0.8);
    }

    #[test]
    fn fitting_is_deterministic_for_a_fixed_seed() {
        let (features, labels) = threshold_data();

        let mut first = RandomForestClassifier::new(15, 5, 42);
        first.fit(&features, &labels);
        let mut second = RandomForestClassifier::new(15, 5, 42);
        second.fit(&features, &labels);

        assert_eq!(first, second);
        assert_eq!(
            first.predict_with_confidence(&[8.0, 1.0]),
            second.predict_with_confidence(&[8.0, 1.0]),
        );
    }

    #[test]
    fn informative_splits_give_normalized_importances() {
        let (features, labels) = threshold_data();
        let mut forest = RandomForestClassifier::new(10, 4, 3);
        forest.fit(&features, &labels);

        let total: f64 = forest.importances().iter().sum();
        assert!((total - 1.0).abs() < 1e-9, "importances sum {total} should be 1");
        // The first feature carries the rule so it dominates.
        assert!(forest.importances()[0] > forest.importances()[1]);
    }

    #[test]
    fn pure_labels_leave_importances_empty() {
        let features: Vec<Vec<f64>> = (0..12).map(|x| vec![x as f64, (x % 4) as f64]).collect();
        let labels = vec![3u8; 12];

        let mut forest = RandomForestClassifier::new(8, 4, 9);
        forest.fit(&features, &labels);

        assert!(forest.importances().is_empty());
    }

    #[test]
    fn single_class_data_predicts_with_full_confidence() {
        let features: Vec<Vec<f64>> = (0..6).map(|x| vec![x as f64]).collect();
        let labels = vec![5u8; 6];

        let mut forest = RandomForestClassifier::new(5, 3, 11);
        forest.fit(&features, &labels);

        let (class, confidence) = forest.predict_with_confidence(&[2.5]);
        assert_eq!(class, 5);
        assert!((confidence - 1.0).abs() < 1e-12);
    }
}
