//! Leaf-wise gradient boosting over quantile histogram bins.

use serde::{Deserialize, Serialize};

use super::tree::{RegressionTree, split_threshold};
use super::{HyperParams, MIN_SPLIT_GAIN, Regressor, mean, to_columns};
use crate::error::Result;

/// Booster parameters of the leaf-wise family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LgbmParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    /// Maximum number of leaves per tree
    pub num_leaves: usize,
    /// Depth limit; `None` grows without one
    pub max_depth: Option<usize>,
    pub min_data_in_leaf: usize,
    pub lambda_l2: f64,
    /// Maximum number of histogram bins per feature
    pub max_bin: usize,
}

impl Default for LgbmParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            num_leaves: 31,
            max_depth: None,
            min_data_in_leaf: 20,
            lambda_l2: 0.0,
            max_bin: 255,
        }
    }
}

impl From<&HyperParams> for LgbmParams {
    fn from(p: &HyperParams) -> Self {
        Self {
            n_estimators: p.n_estimators,
            learning_rate: p.learning_rate,
            max_depth: p.max_depth,
            ..Self::default()
        }
    }
}

/// Upper bounds of the bins of one feature. A value `x` falls in the first
/// bin `b` with `x <= bounds[b]`, or in the last bin if there is none.
pub fn bin_bounds(values: &[f64], max_bin: usize) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut distinct = sorted.clone();
    distinct.dedup();
    if distinct.len() <= 1 {
        return Vec::new();
    }

    if distinct.len() <= max_bin {
        return distinct
            .windows(2)
            .map(|w| split_threshold(w[0], w[1]))
            .collect();
    }

    // equal-frequency cut points over the samples
    let n = sorted.len();
    let max_value = distinct[distinct.len() - 1];
    let mut bounds: Vec<f64> = (1..max_bin)
        .map(|k| sorted[(k * n / max_bin).saturating_sub(1)])
        .filter(|&v| v < max_value)
        .collect();
    bounds.dedup();
    bounds
}

fn bin_of(bounds: &[f64], value: f64) -> usize {
    bounds.partition_point(|&b| b < value)
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    gain: f64,
    feature: usize,
    bin: usize,
}

struct LeafState {
    node: usize,
    depth: usize,
    rows: Vec<usize>,
    best: Option<SplitCandidate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LgbmRegressor {
    params: LgbmParams,
    init_score: f64,
    trees: Vec<RegressionTree>,
}

impl LgbmRegressor {
    pub fn new(params: LgbmParams) -> Self {
        Self {
            params,
            init_score: 0.0,
            trees: Vec::new(),
        }
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.params.lambda_l2)
    }

    /// Best histogram split of a leaf, if any satisfies the leaf-size limit.
    fn find_split(&self, bins: &[Vec<u16>], n_bins: &[usize], grad: &[f64], rows: &[usize]) -> Option<SplitCandidate> {
        let min_data = self.params.min_data_in_leaf.max(1);
        if rows.len() < 2 * min_data {
            return None;
        }

        let total_grad: f64 = rows.iter().map(|&r| grad[r]).sum();
        let total_count = rows.len() as f64;
        let parent = self.score(total_grad, total_count);

        let mut best: Option<SplitCandidate> = None;
        for (feature, feature_bins) in bins.iter().enumerate() {
            if n_bins[feature] < 2 {
                continue;
            }
            let mut hist_grad = vec![0.0; n_bins[feature]];
            let mut hist_count = vec![0usize; n_bins[feature]];
            for &r in rows {
                let b = feature_bins[r] as usize;
                hist_grad[b] += grad[r];
                hist_count[b] += 1;
            }

            let mut left_grad = 0.0;
            let mut left_count = 0usize;
            for bin in 0..n_bins[feature] - 1 {
                left_grad += hist_grad[bin];
                left_count += hist_count[bin];
                let right_count = rows.len() - left_count;
                if left_count < min_data {
                    continue;
                }
                if right_count < min_data {
                    break;
                }

                let gain = self.score(left_grad, left_count as f64)
                    + self.score(total_grad - left_grad, right_count as f64)
                    - parent;
                if gain > MIN_SPLIT_GAIN && best.is_none_or(|b| gain > b.gain) {
                    best = Some(SplitCandidate { gain, feature, bin });
                }
            }
        }
        best
    }

    fn leaf_output(&self, grad: &[f64], rows: &[usize]) -> f64 {
        let g: f64 = rows.iter().map(|&r| grad[r]).sum();
        let h = rows.len() as f64;
        if h + self.params.lambda_l2 <= 0.0 {
            return 0.0;
        }
        -self.params.learning_rate * g / (h + self.params.lambda_l2)
    }

    /// Grow one tree best-first until `num_leaves` or no admissible split.
    fn grow_tree(
        &self,
        bins: &[Vec<u16>],
        bounds: &[Vec<f64>],
        grad: &[f64],
        leaf_of_row: &mut [usize],
    ) -> RegressionTree {
        let n_bins: Vec<usize> = bounds.iter().map(|b| b.len() + 1).collect();
        let mut tree = RegressionTree::leaf(0.0);

        let root_rows: Vec<usize> = (0..grad.len()).collect();
        let root_best = self.find_split(bins, &n_bins, grad, &root_rows);
        let mut leaves = vec![LeafState {
            node: 0,
            depth: 0,
            rows: root_rows,
            best: root_best,
        }];

        while leaves.len() < self.params.num_leaves.max(2) {
            // first leaf with the largest gain
            let mut chosen: Option<(usize, f64)> = None;
            for (i, leaf) in leaves.iter().enumerate() {
                if let Some(c) = leaf.best {
                    if chosen.is_none_or(|(_, g)| c.gain > g) {
                        chosen = Some((i, c.gain));
                    }
                }
            }
            let Some((idx, _)) = chosen else {
                break;
            };

            let leaf = leaves.remove(idx);
            let Some(split) = leaf.best else {
                break;
            };
            let threshold = bounds[split.feature][split.bin];
            let (left_node, right_node) = tree.split_leaf(leaf.node, split.feature, threshold);

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = leaf
                .rows
                .iter()
                .copied()
                .partition(|&r| bins[split.feature][r] as usize <= split.bin);

            let depth = leaf.depth + 1;
            let can_split = self.params.max_depth.is_none_or(|d| depth < d);
            let children: Vec<LeafState> = [(left_node, left_rows), (right_node, right_rows)]
                .into_iter()
                .map(|(node, rows)| {
                    let best = if can_split {
                        self.find_split(bins, &n_bins, grad, &rows)
                    } else {
                        None
                    };
                    LeafState { node, depth, rows, best }
                })
                .collect();
            leaves.splice(idx..idx, children);
        }

        for leaf in &leaves {
            tree.set_leaf_value(leaf.node, self.leaf_output(grad, &leaf.rows));
            for &r in &leaf.rows {
                leaf_of_row[r] = leaf.node;
            }
        }
        tree
    }
}

impl Regressor for LgbmRegressor {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        let columns = to_columns(x, y)?;
        let n_rows = y.len();
        let max_bin = self.params.max_bin.clamp(2, u16::MAX as usize);

        let bounds: Vec<Vec<f64>> = columns.iter().map(|c| bin_bounds(c, max_bin)).collect();
        let bins: Vec<Vec<u16>> = columns
            .iter()
            .zip(bounds.iter())
            .map(|(col, b)| col.iter().map(|&v| bin_of(b, v) as u16).collect())
            .collect();

        self.init_score = mean(y);
        self.trees = Vec::with_capacity(self.params.n_estimators);

        let mut predictions = vec![self.init_score; n_rows];
        let mut grad = vec![0.0; n_rows];
        let mut leaf_of_row = vec![0usize; n_rows];

        for _ in 0..self.params.n_estimators {
            for i in 0..n_rows {
                grad[i] = predictions[i] - y[i];
            }
            let tree = self.grow_tree(&bins, &bounds, &grad, &mut leaf_of_row);
            for i in 0..n_rows {
                predictions[i] += tree.leaf_value(leaf_of_row[i]);
            }
            self.trees.push(tree);
        }

        Ok(())
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        self.init_score + self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_bounds_few_distinct_values() {
        let bounds = bin_bounds(&[3.0, 1.0, 2.0, 2.0, 1.0], 255);
        assert_eq!(bounds, vec![1.5, 2.5]);
        assert_eq!(bin_of(&bounds, 1.0), 0);
        assert_eq!(bin_of(&bounds, 2.0), 1);
        assert_eq!(bin_of(&bounds, 3.0), 2);

        assert!(bin_bounds(&[4.0, 4.0], 255).is_empty());
    }

    #[test]
    fn test_bin_bounds_respect_max_bin() {
        let values: Vec<f64> = (0..1000).map(|i| i as f64).collect();
        let bounds = bin_bounds(&values, 16);
        assert!(bounds.len() <= 15);
        assert!(bounds.windows(2).all(|w| w[0] < w[1]));
        assert!(*bounds.last().unwrap() < 999.0);
    }

    #[test]
    fn test_learns_step_function() {
        let x: Vec<Vec<f64>> = (0..100).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..100).map(|i| if i < 50 { 1.0 } else { 5.0 }).collect();
        let mut model = LgbmRegressor::new(LgbmParams {
            n_estimators: 60,
            learning_rate: 0.2,
            ..LgbmParams::default()
        });
        model.fit(&x, &y).unwrap();

        let pred = model.predict(&x);
        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 0.1, "{} vs {}", p, t);
        }
    }

    #[test]
    fn test_leaves_respect_limits() {
        let x: Vec<Vec<f64>> = (0..200).map(|i| vec![i as f64, ((i * 31) % 17) as f64]).collect();
        let y: Vec<f64> = (0..200).map(|i| ((i * 13) % 29) as f64).collect();
        let params = LgbmParams {
            n_estimators: 3,
            num_leaves: 4,
            min_data_in_leaf: 20,
            ..LgbmParams::default()
        };
        let mut model = LgbmRegressor::new(params);
        model.fit(&x, &y).unwrap();
        assert!(model.trees().iter().all(|t| t.n_leaves() <= 4));

        for tree in model.trees() {
            let mut counts = vec![0usize; tree.nodes.len()];
            for row in &x {
                counts[tree.leaf_index(row)] += 1;
            }
            assert!(counts.iter().all(|&c| c == 0 || c >= 20));
        }
    }

    #[test]
    fn test_small_data_stays_constant() {
        // fewer than 2 * min_data_in_leaf rows: no split possible
        let x: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let mut model = LgbmRegressor::new(LgbmParams::default());
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&x);
        assert!(pred.iter().all(|p| (p - 14.5).abs() < 1e-9));
    }
}
