//! Depth-wise gradient boosting with exact greedy split finding.

use serde::{Deserialize, Serialize};

use super::tree::{RegressionTree, TreeNode, split_threshold};
use super::{HyperParams, MIN_SPLIT_GAIN, Regressor, mean, to_columns};
use crate::error::Result;

/// Booster parameters. Everything outside the grid keeps the library
/// defaults of the depth-wise family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XgbParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// L2 regularization on leaf weights
    pub lambda: f64,
    /// Minimum hessian sum per child
    pub min_child_weight: f64,
    /// Minimum loss reduction to make a split
    pub gamma: f64,
}

impl Default for XgbParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            lambda: 1.0,
            min_child_weight: 1.0,
            gamma: 0.0,
        }
    }
}

impl From<&HyperParams> for XgbParams {
    fn from(p: &HyperParams) -> Self {
        let defaults = Self::default();
        Self {
            n_estimators: p.n_estimators,
            learning_rate: p.learning_rate,
            max_depth: p.max_depth.unwrap_or(defaults.max_depth),
            ..defaults
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct NodeStats {
    sum_grad: f64,
    sum_hess: f64,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    gain: f64,
    feature: usize,
    threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XgbRegressor {
    params: XgbParams,
    base_score: f64,
    trees: Vec<RegressionTree>,
}

impl XgbRegressor {
    pub fn new(params: XgbParams) -> Self {
        Self {
            params,
            base_score: 0.0,
            trees: Vec::new(),
        }
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    fn weight(&self, stats: NodeStats) -> f64 {
        -stats.sum_grad / (stats.sum_hess + self.params.lambda)
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.params.lambda)
    }

    /// Grow one tree level by level. `sorted` holds every feature's row
    /// order by value; `position` ends up mapping each row to its leaf.
    fn grow_tree(
        &self,
        columns: &[Vec<f64>],
        sorted: &[Vec<usize>],
        grad: &[f64],
        position: &mut [usize],
    ) -> RegressionTree {
        let n_rows = grad.len();
        let mut tree = RegressionTree::leaf(0.0);
        position.iter_mut().for_each(|p| *p = 0);
        let mut frontier: Vec<usize> = vec![0];

        for _depth in 0..self.params.max_depth {
            if frontier.is_empty() {
                break;
            }

            // frontier slot of every arena node, None for settled nodes
            let mut slot_of: Vec<Option<usize>> = vec![None; tree.nodes.len()];
            for (slot, &node) in frontier.iter().enumerate() {
                slot_of[node] = Some(slot);
            }

            let mut totals = vec![NodeStats::default(); frontier.len()];
            for row in 0..n_rows {
                if let Some(slot) = slot_of[position[row]] {
                    totals[slot].sum_grad += grad[row];
                    totals[slot].sum_hess += 1.0;
                }
            }

            let mut best: Vec<Option<SplitCandidate>> = vec![None; frontier.len()];
            for (feature, order) in sorted.iter().enumerate() {
                let values = &columns[feature];
                let mut left = vec![NodeStats::default(); frontier.len()];
                let mut last_value: Vec<Option<f64>> = vec![None; frontier.len()];

                for &row in order {
                    let Some(slot) = slot_of[position[row]] else {
                        continue;
                    };
                    let value = values[row];

                    if let Some(prev) = last_value[slot] {
                        if value > prev {
                            let total = totals[slot];
                            let l = left[slot];
                            let r_hess = total.sum_hess - l.sum_hess;
                            if l.sum_hess >= self.params.min_child_weight
                                && r_hess >= self.params.min_child_weight
                            {
                                let r_grad = total.sum_grad - l.sum_grad;
                                let gain = 0.5
                                    * (self.score(l.sum_grad, l.sum_hess)
                                        + self.score(r_grad, r_hess)
                                        - self.score(total.sum_grad, total.sum_hess))
                                    - self.params.gamma;
                                if gain > MIN_SPLIT_GAIN
                                    && best[slot].is_none_or(|b| gain > b.gain)
                                {
                                    best[slot] = Some(SplitCandidate {
                                        gain,
                                        feature,
                                        threshold: split_threshold(prev, value),
                                    });
                                }
                            }
                        }
                    }

                    left[slot].sum_grad += grad[row];
                    left[slot].sum_hess += 1.0;
                    last_value[slot] = Some(value);
                }
            }

            let mut next_frontier = Vec::new();
            let mut children: Vec<Option<(usize, usize)>> = vec![None; frontier.len()];
            for (slot, &node) in frontier.iter().enumerate() {
                if let Some(split) = best[slot] {
                    let pair = tree.split_leaf(node, split.feature, split.threshold);
                    next_frontier.push(pair.0);
                    next_frontier.push(pair.1);
                    children[slot] = Some(pair);
                }
            }
            if next_frontier.is_empty() {
                break;
            }

            for row in 0..n_rows {
                let Some(slot) = slot_of[position[row]] else {
                    continue;
                };
                if let (Some((l, r)), TreeNode::Split { feature, threshold, .. }) =
                    (children[slot], &tree.nodes[position[row]])
                {
                    position[row] = if columns[*feature][row] <= *threshold { l } else { r };
                }
            }
            frontier = next_frontier;
        }

        let mut leaf_stats = vec![NodeStats::default(); tree.nodes.len()];
        for row in 0..n_rows {
            leaf_stats[position[row]].sum_grad += grad[row];
            leaf_stats[position[row]].sum_hess += 1.0;
        }
        for (node, stats) in leaf_stats.into_iter().enumerate() {
            if stats.sum_hess > 0.0 {
                tree.set_leaf_value(node, self.params.learning_rate * self.weight(stats));
            }
        }

        tree
    }
}

impl Regressor for XgbRegressor {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        let columns = to_columns(x, y)?;
        let n_rows = y.len();

        let sorted: Vec<Vec<usize>> = columns
            .iter()
            .map(|col| {
                let mut order: Vec<usize> = (0..n_rows).collect();
                order.sort_by(|&a, &b| col[a].total_cmp(&col[b]));
                order
            })
            .collect();

        self.base_score = mean(y);
        self.trees = Vec::with_capacity(self.params.n_estimators);

        let mut predictions = vec![self.base_score; n_rows];
        let mut grad = vec![0.0; n_rows];
        let mut position = vec![0usize; n_rows];

        for _ in 0..self.params.n_estimators {
            for i in 0..n_rows {
                grad[i] = predictions[i] - y[i];
            }

            let tree = self.grow_tree(&columns, &sorted, &grad, &mut position);
            for i in 0..n_rows {
                predictions[i] += tree.leaf_value(position[i]);
            }
            self.trees.push(tree);
        }

        Ok(())
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let y: Vec<f64> = (0..40).map(|i| if i < 20 { 10.0 } else { 20.0 }).collect();
        (x, y)
    }

    #[test]
    fn test_learns_step_function() {
        let (x, y) = step_data();
        let mut model = XgbRegressor::new(XgbParams {
            n_estimators: 50,
            learning_rate: 0.3,
            max_depth: 2,
            ..XgbParams::default()
        });
        model.fit(&x, &y).unwrap();

        let pred = model.predict(&x);
        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 0.5, "{} vs {}", p, t);
        }
        // the first split lands between 19 and 20
        match &model.trees()[0].nodes[0] {
            TreeNode::Split { feature, threshold, .. } => {
                assert_eq!(*feature, 0);
                assert!(*threshold >= 19.0 && *threshold < 20.0);
            }
            TreeNode::Leaf { .. } => panic!("root should split"),
        }
    }

    #[test]
    fn test_respects_max_depth() {
        let x: Vec<Vec<f64>> = (0..64).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..64).map(|i| ((i * 7) % 13) as f64).collect();
        let mut model = XgbRegressor::new(XgbParams {
            n_estimators: 5,
            max_depth: 3,
            ..XgbParams::default()
        });
        model.fit(&x, &y).unwrap();
        assert!(model.trees().iter().all(|t| t.depth() <= 3));
        assert!(model.trees().iter().any(|t| t.depth() == 3));
    }

    #[test]
    fn test_constant_target_predicts_mean() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y = vec![1850.0; 10];
        let mut model = XgbRegressor::new(XgbParams::default());
        model.fit(&x, &y).unwrap();
        for p in model.predict(&x) {
            assert!((p - 1850.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (x, y) = step_data();
        let params = XgbParams { n_estimators: 20, ..XgbParams::default() };
        let mut a = XgbRegressor::new(params);
        let mut b = XgbRegressor::new(params);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_grid_params_map_onto_booster() {
        let hp = HyperParams { learning_rate: 0.01, max_depth: Some(3), n_estimators: 200 };
        let p = XgbParams::from(&hp);
        assert_eq!(p.max_depth, 3);
        assert_eq!(p.n_estimators, 200);
        assert_eq!(p.lambda, 1.0);

        let hp = HyperParams { max_depth: None, ..hp };
        assert_eq!(XgbParams::from(&hp).max_depth, 6);
    }
}
