//! Regression tree stored as a flat node arena, shared by both boosters.

use serde::{Deserialize, Serialize};

/// A node of a regression tree. Children are indices into the owning arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
    },
    /// Rows with `x[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Regression tree; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Single-leaf tree.
    pub fn leaf(value: f64) -> Self {
        Self {
            nodes: vec![TreeNode::Leaf { value }],
        }
    }

    /// Append a leaf and return its index.
    pub fn push_leaf(&mut self, value: f64) -> usize {
        self.nodes.push(TreeNode::Leaf { value });
        self.nodes.len() - 1
    }

    /// Turn leaf `node` into a split with two fresh leaf children.
    /// Returns `(left, right)` indices.
    pub fn split_leaf(&mut self, node: usize, feature: usize, threshold: f64) -> (usize, usize) {
        let left = self.push_leaf(0.0);
        let right = self.push_leaf(0.0);
        self.nodes[node] = TreeNode::Split {
            feature,
            threshold,
            left,
            right,
        };
        (left, right)
    }

    /// Overwrite the value of a leaf. Split nodes are left untouched.
    pub fn set_leaf_value(&mut self, node: usize, new_value: f64) {
        if let TreeNode::Leaf { value } = &mut self.nodes[node] {
            *value = new_value;
        }
    }

    /// Index of the leaf `row` lands in.
    pub fn leaf_index(&self, row: &[f64]) -> usize {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { .. } => return idx,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Value of leaf `node`; 0 for a split node.
    pub fn leaf_value(&self, node: usize) -> f64 {
        match &self.nodes[node] {
            TreeNode::Leaf { value } => *value,
            TreeNode::Split { .. } => 0.0,
        }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        self.leaf_value(self.leaf_index(row))
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }

    /// Depth of the deepest leaf (a lone root has depth 0).
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], idx: usize) -> usize {
            match &nodes[idx] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

/// Threshold separating two adjacent distinct sorted values `lo < hi`,
/// guaranteed to satisfy `lo <= threshold < hi`.
pub fn split_threshold(lo: f64, hi: f64) -> f64 {
    let mid = lo + (hi - lo) * 0.5;
    if mid < hi { mid } else { lo }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traverse() {
        let mut tree = RegressionTree::leaf(0.0);
        let (left, right) = tree.split_leaf(0, 1, 5.0);
        tree.set_leaf_value(left, -1.0);
        let (rl, rr) = tree.split_leaf(right, 0, 2.0);
        tree.set_leaf_value(rl, 3.0);
        tree.set_leaf_value(rr, 4.0);

        assert_eq!(tree.predict(&[0.0, 5.0]), -1.0);
        assert_eq!(tree.predict(&[1.0, 6.0]), 3.0);
        assert_eq!(tree.predict(&[2.5, 6.0]), 4.0);
        assert_eq!(tree.n_leaves(), 3);
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn test_split_threshold_between_values() {
        assert_eq!(split_threshold(1.0, 2.0), 1.5);

        let lo = 1.0_f64;
        let hi = f64::from_bits(lo.to_bits() + 1);
        let t = split_threshold(lo, hi);
        assert!(lo <= t && t < hi);
    }

    #[test]
    fn test_serde_round_trip() {
        let mut tree = RegressionTree::leaf(0.0);
        tree.split_leaf(0, 2, 0.25);
        let json = serde_json::to_string(&tree).unwrap();
        let back: RegressionTree = serde_json::from_str(&json).unwrap();
        assert_eq!(tree, back);
    }
}
