//! Regression tree representation and inference.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// A node of a regression tree.
///
/// Nodes live in a flat vector with the root at index 0; children are
/// referenced by index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Internal node. Rows with `x[feature] < threshold` go left, missing
    /// values follow `default_left`.
    Split {
        /// Model matrix column.
        feature: usize,
        /// Split point.
        threshold: f64,
        /// Direction for NaN.
        default_left: bool,
        /// Left child index.
        left: usize,
        /// Right child index.
        right: usize,
        /// Sum of hessians of the training rows reaching this node.
        cover: f64,
        /// Loss reduction of the split.
        gain: f64,
    },
    /// Terminal node.
    Leaf {
        /// Contribution to the prediction (learning rate applied).
        value: f64,
        /// Sum of hessians of the training rows reaching this node.
        cover: f64,
    },
}

impl TreeNode {
    /// Training cover of the node.
    pub const fn cover(&self) -> f64 {
        match self {
            Self::Split { cover, .. } | Self::Leaf { cover, .. } => *cover,
        }
    }

    /// Whether the node is a leaf.
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }
}

/// Child a row takes at a split.
pub(crate) fn goes_left(value: f64, threshold: f64, default_left: bool) -> bool {
    if value.is_nan() {
        default_left
    } else {
        value < threshold
    }
}

/// A single regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Wrap a node vector whose root is at index 0.
    pub const fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    /// All nodes.
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Node by index.
    pub fn node(&self, index: usize) -> &TreeNode {
        &self.nodes[index]
    }

    /// Number of leaves.
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Largest feature index used by a split, if any.
    pub fn max_feature(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                TreeNode::Split { feature, .. } => Some(*feature),
                TreeNode::Leaf { .. } => None,
            })
            .max()
    }

    /// Index of the leaf a row falls into.
    pub fn leaf_index(&self, row: ArrayView1<'_, f64>) -> usize {
        self.descend(row).0
    }

    /// Tree output for one row.
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.descend(row).1
    }

    fn descend(&self, row: ArrayView1<'_, f64>) -> (usize, f64) {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value, .. } => return (index, *value),
                TreeNode::Split {
                    feature,
                    threshold,
                    default_left,
                    left,
                    right,
                    ..
                } => {
                    index = if goes_left(row[*feature], *threshold, *default_left) {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Cover-weighted mean of the leaf values.
    pub fn expected_value(&self) -> f64 {
        self.expected_value_at(0)
    }

    fn expected_value_at(&self, index: usize) -> f64 {
        match &self.nodes[index] {
            TreeNode::Leaf { value, .. } => *value,
            TreeNode::Split { left, right, .. } => {
                let left_cover = self.nodes[*left].cover();
                let right_cover = self.nodes[*right].cover();
                let total = left_cover + right_cover;
                (left_cover * self.expected_value_at(*left)
                    + right_cover * self.expected_value_at(*right))
                    / total
            }
        }
    }

    /// Depth of the deepest leaf (a single leaf has depth 0).
    pub fn depth(&self) -> usize {
        self.depth_at(0)
    }

    fn depth_at(&self, index: usize) -> usize {
        match &self.nodes[index] {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => {
                1 + self.depth_at(*left).max(self.depth_at(*right))
            }
        }
    }
}
