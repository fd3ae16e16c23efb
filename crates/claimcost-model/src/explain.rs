//! Exact TreeSHAP attributions for [`GradientBoostedTrees`].
//!
//! Polynomial-time Shapley values for tree ensembles (Lundberg et al.,
//! "Consistent Individualized Feature Attribution for Tree Ensembles",
//! Algorithm 2). Expectations are taken over the training cover recorded in
//! each node, so for every row
//!
//! `sum(phi) + expected_value == prediction`
//!
//! up to floating-point error.

use crate::error::Result;
use crate::gbdt::tree::goes_left;
use crate::gbdt::{GradientBoostedTrees, RegressionTree, TreeNode};
use ndarray::{Array2, ArrayView1};

/// One element of the feature path from the root to the current node.
#[derive(Debug, Clone, Copy)]
struct PathElement {
    /// `None` for the sentinel at the root.
    feature: Option<usize>,
    /// Fraction of "feature absent" paths flowing through.
    zero_fraction: f64,
    /// Fraction of "feature present" paths flowing through (0 or 1).
    one_fraction: f64,
    /// Permutation weight.
    pweight: f64,
}

/// Grow the path by one feature split.
fn extend_path(path: &mut Vec<PathElement>, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if depth == 0 { 1.0 } else { 0.0 },
    });

    let d = (depth + 1) as f64;
    for i in (0..depth).rev() {
        path[i + 1].pweight += one_fraction * path[i].pweight * (i + 1) as f64 / d;
        path[i].pweight = zero_fraction * path[i].pweight * (depth - i) as f64 / d;
    }
}

/// Undo the extension at `index` and drop the last element.
fn unwind_path(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let d = (depth + 1) as f64;
    let mut next_one_portion = path[depth].pweight;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next_one_portion * d / ((i + 1) as f64 * one_fraction);
            next_one_portion = tmp - path[i].pweight * zero_fraction * (depth - i) as f64 / d;
        } else {
            path[i].pweight = path[i].pweight * d / (zero_fraction * (depth - i) as f64);
        }
    }

    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

/// Total permutation weight of the path if `index` were unwound.
fn unwound_path_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let mut next_one_portion = path[depth].pweight;
    let mut total = 0.0;

    if one_fraction != 0.0 {
        for i in (0..depth).rev() {
            let tmp = next_one_portion / ((i + 1) as f64 * one_fraction);
            total += tmp;
            next_one_portion = path[i].pweight - tmp * zero_fraction * (depth - i) as f64;
        }
    } else {
        for i in (0..depth).rev() {
            total += path[i].pweight / (zero_fraction * (depth - i) as f64);
        }
    }

    total * (depth + 1) as f64
}

/// Computes per-row, per-feature attributions for a fitted ensemble.
#[derive(Debug, Clone, Copy)]
pub struct TreeExplainer<'a> {
    model: &'a GradientBoostedTrees,
}

impl<'a> TreeExplainer<'a> {
    /// Explain `model`.
    pub const fn new(model: &'a GradientBoostedTrees) -> Self {
        Self { model }
    }

    /// Baseline the attributions are measured from.
    pub fn expected_value(&self) -> f64 {
        self.model.expected_value()
    }

    /// Attributions for every row of `x`, same shape as `x`.
    pub fn shap_values(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.model.check_width(x)?;

        let mut phi = Array2::<f64>::zeros(x.dim());
        for (row, mut out) in x.rows().into_iter().zip(phi.rows_mut()) {
            let contributions = self.shap_row(row);
            out.iter_mut()
                .zip(contributions)
                .for_each(|(o, c)| *o = c);
        }
        Ok(phi)
    }

    /// Attributions for a single row.
    pub fn shap_row(&self, row: ArrayView1<'_, f64>) -> Vec<f64> {
        let mut phi = vec![0.0; row.len()];
        for tree in self.model.trees() {
            let path = Vec::with_capacity(tree.depth() + 2);
            recurse(tree, row, &mut phi, 0, path, 1.0, 1.0, None);
        }
        phi
    }
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    tree: &RegressionTree,
    row: ArrayView1<'_, f64>,
    phi: &mut [f64],
    index: usize,
    mut path: Vec<PathElement>,
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    extend_path(&mut path, zero_fraction, one_fraction, feature);

    match tree.node(index) {
        TreeNode::Leaf { value, .. } => {
            for i in 1..path.len() {
                let weight = unwound_path_sum(&path, i);
                let element = path[i];
                if let Some(f) = element.feature {
                    phi[f] += weight * (element.one_fraction - element.zero_fraction) * value;
                }
            }
        }
        TreeNode::Split {
            feature: split_feature,
            threshold,
            default_left,
            left,
            right,
            cover,
            ..
        } => {
            let (hot, cold) = if goes_left(row[*split_feature], *threshold, *default_left) {
                (*left, *right)
            } else {
                (*right, *left)
            };
            let hot_zero_fraction = tree.node(hot).cover() / cover;
            let cold_zero_fraction = tree.node(cold).cover() / cover;

            // A feature seen higher up is unwound so it is only counted once.
            let mut incoming_zero_fraction = 1.0;
            let mut incoming_one_fraction = 1.0;
            if let Some(k) = path.iter().position(|e| e.feature == Some(*split_feature)) {
                incoming_zero_fraction = path[k].zero_fraction;
                incoming_one_fraction = path[k].one_fraction;
                unwind_path(&mut path, k);
            }

            recurse(
                tree,
                row,
                phi,
                hot,
                path.clone(),
                hot_zero_fraction * incoming_zero_fraction,
                incoming_one_fraction,
                Some(*split_feature),
            );
            recurse(
                tree,
                row,
                phi,
                cold,
                path,
                cold_zero_fraction * incoming_zero_fraction,
                0.0,
                Some(*split_feature),
            );
        }
    }
}
