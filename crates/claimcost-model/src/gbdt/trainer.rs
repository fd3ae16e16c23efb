//! Boosting loop and exact greedy tree construction.
//!
//! Every feature keeps a list of row indices sorted by value (NaN rows left
//! out). A node owns its slice of each list; splitting a node partitions the
//! lists stably, so children stay sorted without re-sorting. Ties between
//! candidate splits go to the first one evaluated (feature order, then
//! threshold order, missing-right before missing-left), so fitting is fully
//! deterministic.

use super::tree::{RegressionTree, TreeNode, goes_left};
use super::{GbdtConfig, GradientBoostedTrees};
use crate::error::{ModelError, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Splits must improve the objective by more than this.
const MIN_SPLIT_GAIN: f64 = 1e-6;

/// Fits [`GradientBoostedTrees`] to a dense matrix.
#[derive(Debug, Clone, Default)]
pub struct GbdtTrainer {
    config: GbdtConfig,
}

impl GbdtTrainer {
    /// Create a trainer, validating the configuration.
    pub fn new(config: GbdtConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Trainer configuration.
    pub const fn config(&self) -> &GbdtConfig {
        &self.config
    }

    /// Fit on `x` (rows × features, NaN = missing) against `y`.
    pub fn fit(&self, x: &Array2<f64>, y: &[f64]) -> Result<GradientBoostedTrees> {
        self.fit_with_progress(x, y, |_, _| {})
    }

    /// Fit, calling `progress(round, total)` after every tree.
    pub fn fit_with_progress<F>(
        &self,
        x: &Array2<f64>,
        y: &[f64],
        mut progress: F,
    ) -> Result<GradientBoostedTrees>
    where
        F: FnMut(usize, usize),
    {
        let (n_rows, n_features) = x.dim();
        if n_rows == 0 {
            return Err(ModelError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }
        if y.len() != n_rows {
            return Err(ModelError::DimensionMismatch {
                expected: n_rows,
                actual: y.len(),
            });
        }
        let non_finite = y.iter().filter(|v| !v.is_finite()).count();
        if non_finite > 0 {
            return Err(ModelError::NonFiniteTarget(non_finite));
        }

        let base_score = y.iter().sum::<f64>() / n_rows as f64;
        let mut predictions = vec![base_score; n_rows];
        let mut gradients = vec![0.0; n_rows];
        let hessians = vec![1.0; n_rows];

        let presorted = presort(x);
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut trees = Vec::with_capacity(self.config.n_estimators);

        for round in 0..self.config.n_estimators {
            for i in 0..n_rows {
                gradients[i] = predictions[i] - y[i];
            }

            let rows = self.sample_rows(n_rows, &mut rng);
            let sorted: Vec<Vec<usize>> = if rows.len() == n_rows {
                presorted.clone()
            } else {
                let mut in_sample = vec![false; n_rows];
                rows.iter().for_each(|&r| in_sample[r] = true);
                presorted
                    .iter()
                    .map(|list| list.iter().copied().filter(|&r| in_sample[r]).collect())
                    .collect()
            };

            let tree = TreeBuilder::new(x, &gradients, &hessians, &self.config)
                .build(NodeRows { rows, sorted });

            for (i, row) in x.rows().into_iter().enumerate() {
                predictions[i] += tree.predict_row(row);
            }

            let mse = predictions
                .iter()
                .zip(y)
                .map(|(p, t)| (p - t).powi(2))
                .sum::<f64>()
                / n_rows as f64;
            debug!(
                round = round + 1,
                leaves = tree.n_leaves(),
                train_rmse = mse.sqrt(),
                "Boosting round"
            );

            trees.push(tree);
            progress(round + 1, self.config.n_estimators);
        }

        Ok(GradientBoostedTrees::new(base_score, n_features, trees))
    }

    fn sample_rows(&self, n_rows: usize, rng: &mut StdRng) -> Vec<usize> {
        if self.config.subsample >= 1.0 {
            return (0..n_rows).collect();
        }

        let sampled: Vec<usize> = (0..n_rows)
            .filter(|_| rng.r#gen::<f64>() < self.config.subsample)
            .collect();
        // Never hand the builder an empty node.
        if sampled.is_empty() {
            vec![rng.gen_range(0..n_rows)]
        } else {
            sampled
        }
    }
}

/// Row indices per feature, sorted by value, NaN excluded.
fn presort(x: &Array2<f64>) -> Vec<Vec<usize>> {
    x.columns()
        .into_iter()
        .map(|column| {
            let mut rows: Vec<usize> = (0..column.len()).filter(|&i| !column[i].is_nan()).collect();
            rows.sort_by(|&a, &b| column[a].total_cmp(&column[b]));
            rows
        })
        .collect()
}

/// Rows reaching a node: all of them, plus the per-feature sorted views.
struct NodeRows {
    rows: Vec<usize>,
    sorted: Vec<Vec<usize>>,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    default_left: bool,
    gain: f64,
}

struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    gradients: &'a [f64],
    hessians: &'a [f64],
    config: &'a GbdtConfig,
    nodes: Vec<TreeNode>,
}

impl<'a> TreeBuilder<'a> {
    fn new(
        x: &'a Array2<f64>,
        gradients: &'a [f64],
        hessians: &'a [f64],
        config: &'a GbdtConfig,
    ) -> Self {
        Self {
            x,
            gradients,
            hessians,
            config,
            nodes: Vec::new(),
        }
    }

    fn build(mut self, root: NodeRows) -> RegressionTree {
        self.build_node(root, 0);
        RegressionTree::new(self.nodes)
    }

    fn build_node(&mut self, node: NodeRows, depth: usize) -> usize {
        let index = self.nodes.len();
        let (g, h) = self.sums(&node.rows);

        let split = if depth < self.config.max_depth && node.rows.len() >= 2 {
            self.find_best_split(&node, g, h)
        } else {
            None
        };

        let Some(split) = split else {
            let value = self.leaf_weight(g, h);
            self.nodes.push(TreeNode::Leaf { value, cover: h });
            return index;
        };

        // Reserve the slot, children are filled in after recursion.
        self.nodes.push(TreeNode::Leaf {
            value: 0.0,
            cover: h,
        });

        let (left_rows, right_rows) = self.partition(node, &split);
        let left = self.build_node(left_rows, depth + 1);
        let right = self.build_node(right_rows, depth + 1);

        self.nodes[index] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            default_left: split.default_left,
            left,
            right,
            cover: h,
            gain: split.gain,
        };
        index
    }

    fn sums(&self, rows: &[usize]) -> (f64, f64) {
        rows.iter().fold((0.0, 0.0), |(g, h), &r| {
            (g + self.gradients[r], h + self.hessians[r])
        })
    }

    fn leaf_weight(&self, g: f64, h: f64) -> f64 {
        -g / (h + self.config.lambda) * self.config.learning_rate
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.config.lambda)
    }

    fn find_best_split(&self, node: &NodeRows, g: f64, h: f64) -> Option<SplitCandidate> {
        let parent_score = self.score(g, h);
        let mut best: Option<SplitCandidate> = None;

        for (feature, sorted) in node.sorted.iter().enumerate() {
            if sorted.len() < 2 {
                continue;
            }

            let (g_present, h_present) = self.sums(sorted);
            let (g_missing, h_missing) = (g - g_present, h - h_present);
            let has_missing = sorted.len() < node.rows.len();

            let mut g_left = 0.0;
            let mut h_left = 0.0;
            for k in 0..sorted.len() - 1 {
                let row = sorted[k];
                g_left += self.gradients[row];
                h_left += self.hessians[row];

                let value = self.x[[row, feature]];
                let next = self.x[[sorted[k + 1], feature]];
                if value == next {
                    continue;
                }

                let mut threshold = value + (next - value) / 2.0;
                if threshold <= value {
                    threshold = next;
                }

                let directions: &[bool] = if has_missing { &[false, true] } else { &[false] };
                for &default_left in directions {
                    let (gl, hl) = if default_left {
                        (g_left + g_missing, h_left + h_missing)
                    } else {
                        (g_left, h_left)
                    };
                    let (gr, hr) = (g - gl, h - hl);
                    if hl < self.config.min_child_weight || hr < self.config.min_child_weight {
                        continue;
                    }

                    let gain = 0.5 * (self.score(gl, hl) + self.score(gr, hr) - parent_score)
                        - self.config.gamma;
                    if gain > MIN_SPLIT_GAIN && best.is_none_or(|b| gain > b.gain) {
                        best = Some(SplitCandidate {
                            feature,
                            threshold,
                            default_left,
                            gain,
                        });
                    }
                }
            }
        }

        best
    }

    fn partition(&self, node: NodeRows, split: &SplitCandidate) -> (NodeRows, NodeRows) {
        let column = self.x.column(split.feature);
        let left_of = |r: usize| goes_left(column[r], split.threshold, split.default_left);

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            node.rows.into_iter().partition(|&r| left_of(r));

        let mut left_sorted = Vec::with_capacity(node.sorted.len());
        let mut right_sorted = Vec::with_capacity(node.sorted.len());
        for list in node.sorted {
            let (l, r): (Vec<usize>, Vec<usize>) = list.into_iter().partition(|&r| left_of(r));
            left_sorted.push(l);
            right_sorted.push(r);
        }

        (
            NodeRows {
                rows: left_rows,
                sorted: left_sorted,
            },
            NodeRows {
                rows: right_rows,
                sorted: right_sorted,
            },
        )
    }
}
