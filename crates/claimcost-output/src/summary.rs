//! Attribution summary plot.
//!
//! One horizontal band per top driver, most important at the top. Each row
//! of the data is a dot placed at its attribution value, coloured from blue
//! (low feature value) to red (high feature value). Missing feature values
//! are drawn grey. The chart carries no text labels; the compliance report
//! names the bands in order next to the figure path.

use crate::attribution::{DriverRanking, FeatureAttribution};
use crate::error::{OutputError, Result};
use ndarray::Array2;
use plotters::prelude::*;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

const DOT_RADIUS: u32 = 3;
const BAND_SPREAD: f64 = 0.6;
const MISSING_COLOR: RGBColor = RGBColor(160, 160, 160);

/// Attributions paired with the model matrix they explain.
#[derive(Debug, Clone, Copy)]
pub struct SummaryPlot<'a> {
    feature_names: &'a [String],
    attributions: &'a Array2<f64>,
    feature_values: &'a Array2<f64>,
}

impl<'a> SummaryPlot<'a> {
    /// Pair an attribution matrix with its model matrix (same shape).
    pub fn new(
        feature_names: &'a [String],
        attributions: &'a Array2<f64>,
        feature_values: &'a Array2<f64>,
    ) -> Result<Self> {
        if attributions.ncols() != feature_names.len() {
            return Err(OutputError::DimensionMismatch {
                expected: feature_names.len(),
                actual: attributions.ncols(),
            });
        }
        if feature_values.dim() != attributions.dim() {
            return Err(OutputError::DimensionMismatch {
                expected: attributions.len(),
                actual: feature_values.len(),
            });
        }

        Ok(Self {
            feature_names,
            attributions,
            feature_values,
        })
    }

    /// Render the plot for `drivers` to a PNG, creating parent directories.
    pub fn render(
        &self,
        drivers: &[FeatureAttribution],
        path: &Path,
        width: u32,
        height: u32,
    ) -> Result<()> {
        let columns: Vec<usize> = drivers
            .iter()
            .filter_map(|d| DriverRanking::column_index(self.feature_names, &d.feature))
            .collect();
        let n_bands = columns.len().max(1) as f64;
        let (x_min, x_max) = self.x_range(&columns);
        debug!(bands = columns.len(), x_min, x_max, "Rendering summary plot");

        let mut buf = vec![0u8; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buf, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(plot_error)?;

            let mut chart = ChartBuilder::on(&root)
                .margin(20)
                .build_cartesian_2d(x_min..x_max, -0.5..n_bands - 0.5)
                .map_err(plot_error)?;

            chart
                .draw_series(LineSeries::new(
                    vec![(0.0, -0.5), (0.0, n_bands - 0.5)],
                    &BLACK,
                ))
                .map_err(plot_error)?;

            for (rank, &j) in columns.iter().enumerate() {
                let band = n_bands - 1.0 - rank as f64;
                let values = self.feature_values.column(j);
                let (lo, hi) = finite_bounds(values.iter().copied());

                let dots = self
                    .attributions
                    .column(j)
                    .iter()
                    .zip(values.iter())
                    .enumerate()
                    .map(|(i, (&phi, &value))| {
                        let color = value_color(value, lo, hi);
                        Circle::new((phi, band + jitter(i)), DOT_RADIUS, color.filled())
                    })
                    .collect::<Vec<_>>();
                chart.draw_series(dots).map_err(plot_error)?;
            }

            root.present().map_err(plot_error)?;
        }

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        image::save_buffer(path, &buf, width, height, image::ColorType::Rgb8)?;

        info!("Summary plot saved to {}", path.display());
        Ok(())
    }

    /// Padded x range covering every plotted attribution and zero.
    fn x_range(&self, columns: &[usize]) -> (f64, f64) {
        let (lo, hi) = finite_bounds(
            columns
                .iter()
                .flat_map(|&j| self.attributions.column(j).to_vec()),
        );
        let (lo, hi) = (lo.min(0.0), hi.max(0.0));
        let pad = ((hi - lo) * 0.05).max(1e-3);
        (lo - pad, hi + pad)
    }
}

fn plot_error<E: std::fmt::Display>(e: E) -> OutputError {
    OutputError::Plot(e.to_string())
}

/// Min and max of the finite values, `(0, 0)` when there are none.
fn finite_bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo.is_finite() { (lo, hi) } else { (0.0, 0.0) }
}

/// Deterministic vertical offset within a band.
fn jitter(row: usize) -> f64 {
    let u = (row.wrapping_mul(7919) % 101) as f64 / 100.0;
    (u - 0.5) * BAND_SPREAD
}

fn value_color(value: f64, lo: f64, hi: f64) -> RGBColor {
    if !value.is_finite() {
        return MISSING_COLOR;
    }
    let t = if hi > lo { (value - lo) / (hi - lo) } else { 0.5 };
    let t = t.clamp(0.0, 1.0);
    RGBColor((255.0 * t).round() as u8, 30, (255.0 * (1.0 - t)).round() as u8)
}
