//! Initialization methods for k-means and k-prototypes clustering

use crate::distance::{active_index, ClusterMode, Distance};
use crate::encoding::FeatureLayout;
use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView2, ArrayViewMut1};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Initialization methods for clustering algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InitMethod {
    /// Random initialization - sample k distinct data rows as initial centroids
    #[default]
    Random,
    /// Uniform initialization - draw each coordinate uniformly from the column's observed range
    Uniform,
    /// Cao initialization - deterministic, based on density and dissimilarity
    Cao,
}

/// Initialize `n_clusters` centroids for the given data.
///
/// In mixed mode every categorical block of the result is hard (one-hot).
pub fn initialize_centroids<R: Rng>(
    data: ArrayView2<f64>,
    layout: &FeatureLayout,
    n_clusters: usize,
    method: InitMethod,
    mode: ClusterMode,
    rng: &mut R,
) -> Result<Array2<f64>> {
    if n_clusters == 0 {
        return Err(Error::invalid_parameter("Number of clusters must be > 0"));
    }

    if n_clusters > data.nrows() {
        return Err(Error::invalid_parameter(
            "Number of clusters cannot exceed number of data points",
        ));
    }

    let mut centroids = match method {
        InitMethod::Random => random_init(data, n_clusters, rng),
        InitMethod::Uniform => uniform_init(data, n_clusters, rng),
        InitMethod::Cao => cao_init(data, layout, n_clusters, mode)?,
    };

    if mode.is_mixed() {
        for row in centroids.rows_mut() {
            harden(row, layout);
        }
    }

    Ok(centroids)
}

/// Set each categorical block to a one-hot of its currently largest column
pub fn harden(mut centroid: ArrayViewMut1<f64>, layout: &FeatureLayout) {
    for block in layout.blocks() {
        let active = block.columns.start + active_index(centroid.view(), block);
        for idx in block.columns.clone() {
            centroid[idx] = if idx == active { 1.0 } else { 0.0 };
        }
    }
}

/// Random initialization: sample k distinct rows
fn random_init<R: Rng>(data: ArrayView2<f64>, n_clusters: usize, rng: &mut R) -> Array2<f64> {
    let indices = rand::seq::index::sample(rng, data.nrows(), n_clusters).into_vec();
    data.select(ndarray::Axis(0), &indices)
}

/// Uniform initialization: independent draws inside each column's min/max
fn uniform_init<R: Rng>(data: ArrayView2<f64>, n_clusters: usize, rng: &mut R) -> Array2<f64> {
    let bounds: Vec<(f64, f64)> = data
        .columns()
        .into_iter()
        .map(|column| {
            column
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
        })
        .collect();

    Array2::from_shape_fn((n_clusters, data.ncols()), |(_, j)| {
        let (lo, hi) = bounds[j];
        lo + rng.gen::<f64>() * (hi - lo)
    })
}

/// Cao initialization: the densest row first, then repeatedly the row that
/// maximises density times distance to the nearest chosen centroid.
///
/// Density is the mean relative frequency of a row's categorical values; rows
/// with no categorical blocks all share density 1. Ties go to the lowest row.
fn cao_init(
    data: ArrayView2<f64>,
    layout: &FeatureLayout,
    n_clusters: usize,
    mode: ClusterMode,
) -> Result<Array2<f64>> {
    let n_points = data.nrows();
    let density = row_densities(data, layout);

    let first = argmax(density.iter().copied())
        .ok_or_else(|| Error::initialization_failure("No data points found"))?;
    let mut selected = vec![first];
    let mut nearest: Vec<f64> = vec![f64::INFINITY; n_points];

    while selected.len() < n_clusters {
        let newest = data.row(*selected.last().unwrap_or(&first));
        for (i, slot) in nearest.iter_mut().enumerate() {
            let d = mode.distance(data.row(i), newest, layout)?;
            *slot = slot.min(d);
        }

        let scores = (0..n_points).map(|i| {
            if selected.contains(&i) {
                f64::NEG_INFINITY
            } else {
                density[i] * nearest[i]
            }
        });

        let next = match argmax(scores) {
            Some(i) if density[i] * nearest[i] > 0.0 => i,
            // remaining rows coincide with chosen centroids
            _ => (0..n_points)
                .find(|i| !selected.contains(i))
                .ok_or_else(|| Error::initialization_failure("Insufficient data points"))?,
        };
        selected.push(next);
    }

    Ok(data.select(ndarray::Axis(0), &selected))
}

fn row_densities(data: ArrayView2<f64>, layout: &FeatureLayout) -> Vec<f64> {
    let n_points = data.nrows();
    if layout.blocks().is_empty() {
        return vec![1.0; n_points];
    }

    let mut density = vec![0.0; n_points];
    for block in layout.blocks() {
        let actives: Vec<usize> = data.rows().into_iter().map(|row| active_index(row, block)).collect();
        let mut counts = vec![0usize; block.columns.len()];
        for &a in &actives {
            counts[a] += 1;
        }
        for (i, &a) in actives.iter().enumerate() {
            density[i] += counts[a] as f64 / n_points as f64;
        }
    }

    let n_blocks = layout.blocks().len() as f64;
    density.iter_mut().for_each(|d| *d /= n_blocks);
    density
}

/// Index of the largest value, lowest index on ties
fn argmax(values: impl Iterator<Item = f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.enumerate() {
        match best {
            Some((_, bv)) if v <= bv => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
