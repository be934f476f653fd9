//! Cost-versus-k exploration for picking a number of clusters by eye

use crate::clustering::{ClusterResult, Clusterer};
use crate::distance::Distance;
use crate::encoding::EncodedMatrix;
use crate::error::{Error, Result};
use ndarray::{concatenate, Axis};
use serde::{Deserialize, Serialize};

/// One point on the cost curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostPoint {
    /// Number of clusters
    pub k: usize,
    /// Total clustering cost at `k`
    pub cost: f64,
}

/// Runs the clusterer for k = 1, 2, 3, ... until extra clusters stop paying off.
///
/// Each k+1 run starts from the k solution plus the row farthest from its
/// centroid, so the returned costs never increase with k.
#[derive(Debug, Clone)]
pub struct CostCurve {
    /// Settings used for every run; `n_clusters` is ignored
    pub clusterer: Clusterer,
    /// Stop once `previous_cost / new_cost` falls to this ratio or below
    pub threshold: f64,
    /// Hard upper bound on k
    pub max_k: Option<usize>,
}

impl Default for CostCurve {
    fn default() -> Self {
        Self::new(Clusterer::default())
    }
}

impl CostCurve {
    /// Create an explorer around the given clusterer settings
    pub fn new(clusterer: Clusterer) -> Self {
        Self {
            clusterer,
            threshold: 1.01,
            max_k: None,
        }
    }

    /// Set the diminishing-returns ratio
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Cap the largest k tried
    pub fn max_k(mut self, max_k: usize) -> Self {
        self.max_k = Some(max_k);
        self
    }

    /// Produce the cost curve.
    ///
    /// The point that triggers the stop is included. Exploration also ends
    /// when the cost reaches zero or k would exceed the number of rows.
    pub fn explore(&self, matrix: &EncodedMatrix) -> Result<Vec<CostPoint>> {
        if !self.threshold.is_finite() || self.threshold < 1.0 {
            return Err(Error::invalid_parameter("Threshold must be a finite ratio >= 1"));
        }
        if self.max_k == Some(0) {
            return Err(Error::invalid_parameter("max_k must be > 0"));
        }

        let limit = self.max_k.unwrap_or(usize::MAX).min(matrix.nrows());
        let first = Clusterer {
            n_clusters: 1,
            ..self.clusterer.clone()
        }
        .fit(matrix)?;

        let mut curve = vec![CostPoint { k: 1, cost: first.cost }];
        let mut current = first;

        while current.cost > 0.0 && current.n_clusters() < limit {
            let seeds = self.grow(matrix, &current)?;
            let next = self.clusterer.fit_from(matrix, seeds)?;

            let ratio = current.cost / next.cost;
            curve.push(CostPoint {
                k: next.n_clusters(),
                cost: next.cost,
            });
            log::debug!("k={} cost {:.6} (ratio {:.4})", next.n_clusters(), next.cost, ratio);

            if ratio <= self.threshold {
                break;
            }
            current = next;
        }

        log::info!("cost curve explored up to k={}", curve.len());
        Ok(curve)
    }

    /// Current centroids plus the row farthest from its own centroid
    fn grow(&self, matrix: &EncodedMatrix, result: &ClusterResult) -> Result<ndarray::Array2<f64>> {
        let data = matrix.data();
        let layout = matrix.layout();

        let mut farthest = 0;
        let mut farthest_distance = f64::NEG_INFINITY;
        for (i, row) in data.rows().into_iter().enumerate() {
            let centroid = result.centroids.row(result.labels[i]);
            let d = self.clusterer.mode.distance(row, centroid, layout)?;
            if d > farthest_distance {
                farthest_distance = d;
                farthest = i;
            }
        }

        concatenate(
            Axis(0),
            &[result.centroids.view(), data.slice(ndarray::s![farthest..farthest + 1, ..])],
        )
        .map_err(|e| Error::computation_error(e.to_string()))
    }
}

/// Explore the cost curve with default settings
pub fn explore(matrix: &EncodedMatrix, clusterer: Clusterer) -> Result<Vec<CostPoint>> {
    CostCurve::new(clusterer).explore(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::ClusterMode;
    use ndarray::Array2;

    fn blobs() -> EncodedMatrix {
        let values = [0.0, 0.02, 0.04, 0.5, 0.52, 0.54, 0.96, 0.98, 1.0];
        EncodedMatrix::numeric(Array2::from_shape_vec((9, 1), values.to_vec()).unwrap())
    }

    #[test]
    fn test_curve_is_non_increasing() {
        let data = Array2::from_shape_fn((25, 2), |(i, j)| ((i * 3 + j * 7) % 11) as f64 / 11.0);
        let matrix = EncodedMatrix::numeric(data);

        let curve = CostCurve::new(Clusterer::default().random_state(5))
            .threshold(1.0)
            .explore(&matrix)
            .unwrap();

        assert_eq!(curve[0].k, 1);
        for pair in curve.windows(2) {
            assert_eq!(pair[1].k, pair[0].k + 1);
            assert!(pair[1].cost <= pair[0].cost + 1e-9, "{:?}", curve);
        }
    }

    #[test]
    fn test_stops_at_elbow() {
        let curve = CostCurve::new(Clusterer::default().random_state(1))
            .threshold(1.5)
            .explore(&blobs())
            .unwrap();

        // three blobs: big drops up to k=3, then the gain flattens out
        assert!(curve.len() >= 3);
        assert!(curve.len() < 9);
        assert!(curve[2].cost < curve[0].cost / 10.0);
    }

    #[test]
    fn test_stop_point_is_first_ratio_under_threshold() {
        // costs: k=1 101, k=2 1, k=3 0.5, k=4 0
        let matrix = EncodedMatrix::numeric(Array2::from_shape_vec((4, 1), vec![0.0, 1.0, 10.0, 11.0]).unwrap());
        let explorer = CostCurve::new(Clusterer::default().random_state(0));

        let curve = explorer.clone().threshold(2.5).explore(&matrix).unwrap();
        assert_eq!(
            curve,
            vec![
                CostPoint { k: 1, cost: 101.0 },
                CostPoint { k: 2, cost: 1.0 },
                CostPoint { k: 3, cost: 0.5 },
            ]
        );

        // a ratio equal to the threshold also stops
        assert_eq!(explorer.clone().threshold(2.0).explore(&matrix).unwrap().len(), 3);
        let longer = explorer.threshold(1.5).explore(&matrix).unwrap();
        assert_eq!(longer.len(), 4);
        assert_eq!(longer[3], CostPoint { k: 4, cost: 0.0 });
    }

    #[test]
    fn test_respects_row_count() {
        let matrix = EncodedMatrix::numeric(Array2::from_shape_vec((3, 1), vec![0.0, 0.5, 1.0]).unwrap());
        let curve = CostCurve::new(Clusterer::default().random_state(0))
            .threshold(1.0)
            .explore(&matrix)
            .unwrap();

        assert!(curve.len() <= 3);
        assert_eq!(curve.last().unwrap().cost, 0.0);
    }

    #[test]
    fn test_max_k() {
        let curve = CostCurve::new(Clusterer::default().random_state(0))
            .threshold(1.0)
            .max_k(2)
            .explore(&blobs())
            .unwrap();
        assert_eq!(curve.len(), 2);
    }

    #[test]
    fn test_mixed_mode_curve() {
        let curve = explore(&blobs(), Clusterer::default().mode(ClusterMode::mixed()).random_state(2)).unwrap();
        assert!(!curve.is_empty());
        for pair in curve.windows(2) {
            assert!(pair[1].cost <= pair[0].cost + 1e-9);
        }
    }

    #[test]
    fn test_invalid_settings() {
        assert!(CostCurve::default().threshold(0.5).explore(&blobs()).is_err());
        assert!(CostCurve::default().threshold(f64::NAN).explore(&blobs()).is_err());
        assert!(CostCurve::default().max_k(0).explore(&blobs()).is_err());
    }
}
