//! Distance metrics between encoded records and centroids

use crate::encoding::{CategoricalBlock, FeatureLayout};
use crate::error::{Error, Result};
use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Trait for computing dissimilarity between an encoded vector and a centroid
pub trait Distance {
    /// Compute distance between a vector and a centroid laid out as `layout`
    fn distance(&self, a: ArrayView1<f64>, b: ArrayView1<f64>, layout: &FeatureLayout) -> Result<f64>;

    /// Compute distances between a single point and multiple centroids
    fn distances_to_centroids(
        &self,
        point: ArrayView1<f64>,
        centroids: ArrayView2<f64>,
        layout: &FeatureLayout,
    ) -> Result<Vec<f64>> {
        if centroids.ncols() != point.len() {
            return Err(Error::dimension_mismatch(point.len(), centroids.ncols()));
        }

        let mut distances = Vec::with_capacity(centroids.nrows());
        for centroid_row in centroids.rows() {
            distances.push(self.distance(point, centroid_row, layout)?);
        }
        Ok(distances)
    }
}

/// Squared Euclidean distance over every column.
///
/// One-hot columns are treated as plain numbers. This is an approximation:
/// a mismatch on any attribute costs 2 between two records, and against a
/// soft centroid an attribute spread over `m` values costs `1 - 1/m`, so
/// attributes with more distinct values carry more weight.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredEuclidean;

impl Distance for SquaredEuclidean {
    fn distance(&self, a: ArrayView1<f64>, b: ArrayView1<f64>, _layout: &FeatureLayout) -> Result<f64> {
        if a.len() != b.len() {
            return Err(Error::dimension_mismatch(a.len(), b.len()));
        }

        Ok(a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum())
    }
}

/// Combined distance for k-prototypes: squared difference on numeric columns
/// plus `gamma` per categorical block whose active values disagree
#[derive(Debug, Clone, Copy)]
pub struct PrototypesDistance {
    gamma: f64,
}

impl PrototypesDistance {
    /// Create a new prototypes distance metric
    pub fn new(gamma: f64) -> Self {
        Self { gamma }
    }

    /// Weight applied to each categorical mismatch
    pub fn gamma(&self) -> f64 {
        self.gamma
    }
}

impl Default for PrototypesDistance {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Distance for PrototypesDistance {
    fn distance(&self, a: ArrayView1<f64>, b: ArrayView1<f64>, layout: &FeatureLayout) -> Result<f64> {
        if a.len() != b.len() {
            return Err(Error::dimension_mismatch(a.len(), b.len()));
        }
        if layout.n_columns() != a.len() {
            return Err(Error::dimension_mismatch(layout.n_columns(), a.len()));
        }

        let numerical_distance: f64 = layout
            .numeric_columns()
            .iter()
            .map(|&idx| (a[idx] - b[idx]).powi(2))
            .sum();

        let mismatches = layout
            .blocks()
            .iter()
            .filter(|block| active_index(a, block) != active_index(b, block))
            .count();

        Ok(numerical_distance + self.gamma * mismatches as f64)
    }
}

/// How clustering measures and updates categorical columns
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ClusterMode {
    /// k-means: every column numeric, centroids are plain means
    #[default]
    Numeric,
    /// k-prototypes: categorical blocks matched by mode, weighted by `gamma`
    Mixed {
        /// Weight of one categorical mismatch relative to squared numeric distance
        gamma: f64,
    },
}

impl ClusterMode {
    /// Mixed mode with the default weight of 1.0
    pub fn mixed() -> Self {
        ClusterMode::Mixed { gamma: 1.0 }
    }

    /// Check mode parameters
    pub fn validate(&self) -> Result<()> {
        match self {
            ClusterMode::Numeric => Ok(()),
            ClusterMode::Mixed { gamma } if gamma.is_finite() && *gamma >= 0.0 => Ok(()),
            ClusterMode::Mixed { .. } => Err(Error::invalid_parameter(
                "Gamma must be finite and non-negative",
            )),
        }
    }

    /// Whether categorical blocks are updated by plurality
    pub fn is_mixed(&self) -> bool {
        matches!(self, ClusterMode::Mixed { .. })
    }
}

impl Distance for ClusterMode {
    fn distance(&self, a: ArrayView1<f64>, b: ArrayView1<f64>, layout: &FeatureLayout) -> Result<f64> {
        match *self {
            ClusterMode::Numeric => SquaredEuclidean.distance(a, b, layout),
            ClusterMode::Mixed { gamma } => PrototypesDistance::new(gamma).distance(a, b, layout),
        }
    }
}

/// Compute the distance between `vector` and `centroid` in the given mode
pub fn distance(
    vector: ArrayView1<f64>,
    centroid: ArrayView1<f64>,
    layout: &FeatureLayout,
    mode: ClusterMode,
) -> Result<f64> {
    mode.distance(vector, centroid, layout)
}

/// Column (relative to the block start) holding the largest value; ties go to the lowest
pub fn active_index(vector: ArrayView1<f64>, block: &CategoricalBlock) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (offset, idx) in block.columns.clone().enumerate() {
        if vector[idx] > best_value {
            best_value = vector[idx];
            best = offset;
        }
    }
    best
}

/// Plurality value (relative to the block start) among the given rows.
///
/// Returns `None` for an empty row set. Ties go to the lowest column.
pub fn block_mode(data: ArrayView2<f64>, rows: &[usize], block: &CategoricalBlock) -> Option<usize> {
    if rows.is_empty() {
        return None;
    }

    let mut counts = vec![0usize; block.columns.len()];
    for &row in rows {
        counts[active_index(data.row(row), block)] += 1;
    }

    let mut best = 0;
    for (offset, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = offset;
        }
    }
    Some(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::CategoricalBlock;
    use ndarray::{arr1, Array1, Array2};

    // [amount | a0 a1 | b0 b1 b2]
    fn layout() -> FeatureLayout {
        FeatureLayout::new(
            6,
            vec![0],
            vec![
                CategoricalBlock { attribute: None, columns: 1..3 },
                CategoricalBlock { attribute: None, columns: 3..6 },
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_squared_euclidean() {
        let a = arr1(&[1.0, 2.0, 3.0]);
        let b = arr1(&[4.0, 5.0, 6.0]);

        let result = SquaredEuclidean
            .distance(a.view(), b.view(), &FeatureLayout::numeric(3))
            .unwrap();
        assert!((result - 27.0).abs() < 1e-10);
    }

    #[test]
    fn test_prototypes_distance() {
        let layout = layout();
        let a = arr1(&[0.2, 1.0, 0.0, 0.0, 1.0, 0.0]);
        let b = arr1(&[0.7, 0.0, 1.0, 0.0, 1.0, 0.0]);

        // 0.5^2 for the amount plus one mismatch on the first block
        let result = PrototypesDistance::new(1.0).distance(a.view(), b.view(), &layout).unwrap();
        assert!((result - 1.25).abs() < 1e-12);

        let weighted = PrototypesDistance::new(3.0).distance(a.view(), b.view(), &layout).unwrap();
        assert!((weighted - 3.25).abs() < 1e-12);
    }

    #[test]
    fn test_numeric_mode_double_counts_mismatch() {
        let layout = layout();
        let a = arr1(&[0.5, 1.0, 0.0, 0.0, 0.0, 1.0]);
        let b = arr1(&[0.5, 0.0, 1.0, 0.0, 0.0, 1.0]);

        let numeric = distance(a.view(), b.view(), &layout, ClusterMode::Numeric).unwrap();
        let mixed = distance(a.view(), b.view(), &layout, ClusterMode::mixed()).unwrap();

        assert_eq!(numeric, 2.0);
        assert_eq!(mixed, 1.0);
    }

    #[test]
    fn test_numeric_mode_favours_many_valued_attributes() {
        // distance from a member to the soft centroid of m evenly spread values is 1 - 1/m
        let mut previous = 0.0;
        for m in 2..6 {
            let layout = FeatureLayout::new(
                m,
                Vec::new(),
                vec![CategoricalBlock { attribute: None, columns: 0..m }],
            )
            .unwrap();
            let mut member = Array1::zeros(m);
            member[0] = 1.0;
            let centroid = Array1::from_elem(m, 1.0 / m as f64);

            let numeric = distance(member.view(), centroid.view(), &layout, ClusterMode::Numeric).unwrap();
            assert!((numeric - (1.0 - 1.0 / m as f64)).abs() < 1e-12);
            assert!(numeric > previous);
            previous = numeric;

            let mixed = distance(member.view(), centroid.view(), &layout, ClusterMode::mixed()).unwrap();
            assert!(mixed <= 1.0);
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        let layout = layout();
        let a = arr1(&[0.0, 1.0, 0.0, 1.0, 0.0, 0.0]);
        let short = arr1(&[0.0, 1.0, 0.0]);

        let result = ClusterMode::Numeric.distance(a.view(), short.view(), &layout);
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));

        let result = ClusterMode::mixed().distance(short.view(), short.view(), &layout);
        assert!(matches!(result, Err(Error::DimensionMismatch { expected: 6, found: 3 })));
    }

    #[test]
    fn test_distances_to_centroids() {
        let layout = FeatureLayout::numeric(2);
        let point = arr1(&[0.0, 0.0]);
        let centroids = Array2::from_shape_vec((3, 2), vec![1.0, 0.0, 0.0, 2.0, 0.0, 0.0]).unwrap();

        let distances = ClusterMode::Numeric
            .distances_to_centroids(point.view(), centroids.view(), &layout)
            .unwrap();
        assert_eq!(distances, vec![1.0, 4.0, 0.0]);
    }

    #[test]
    fn test_block_mode_ties_prefer_lowest() {
        let block = CategoricalBlock { attribute: None, columns: 1..4 };
        let data = Array2::from_shape_vec(
            (4, 4),
            vec![
                0.0, 0.0, 1.0, 0.0,
                0.0, 0.0, 0.0, 1.0,
                0.0, 0.0, 1.0, 0.0,
                0.0, 0.0, 0.0, 1.0,
            ],
        )
        .unwrap();

        assert_eq!(block_mode(data.view(), &[0, 1, 2, 3], &block), Some(1));
        assert_eq!(block_mode(data.view(), &[1, 3], &block), Some(2));
        assert_eq!(block_mode(data.view(), &[], &block), None);
    }

    #[test]
    fn test_mode_validation() {
        assert_eq!(ClusterMode::default(), ClusterMode::Numeric);
        assert!(ClusterMode::Numeric.validate().is_ok());
        assert!(ClusterMode::Mixed { gamma: 0.0 }.validate().is_ok());
        assert!(ClusterMode::Mixed { gamma: -1.0 }.validate().is_err());
        assert!(ClusterMode::Mixed { gamma: f64::NAN }.validate().is_err());
    }
}
