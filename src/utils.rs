//! Utility functions shared by the clustering routines

use crate::distance::Distance;
use crate::encoding::FeatureLayout;
use crate::error::{Error, Result};
use ndarray::{Array1, ArrayView1, ArrayView2};

/// Find the closest centroid for a given data point.
///
/// Returns the centroid index and its distance; ties go to the lowest index.
pub fn find_closest_centroid<D: Distance>(
    point: ArrayView1<f64>,
    centroids: ArrayView2<f64>,
    layout: &FeatureLayout,
    metric: &D,
) -> Result<(usize, f64)> {
    if centroids.nrows() == 0 {
        return Err(Error::invalid_data("No centroids provided"));
    }

    if centroids.ncols() != point.len() {
        return Err(Error::dimension_mismatch(point.len(), centroids.ncols()));
    }

    let distances = metric.distances_to_centroids(point, centroids, layout)?;

    let mut min_distance = f64::INFINITY;
    let mut closest_centroid = 0;
    for (i, &distance) in distances.iter().enumerate() {
        if !distance.is_finite() {
            return Err(Error::computation_error(format!(
                "Non-finite distance to centroid {}",
                i
            )));
        }
        if distance < min_distance {
            min_distance = distance;
            closest_centroid = i;
        }
    }

    Ok((closest_centroid, min_distance))
}

/// Assign all data points to their closest centroids, returning the labels and total cost
pub fn assign_points_to_centroids<D: Distance>(
    data: ArrayView2<f64>,
    centroids: ArrayView2<f64>,
    layout: &FeatureLayout,
    metric: &D,
) -> Result<(Array1<usize>, f64)> {
    let mut assignments = Array1::zeros(data.nrows());
    let mut total_cost = 0.0;

    for (i, point) in data.rows().into_iter().enumerate() {
        let (closest, distance) = find_closest_centroid(point, centroids, layout, metric)?;
        assignments[i] = closest;
        total_cost += distance;
    }

    Ok((assignments, total_cost))
}

/// Check if two assignment arrays are equal (for convergence testing)
pub fn assignments_equal(a: ArrayView1<usize>, b: ArrayView1<usize>) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b.iter()).all(|(&x, &y)| x == y)
}

/// Get indices of points assigned to each cluster
pub fn get_cluster_indices(assignments: ArrayView1<usize>, n_clusters: usize) -> Vec<Vec<usize>> {
    let mut cluster_indices = vec![Vec::new(); n_clusters];

    for (point_idx, &cluster_id) in assignments.iter().enumerate() {
        if cluster_id < n_clusters {
            cluster_indices[cluster_id].push(point_idx);
        }
    }

    cluster_indices
}

/// Calculate cluster sizes
pub fn cluster_sizes(assignments: ArrayView1<usize>, n_clusters: usize) -> Vec<usize> {
    let mut sizes = vec![0; n_clusters];

    for &cluster_id in assignments.iter() {
        if cluster_id < n_clusters {
            sizes[cluster_id] += 1;
        }
    }

    sizes
}

/// Validate clustering parameters
pub fn validate_parameters(n_clusters: usize, max_iter: usize, tol: f64, n_init: usize) -> Result<()> {
    if n_clusters == 0 {
        return Err(Error::invalid_parameter("n_clusters must be > 0"));
    }

    if max_iter == 0 {
        return Err(Error::invalid_parameter("max_iter must be > 0"));
    }

    if tol.is_nan() || tol < 0.0 {
        return Err(Error::invalid_parameter("tol must be >= 0"));
    }

    if n_init == 0 {
        return Err(Error::invalid_parameter("n_init must be > 0"));
    }

    Ok(())
}

/// Validate input data: empty input is a parameter error, NaN/infinity is bad data
pub fn validate_data(data: ArrayView2<f64>) -> Result<()> {
    if data.nrows() == 0 {
        return Err(Error::invalid_parameter("Data cannot be empty"));
    }

    if data.ncols() == 0 {
        return Err(Error::invalid_parameter("Data must have at least one feature"));
    }

    if let Some(((row, col), _)) = data.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(Error::invalid_data(format!(
            "Non-finite value at row {}, column {}",
            row, col
        )));
    }

    Ok(())
}
