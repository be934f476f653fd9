//! Lloyd-style clustering of encoded records (k-means and k-prototypes)

use crate::distance::{block_mode, ClusterMode};
use crate::encoding::{EncodedMatrix, FeatureLayout};
use crate::error::{Error, Result};
use crate::initialization::{harden, initialize_centroids, InitMethod};
use crate::utils::{
    assign_points_to_centroids, assignments_equal, cluster_sizes, get_cluster_indices,
    validate_data, validate_parameters,
};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::prelude::*;
use rayon::prelude::*;

/// Iterative centroid-relocation clusterer for encoded transaction data
#[derive(Debug, Clone)]
pub struct Clusterer {
    /// Number of clusters
    pub n_clusters: usize,
    /// Distance and update rules
    pub mode: ClusterMode,
    /// Initialization method
    pub init_method: InitMethod,
    /// Maximum number of update steps
    pub max_iter: usize,
    /// Relative cost change under which a run counts as converged
    pub tol: f64,
    /// Number of initialization runs
    pub n_init: usize,
    /// Random seed for reproducibility
    pub random_state: Option<u64>,
    /// Number of parallel jobs
    pub n_jobs: Option<usize>,
    /// Log every iteration at debug level instead of trace
    pub verbose: bool,
}

/// Result of one clustering
#[derive(Debug, Clone)]
pub struct ClusterResult {
    /// Cluster id for each input row, in input order
    pub labels: Array1<usize>,
    /// Final centroids, one row per cluster
    pub centroids: Array2<f64>,
    /// Total distance from every row to its centroid
    pub cost: f64,
    /// Number of update steps performed
    pub n_iter: usize,
    /// Whether the run converged before hitting `max_iter`
    pub converged: bool,
    /// Cost after the initial assignment and after every update step
    pub cost_history: Vec<f64>,
    /// Mode the result was produced with
    pub mode: ClusterMode,
}

impl ClusterResult {
    /// Number of clusters
    pub fn n_clusters(&self) -> usize {
        self.centroids.nrows()
    }

    /// Number of rows assigned to each cluster
    pub fn cluster_sizes(&self) -> Vec<usize> {
        cluster_sizes(self.labels.view(), self.n_clusters())
    }
}

impl Default for Clusterer {
    fn default() -> Self {
        Self {
            n_clusters: 8,
            mode: ClusterMode::Numeric,
            init_method: InitMethod::Random,
            max_iter: 100,
            tol: 1e-4,
            n_init: 10,
            random_state: None,
            n_jobs: None,
            verbose: false,
        }
    }
}

impl Clusterer {
    /// Create a new clusterer with the given number of clusters
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            ..Default::default()
        }
    }

    /// Set the distance/update mode
    pub fn mode(mut self, mode: ClusterMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the initialization method
    pub fn init_method(mut self, method: InitMethod) -> Self {
        self.init_method = method;
        self
    }

    /// Set the maximum number of iterations
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the convergence tolerance
    pub fn tolerance(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set the number of initialization runs
    pub fn n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    /// Set the random seed for reproducibility
    pub fn random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Set the number of parallel jobs
    pub fn n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = Some(n_jobs);
        self
    }

    /// Enable verbose output
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Cluster the encoded rows, keeping the cheapest of `n_init` runs.
    ///
    /// Run `i` is seeded with `random_state + i`; equal costs keep the
    /// earlier run, so parallel and sequential execution agree.
    pub fn fit(&self, matrix: &EncodedMatrix) -> Result<ClusterResult> {
        self.validate_input(matrix, self.n_clusters)?;

        let data = matrix.data();
        let layout = matrix.layout();
        let base_seed = self.random_state.unwrap_or(0);
        let run = |i: usize| self.fit_single(data, layout, base_seed.wrapping_add(i as u64));

        let results: Vec<Result<ClusterResult>> = if self.should_use_parallel() {
            match self.n_jobs {
                Some(n_jobs) => rayon::ThreadPoolBuilder::new()
                    .num_threads(n_jobs)
                    .build()
                    .map_err(|e| Error::computation_error(e.to_string()))?
                    .install(|| (0..self.n_init).into_par_iter().map(run).collect()),
                None => (0..self.n_init).into_par_iter().map(run).collect(),
            }
        } else {
            (0..self.n_init).map(run).collect()
        };

        let mut best_result: Option<ClusterResult> = None;
        for result in results {
            let result = result?;
            let better = best_result
                .as_ref()
                .map_or(true, |best| result.cost < best.cost);
            if better {
                best_result = Some(result);
            }
        }

        let best = best_result.ok_or_else(|| Error::computation_error("No successful runs"))?;
        log::info!(
            "k={} {:?}: cost {:.6} after {} iterations (converged: {})",
            best.n_clusters(),
            self.mode,
            best.cost,
            best.n_iter,
            best.converged
        );
        Ok(best)
    }

    /// Run a single relocation pass starting from the given centroids.
    ///
    /// The number of clusters is taken from `initial_centroids`.
    pub fn fit_from(&self, matrix: &EncodedMatrix, initial_centroids: Array2<f64>) -> Result<ClusterResult> {
        let k = initial_centroids.nrows();
        self.validate_input(matrix, k)?;

        if initial_centroids.ncols() != matrix.ncols() {
            return Err(Error::dimension_mismatch(matrix.ncols(), initial_centroids.ncols()));
        }
        validate_data(initial_centroids.view())?;

        let mut centroids = initial_centroids;
        if self.mode.is_mixed() {
            for row in centroids.rows_mut() {
                harden(row, matrix.layout());
            }
        }

        self.relocate(matrix.data(), matrix.layout(), centroids)
    }

    /// Fit the model and return only the cluster ids
    pub fn fit_predict(&self, matrix: &EncodedMatrix) -> Result<Array1<usize>> {
        Ok(self.fit(matrix)?.labels)
    }

    /// Single seeded run
    fn fit_single(&self, data: ArrayView2<f64>, layout: &FeatureLayout, seed: u64) -> Result<ClusterResult> {
        let mut rng = StdRng::seed_from_u64(seed);
        let centroids = initialize_centroids(
            data,
            layout,
            self.n_clusters,
            self.init_method,
            self.mode,
            &mut rng,
        )?;
        self.relocate(data, layout, centroids)
    }

    /// Alternate assignment and update until the cost settles or `max_iter` is hit
    fn relocate(
        &self,
        data: ArrayView2<f64>,
        layout: &FeatureLayout,
        mut centroids: Array2<f64>,
    ) -> Result<ClusterResult> {
        let (mut labels, mut cost) =
            assign_points_to_centroids(data, centroids.view(), layout, &self.mode)?;
        let mut cost_history = vec![cost];
        let mut n_iter = 0;
        let mut converged = false;

        while n_iter < self.max_iter {
            n_iter += 1;

            let new_centroids = self.update_centroids(data, layout, &labels, &centroids)?;
            let (new_labels, new_cost) =
                assign_points_to_centroids(data, new_centroids.view(), layout, &self.mode)?;

            let stable = assignments_equal(labels.view(), new_labels.view());
            let change = relative_change(cost, new_cost);

            centroids = new_centroids;
            labels = new_labels;
            cost = new_cost;
            cost_history.push(cost);

            if self.verbose {
                log::debug!("iteration {}: cost {:.6} (change {:.3e})", n_iter, cost, change);
            } else {
                log::trace!("iteration {}: cost {:.6} (change {:.3e})", n_iter, cost, change);
            }

            if stable || change <= self.tol {
                converged = true;
                break;
            }
        }

        if !converged {
            log::warn!(
                "stopped after {} iterations without converging (cost {:.6})",
                n_iter,
                cost
            );
        }

        Ok(ClusterResult {
            labels,
            centroids,
            cost,
            n_iter,
            converged,
            cost_history,
            mode: self.mode,
        })
    }

    /// Move each centroid to the mean of its members (and, in mixed mode,
    /// each categorical block to its plurality value). A centroid with no
    /// members keeps its previous position.
    fn update_centroids(
        &self,
        data: ArrayView2<f64>,
        layout: &FeatureLayout,
        labels: &Array1<usize>,
        previous: &Array2<f64>,
    ) -> Result<Array2<f64>> {
        let n_clusters = previous.nrows();
        let cluster_indices = get_cluster_indices(labels.view(), n_clusters);
        let mut new_centroids = previous.clone();

        for (cluster_id, indices) in cluster_indices.iter().enumerate() {
            if indices.is_empty() {
                log::warn!("cluster {} is empty, keeping its centroid", cluster_id);
                continue;
            }

            let mean = data
                .select(Axis(0), indices)
                .mean_axis(Axis(0))
                .ok_or_else(|| Error::computation_error("Cannot average an empty cluster"))?;
            let mut row = new_centroids.row_mut(cluster_id);
            row.assign(&mean);

            if self.mode.is_mixed() {
                for block in layout.blocks() {
                    let mode = block_mode(data, indices, block)
                        .ok_or_else(|| Error::computation_error("Unable to compute mode"))?;
                    for (offset, idx) in block.columns.clone().enumerate() {
                        row[idx] = if offset == mode { 1.0 } else { 0.0 };
                    }
                }
            }
        }

        Ok(new_centroids)
    }

    /// Validate input parameters and data
    fn validate_input(&self, matrix: &EncodedMatrix, n_clusters: usize) -> Result<()> {
        validate_parameters(n_clusters, self.max_iter, self.tol, self.n_init)?;
        self.mode.validate()?;
        validate_data(matrix.data())?;

        if n_clusters > matrix.nrows() {
            return Err(Error::invalid_parameter(format!(
                "Number of clusters ({}) cannot exceed number of data points ({})",
                n_clusters,
                matrix.nrows()
            )));
        }

        if matrix.layout().n_columns() != matrix.ncols() {
            return Err(Error::dimension_mismatch(matrix.layout().n_columns(), matrix.ncols()));
        }

        Ok(())
    }

    /// Determine if parallel processing should be used
    fn should_use_parallel(&self) -> bool {
        match self.n_jobs {
            Some(1) => false,
            Some(_) => true,
            None => self.n_init > 1,
        }
    }
}

/// Cluster `matrix` into `k` groups with default settings and a fixed seed
pub fn cluster(matrix: &EncodedMatrix, k: usize, mode: ClusterMode, seed: u64) -> Result<ClusterResult> {
    Clusterer::new(k).mode(mode).random_state(seed).fit(matrix)
}

/// Relative drop between successive costs; a zero previous cost counts as settled
fn relative_change(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        (previous - current).abs() / previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::CategoricalBlock;
    use ndarray::Array2;

    fn line(values: &[f64]) -> EncodedMatrix {
        EncodedMatrix::numeric(Array2::from_shape_vec((values.len(), 1), values.to_vec()).unwrap())
    }

    #[test]
    fn test_clusterer_creation() {
        let clusterer = Clusterer::new(3);
        assert_eq!(clusterer.n_clusters, 3);
        assert_eq!(clusterer.mode, ClusterMode::Numeric);
        assert_eq!(clusterer.init_method, InitMethod::Random);
    }

    #[test]
    fn test_builder_pattern() {
        let clusterer = Clusterer::new(5)
            .mode(ClusterMode::Mixed { gamma: 0.5 })
            .init_method(InitMethod::Cao)
            .max_iter(50)
            .tolerance(0.001)
            .n_init(5)
            .random_state(42)
            .n_jobs(2)
            .verbose(true);

        assert_eq!(clusterer.n_clusters, 5);
        assert_eq!(clusterer.mode, ClusterMode::Mixed { gamma: 0.5 });
        assert_eq!(clusterer.init_method, InitMethod::Cao);
        assert_eq!(clusterer.max_iter, 50);
        assert_eq!(clusterer.tol, 0.001);
        assert_eq!(clusterer.n_init, 5);
        assert_eq!(clusterer.random_state, Some(42));
        assert_eq!(clusterer.n_jobs, Some(2));
        assert!(clusterer.verbose);
    }

    #[test]
    fn test_simple_clustering() {
        let matrix = line(&[0.0, 0.05, 0.1, 0.9, 0.95, 1.0]);
        let result = Clusterer::new(2).random_state(42).n_init(3).fit(&matrix).unwrap();

        assert_eq!(result.labels.len(), 6);
        assert_eq!(result.centroids.dim(), (2, 1));
        assert!(result.converged);
        assert_eq!(result.labels[0], result.labels[2]);
        assert_eq!(result.labels[3], result.labels[5]);
        assert_ne!(result.labels[0], result.labels[5]);
        assert!((result.cost - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_cost_history_is_non_increasing() {
        let data = Array2::from_shape_fn((40, 2), |(i, j)| ((i * 7 + j * 13) % 17) as f64 / 17.0);
        let matrix = EncodedMatrix::numeric(data);

        for seed in 0..5 {
            let result = Clusterer::new(4)
                .random_state(seed)
                .n_init(1)
                .tolerance(0.0)
                .fit(&matrix)
                .unwrap();
            for pair in result.cost_history.windows(2) {
                assert!(pair[1] <= pair[0] + 1e-9, "cost rose: {:?}", result.cost_history);
            }
            assert_eq!(*result.cost_history.last().unwrap(), result.cost);
        }
    }

    #[test]
    fn test_iteration_cap_is_not_an_error() {
        let matrix = line(&[0.0, 0.2, 0.4, 0.6, 0.8, 1.0]);
        let result = Clusterer::new(3)
            .init_method(InitMethod::Uniform)
            .random_state(1)
            .n_init(1)
            .max_iter(1)
            .tolerance(0.0)
            .fit(&matrix)
            .unwrap();

        assert_eq!(result.n_iter, 1);
        assert_eq!(result.labels.len(), 6);
        assert!(result.labels.iter().all(|&l| l < 3));
    }

    #[test]
    fn test_empty_cluster_keeps_centroid() {
        let matrix = line(&[0.0, 0.1, 0.2]);
        let initial = Array2::from_shape_vec((2, 1), vec![0.1, 5.0]).unwrap();

        let result = Clusterer::new(2).fit_from(&matrix, initial).unwrap();

        assert_eq!(result.n_clusters(), 2);
        assert_eq!(result.centroids[[1, 0]], 5.0);
        assert_eq!(result.cluster_sizes(), vec![3, 0]);
    }

    #[test]
    fn test_mixed_mode_centroids_follow_plurality() {
        // [amount | A B]
        let data = Array2::from_shape_vec(
            (5, 3),
            vec![
                0.0, 1.0, 0.0,
                0.1, 1.0, 0.0,
                0.2, 0.0, 1.0,
                0.9, 0.0, 1.0,
                1.0, 0.0, 1.0,
            ],
        )
        .unwrap();
        let layout = FeatureLayout::new(
            3,
            vec![0],
            vec![CategoricalBlock { attribute: None, columns: 1..3 }],
        )
        .unwrap();
        let matrix = EncodedMatrix::with_layout(data, layout).unwrap();

        let initial = Array2::from_shape_vec((2, 3), vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0]).unwrap();
        let result = Clusterer::new(2)
            .mode(ClusterMode::Mixed { gamma: 0.1 })
            .fit_from(&matrix, initial)
            .unwrap();

        for row in result.centroids.rows() {
            assert!(row[1] == 0.0 || row[1] == 1.0);
            assert_eq!(row[1] + row[2], 1.0);
        }
        assert_eq!(result.labels.to_vec(), vec![0, 0, 0, 1, 1]);
        // cluster 0 holds two A's and one B
        assert_eq!(&result.centroids.row(0).to_vec()[1..], &[1.0, 0.0]);
    }

    #[test]
    fn test_deterministic_under_seed() {
        let data = Array2::from_shape_fn((30, 3), |(i, j)| ((i * 5 + j * 11) % 13) as f64 / 13.0);
        let matrix = EncodedMatrix::numeric(data);

        let clusterer = Clusterer::new(3).random_state(9).n_init(4);
        let a = clusterer.fit(&matrix).unwrap();
        let b = clusterer.fit(&matrix).unwrap();
        let sequential = clusterer.clone().n_jobs(1).fit(&matrix).unwrap();

        assert_eq!(a.labels, b.labels);
        assert_eq!(a.centroids, b.centroids);
        assert_eq!(a.cost, b.cost);
        assert_eq!(a.labels, sequential.labels);
        assert_eq!(a.cost, sequential.cost);
    }

    #[test]
    fn test_invalid_parameters() {
        let matrix = line(&[0.0, 1.0]);

        let err = Clusterer::new(0).fit(&matrix).unwrap_err();
        assert!(err.is_invalid_parameter());

        let err = Clusterer::new(3).fit(&matrix).unwrap_err();
        assert!(err.is_invalid_parameter());

        assert!(Clusterer::new(1).max_iter(0).fit(&matrix).is_err());
        assert!(Clusterer::new(1).n_init(0).fit(&matrix).is_err());
        assert!(Clusterer::new(1)
            .mode(ClusterMode::Mixed { gamma: -1.0 })
            .fit(&matrix)
            .is_err());
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let matrix = line(&[0.0, f64::NAN, 1.0]);
        let result = Clusterer::new(1).fit(&matrix);
        assert!(matches!(result, Err(Error::InvalidData { .. })));

        let good = line(&[0.0, 1.0]);
        let initial = Array2::from_shape_vec((1, 1), vec![f64::INFINITY]).unwrap();
        assert!(Clusterer::new(1).fit_from(&good, initial).is_err());
    }

    #[test]
    fn test_fit_from_dimension_mismatch() {
        let matrix = line(&[0.0, 1.0]);
        let initial = Array2::zeros((1, 2));
        let result = Clusterer::new(1).fit_from(&matrix, initial);
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn test_relative_change() {
        assert_eq!(relative_change(0.0, 0.0), 0.0);
        assert!((relative_change(2.0, 1.0) - 0.5).abs() < 1e-12);
        assert!((relative_change(1.0, 1.0)).abs() < 1e-12);
    }
}
