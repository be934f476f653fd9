//! # Spending categories from bank transactions
//!
//! This crate groups bank transactions into spending categories with
//! k-means (numeric) or k-prototypes (mixed numeric + categorical)
//! clustering, then lets an operator name each group.
//!
//! ## Features
//!
//! - **Encoding**: min/max-scaled amounts plus one-hot transaction type, merchant and particulars
//! - **Clustering**: Lloyd iteration with seeded restarts, run in parallel via Rayon
//! - **Cost curve**: cost over k for choosing a cluster count by eye
//! - **Labeling**: an [`Operator`] binds every cluster id to a category name
//! - CSV loading and saving, plus simple slicing of the records
//!
//! ## Example
//!
//! ```rust
//! use spendsort::{ClusterMode, Clusterer, FeatureEncoder, Record};
//! use chrono::NaiveDate;
//!
//! let day = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
//! let records = vec![
//!     Record::new(day, "Eft-Pos", "Countdown", "Card", -10.0),
//!     Record::new(day, "Eft-Pos", "Countdown", "Card", -20.0),
//!     Record::new(day, "Salary", "Employer", "Pay", 1000.0),
//!     Record::new(day, "Salary", "Employer", "Pay", 1050.0),
//! ];
//!
//! let matrix = FeatureEncoder::new().encode(&records).unwrap();
//!
//! let result = Clusterer::new(2)
//!     .mode(ClusterMode::Numeric)
//!     .n_init(5)
//!     .random_state(42)
//!     .fit(&matrix)
//!     .unwrap();
//!
//! assert_eq!(result.labels[0], result.labels[1]);
//! assert_ne!(result.labels[0], result.labels[2]);
//! ```

#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod cli;
pub mod clustering;
pub mod distance;
pub mod elbow;
pub mod encoding;
pub mod error;
pub mod initialization;
pub mod io;
pub mod reconcile;
pub mod record;
pub mod slicing;
pub mod utils;

pub use clustering::{cluster, ClusterResult, Clusterer};
pub use distance::{distance, ClusterMode, Distance, PrototypesDistance, SquaredEuclidean};
pub use elbow::{CostCurve, CostPoint};
pub use encoding::{encode, Column, EncodedMatrix, FeatureEncoder, FeatureLayout};
pub use error::{Error, Result};
pub use initialization::InitMethod;
pub use io::{load_records, save_records};
pub use reconcile::{CategoryBook, LabelReconciler, Operator, Reconciliation};
pub use record::{Attribute, Record};
pub use slicing::Slice;

/// Re-export commonly used types from ndarray
pub use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_reexported_pipeline() {
        let day = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let records = vec![
            Record::new(day, "Eft-Pos", "Cafe", "Card", -4.0),
            Record::new(day, "Eft-Pos", "Cafe", "Card", -5.0),
            Record::new(day, "Salary", "Employer", "Pay", 900.0),
        ];

        let matrix = encode(&records).unwrap();
        assert_eq!(matrix.column_name(0).unwrap(), "Amount");

        let result = cluster(&matrix, 2, ClusterMode::mixed(), 3).unwrap();
        assert_eq!(result.labels[0], result.labels[1]);
        assert_ne!(result.labels[0], result.labels[2]);
        assert_eq!(result.cluster_sizes().iter().sum::<usize>(), 3);
    }
}
