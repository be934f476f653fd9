//! Turning transaction records into a clusterable numeric matrix

use crate::error::{Error, Result};
use crate::record::{Attribute, Record};
use ndarray::{Array2, ArrayView2};
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

/// Meaning of one encoded column
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Quantity scaled into `[0, 1]`
    Quantity,
    /// Column of a matrix supplied already encoded
    Feature(usize),
    /// Indicator for one observed value of a categorical attribute
    Indicator {
        /// Attribute the value belongs to
        attribute: Attribute,
        /// The observed value
        value: String,
    },
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Column::Quantity => f.write_str("Amount"),
            Column::Feature(idx) => write!(f, "x{}", idx),
            Column::Indicator { attribute, value } => write!(f, "{}_{}", attribute, value),
        }
    }
}

/// Contiguous one-hot columns of a single categorical attribute
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalBlock {
    /// Attribute encoded by the block, if it came from a record field
    pub attribute: Option<Attribute>,
    /// Columns of the block in the encoded matrix
    pub columns: Range<usize>,
}

/// Which columns are numeric and which form categorical blocks.
///
/// The mixed distance treats each block as a single discrete dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureLayout {
    n_columns: usize,
    numeric: Vec<usize>,
    blocks: Vec<CategoricalBlock>,
}

impl FeatureLayout {
    /// Layout in which every column is numeric
    pub fn numeric(n_columns: usize) -> Self {
        Self {
            n_columns,
            numeric: (0..n_columns).collect(),
            blocks: Vec::new(),
        }
    }

    /// Build a layout from numeric column indices and categorical blocks.
    ///
    /// Every column must be covered exactly once and blocks must be non-empty.
    pub fn new(n_columns: usize, numeric: Vec<usize>, blocks: Vec<CategoricalBlock>) -> Result<Self> {
        let mut covered = vec![false; n_columns];
        let block_columns = blocks.iter().flat_map(|block| block.columns.clone());

        for idx in numeric.iter().copied().chain(block_columns) {
            if idx >= n_columns {
                return Err(Error::invalid_parameter("Layout column index out of bounds"));
            }
            if covered[idx] {
                return Err(Error::invalid_parameter("Duplicate column in layout"));
            }
            covered[idx] = true;
        }

        if blocks.iter().any(|block| block.columns.is_empty()) {
            return Err(Error::invalid_parameter("Categorical block cannot be empty"));
        }
        if covered.iter().any(|&c| !c) {
            return Err(Error::invalid_parameter("Layout leaves columns unassigned"));
        }

        Ok(Self {
            n_columns,
            numeric,
            blocks,
        })
    }

    /// Total number of columns described
    pub fn n_columns(&self) -> usize {
        self.n_columns
    }

    /// Indices of numeric columns
    pub fn numeric_columns(&self) -> &[usize] {
        &self.numeric
    }

    /// Categorical blocks in column order
    pub fn blocks(&self) -> &[CategoricalBlock] {
        &self.blocks
    }
}

/// Records encoded as rows of `f64`, with the metadata needed to read them back
#[derive(Debug, Clone)]
pub struct EncodedMatrix {
    data: Array2<f64>,
    columns: Vec<Column>,
    layout: FeatureLayout,
    quantity_range: Option<(f64, f64)>,
}

impl EncodedMatrix {
    /// Wrap an already-encoded matrix whose columns are all numeric
    pub fn numeric(data: Array2<f64>) -> Self {
        let n_columns = data.ncols();
        Self {
            columns: (0..n_columns).map(Column::Feature).collect(),
            layout: FeatureLayout::numeric(n_columns),
            quantity_range: None,
            data,
        }
    }

    /// Wrap an already-encoded matrix with an explicit layout
    pub fn with_layout(data: Array2<f64>, layout: FeatureLayout) -> Result<Self> {
        if layout.n_columns() != data.ncols() {
            return Err(Error::dimension_mismatch(layout.n_columns(), data.ncols()));
        }
        let columns = (0..data.ncols()).map(Column::Feature).collect();
        Ok(Self {
            data,
            columns,
            layout,
            quantity_range: None,
        })
    }

    /// The encoded rows
    pub fn data(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    /// Number of encoded records
    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of encoded columns
    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    /// Column meanings in order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Human-readable name of a column
    pub fn column_name(&self, idx: usize) -> Option<String> {
        self.columns.get(idx).map(|column| column.to_string())
    }

    /// Numeric/categorical structure of the columns
    pub fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    /// `(min, max)` of the raw quantities, when encoded from records
    pub fn quantity_range(&self) -> Option<(f64, f64)> {
        self.quantity_range
    }
}

/// Encodes records as one scaled quantity column plus one-hot blocks
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    /// Categorical attributes to expand, in column order
    pub attributes: Vec<Attribute>,
}

impl Default for FeatureEncoder {
    fn default() -> Self {
        Self {
            attributes: Attribute::ALL.to_vec(),
        }
    }
}

impl FeatureEncoder {
    /// Encoder over all clustering attributes
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict (or reorder) the categorical attributes that get encoded
    pub fn attributes(mut self, attributes: Vec<Attribute>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Encode records into a matrix with one row per record.
    ///
    /// Indicator columns appear in first-seen order within each attribute.
    /// A constant quantity column encodes to `0.0` for every row.
    pub fn encode(&self, records: &[Record]) -> Result<EncodedMatrix> {
        if records.is_empty() {
            return Err(Error::invalid_parameter("Cannot encode an empty record set"));
        }

        let mut seen = vec![false; Attribute::ALL.len()];
        for attribute in &self.attributes {
            let slot = &mut seen[*attribute as usize];
            if *slot {
                return Err(Error::invalid_parameter(format!(
                    "Attribute {} listed twice",
                    attribute
                )));
            }
            *slot = true;
        }

        let (min, max) = quantity_range(records)?;

        let mut columns = vec![Column::Quantity];
        let mut blocks = Vec::with_capacity(self.attributes.len());
        let mut lookups = Vec::with_capacity(self.attributes.len());

        for &attribute in &self.attributes {
            let start = columns.len();
            let mut index: HashMap<&str, usize> = HashMap::new();
            for record in records {
                let value = record.attribute(attribute);
                if !index.contains_key(value) {
                    index.insert(value, columns.len());
                    columns.push(Column::Indicator {
                        attribute,
                        value: value.to_string(),
                    });
                }
            }
            blocks.push(CategoricalBlock {
                attribute: Some(attribute),
                columns: start..columns.len(),
            });
            lookups.push((attribute, index));
        }

        let mut data = Array2::zeros((records.len(), columns.len()));
        for (row, record) in records.iter().enumerate() {
            data[[row, 0]] = scale(record.quantity, min, max);
            for (attribute, index) in &lookups {
                let col = index[record.attribute(*attribute)];
                data[[row, col]] = 1.0;
            }
        }

        let layout = FeatureLayout::new(columns.len(), vec![0], blocks)?;
        log::debug!(
            "encoded {} records into {} columns (amount range {}..{})",
            records.len(),
            columns.len(),
            min,
            max
        );

        Ok(EncodedMatrix {
            data,
            columns,
            layout,
            quantity_range: Some((min, max)),
        })
    }
}

/// Encode records with the default encoder
pub fn encode(records: &[Record]) -> Result<EncodedMatrix> {
    FeatureEncoder::default().encode(records)
}

/// Min/max of the quantities, rejecting non-finite amounts
fn quantity_range(records: &[Record]) -> Result<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for record in records {
        if !record.quantity.is_finite() {
            return Err(Error::invalid_data(format!(
                "Non-finite amount on {}",
                record.date
            )));
        }
        min = min.min(record.quantity);
        max = max.max(record.quantity);
    }
    Ok((min, max))
}

/// Min-max scaling with the zero-range case pinned to 0
fn scale(x: f64, min: f64, max: f64) -> f64 {
    let range = max - min;
    if range > 0.0 {
        (x - min) / range
    } else {
        0.0
    }
}
