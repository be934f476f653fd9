//! Binding opaque cluster ids to human category labels

use crate::error::{Error, Result};
use crate::record::Record;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Answer that asks for a brand new label instead of an existing one
pub const NEW_LABEL: &str = "-";

/// Caller-owned list of category labels, in the order they were created
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBook {
    labels: Vec<String>,
}

impl CategoryBook {
    /// Empty book
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a label, returning its index. Existing labels are not duplicated.
    pub fn add(&mut self, label: impl Into<String>) -> usize {
        let label = label.into();
        match self.labels.iter().position(|l| *l == label) {
            Some(idx) => idx,
            None => {
                self.labels.push(label);
                self.labels.len() - 1
            }
        }
    }

    /// Label at `idx`
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.labels.get(idx).map(String::as_str)
    }

    /// All labels
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of labels
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether no label exists yet
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for CategoryBook {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut book = CategoryBook::new();
        for label in iter {
            book.add(label);
        }
        book
    }
}

impl fmt::Display for CategoryBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, label) in self.labels.iter().enumerate() {
            writeln!(f, "({}) : {}", i, label)?;
        }
        Ok(())
    }
}

/// The party that decides what each cluster means
pub trait Operator {
    /// Show up to `preview_size` members of `cluster` and the labels known so far
    fn preview(&mut self, cluster: usize, members: &[&Record], book: &CategoryBook);

    /// Read an answer: [`NEW_LABEL`] or the index of an existing label
    fn read_choice(&mut self) -> Result<String>;

    /// Read the name of a new label
    fn read_new_label(&mut self) -> Result<String>;

    /// Tell the operator their last answer was not usable
    fn reject(&mut self, reason: &str);
}

/// A parsed operator answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    /// Create a new label
    New,
    /// Reuse the label at this index
    Existing(usize),
}

impl Choice {
    /// Parse an answer against the current book
    pub fn parse(input: &str, book: &CategoryBook) -> std::result::Result<Self, String> {
        let input = input.trim();
        if input == NEW_LABEL {
            return Ok(Choice::New);
        }
        match input.parse::<usize>() {
            Ok(idx) if idx < book.len() => Ok(Choice::Existing(idx)),
            Ok(idx) => Err(format!("{} is not in the list", idx)),
            Err(_) => Err(format!("expected '{}' or a label number, got '{}'", NEW_LABEL, input)),
        }
    }
}

/// Outcome of a complete labeling session
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Label chosen for every cluster id that occurs in the assignment
    pub mapping: BTreeMap<usize, String>,
    /// The book including any labels created during the session
    pub book: CategoryBook,
    /// Input records with `classification` set from the mapping
    pub records: Vec<Record>,
}

/// Drives an [`Operator`] through every cluster once
#[derive(Debug, Clone)]
pub struct LabelReconciler {
    /// Number of member records shown per cluster
    pub preview_size: usize,
    /// Unusable answers tolerated per cluster before giving up
    pub max_attempts: usize,
}

impl Default for LabelReconciler {
    fn default() -> Self {
        Self::new(10)
    }
}

impl LabelReconciler {
    /// Create a reconciler showing `preview_size` records per cluster
    pub fn new(preview_size: usize) -> Self {
        Self {
            preview_size,
            max_attempts: 10,
        }
    }

    /// Set the per-cluster retry bound
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Ask the operator for a label per cluster and apply the result.
    ///
    /// Fails without a partial mapping if any cluster runs out of attempts.
    pub fn reconcile<O: Operator + ?Sized>(
        &self,
        records: &[Record],
        labels: ArrayView1<usize>,
        book: CategoryBook,
        operator: &mut O,
    ) -> Result<Reconciliation> {
        if records.len() != labels.len() {
            return Err(Error::invalid_parameter(format!(
                "{} records but {} cluster labels",
                records.len(),
                labels.len()
            )));
        }
        if self.max_attempts == 0 {
            return Err(Error::invalid_parameter("max_attempts must be > 0"));
        }

        let mut members: BTreeMap<usize, Vec<&Record>> = BTreeMap::new();
        for (record, &cluster) in records.iter().zip(labels.iter()) {
            members.entry(cluster).or_default().push(record);
        }

        let mut book = book;
        let mut mapping = BTreeMap::new();
        for (&cluster, rows) in &members {
            let shown = &rows[..rows.len().min(self.preview_size)];
            operator.preview(cluster, shown, &book);

            let label = self.ask(operator, &mut book)?;
            log::debug!("cluster {} ({} records) -> {}", cluster, rows.len(), label);
            mapping.insert(cluster, label);
        }

        let records = records
            .iter()
            .zip(labels.iter())
            .map(|(record, cluster)| match mapping.get(cluster) {
                Some(label) => Ok(record.with_classification(label.clone())),
                None => Err(Error::computation_error(format!("cluster {} has no label", cluster))),
            })
            .collect::<Result<Vec<_>>>()?;

        log::info!("labeled {} clusters with {} categories", mapping.len(), book.len());
        Ok(Reconciliation { mapping, book, records })
    }

    fn ask<O: Operator + ?Sized>(&self, operator: &mut O, book: &mut CategoryBook) -> Result<String> {
        for _ in 0..self.max_attempts {
            let answer = operator.read_choice()?;
            match Choice::parse(&answer, book) {
                Ok(Choice::Existing(idx)) => {
                    if let Some(label) = book.get(idx) {
                        return Ok(label.to_string());
                    }
                }
                Ok(Choice::New) => {
                    let name = operator.read_new_label()?;
                    let name = name.trim();
                    if name.is_empty() {
                        operator.reject("label cannot be empty");
                        continue;
                    }
                    book.add(name);
                    return Ok(name.to_string());
                }
                Err(reason) => operator.reject(&reason),
            }
        }

        Err(Error::InputExhausted {
            attempts: self.max_attempts,
        })
    }
}
