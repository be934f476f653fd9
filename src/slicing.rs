//! Filters and summaries over loaded records

use crate::error::{Error, Result};
use crate::record::Record;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Which side of zero to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Keep everything
    #[default]
    All,
    /// Money leaving the account (amount < 0)
    Spends,
    /// Money arriving (amount >= 0)
    Income,
}

/// A combination of filters applied in one pass
#[derive(Debug, Clone, Default)]
pub struct Slice {
    /// Sign filter
    pub direction: Direction,
    /// Keep only these transaction types; empty keeps all
    pub spend_types: Vec<String>,
    /// Inclusive lower date bound
    pub from: Option<NaiveDate>,
    /// Inclusive upper date bound
    pub to: Option<NaiveDate>,
}

impl Slice {
    /// A slice that keeps every record
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sign filter
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Restrict to the given transaction types
    pub fn spend_types(mut self, spend_types: Vec<String>) -> Self {
        self.spend_types = spend_types;
        self
    }

    /// Restrict to an inclusive date range; either end may be open
    pub fn dates(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    /// Apply every filter, preserving input order
    pub fn apply(&self, records: &[Record]) -> Result<Vec<Record>> {
        let mut kept = match self.direction {
            Direction::All => records.to_vec(),
            Direction::Spends => spends_only(records),
            Direction::Income => income_only(records),
        };
        if !self.spend_types.is_empty() {
            kept = by_spend_types(&kept, &self.spend_types);
        }
        if self.from.is_some() || self.to.is_some() {
            kept = by_date_range(&kept, self.from, self.to)?;
        }

        log::debug!("slice kept {} of {} records", kept.len(), records.len());
        Ok(kept)
    }
}

/// Records with a negative amount
pub fn spends_only(records: &[Record]) -> Vec<Record> {
    records.iter().filter(|r| r.quantity < 0.0).cloned().collect()
}

/// Records with a zero or positive amount
pub fn income_only(records: &[Record]) -> Vec<Record> {
    records.iter().filter(|r| r.quantity >= 0.0).cloned().collect()
}

/// Records whose transaction type is one of `spend_types`
pub fn by_spend_types<S: AsRef<str>>(records: &[Record], spend_types: &[S]) -> Vec<Record> {
    records
        .iter()
        .filter(|r| spend_types.iter().any(|t| t.as_ref() == r.spend_type))
        .cloned()
        .collect()
}

/// Records dated within `[from, to]`
pub fn by_date_range(records: &[Record], from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Vec<Record>> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(Error::invalid_parameter(format!(
                "Date range starts after it ends ({} > {})",
                from, to
            )));
        }
    }

    Ok(records
        .iter()
        .filter(|r| from.map_or(true, |f| r.date >= f) && to.map_or(true, |t| r.date <= t))
        .cloned()
        .collect())
}

/// Records carrying the given label
pub fn by_classification(records: &[Record], label: &str) -> Vec<Record> {
    records
        .iter()
        .filter(|r| r.classification.as_deref() == Some(label))
        .cloned()
        .collect()
}

/// Distinct transaction types in first-seen order
pub fn spend_types(records: &[Record]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for record in records {
        if !seen.contains(&record.spend_type) {
            seen.push(record.spend_type.clone());
        }
    }
    seen
}

/// Sum of amounts per calendar day
pub fn total_per_day(records: &[Record]) -> BTreeMap<NaiveDate, f64> {
    let mut totals = BTreeMap::new();
    for record in records {
        *totals.entry(record.date).or_insert(0.0) += record.quantity;
    }
    totals
}
