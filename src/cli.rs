//! Command-line interface definitions and the interactive terminal operator

use crate::clustering::Clusterer;
use crate::distance::ClusterMode;
use crate::elbow::CostPoint;
use crate::error::{Error, Result};
use crate::initialization::InitMethod;
use crate::reconcile::{CategoryBook, Operator, NEW_LABEL};
use crate::record::{parse_date, Record, OUTPUT_DATE_FORMAT};
use crate::slicing::{Direction, Slice};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use dialoguer::{Confirm, Input};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Cluster bank transactions into spending categories and label them
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long)]
    pub input: PathBuf,

    /// Number of clusters; asked for interactively when omitted
    #[arg(short = 'k', long)]
    pub clusters: Option<usize>,

    /// Distance used for clustering
    #[arg(long, value_enum, default_value_t = ModeArg::Numeric)]
    pub mode: ModeArg,

    /// Weight of a categorical mismatch in mixed mode
    #[arg(long, default_value = "1.0")]
    pub gamma: f64,

    /// Centroid seeding strategy
    #[arg(long, value_enum, default_value_t = InitArg::Random)]
    pub init: InitArg,

    /// Maximum Lloyd iterations per run
    #[arg(long, default_value = "100")]
    pub max_iters: usize,

    /// Relative cost change treated as converged
    #[arg(long, default_value = "1e-4")]
    pub tolerance: f64,

    /// Number of restarts; the cheapest is kept
    #[arg(long, default_value = "10")]
    pub n_init: usize,

    /// Seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the cost curve over k before clustering
    #[arg(long)]
    pub elbow: bool,

    /// Ratio below which another cluster is not worth it
    #[arg(long, default_value = "1.01")]
    pub threshold: f64,

    /// Records shown per cluster while labeling
    #[arg(long, default_value = "10")]
    pub preview: usize,

    /// Where to write the labeled records
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Replace the output file without asking
    #[arg(long)]
    pub overwrite: bool,

    /// Only cluster money leaving the account
    #[arg(long, conflicts_with = "income_only")]
    pub spends_only: bool,

    /// Only cluster money arriving
    #[arg(long)]
    pub income_only: bool,

    /// Only cluster these transaction types (repeatable)
    #[arg(long = "spend-type")]
    pub spend_types: Vec<String>,

    /// Earliest date to include
    #[arg(long, value_parser = parse_date_arg)]
    pub from: Option<NaiveDate>,

    /// Latest date to include
    #[arg(long, value_parser = parse_date_arg)]
    pub to: Option<NaiveDate>,

    /// Print total spending per day of the selected records
    #[arg(long)]
    pub daily: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Clustering mode on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// k-means over every encoded column
    Numeric,
    /// k-prototypes with categorical matching
    Mixed,
}

/// Initialization method on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InitArg {
    /// Sample distinct rows
    Random,
    /// Uniform point inside the data's bounding box
    Uniform,
    /// Density and dissimilarity based
    Cao,
}

impl From<InitArg> for InitMethod {
    fn from(arg: InitArg) -> Self {
        match arg {
            InitArg::Random => InitMethod::Random,
            InitArg::Uniform => InitMethod::Uniform,
            InitArg::Cao => InitMethod::Cao,
        }
    }
}

fn parse_date_arg(text: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(text).map_err(|e| e.to_string())
}

impl Args {
    /// Cluster mode selected by `--mode` and `--gamma`
    pub fn cluster_mode(&self) -> ClusterMode {
        match self.mode {
            ModeArg::Numeric => ClusterMode::Numeric,
            ModeArg::Mixed => ClusterMode::Mixed { gamma: self.gamma },
        }
    }

    /// Clusterer configured from the arguments for `k` clusters
    pub fn clusterer(&self, k: usize) -> Clusterer {
        let clusterer = Clusterer::new(k)
            .mode(self.cluster_mode())
            .init_method(self.init.into())
            .max_iter(self.max_iters)
            .tolerance(self.tolerance)
            .n_init(self.n_init)
            .verbose(self.verbose);

        match self.seed {
            Some(seed) => clusterer.random_state(seed),
            None => clusterer,
        }
    }

    /// Record filters selected on the command line
    pub fn slice(&self) -> Slice {
        let direction = if self.spends_only {
            Direction::Spends
        } else if self.income_only {
            Direction::Income
        } else {
            Direction::All
        };

        Slice::new()
            .direction(direction)
            .spend_types(self.spend_types.clone())
            .dates(self.from, self.to)
    }
}

/// Render a cost curve as a two-column table
pub fn cost_table(curve: &[CostPoint]) -> String {
    let mut out = format!("{:>4}  {:>14}\n", "k", "cost");
    for point in curve {
        out.push_str(&format!("{:>4}  {:>14.6}\n", point.k, point.cost));
    }
    out
}

/// Render per-day totals as a two-column table
pub fn daily_table(totals: &BTreeMap<NaiveDate, f64>) -> String {
    let mut out = format!("{:<10}  {:>12}\n", "date", "total");
    for (date, total) in totals {
        out.push_str(&format!("{:<10}  {:>12.2}\n", date.format(OUTPUT_DATE_FORMAT), total));
    }
    out
}

/// Operator that talks to a person on the terminal
#[derive(Debug, Default)]
pub struct TerminalOperator;

impl Operator for TerminalOperator {
    fn preview(&mut self, cluster: usize, members: &[&Record], book: &CategoryBook) {
        println!("\n=== Cluster {} ===", cluster);
        for record in members {
            println!("{}", record);
        }
        println!("\nKnown categories:");
        print!("{}", book);
        println!("({}) : new category", NEW_LABEL);
    }

    fn read_choice(&mut self) -> Result<String> {
        Input::new()
            .with_prompt("Category for this cluster")
            .interact_text()
            .map_err(prompt_error)
    }

    fn read_new_label(&mut self) -> Result<String> {
        Input::new()
            .with_prompt("Name of the new category")
            .allow_empty(true)
            .interact_text()
            .map_err(prompt_error)
    }

    fn reject(&mut self, reason: &str) {
        println!("That didn't work: {}", reason);
    }
}

/// Ask for the number of clusters
pub fn ask_clusters(max: usize) -> Result<usize> {
    Input::new()
        .with_prompt(format!("Number of clusters [1-{}]", max))
        .validate_with(|k: &usize| -> std::result::Result<(), String> {
            if *k == 0 || *k > max {
                return Err(format!("Enter a number between 1 and {}", max));
            }
            Ok(())
        })
        .interact_text()
        .map_err(prompt_error)
}

/// Ask before replacing an existing file
pub fn confirm_overwrite(path: &std::path::Path) -> Result<bool> {
    Confirm::new()
        .with_prompt(format!("{} already exists, overwrite it?", path.display()))
        .default(false)
        .interact()
        .map_err(prompt_error)
}

fn prompt_error(e: dialoguer::Error) -> Error {
    Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let args = Args::try_parse_from(["spendsort", "--input", "data.csv"]).unwrap();

        assert_eq!(args.clusters, None);
        assert_eq!(args.cluster_mode(), ClusterMode::Numeric);
        assert_eq!(args.preview, 10);
        assert_eq!(args.threshold, 1.01);

        let clusterer = args.clusterer(4);
        assert_eq!(clusterer.n_clusters, 4);
        assert_eq!(clusterer.max_iter, 100);
        assert_eq!(clusterer.tol, 1e-4);
        assert_eq!(clusterer.random_state, None);
    }

    #[test]
    fn test_parse_full() {
        let args = Args::try_parse_from([
            "spendsort",
            "-i",
            "data.csv",
            "-k",
            "3",
            "--mode",
            "mixed",
            "--gamma",
            "0.5",
            "--init",
            "cao",
            "--seed",
            "9",
            "--spends-only",
            "--spend-type",
            "Eft-Pos",
            "--spend-type",
            "Visa Purchase",
            "--from",
            "01/02/2023",
            "--to",
            "2023-02-28",
        ])
        .unwrap();

        assert_eq!(args.clusters, Some(3));
        assert_eq!(args.cluster_mode(), ClusterMode::Mixed { gamma: 0.5 });

        let clusterer = args.clusterer(3);
        assert_eq!(clusterer.init_method, InitMethod::Cao);
        assert_eq!(clusterer.random_state, Some(9));

        let slice = args.slice();
        assert_eq!(slice.direction, Direction::Spends);
        assert_eq!(slice.spend_types, vec!["Eft-Pos", "Visa Purchase"]);
        assert_eq!(slice.from, NaiveDate::from_ymd_opt(2023, 2, 1));
        assert_eq!(slice.to, NaiveDate::from_ymd_opt(2023, 2, 28));
    }

    #[test]
    fn test_rejects_bad_arguments() {
        assert!(Args::try_parse_from(["spendsort", "-i", "a.csv", "--from", "not-a-date"]).is_err());
        assert!(Args::try_parse_from(["spendsort", "-i", "a.csv", "--mode", "fuzzy"]).is_err());
        assert!(Args::try_parse_from(["spendsort", "-i", "a.csv", "--spends-only", "--income-only"]).is_err());
    }

    #[test]
    fn test_tables() {
        let curve = [CostPoint { k: 1, cost: 2.5 }, CostPoint { k: 2, cost: 0.25 }];
        let table = cost_table(&curve);
        assert_eq!(table.lines().count(), 3);
        assert!(table.contains("2.500000"));

        let mut totals = BTreeMap::new();
        totals.insert(NaiveDate::from_ymd_opt(2023, 1, 5).unwrap(), -12.5);
        assert!(daily_table(&totals).contains("05/01/2023"));
    }
}
