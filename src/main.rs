//! spendsort: cluster bank transactions into spending categories and label them
//!
//! Loads a CSV export, narrows it down, clusters the encoded records, walks
//! the operator through naming each cluster and writes the labeled rows back.

use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::Env;
use spendsort::cli::{self, Args, TerminalOperator};
use spendsort::{
    load_records, save_records, slicing, CategoryBook, CostCurve, FeatureEncoder, LabelReconciler,
};
use std::time::Instant;

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::init_from_env(Env::default().filter_or("RUST_LOG", level));

    run(&args)
}

fn run(args: &Args) -> Result<()> {
    let start_time = Instant::now();

    // Step 1: load and slice
    let records = load_records(&args.input)
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    let records = args.slice().apply(&records)?;
    if records.is_empty() {
        bail!("no records left after filtering");
    }
    println!("✓ {} records selected", records.len());

    if args.verbose {
        println!("  Transaction types: {}", slicing::spend_types(&records).join(", "));
    }
    if args.daily {
        println!("\n{}", cli::daily_table(&slicing::total_per_day(&records)));
    }

    // Step 2: encode
    let matrix = FeatureEncoder::new().encode(&records)?;
    if args.verbose {
        println!("  Encoded shape: {} x {}", matrix.nrows(), matrix.ncols());
        if let Some((min, max)) = matrix.quantity_range() {
            println!("  Amounts scaled from [{:.2}, {:.2}]", min, max);
        }
    }

    // Step 3: pick k
    if args.elbow {
        let curve = CostCurve::new(args.clusterer(1))
            .threshold(args.threshold)
            .explore(&matrix)?;
        println!("\n=== Cost Curve ===\n{}", cli::cost_table(&curve));
    }
    let k = match args.clusters {
        Some(k) => k,
        None => cli::ask_clusters(matrix.nrows())?,
    };

    // Step 4: cluster
    let model = args.clusterer(k).fit(&matrix)?;
    println!("✓ Clustered into {} groups (cost {:.4})", k, model.cost);
    if !model.converged {
        println!("  Stopped at the iteration cap before converging");
    }
    for (i, size) in model.cluster_sizes().iter().enumerate() {
        let percentage = (*size as f64 / records.len() as f64) * 100.0;
        println!("  Cluster {}: {} records ({:.1}%)", i, size, percentage);
    }

    // Step 5: label
    let reconciliation = LabelReconciler::new(args.preview).reconcile(
        &records,
        model.labels.view(),
        CategoryBook::new(),
        &mut TerminalOperator,
    )?;

    println!("\n=== Categories ===");
    for (cluster, label) in &reconciliation.mapping {
        println!("Cluster {} -> {}", cluster, label);
    }

    // Step 6: save
    if let Some(output) = &args.output {
        let overwrite = args.overwrite || (output.exists() && cli::confirm_overwrite(output)?);
        if output.exists() && !overwrite {
            println!("Not saved: {} was left untouched", output.display());
        } else {
            save_records(output, &reconciliation.records, overwrite)?;
            println!("✓ Saved {} records to {}", reconciliation.records.len(), output.display());
        }
    }

    if args.verbose {
        println!("\nTotal time: {:.2}s", start_time.elapsed().as_secs_f64());
    }
    Ok(())
}
