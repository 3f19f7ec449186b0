#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::uninlined_format_args)]

mod csv_reader;
mod engine;
mod error;
mod output;

use clap::{Parser, Subcommand};
use csv_reader::{CsvData, PointSet};
use engine::config::EngineConfig;
use engine::factory::ClusteringEngine;
use error::{KlustError, Result};
use std::path::{Path, PathBuf};

/// klust - adaptive K-means clustering over CSV data
#[derive(Parser, Debug)]
#[command(name = "klust")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Cluster the numeric columns of a CSV, output assignment and report files
    Cluster {
        /// Input CSV/TSV file
        #[arg(short, long)]
        csv: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "./klust_output")]
        output_dir: PathBuf,

        /// Number of clusters (0 = adaptive search from 1)
        #[arg(short = 'k', long, default_value = "0")]
        clusters: usize,

        /// Treat input as TSV instead of CSV
        #[arg(long)]
        tsv: bool,

        /// Column whose values become per-point weights
        #[arg(long)]
        weight_col: Option<String>,

        /// Search the cluster count adaptively, starting from --clusters
        #[arg(long)]
        adaptive: bool,

        /// Fixed RNG seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,

        /// Engine tuning options, e.g. "seeding=random:maxiter=50:tolerance=0.01"
        #[arg(long)]
        options: Option<String>,

        /// Print per-pass progress
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Some(Commands::Cluster {
            csv,
            output_dir,
            clusters,
            tsv,
            weight_col,
            adaptive,
            seed,
            options,
            verbose,
        }) => {
            let config = resolve_config(clusters, adaptive, seed, options.as_deref(), verbose);
            run_cluster(&csv, &output_dir, weight_col.as_deref(), tsv, config)
        }

        None => {
            eprintln!("No subcommand provided. Use 'klust cluster'.");
            eprintln!("Run 'klust --help' for usage information.");
            std::process::exit(1);
        }
    }
}

/// Resolve CLI flags and the free-form option string into the typed engine
/// configuration. Unrecognized options are reported and fall back to their
/// defaults.
fn resolve_config(
    clusters: usize,
    adaptive: bool,
    seed: Option<u64>,
    options: Option<&str>,
    verbose: bool,
) -> EngineConfig {
    let mut config = EngineConfig::default();

    if let Some(options) = options {
        for warning in config.apply_options(options) {
            eprintln!("Warning: {warning}");
        }
    }

    // First-class flags win over the option string
    if clusters == 0 {
        config.adaptive = true;
    } else {
        config.initial_clusters = clusters;
    }
    if adaptive {
        config.adaptive = true;
    }
    if let Some(seed) = seed {
        config.seed = Some(seed);
    }
    if verbose {
        config.verbose = true;
    }

    config
}

/// Run the clustering phase end to end
fn run_cluster(
    csv_path: &Path,
    output_dir: &Path,
    weight_col: Option<&str>,
    tsv: bool,
    config: EngineConfig,
) -> Result<()> {
    if !csv_path.exists() {
        return Err(KlustError::Config(format!(
            "CSV file not found: {}",
            csv_path.display()
        )));
    }

    std::fs::create_dir_all(output_dir)?;

    eprintln!("Clustering: {}", csv_path.display());

    let csv_data = CsvData::from_file(csv_path, tsv)?;
    eprintln!(
        "Loaded {} rows x {} columns",
        csv_data.row_count(),
        csv_data.col_count()
    );

    let point_set = PointSet::from_csv(&csv_data, weight_col)?;
    eprintln!(
        "Extracted {} points over {} dimensions ({})",
        point_set.points.len(),
        point_set.dim(),
        point_set.names.join(", ")
    );

    let verbose = config.verbose;
    let mut engine = ClusteringEngine::new(point_set.points.clone(), config)?;
    engine.run()?;

    let report = engine.report();
    eprintln!(
        "Found {} clusters ({} after {} passes)",
        report.clusters.len(),
        if report.converged {
            "converged"
        } else {
            "iteration budget reached"
        },
        report.iterations
    );
    if let Some(outcome) = engine.outcome() {
        if verbose {
            let center: Vec<String> = engine
                .global_center()
                .position()
                .iter()
                .map(|v| format!("{v:.4}"))
                .collect();
            eprintln!(
                "Final center displacement {:.6}; dataset center of mass ({})",
                outcome.final_displacement,
                center.join(", ")
            );
        }
    }

    output::write_assignments(output_dir, &point_set, &engine)?;
    output::write_report(output_dir, &report, &point_set.names)?;
    output::write_stats_json(output_dir, &report)?;

    eprintln!("Output written to {}", output_dir.display());
    eprintln!("  - clusters.csv");
    eprintln!("  - report.txt");
    eprintln!("  - stats.json");

    Ok(())
}
