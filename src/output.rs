//! Output file writers for a finished clustering run

use crate::csv_reader::PointSet;
use crate::engine::factory::ClusteringEngine;
use crate::engine::report::ClusterReport;
use crate::error::Result;
use std::fs;
use std::path::Path;

/// Write `clusters.csv` - the nearest final cluster for every extracted
/// row, with its distance in the run's metric
///
/// # Errors
/// Returns error if assignment fails or the file cannot be written
pub fn write_assignments(
    output_dir: &Path,
    point_set: &PointSet,
    engine: &ClusteringEngine,
) -> Result<()> {
    use std::fmt::Write as _;

    let path = output_dir.join("clusters.csv");
    let mut content = String::from("row_id,cluster,distance\n");

    for (point, &row_id) in point_set.points.iter().zip(&point_set.row_indices) {
        let (cluster, distance) = engine.assign(point)?;
        let _ = writeln!(content, "{row_id},{cluster},{distance:.6}");
    }

    fs::write(path, content)?;
    Ok(())
}

/// Write `report.txt` - human-readable cluster overview
///
/// # Errors
/// Returns error if the file cannot be written
pub fn write_report(output_dir: &Path, report: &ClusterReport, names: &[String]) -> Result<()> {
    use std::fmt::Write as _;

    let path = output_dir.join("report.txt");
    let mut content = String::new();

    let _ = writeln!(
        content,
        "Clustered {} points over {} dimensions ({})",
        report.total_points,
        report.dimensions,
        names.join(", ")
    );
    let _ = writeln!(
        content,
        "{} after {} passes\n",
        if report.converged {
            "Converged"
        } else {
            "Iteration budget reached"
        },
        report.iterations
    );

    for summary in &report.clusters {
        let center: Vec<String> = summary.center.iter().map(|v| format!("{v:.4}")).collect();
        let _ = writeln!(
            content,
            "Cluster {}: {} points, center ({}), dispersion {:.4}",
            summary.id,
            summary.population,
            center.join(", "),
            summary.dispersion
        );
    }

    if report.clusters.len() > 1 {
        let _ = writeln!(content, "\nPairwise center distances:");
        for (i, row) in report.center_distances.iter().enumerate() {
            let cells: Vec<String> = row.iter().map(|d| format!("{d:10.4}")).collect();
            let _ = writeln!(content, "  {i}: {}", cells.join(" "));
        }
    }

    fs::write(path, content)?;
    Ok(())
}

/// Write `stats.json` - machine-readable run report
///
/// # Errors
/// Returns error if serialization or the write fails
pub fn write_stats_json(output_dir: &Path, report: &ClusterReport) -> Result<()> {
    let path = output_dir.join("stats.json");
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;
    Ok(())
}
