//! Batch command - process a directory of profiles and combine legs.

use std::path::PathBuf;

use colored::Colorize;
use subocean::cast::CastDirection;
use subocean::export;
use subocean::{combine, Exporter, Pipeline, ProcessingLog, Profile};

pub fn run(
    dir: PathBuf,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    interval: f64,
    gas_corrections: bool,
    no_combine: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !dir.is_dir() {
        return Err(format!("Not a directory: {}", dir.display()).into());
    }

    let profiles = discover_profiles(&dir)?;
    if profiles.is_empty() {
        return Err(format!("No .txt profiles found in {}", dir.display()).into());
    }
    println!(
        "{} {} profiles in {}",
        "Processing".cyan().bold(),
        profiles.len().to_string().white().bold(),
        dir.display().to_string().white()
    );

    let pipeline_config = super::pipeline_config(config.as_deref(), interval, None, gas_corrections)?;
    let pipeline = Pipeline::new(pipeline_config);
    let batch = pipeline.process_batch(&profiles);

    let out_dir = output.unwrap_or_else(|| dir.join("processed"));
    let exporter = Exporter::new(&out_dir)?;

    for (_, levels, log) in &batch.completed {
        exporter.export_levels(levels)?;
        println!(
            "  {} {} ({} warnings, {} gridded legs)",
            "ok".green(),
            levels.name.white(),
            log.warnings().count(),
            levels.l3.len()
        );
    }
    for (name, err) in &batch.failed {
        println!("  {} {} - {}", "failed".red().bold(), name.white(), err);
    }

    if !no_combine {
        let mut log = ProcessingLog::new();
        for cast in [CastDirection::Downcast, CastDirection::Upcast] {
            let grids = batch.grids_for(cast);
            if grids.len() < 2 {
                continue;
            }
            let combined = combine(&grids, &mut log)?;
            let path = exporter.export_combined(&combined)?;
            println!(
                "{} {} profiles into {}",
                "Combined".green().bold(),
                combined.profiles.len(),
                path.display().to_string().white()
            );
        }
        let log_path = exporter.out_dir().join("combine_log.json");
        export::write_json(&log, &log_path)?;
    }

    println!();
    println!(
        "{}: {} completed, {} failed",
        "Batch done".green().bold(),
        batch.completed.len().to_string().white().bold(),
        batch.failed.len().to_string().red()
    );
    Ok(())
}

/// Find raw profiles and pair each with its sidecar when one sits alongside.
fn discover_profiles(dir: &std::path::Path) -> std::io::Result<Vec<Profile>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    paths.sort();

    Ok(paths
        .into_iter()
        .map(|data| {
            let sidecar = data.with_file_name(format!(
                "{}_log.json",
                data.file_stem().unwrap_or_default().to_string_lossy()
            ));
            let sidecar = sidecar.exists().then_some(sidecar);
            Profile::new(data, sidecar)
        })
        .collect())
}
