//! Process command - run one profile through the quality levels.

use std::path::PathBuf;

use colored::Colorize;
use subocean::export::{self, sanitize_name};
use subocean::{Exporter, Pipeline, Profile};

#[allow(clippy::too_many_arguments)]
pub fn run(
    file: PathBuf,
    metadata: Option<PathBuf>,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    interval: f64,
    delay: Option<f64>,
    gas_corrections: bool,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !file.exists() {
        return Err(format!("File not found: {}", file.display()).into());
    }

    println!(
        "{} {}",
        "Processing".cyan().bold(),
        file.display().to_string().white()
    );

    let pipeline_config =
        super::pipeline_config(config.as_deref(), interval, delay, gas_corrections)?;
    let pipeline = Pipeline::new(pipeline_config);

    let profile = Profile::new(&file, metadata);
    let (loaded, levels, log) = pipeline.process(&profile)?;

    println!(
        "Loaded {} rows, {} channels ({})",
        loaded.source.row_count.to_string().white().bold(),
        loaded.source.column_count.to_string().white().bold(),
        loaded.source.hash.get(..15).unwrap_or(&loaded.source.hash)
    );
    match &loaded.metadata {
        Some(meta) => println!("Deployment: {}", meta.title.white()),
        None => println!("{}", "No metadata sidecar".yellow()),
    }

    if verbose {
        println!();
        println!("{}", "Stage records:".yellow().bold());
        for record in log.records() {
            println!("  {:?} {} - {}", record.stage, record.action, record.detail);
        }
        println!();
    }

    let warning_count = log.warnings().count();
    println!(
        "Pipeline finished with {} warnings, {} gridded legs",
        warning_count.to_string().yellow(),
        levels.l3.len().to_string().white().bold()
    );

    let out_dir = output.unwrap_or_else(|| super::default_output(&file));
    let exporter = Exporter::new(&out_dir)?;
    let written = exporter.export_levels(&levels)?;

    let log_path = out_dir.join(format!("{}_processing_log.json", sanitize_name(&levels.name)));
    export::write_json(&log, &log_path)?;

    println!();
    println!(
        "{} {} artifacts in {}",
        "Saved".green().bold(),
        written.len() + 1,
        out_dir.display().to_string().white()
    );
    Ok(())
}
