//! Command implementations.

pub mod batch;
pub mod plot;
pub mod process;

use std::path::{Path, PathBuf};

use subocean::derived::{CalculatorOptions, TimeDelay};
use subocean::{PipelineConfig, ValidationConfig};

/// Build a pipeline configuration from shared CLI options.
pub fn pipeline_config(
    config: Option<&Path>,
    interval: f64,
    delay: Option<f64>,
    gas_corrections: bool,
) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let validation = match config {
        Some(path) => ValidationConfig::from_path(path)?,
        None => ValidationConfig::default(),
    };

    let mut calculator = CalculatorOptions {
        apply_gas_corrections: gas_corrections,
        ..CalculatorOptions::default()
    };
    if let Some(seconds) = delay {
        calculator.time_delay = Some(TimeDelay {
            channels: vec![subocean::schema::CH4_DISSOLVED.to_string()],
            seconds,
        });
    }

    Ok(PipelineConfig {
        validation,
        calculator,
        depth_interval: interval,
        ..PipelineConfig::default()
    })
}

/// Default output directory next to the input.
pub fn default_output(input: &Path) -> PathBuf {
    input
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("processed")
}
