//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// SubOcean: dissolved-gas sensor profile processing
#[derive(Parser)]
#[command(name = "subocean")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process one raw profile through quality levels L1A-L3
    Process {
        /// Path to the raw tab-separated profile
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Path to the JSON metadata sidecar
        #[arg(short, long)]
        metadata: Option<PathBuf>,

        /// Output directory (default: <file dir>/processed)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Validation configuration JSON (default: instrument ranges)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Depth grid spacing in meters
        #[arg(long, default_value = "0.05")]
        interval: f64,

        /// Carrier-gas transit delay in seconds, applied to gas channels
        #[arg(long)]
        delay: Option<f64>,

        /// Apply cell-temperature gas corrections
        #[arg(long)]
        gas_corrections: bool,
    },

    /// Process every profile in a directory and combine the gridded legs
    Batch {
        /// Directory holding raw profiles (*.txt)
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Output directory (default: <dir>/processed)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Validation configuration JSON (default: instrument ranges)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Depth grid spacing in meters
        #[arg(long, default_value = "0.05")]
        interval: f64,

        /// Apply cell-temperature gas corrections
        #[arg(long)]
        gas_corrections: bool,

        /// Skip the combined multi-profile artifact
        #[arg(long)]
        no_combine: bool,
    },

    /// Generate a plotting script from a plain-language request
    Plot {
        /// What to plot, in plain language
        #[arg(value_name = "REQUEST")]
        request: String,

        /// Gridded L3 artifact supplying the available channels
        #[arg(short, long)]
        gridded: PathBuf,

        /// Script generator backend
        #[arg(long, default_value = "mock")]
        generator: GeneratorChoice,

        /// Model to use (generator-specific, e.g. "gpt-4o")
        #[arg(long)]
        model: Option<String>,

        /// Previous script to refine instead of starting over
        #[arg(short, long)]
        script: Option<PathBuf>,

        /// Write the script here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Plot script generator backend.
#[derive(Clone, Debug, Default)]
pub enum GeneratorChoice {
    /// Deterministic generator for testing
    #[default]
    Mock,
    /// OpenAI GPT API (requires OPENAI_API_KEY)
    OpenAI,
}

impl std::str::FromStr for GeneratorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" | "test" => Ok(GeneratorChoice::Mock),
            "openai" | "gpt" => Ok(GeneratorChoice::OpenAI),
            _ => Err(format!("Unknown generator: {}. Use: mock or openai.", s)),
        }
    }
}

impl std::fmt::Display for GeneratorChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeneratorChoice::Mock => write!(f, "mock"),
            GeneratorChoice::OpenAI => write!(f, "openai"),
        }
    }
}
