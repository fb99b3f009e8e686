//! Plot command - turn a plain-language request into a plotting script.

use std::fs;
use std::path::PathBuf;

use colored::Colorize;
use subocean::plotgen::{
    MockPlotGenerator, OpenAIPlotGenerator, PlotContext, PlotGenConfig, PlotGenerator,
};
use subocean::GriddedDataset;

use crate::cli::GeneratorChoice;

pub fn run(
    request: String,
    gridded: PathBuf,
    generator: GeneratorChoice,
    model: Option<String>,
    script: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let contents = fs::read_to_string(&gridded)
        .map_err(|e| format!("Cannot read {}: {e}", gridded.display()))?;
    let dataset: GriddedDataset = serde_json::from_str(&contents)?;

    let mut context = PlotContext::new(dataset.channels.keys().cloned().collect());
    if let Some(path) = script {
        context = context.with_current_script(fs::read_to_string(&path)?);
    }

    let generator: Box<dyn PlotGenerator> = match generator {
        GeneratorChoice::Mock => Box::new(MockPlotGenerator::new()),
        GeneratorChoice::OpenAI => {
            let mut config = PlotGenConfig::default();
            if let Some(model) = model {
                config.model = model;
            }
            let api_key = std::env::var("OPENAI_API_KEY")
                .map_err(|_| "OPENAI_API_KEY environment variable not set")?;
            Box::new(OpenAIPlotGenerator::with_config(api_key, config)?)
        }
    };

    println!(
        "{} via {} ({} channels)",
        "Generating".cyan().bold(),
        generator.name().white(),
        context.channels.len()
    );
    let script_text = generator.generate(&request, &context)?;

    match output {
        Some(path) => {
            fs::write(&path, &script_text)?;
            println!(
                "{} {}",
                "Saved to".green().bold(),
                path.display().to_string().white()
            );
        }
        None => {
            println!();
            println!("{script_text}");
        }
    }
    Ok(())
}
