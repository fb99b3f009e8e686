//! SubOcean CLI - dissolved-gas profile processing.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "subocean=debug" } else { "subocean=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Process {
            file,
            metadata,
            output,
            config,
            interval,
            delay,
            gas_corrections,
        } => commands::process::run(
            file,
            metadata,
            output,
            config,
            interval,
            delay,
            gas_corrections,
            cli.verbose,
        ),

        Commands::Batch {
            dir,
            output,
            config,
            interval,
            gas_corrections,
            no_combine,
        } => commands::batch::run(dir, output, config, interval, gas_corrections, no_combine),

        Commands::Plot {
            request,
            gridded,
            generator,
            model,
            script,
            output,
        } => commands::plot::run(request, gridded, generator, model, script, output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
