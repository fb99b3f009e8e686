//! Natural-language plot scripting.
//!
//! A [`PlotGenerator`] turns a free-text request ("methane against depth,
//! downcast only") into a runnable plotting script for the gridded
//! artifacts. The pipeline itself never interprets the script; it only
//! brokers the conversation and hands the text to the caller.

mod generator;
mod mock;
mod openai;
mod prompts;

pub use generator::{PlotContext, PlotGenConfig, PlotGenerator};
pub use mock::MockPlotGenerator;
pub use openai::OpenAIPlotGenerator;
