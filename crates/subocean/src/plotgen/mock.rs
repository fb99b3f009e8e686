//! Mock plot generator for testing.

use crate::error::Result;

use super::generator::{PlotContext, PlotGenerator};

/// Mock generator that returns a predictable script for testing.
pub struct MockPlotGenerator;

impl MockPlotGenerator {
    /// Create a new mock generator.
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockPlotGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PlotGenerator for MockPlotGenerator {
    fn generate(&self, request: &str, context: &PlotContext) -> Result<String> {
        let channels = context.channels.join(", ");
        let base = context
            .current_script
            .as_deref()
            .unwrap_or("import matplotlib.pyplot as plt");
        Ok(format!(
            "{base}\n# request: {request}\n# channels: {channels}\nplt.show()"
        ))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
