//! Plot generator trait and types.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What the generator knows about the dataset and the conversation so far.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlotContext {
    /// Channel names available in the gridded artifacts.
    pub channels: Vec<String>,

    /// Script produced by the previous request, for iterative refinement
    /// ("now add the upcast in red").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_script: Option<String>,
}

impl PlotContext {
    /// Context over a set of channel names.
    pub fn new(channels: Vec<String>) -> Self {
        Self {
            channels,
            current_script: None,
        }
    }

    /// Carry the previous script into the next request.
    pub fn with_current_script(mut self, script: impl Into<String>) -> Self {
        self.current_script = Some(script.into());
        self
    }
}

/// Configuration for plot generators.
#[derive(Debug, Clone)]
pub struct PlotGenConfig {
    /// Model to use (e.g., "gpt-4o").
    pub model: String,

    /// Maximum tokens in response.
    pub max_tokens: usize,

    /// Temperature for generation (0.0-1.0).
    pub temperature: f64,
}

impl Default for PlotGenConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            max_tokens: 2048,
            temperature: 0.2,
        }
    }
}

/// Trait for plot script generators.
///
/// Implementations must be thread-safe (Send + Sync) so a batch run can
/// share one generator across profiles.
pub trait PlotGenerator: Send + Sync {
    /// Generate a plotting script from a free-text request.
    ///
    /// # Arguments
    /// * `request` - The user's plain-language description of the plot
    /// * `context` - Available channels and the previous script, if any
    ///
    /// # Returns
    /// Script text with any markdown fencing removed
    fn generate(&self, request: &str, context: &PlotContext) -> Result<String>;

    /// Get the name of this generator (for logging/debugging).
    fn name(&self) -> &str;
}
