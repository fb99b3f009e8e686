//! Validation configuration: standard ranges and gas-channel rules.

use std::path::Path;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema;

/// Instrument acceptance ranges applied when no configuration is supplied.
static DEFAULT_STANDARD_RANGES: Lazy<IndexMap<String, (f64, f64)>> = Lazy::new(|| {
    let mut ranges = IndexMap::new();
    ranges.insert("Cavity Pressure (mbar)".to_string(), (29.5, 30.5));
    ranges.insert(schema::CELL_TEMPERATURE.to_string(), (39.5, 40.5));
    ranges.insert(schema::DEPTH.to_string(), (-2.0, 11000.0));
    ranges.insert(schema::CARRIER_FLOW.to_string(), (0.0, 10.0));
    ranges.insert(schema::TOTAL_FLOW.to_string(), (0.0, 100.0));
    // 13 +- 1 for CH4 instruments, 26 +- 1 for N2O; the wide window covers both.
    ranges.insert("Ringdown time (microSec)".to_string(), (10.0, 30.0));
    ranges.insert(schema::ERROR_STANDARD.to_string(), (0.0, 0.1));
    ranges
});

/// Rule for one gas concentration channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasRule {
    /// Acceptable concentration range (min, max).
    pub range: (f64, f64),
    /// RSD above this value marks the sample as too noisy.
    pub rsd_threshold: f64,
}

/// Validator configuration, loadable from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Absolute acceptance ranges per channel.
    #[serde(default)]
    pub standard_ranges: IndexMap<String, (f64, f64)>,
    /// Range plus RSD threshold per gas channel.
    #[serde(default)]
    pub gas_rules: IndexMap<String, GasRule>,
    /// Shared noise/error channel used by the RSD test.
    #[serde(default = "default_error_channel")]
    pub error_channel: String,
}

fn default_error_channel() -> String {
    schema::ERROR_STANDARD.to_string()
}

impl Default for ValidationConfig {
    fn default() -> Self {
        let mut gas_rules = IndexMap::new();
        gas_rules.insert(
            schema::CH4_DISSOLVED.to_string(),
            GasRule {
                range: (0.0, 100.0),
                rsd_threshold: 0.001,
            },
        );

        Self {
            standard_ranges: DEFAULT_STANDARD_RANGES.clone(),
            gas_rules,
            error_channel: default_error_channel(),
        }
    }
}

impl ValidationConfig {
    /// Load a configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path.as_ref()).map_err(|e| crate::error::SuboceanError::Io {
                path: path.as_ref().to_path_buf(),
                source: e,
            })?;
        Ok(serde_json::from_str(&contents)?)
    }
}
