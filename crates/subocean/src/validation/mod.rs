//! Measurement validation: range flags, RSD noise test, row filtering.

mod config;
mod validator;

pub use config::{GasRule, ValidationConfig};
pub use validator::{OutlierMethod, QualityMetrics, Validator};
