//! SubOcean: processing pipeline for in-situ dissolved-gas sensor profiles.
//!
//! A deployment produces a tab-separated stream of analyzer channels plus an
//! optional metadata sidecar. The pipeline refines it through quality
//! levels: flagged raw data (L1A), flag-filtered data (L1B), segmented casts
//! with derived parameters (L2), depth-gridded legs (L3), and multi-profile
//! combinations (L3B).
//!
//! # Core Principles
//!
//! - **Non-destructive**: each level is an independent copy; flagging never
//!   overwrites raw values
//! - **NaN over deletion**: rejected samples are blanked, never removed, so
//!   row counts and time order survive filtering
//! - **Full provenance**: every stage appends to a caller-owned processing
//!   log
//!
//! # Example
//!
//! ```no_run
//! use subocean::{Pipeline, Profile};
//!
//! let pipeline = Pipeline::default();
//! let profile = Profile::new("dive01.txt", None);
//! let (loaded, levels, log) = pipeline.process(&profile).unwrap();
//!
//! println!("gridded legs: {}", levels.l3.len());
//! println!("log records: {}", log.len());
//! ```

pub mod cast;
pub mod derived;
pub mod error;
pub mod export;
pub mod grid;
pub mod input;
pub mod log;
pub mod pipeline;
pub mod plotgen;
pub mod schema;
pub mod table;
pub mod validation;

pub use cast::{segment, select_cast, CastDirection};
pub use error::{Result, SuboceanError};
pub use export::Exporter;
pub use grid::GriddedDataset;
pub use input::{LoadedProfile, Profile, ProfileMetadata, SourceInfo};
pub use log::{ProcessingLog, Stage, StageRecord};
pub use pipeline::{combine, CombinedDataset, Pipeline, PipelineConfig, ProfileLevels};
pub use table::{Column, MeasurementTable};
pub use validation::{ValidationConfig, Validator};
