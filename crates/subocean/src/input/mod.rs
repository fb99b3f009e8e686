//! Raw profile ingestion: tab-separated data stream plus JSON sidecar.

mod loader;
mod metadata;

pub use loader::{LoadedProfile, Profile, SourceInfo};
pub use metadata::ProfileMetadata;
