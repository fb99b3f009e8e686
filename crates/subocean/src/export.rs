//! Artifact writers for the quality levels.
//!
//! Tabular levels (L1A, L1B, L2) are written as tab-separated text with NaN
//! rendered as empty cells, matching the instrument's own file style.
//! Gridded levels (L3, L3B) are written as pretty JSON.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::cast::CastDirection;
use crate::error::{Result, SuboceanError};
use crate::grid::GriddedDataset;
use crate::pipeline::{CombinedDataset, ProfileLevels};
use crate::table::{Column, MeasurementTable};

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]+").unwrap());

/// Make a profile or channel name safe for use in a file name.
pub fn sanitize_name(name: &str) -> String {
    let cleaned = UNSAFE_CHARS.replace_all(name.trim(), "_");
    let cleaned = cleaned.trim_matches('_');
    match cleaned.chars().next() {
        None => "unnamed".to_string(),
        Some(c) if c.is_ascii_digit() => format!("_{cleaned}"),
        _ => cleaned.to_string(),
    }
}

/// Writes level artifacts into one output directory.
#[derive(Debug, Clone)]
pub struct Exporter {
    out_dir: PathBuf,
}

impl Exporter {
    /// Create an exporter, creating the output directory if needed.
    pub fn new(out_dir: impl Into<PathBuf>) -> Result<Self> {
        let out_dir = out_dir.into();
        fs::create_dir_all(&out_dir).map_err(|e| SuboceanError::Io {
            path: out_dir.clone(),
            source: e,
        })?;
        Ok(Self { out_dir })
    }

    /// Output directory this exporter writes into.
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Write every level of one profile. Returns the paths written.
    pub fn export_levels(&self, levels: &ProfileLevels) -> Result<Vec<PathBuf>> {
        let stem = sanitize_name(&levels.name);
        let mut written = Vec::new();

        for (suffix, table) in [
            ("L1A", &levels.l1a),
            ("L1B", &levels.l1b),
            ("L2", &levels.l2),
        ] {
            let path = self.out_dir.join(format!("{stem}_{suffix}.tsv"));
            write_table_tsv(table, &path)?;
            written.push(path);
        }
        for gridded in &levels.l3 {
            written.push(self.export_gridded(&stem, gridded)?);
        }
        Ok(written)
    }

    /// Write one gridded leg as JSON.
    pub fn export_gridded(&self, stem: &str, gridded: &GriddedDataset) -> Result<PathBuf> {
        let path = self
            .out_dir
            .join(format!("{stem}_{}_L3.json", gridded.cast.label()));
        write_json(gridded, &path)?;
        Ok(path)
    }

    /// Write a combined multi-profile dataset as JSON.
    pub fn export_combined(&self, combined: &CombinedDataset) -> Result<PathBuf> {
        let path = self
            .out_dir
            .join(format!("combined_{}_L3B.json", combined.cast.label()));
        write_json(combined, &path)?;
        Ok(path)
    }
}

/// Write a measurement table as tab-separated text. NaN becomes an empty
/// cell, so re-loading the file reproduces the same missing values.
pub fn write_table_tsv(table: &MeasurementTable, path: &Path) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(SuboceanError::from)?;

    let names = table.channel_names();
    writer.write_record(&names)?;

    let columns: Vec<&Column> = names
        .iter()
        .filter_map(|name| table.column(name))
        .collect();
    for row in 0..table.row_count() {
        let record: Vec<String> = columns.iter().map(|col| cell_text(col, row)).collect();
        writer.write_record(&record)?;
    }
    writer.flush().map_err(|e| SuboceanError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

fn cell_text(column: &Column, row: usize) -> String {
    match column {
        Column::Float(v) => {
            let value = v[row];
            if value.is_nan() {
                String::new()
            } else {
                value.to_string()
            }
        }
        Column::Text(v) => v[row].clone(),
        Column::Bool(v) => v[row].to_string(),
        Column::DateTime(v) => v[row].format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
    }
}

/// Write any serializable artifact as pretty JSON. Non-finite floats are
/// rendered as `null`.
pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(|e| SuboceanError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// File name label for one cast leg of a profile.
pub fn cast_file_stem(profile: &str, cast: CastDirection) -> String {
    format!("{}_{}", sanitize_name(profile), cast.label())
}
