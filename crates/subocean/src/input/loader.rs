//! Profile loader: tab-separated measurement stream plus optional sidecar.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Result, SuboceanError};
use crate::log::{ProcessingLog, Stage};
use crate::schema;
use crate::table::{Column, MeasurementTable};

use super::metadata::ProfileMetadata;

/// Timestamp formats accepted when combining `Date` and `Time` fields.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

/// Provenance for a loaded raw profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    /// File name without path.
    pub file: String,
    /// Full path to the raw data file.
    pub path: PathBuf,
    /// SHA-256 hash of the file contents.
    pub hash: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Number of data rows (excluding header).
    pub row_count: usize,
    /// Number of channels.
    pub column_count: usize,
    /// When the profile was loaded.
    pub loaded_at: DateTime<Utc>,
}

/// Result of loading one deployment.
#[derive(Debug, Clone)]
pub struct LoadedProfile {
    pub table: MeasurementTable,
    pub metadata: Option<ProfileMetadata>,
    pub source: SourceInfo,
}

/// One deployment of the instrument: a raw data file and an optional
/// metadata sidecar.
#[derive(Debug, Clone)]
pub struct Profile {
    data_path: PathBuf,
    log_path: Option<PathBuf>,
}

impl Profile {
    /// Describe a profile by its data file and optional sidecar path.
    pub fn new(data_path: impl Into<PathBuf>, log_path: Option<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            log_path,
        }
    }

    /// Stem of the data file, used to name level artifacts.
    pub fn name(&self) -> String {
        self.data_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "profile".to_string())
    }

    /// Load the measurement table and metadata.
    ///
    /// A missing or unreadable sidecar yields `metadata: None` and a warning
    /// record; a sidecar that exists but is malformed is a hard error.
    pub fn load(&self, log: &mut ProcessingLog) -> Result<LoadedProfile> {
        let mut file = File::open(&self.data_path).map_err(|e| SuboceanError::Io {
            path: self.data_path.clone(),
            source: e,
        })?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).map_err(|e| SuboceanError::Io {
            path: self.data_path.clone(),
            source: e,
        })?;

        let mut hasher = Sha256::new();
        hasher.update(&contents);
        let hash = format!("sha256:{:x}", hasher.finalize());

        let table = self.parse_table(&contents, log)?;
        let metadata = self.load_metadata(log)?;

        let source = SourceInfo {
            file: self
                .data_path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: self.data_path.clone(),
            hash,
            size_bytes: contents.len() as u64,
            row_count: table.row_count(),
            column_count: table.column_count(),
            loaded_at: Utc::now(),
        };

        log.info(
            Stage::Loader,
            "load",
            format!("{} rows, {} channels", source.row_count, source.column_count),
        );

        Ok(LoadedProfile {
            table,
            metadata,
            source,
        })
    }

    fn parse_table(&self, bytes: &[u8], log: &mut ProcessingLog) -> Result<MeasurementTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| self.parse_error(format!("cannot read header row: {e}")))?
            .iter()
            .map(|s| s.trim().to_string())
            .collect();

        if headers.len() < 2 {
            return Err(self.parse_error("header row does not name multiple channels"));
        }
        for required in [schema::DATE, schema::TIME] {
            if !headers.iter().any(|h| h == required) {
                return Err(self.parse_error(format!("missing required column '{required}'")));
            }
        }

        let expected_cols = headers.len();
        let mut rows: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
            row.resize(expected_cols, String::new());
            rows.push(row);
        }
        if rows.is_empty() {
            return Err(self.parse_error("no data rows found"));
        }

        let mut table = MeasurementTable::new();
        for (col_idx, header) in headers.iter().enumerate() {
            let cells: Vec<&str> = rows.iter().map(|r| r[col_idx].as_str()).collect();
            table.insert(header.clone(), infer_column(&cells));
        }

        let datetimes = self.synthesize_datetimes(&table)?;
        if !is_non_decreasing(&datetimes) {
            log.warn(
                Stage::Loader,
                "datetime order",
                "timestamps are not monotonically non-decreasing",
            );
        }
        table.insert(schema::DATETIME, Column::DateTime(datetimes));

        Ok(table)
    }

    /// Combine the raw `Date` and `Time` text fields into one timestamp per row.
    fn synthesize_datetimes(&self, table: &MeasurementTable) -> Result<Vec<NaiveDateTime>> {
        let dates = table
            .text(schema::DATE)
            .ok_or_else(|| self.parse_error("'Date' column is not text"))?;
        let times = table
            .text(schema::TIME)
            .ok_or_else(|| self.parse_error("'Time' column is not text"))?;

        dates
            .iter()
            .zip(times)
            .enumerate()
            .map(|(row, (date, time))| {
                let combined = format!("{} {}", date.trim(), time.trim());
                DATETIME_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDateTime::parse_from_str(&combined, fmt).ok())
                    .ok_or_else(|| {
                        self.parse_error(format!("row {row}: cannot parse datetime '{combined}'"))
                    })
            })
            .collect()
    }

    fn load_metadata(&self, log: &mut ProcessingLog) -> Result<Option<ProfileMetadata>> {
        let Some(path) = &self.log_path else {
            log.warn(Stage::Loader, "metadata", "no sidecar path given");
            return Ok(None);
        };
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                log.warn(
                    Stage::Loader,
                    "metadata",
                    format!("sidecar '{}' unreadable: {e}", path.display()),
                );
                return Ok(None);
            }
        };
        let value: serde_json::Value = serde_json::from_str(&contents)?;
        ProfileMetadata::from_json(&value).map(Some)
    }

    fn parse_error(&self, message: impl Into<String>) -> SuboceanError {
        SuboceanError::Parse {
            path: self.data_path.clone(),
            message: message.into(),
        }
    }
}

/// Infer a typed column from raw cells.
///
/// A column becomes numeric when a strict majority of its non-null cells
/// parse as floats; unparseable cells within a numeric column become NaN.
fn infer_column(cells: &[&str]) -> Column {
    let mut non_null = 0usize;
    let mut parseable = 0usize;
    for cell in cells {
        if MeasurementTable::is_null_value(cell) {
            continue;
        }
        non_null += 1;
        if cell.trim().parse::<f64>().is_ok() {
            parseable += 1;
        }
    }

    if non_null > 0 && parseable * 2 > non_null {
        Column::Float(
            cells
                .iter()
                .map(|cell| cell.trim().parse::<f64>().unwrap_or(f64::NAN))
                .collect(),
        )
    } else {
        Column::Text(cells.iter().map(|c| c.to_string()).collect())
    }
}

fn is_non_decreasing(values: &[NaiveDateTime]) -> bool {
    values.windows(2).all(|w| w[0] <= w[1])
}
