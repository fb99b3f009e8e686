//! Cast segmentation from the pressure trend.
//!
//! A profile is split at its maximum-pressure sample into a descending and
//! an ascending leg. Rows whose pressure gradient briefly runs against the
//! leg's direction by more than the threshold are sensor noise around the
//! turn and are dropped entirely, so the output may hold fewer rows than the
//! input.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SuboceanError};
use crate::log::{ProcessingLog, Stage};
use crate::schema;
use crate::table::{Column, MeasurementTable};

/// Direction of one cast leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CastDirection {
    Downcast,
    Upcast,
}

impl CastDirection {
    /// Label used in artifact file names.
    pub fn label(&self) -> &'static str {
        match self {
            CastDirection::Downcast => "downcast",
            CastDirection::Upcast => "upcast",
        }
    }
}

impl std::fmt::Display for CastDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Segment a profile into labeled down- and upcast rows.
///
/// The head segment (start through maximum pressure) keeps rows whose
/// gradient is at least `-threshold`; the tail keeps rows whose gradient is
/// at most `+threshold`. A row with no in-segment predecessor has an
/// undefined gradient and is dropped, which is also what leaves a pure
/// downcast with an empty upcast. Survivors get an `is_downcast` label and
/// are re-concatenated in time order.
pub fn segment(
    table: &MeasurementTable,
    pressure_channel: &str,
    threshold: f64,
    log: &mut ProcessingLog,
) -> Result<MeasurementTable> {
    let pressure = table.float(pressure_channel).ok_or_else(|| {
        SuboceanError::Segmentation(format!(
            "pressure channel '{pressure_channel}' absent or non-numeric"
        ))
    })?;

    // First occurrence of the maximum is the turning point.
    let mut max_idx: Option<usize> = None;
    for (idx, &p) in pressure.iter().enumerate() {
        if p.is_nan() {
            continue;
        }
        match max_idx {
            Some(current) if pressure[current] >= p => {}
            _ => max_idx = Some(idx),
        }
    }
    let max_idx = max_idx.ok_or_else(|| {
        SuboceanError::Segmentation(format!(
            "pressure channel '{pressure_channel}' has no finite samples"
        ))
    })?;

    let rows = pressure.len();
    let mut head_keep = vec![false; rows];
    let mut tail_keep = vec![false; rows];
    for i in 1..=max_idx {
        let gradient = pressure[i] - pressure[i - 1];
        head_keep[i] = gradient >= -threshold;
    }
    for i in (max_idx + 1)..rows {
        let gradient = pressure[i] - pressure[i - 1];
        tail_keep[i] = gradient <= threshold;
    }

    let mut downcast = table.filter_rows(&head_keep);
    let upcast = {
        let mut upcast = table.filter_rows(&tail_keep);
        upcast.insert(
            schema::IS_DOWNCAST,
            Column::Bool(vec![false; upcast.row_count()]),
        );
        upcast
    };
    downcast.insert(
        schema::IS_DOWNCAST,
        Column::Bool(vec![true; downcast.row_count()]),
    );

    log.info(
        Stage::Segmenter,
        "segment",
        format!(
            "{} downcast rows, {} upcast rows (of {rows})",
            downcast.row_count(),
            upcast.row_count()
        ),
    );

    downcast.append_rows(&upcast);
    Ok(downcast)
}

/// Split a segmented table into one leg.
pub fn select_cast(table: &MeasurementTable, cast: CastDirection) -> Option<MeasurementTable> {
    let labels = table.bools(schema::IS_DOWNCAST)?;
    let keep: Vec<bool> = labels
        .iter()
        .map(|&down| match cast {
            CastDirection::Downcast => down,
            CastDirection::Upcast => !down,
        })
        .collect();
    Some(table.filter_rows(&keep))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRESSURE: &str = schema::HYDROSTATIC_PRESSURE;

    fn table_with_pressure(values: Vec<f64>) -> MeasurementTable {
        let mut table = MeasurementTable::new();
        let n = values.len();
        table.insert_float(PRESSURE, values);
        table.insert_float("sample", (0..n).map(|i| i as f64).collect());
        table
    }

    #[test]
    fn test_segment_labels_both_casts() {
        let table = table_with_pressure(vec![0.1, 0.5, 1.0, 1.5, 1.2, 0.8, 0.3]);
        let mut log = ProcessingLog::new();
        let segmented = segment(&table, PRESSURE, 0.01, &mut log).unwrap();

        let labels = segmented.bools(schema::IS_DOWNCAST).unwrap();
        assert_eq!(labels, &[true, true, true, false, false, false]);
        assert!(segmented.row_count() <= table.row_count());
    }

    #[test]
    fn test_segment_rejects_transition_noise() {
        // A brief backward excursion at depth is noise, not a direction change.
        let table = table_with_pressure(vec![0.1, 0.5, 0.45, 1.0, 1.5, 1.0, 0.5]);
        let mut log = ProcessingLog::new();
        let segmented = segment(&table, PRESSURE, 0.01, &mut log).unwrap();

        // Row at 0.45 (gradient -0.05) is dropped from the downcast.
        let samples = segmented.float("sample").unwrap();
        assert!(!samples.contains(&2.0));
    }

    #[test]
    fn test_casts_are_monotone_within_tolerance() {
        let threshold = 0.05;
        let table = table_with_pressure(vec![0.1, 0.4, 0.38, 0.9, 1.4, 1.38, 0.9, 0.92, 0.3]);
        let mut log = ProcessingLog::new();
        let segmented = segment(&table, PRESSURE, threshold, &mut log).unwrap();

        let down = select_cast(&segmented, CastDirection::Downcast).unwrap();
        let down_pressure = down.float(PRESSURE).unwrap();
        assert!(down_pressure.windows(2).all(|w| w[1] - w[0] >= -threshold));

        let up = select_cast(&segmented, CastDirection::Upcast).unwrap();
        let up_pressure = up.float(PRESSURE).unwrap();
        assert!(up_pressure.windows(2).all(|w| w[1] - w[0] <= threshold));
    }

    #[test]
    fn test_pure_downcast_yields_empty_upcast() {
        let table = table_with_pressure(vec![0.1, 0.5, 1.0, 1.5]);
        let mut log = ProcessingLog::new();
        let segmented = segment(&table, PRESSURE, 0.01, &mut log).unwrap();

        let up = select_cast(&segmented, CastDirection::Upcast).unwrap();
        assert_eq!(up.row_count(), 0);

        let down = select_cast(&segmented, CastDirection::Downcast).unwrap();
        assert!(down.row_count() > 0);
    }

    #[test]
    fn test_missing_pressure_channel_fails_fast() {
        let mut table = MeasurementTable::new();
        table.insert_float("sample", vec![1.0, 2.0]);
        let mut log = ProcessingLog::new();

        assert!(matches!(
            segment(&table, PRESSURE, 0.01, &mut log),
            Err(SuboceanError::Segmentation(_))
        ));
    }
}
