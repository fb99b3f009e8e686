//! Depth gridding: resample one cast leg onto a uniform depth axis.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::cast::CastDirection;
use crate::error::{Result, SuboceanError};
use crate::log::{ProcessingLog, Stage};
use crate::table::MeasurementTable;

/// One cast leg resampled onto a uniform depth axis.
///
/// Serializes with NaN rendered as `null`, so the JSON artifact is loadable
/// by downstream plotting tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GriddedDataset {
    /// Profile this leg came from.
    pub profile_name: String,
    /// Which leg of the cast this is.
    pub cast: CastDirection,
    /// Grid spacing in meters.
    pub depth_interval: f64,
    /// Uniform depth axis, ascending.
    pub depths: Vec<f64>,
    /// Channel values aligned with `depths`; NaN where no data brackets a
    /// grid point.
    pub channels: IndexMap<String, Vec<f64>>,
}

impl GriddedDataset {
    /// Number of grid points.
    pub fn len(&self) -> usize {
        self.depths.len()
    }

    /// Whether the grid holds no points.
    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }

    /// Values of one gridded channel.
    pub fn channel(&self, name: &str) -> Option<&[f64]> {
        self.channels.get(name).map(Vec::as_slice)
    }
}

/// Resample every numeric channel of `table` onto a uniform depth axis.
///
/// Rows sharing an exact depth are averaged first (skipping NaN), then each
/// channel is linearly interpolated between its finite observations. The
/// axis runs from the floored minimum to the ceiled maximum observed depth
/// in `depth_interval` steps; grid points outside a channel's observed span
/// stay NaN rather than extrapolate.
pub fn grid_to_depth(
    table: &MeasurementTable,
    profile_name: &str,
    cast: CastDirection,
    depth_channel: &str,
    depth_interval: f64,
    log: &mut ProcessingLog,
) -> Result<GriddedDataset> {
    if !(depth_interval > 0.0) {
        return Err(SuboceanError::Grid(format!(
            "depth interval must be positive, got {depth_interval}"
        )));
    }
    let depths = table.float(depth_channel).ok_or_else(|| {
        SuboceanError::Grid(format!(
            "depth channel '{depth_channel}' absent or non-numeric"
        ))
    })?;

    // Group rows by exact depth, ascending.
    let mut order: Vec<usize> = (0..depths.len()).filter(|&i| depths[i].is_finite()).collect();
    order.sort_by(|&a, &b| depths[a].total_cmp(&depths[b]));
    let mut groups: Vec<(f64, Vec<usize>)> = Vec::new();
    for i in order {
        match groups.last_mut() {
            Some((d, rows)) if *d == depths[i] => rows.push(i),
            _ => groups.push((depths[i], vec![i])),
        }
    }
    if groups.is_empty() {
        return Err(SuboceanError::Grid(format!(
            "depth channel '{depth_channel}' has no finite samples"
        )));
    }

    let lo = groups.first().map(|(d, _)| *d).unwrap_or_default().floor();
    let hi = groups.last().map(|(d, _)| *d).unwrap_or_default().ceil();
    let steps = ((hi - lo) / depth_interval).round() as usize;
    let axis: Vec<f64> = (0..=steps).map(|k| lo + k as f64 * depth_interval).collect();

    let mut channels = IndexMap::new();
    for name in table.float_channel_names() {
        if name == depth_channel {
            continue;
        }
        let values = table.float(&name).unwrap_or(&[]);

        // NaN-skipping average per depth group.
        let points: Vec<(f64, f64)> = groups
            .iter()
            .filter_map(|(depth, rows)| {
                let finite: Vec<f64> = rows
                    .iter()
                    .map(|&i| values[i])
                    .filter(|v| v.is_finite())
                    .collect();
                if finite.is_empty() {
                    None
                } else {
                    Some((*depth, finite.iter().sum::<f64>() / finite.len() as f64))
                }
            })
            .collect();

        let gridded: Vec<f64> = axis.iter().map(|&d| interpolate(&points, d)).collect();
        channels.insert(name, gridded);
    }

    log.info(
        Stage::Gridder,
        "grid",
        format!(
            "{} {} cast: {} rows onto {} grid points at {depth_interval} m",
            profile_name,
            cast,
            table.row_count(),
            axis.len()
        ),
    );

    Ok(GriddedDataset {
        profile_name: profile_name.to_string(),
        cast,
        depth_interval,
        depths: axis,
        channels,
    })
}

/// Linear interpolation over ascending `(x, y)` points; NaN outside the
/// observed span or with fewer than two points.
fn interpolate(points: &[(f64, f64)], x: f64) -> f64 {
    if points.len() < 2 {
        return f64::NAN;
    }
    let first = points[0].0;
    let last = points[points.len() - 1].0;
    if x < first || x > last {
        return f64::NAN;
    }
    match points.binary_search_by(|(px, _)| px.total_cmp(&x)) {
        Ok(i) => points[i].1,
        Err(i) => {
            let (x0, y0) = points[i - 1];
            let (x1, y1) = points[i];
            y0 + (y1 - y0) * (x - x0) / (x1 - x0)
        }
    }
}
