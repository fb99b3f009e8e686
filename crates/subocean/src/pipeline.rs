//! Pipeline orchestration: raw profile through quality levels L1A-L3, plus
//! batch runs and cross-profile combination.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::cast::{self, CastDirection};
use crate::derived::{self, CalculatorOptions};
use crate::error::{Result, SuboceanError};
use crate::grid::{self, GriddedDataset};
use crate::input::{LoadedProfile, Profile};
use crate::log::{ProcessingLog, Stage};
use crate::schema;
use crate::table::MeasurementTable;
use crate::validation::{ValidationConfig, Validator};

/// Full pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Range and RSD rules for the validator.
    pub validation: ValidationConfig,
    /// Segmentation, smoothing and correction options.
    pub calculator: CalculatorOptions,
    /// Channel driving the depth grid.
    pub depth_channel: String,
    /// Grid spacing in meters.
    pub depth_interval: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            validation: ValidationConfig::default(),
            calculator: CalculatorOptions::default(),
            depth_channel: schema::DEPTH.to_string(),
            depth_interval: 0.05,
        }
    }
}

/// Every quality level produced for one profile.
///
/// Each level is an independent copy: inspecting L1A after the run shows
/// flags over untouched raw values even though L1B blanked them.
#[derive(Debug, Clone)]
pub struct ProfileLevels {
    /// Profile name (data file stem).
    pub name: String,
    /// Raw values with quality flags and RSD columns added.
    pub l1a: MeasurementTable,
    /// Flag-filtered values (row filter, then strong filter).
    pub l1b: MeasurementTable,
    /// Segmented casts with derived parameters.
    pub l2: MeasurementTable,
    /// Depth-gridded legs; empty when no leg could be gridded.
    pub l3: Vec<GriddedDataset>,
}

/// One profile's outcome in a batch run.
#[derive(Debug)]
pub struct BatchResult {
    /// Successfully processed profiles with their logs.
    pub completed: Vec<(LoadedProfile, ProfileLevels, ProcessingLog)>,
    /// Profiles that failed, with the error that stopped them.
    pub failed: Vec<(String, SuboceanError)>,
}

impl BatchResult {
    /// Gridded legs of one cast direction across all completed profiles.
    pub fn grids_for(&self, cast: CastDirection) -> Vec<&GriddedDataset> {
        self.completed
            .iter()
            .flat_map(|(_, levels, _)| &levels.l3)
            .filter(|g| g.cast == cast)
            .collect()
    }
}

/// Multi-profile dataset: one cast direction of several profiles on a
/// shared depth axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedDataset {
    /// Which leg each member grid represents.
    pub cast: CastDirection,
    /// Shared grid spacing.
    pub depth_interval: f64,
    /// Profile names in member order.
    pub profiles: Vec<String>,
    /// Union depth axis covering every member.
    pub depths: Vec<f64>,
    /// Per channel, one row of values per profile aligned with `depths`;
    /// NaN where a profile does not reach.
    pub channels: IndexMap<String, Vec<Vec<f64>>>,
}

/// Runs profiles through the quality levels.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline with the given configuration.
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Access the active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load one profile and produce all quality levels.
    ///
    /// The log is owned by this call: batch workers running in parallel
    /// each get their own.
    pub fn process(&self, profile: &Profile) -> Result<(LoadedProfile, ProfileLevels, ProcessingLog)> {
        let mut log = ProcessingLog::new();
        let loaded = profile.load(&mut log)?;
        let levels = self.run_levels(&profile.name(), &loaded.table, &mut log)?;
        Ok((loaded, levels, log))
    }

    /// Produce the quality levels from an already loaded table.
    pub fn run_levels(
        &self,
        name: &str,
        raw: &MeasurementTable,
        log: &mut ProcessingLog,
    ) -> Result<ProfileLevels> {
        let validator = Validator::new(self.config.validation.clone());

        let mut l1a = raw.clone();
        validator.validate_ranges(&mut l1a, log);
        validator.compute_rsd(&mut l1a, log);

        let mut l1b = l1a.clone();
        Validator::apply_row_filter(&mut l1b, log);
        Validator::apply_strong_filter(
            &mut l1b,
            &[validator.config().error_channel.clone()],
            log,
        );

        let l2 = derived::calculate_all(&l1b, &self.config.calculator, log)?;

        // Grid each leg independently; an ungridable leg (empty upcast,
        // all-NaN depths) is skipped, not fatal.
        let mut l3 = Vec::new();
        for cast in [CastDirection::Downcast, CastDirection::Upcast] {
            let Some(leg) = cast::select_cast(&l2, cast) else {
                continue;
            };
            if leg.row_count() == 0 {
                log.warn(Stage::Pipeline, "skip grid", format!("{cast} leg is empty"));
                continue;
            }
            match grid::grid_to_depth(
                &leg,
                name,
                cast,
                &self.config.depth_channel,
                self.config.depth_interval,
                log,
            ) {
                Ok(gridded) => l3.push(gridded),
                Err(err) => {
                    log.warn(Stage::Pipeline, "skip grid", format!("{cast}: {err}"));
                }
            }
        }

        log.info(
            Stage::Pipeline,
            "levels",
            format!("{name}: L1A/L1B/L2 built, {} gridded legs", l3.len()),
        );

        Ok(ProfileLevels {
            name: name.to_string(),
            l1a,
            l1b,
            l2,
            l3,
        })
    }

    /// Process a batch of profiles. One profile's failure is recorded and
    /// does not stop the others.
    pub fn process_batch(&self, profiles: &[Profile]) -> BatchResult {
        let mut completed = Vec::new();
        let mut failed = Vec::new();
        for profile in profiles {
            match self.process(profile) {
                Ok((loaded, levels, log)) => completed.push((loaded, levels, log)),
                Err(err) => {
                    tracing::warn!(profile = %profile.name(), error = %err, "profile failed");
                    failed.push((profile.name(), err));
                }
            }
        }
        BatchResult { completed, failed }
    }
}

/// Combine same-cast gridded legs from several profiles onto a union axis.
///
/// Members must share the cast direction and grid interval. Only channels
/// present in every member survive; the rest are dropped with a warning.
pub fn combine(grids: &[&GriddedDataset], log: &mut ProcessingLog) -> Result<CombinedDataset> {
    let first = grids.first().ok_or_else(|| {
        SuboceanError::Grid("cannot combine zero gridded profiles".to_string())
    })?;
    let interval = first.depth_interval;
    let cast = first.cast;
    for g in grids {
        if g.cast != cast {
            return Err(SuboceanError::Grid(format!(
                "cannot combine {} and {} legs",
                cast, g.cast
            )));
        }
        if g.depth_interval != interval {
            return Err(SuboceanError::Grid(format!(
                "grid intervals differ: {} vs {}",
                interval, g.depth_interval
            )));
        }
        if g.is_empty() {
            return Err(SuboceanError::Grid(format!(
                "profile '{}' has an empty grid",
                g.profile_name
            )));
        }
    }

    let lo = grids
        .iter()
        .map(|g| g.depths[0])
        .fold(f64::INFINITY, f64::min);
    let hi = grids
        .iter()
        .map(|g| g.depths[g.len() - 1])
        .fold(f64::NEG_INFINITY, f64::max);

    // Every member axis must sit on the union lattice, otherwise the index
    // offset below would shift its samples to the wrong depths.
    for g in grids {
        let offset = (g.depths[0] - lo) / interval;
        if (offset - offset.round()).abs() > 1e-9 {
            return Err(SuboceanError::Grid(format!(
                "profile '{}' axis start {} is not a multiple of interval {} \
                 from the combined start {}",
                g.profile_name, g.depths[0], interval, lo
            )));
        }
    }

    let steps = ((hi - lo) / interval).round() as usize;
    let depths: Vec<f64> = (0..=steps).map(|k| lo + k as f64 * interval).collect();

    // Channel intersection across members.
    let mut shared: Vec<String> = first.channels.keys().cloned().collect();
    shared.retain(|name| {
        let everywhere = grids.iter().all(|g| g.channels.contains_key(name));
        if !everywhere {
            log.warn(
                Stage::Pipeline,
                "combine",
                format!("channel '{name}' missing from some profiles, dropped"),
            );
        }
        everywhere
    });

    let mut channels: IndexMap<String, Vec<Vec<f64>>> = IndexMap::new();
    for name in &shared {
        let mut rows = Vec::with_capacity(grids.len());
        for g in grids {
            let offset = ((g.depths[0] - lo) / interval).round() as usize;
            let values = &g.channels[name];
            let mut row = vec![f64::NAN; depths.len()];
            row[offset..offset + values.len()].copy_from_slice(values);
            rows.push(row);
        }
        channels.insert(name.clone(), rows);
    }

    log.info(
        Stage::Pipeline,
        "combine",
        format!(
            "{} {} profiles onto {} depth points, {} shared channels",
            grids.len(),
            cast,
            depths.len(),
            channels.len()
        ),
    );

    Ok(CombinedDataset {
        cast,
        depth_interval: interval,
        profiles: grids.iter().map(|g| g.profile_name.clone()).collect(),
        depths,
        channels,
    })
}
