//! Per-sample quality flagging and flag-driven filtering.
//!
//! Flags are additive: every pass ORs new conditions into the existing
//! `<channel>_FLAG` column and never clears a set flag. Raw values are only
//! blanked by the explicit filter passes, never by the flagging passes.

use serde::{Deserialize, Serialize};

use crate::log::{ProcessingLog, Stage};
use crate::schema::{self, ChannelVariants};
use crate::table::{Column, MeasurementTable};

use super::config::ValidationConfig;

/// Outlier detection method for the error channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierMethod {
    /// Sigma rule: values further than `threshold` sample standard
    /// deviations from the mean are flagged.
    ZScore,
    /// Tukey's method: values outside `[q1 - t*iqr, q3 + t*iqr]` are flagged.
    Iqr,
}

/// Summary statistics over a channel's non-NaN values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub count: usize,
}

/// Flags out-of-range and high-noise samples.
#[derive(Debug, Clone)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a validator with the given configuration.
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Access the active configuration.
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Flag every configured channel's samples that fall outside the
    /// acceptance range or are missing. Values themselves are not touched.
    ///
    /// Configured channels absent from the table (or non-numeric) are
    /// skipped with a warning record, so one configuration can serve
    /// instrument variants with differing channel sets.
    pub fn validate_ranges(&self, table: &mut MeasurementTable, log: &mut ProcessingLog) {
        let mut checks: Vec<(String, (f64, f64))> = self
            .config
            .standard_ranges
            .iter()
            .map(|(name, range)| (name.clone(), *range))
            .collect();
        for (name, rule) in &self.config.gas_rules {
            checks.push((name.clone(), rule.range));
        }

        for (name, (min, max)) in checks {
            let Some(values) = table.float(&name) else {
                log.warn(
                    Stage::Validator,
                    "skip range check",
                    format!("channel '{name}' absent or non-numeric"),
                );
                continue;
            };
            let mask: Vec<bool> = values
                .iter()
                .map(|&v| v.is_nan() || v < min || v > max)
                .collect();
            or_flag(table, &ChannelVariants::new(&name), &mask);
            log.info(
                Stage::Validator,
                "range check",
                format!("'{name}' validated against [{min}, {max}]"),
            );
        }
    }

    /// Compute `<channel>_RSD = error^2 / value` for every configured gas
    /// channel and OR the threshold test into the channel's flag.
    ///
    /// A zero concentration makes the RSD NaN (flagged, never an error).
    pub fn compute_rsd(&self, table: &mut MeasurementTable, log: &mut ProcessingLog) {
        let Some(errors) = table.float(&self.config.error_channel).map(<[f64]>::to_vec) else {
            log.warn(
                Stage::Validator,
                "skip RSD",
                format!("error channel '{}' absent", self.config.error_channel),
            );
            return;
        };

        for (name, rule) in &self.config.gas_rules {
            let Some(values) = table.float(name) else {
                log.warn(
                    Stage::Validator,
                    "skip RSD",
                    format!("channel '{name}' absent or non-numeric"),
                );
                continue;
            };

            let rsd: Vec<f64> = values
                .iter()
                .zip(&errors)
                .map(|(&v, &e)| if v == 0.0 { f64::NAN } else { e * e / v })
                .collect();
            let mask: Vec<bool> = rsd
                .iter()
                .map(|&r| r.is_nan() || r > rule.rsd_threshold)
                .collect();

            let variants = ChannelVariants::new(name);
            table.insert_float(variants.rsd(), rsd);
            or_flag(table, &variants, &mask);
            log.info(
                Stage::Validator,
                "rsd",
                format!("'{name}' tested against threshold {}", rule.rsd_threshold),
            );
        }
    }

    /// Flag statistical outliers on the error channel.
    ///
    /// Complements the absolute range check: a noise estimate can sit inside
    /// its acceptance range yet still be anomalous for this deployment.
    pub fn flag_error_outliers(
        &self,
        table: &mut MeasurementTable,
        method: OutlierMethod,
        threshold: f64,
        log: &mut ProcessingLog,
    ) {
        let channel = self.config.error_channel.clone();
        let Some(values) = table.float(&channel).map(<[f64]>::to_vec) else {
            log.warn(
                Stage::Validator,
                "skip outlier check",
                format!("error channel '{channel}' absent"),
            );
            return;
        };

        let Some(metrics) = quality_metrics_of(&values) else {
            log.warn(
                Stage::Validator,
                "skip outlier check",
                "error channel has no valid samples",
            );
            return;
        };

        let (lower, upper) = match method {
            OutlierMethod::ZScore => (
                metrics.mean - threshold * metrics.std,
                metrics.mean + threshold * metrics.std,
            ),
            OutlierMethod::Iqr => {
                let iqr = metrics.q3 - metrics.q1;
                (metrics.q1 - threshold * iqr, metrics.q3 + threshold * iqr)
            }
        };

        let mask: Vec<bool> = values
            .iter()
            .map(|&v| !v.is_nan() && (v < lower || v > upper))
            .collect();
        let flagged = mask.iter().filter(|&&m| m).count();
        or_flag(table, &ChannelVariants::new(&channel), &mask);
        log.info(
            Stage::Validator,
            "outlier check",
            format!("flagged {flagged} '{channel}' outliers ({method:?})"),
        );
    }

    /// Column-wise filter: blank a channel's value wherever its own flag is
    /// set. One bad channel does not blank unrelated channels in the row.
    pub fn apply_row_filter(table: &mut MeasurementTable, log: &mut ProcessingLog) {
        for (raw, flag) in schema::flagged_channels(table) {
            let Some(flags) = table.float(&flag).map(<[f64]>::to_vec) else {
                continue;
            };
            if let Some(values) = table.float_mut(&raw) {
                let mut blanked = 0usize;
                for (value, flag_value) in values.iter_mut().zip(&flags) {
                    if *flag_value == 1.0 {
                        *value = f64::NAN;
                        blanked += 1;
                    }
                }
                log.info(
                    Stage::Validator,
                    "row filter",
                    format!("blanked {blanked} samples in '{raw}'"),
                );
            }
        }
    }

    /// Strong filter: blank every channel of a row when any of the listed
    /// channels is flagged there. A compromised noise estimate invalidates
    /// the whole sample.
    pub fn apply_strong_filter<S: AsRef<str>>(
        table: &mut MeasurementTable,
        channels_to_check: &[S],
        log: &mut ProcessingLog,
    ) {
        let rows = table.row_count();
        let mut drop_row = vec![false; rows];
        for channel in channels_to_check {
            let flag = ChannelVariants::new(channel.as_ref()).flag();
            let Some(flags) = table.float(&flag) else {
                log.warn(
                    Stage::Validator,
                    "strong filter",
                    format!("no flag column for '{}'", channel.as_ref()),
                );
                continue;
            };
            for (row, &flag_value) in flags.iter().enumerate() {
                if flag_value == 1.0 {
                    drop_row[row] = true;
                }
            }
        }

        let dropped = drop_row.iter().filter(|&&d| d).count();
        // Datetime and cast-label columns survive so time order stays
        // auditable; everything else in a dropped row is blanked.
        let names: Vec<String> = table.channel_names().iter().map(|n| n.to_string()).collect();
        for name in names {
            match table.column_mut(&name) {
                Some(Column::Float(values)) => {
                    for (value, &drop) in values.iter_mut().zip(&drop_row) {
                        if drop {
                            *value = f64::NAN;
                        }
                    }
                }
                Some(Column::Text(values)) => {
                    for (value, &drop) in values.iter_mut().zip(&drop_row) {
                        if drop {
                            value.clear();
                        }
                    }
                }
                _ => {}
            }
        }
        log.info(
            Stage::Validator,
            "strong filter",
            format!("blanked {dropped} rows"),
        );
    }

    /// Summary statistics for a numeric channel, NaN-skipping.
    pub fn quality_metrics(table: &MeasurementTable, channel: &str) -> Option<QualityMetrics> {
        quality_metrics_of(table.float(channel)?)
    }
}

/// OR a boolean mask into a channel's flag column, creating it when absent.
fn or_flag(table: &mut MeasurementTable, channel: &ChannelVariants, mask: &[bool]) {
    let flag_name = channel.flag();
    if !table.contains(&flag_name) {
        table.insert(&flag_name, Column::Float(vec![0.0; mask.len()]));
    }
    if let Some(flags) = table.float_mut(&flag_name) {
        for (flag, &set) in flags.iter_mut().zip(mask) {
            if set {
                *flag = 1.0;
            }
        }
    }
}

fn quality_metrics_of(values: &[f64]) -> Option<QualityMetrics> {
    let mut valid: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if valid.is_empty() {
        return None;
    }
    valid.sort_by(f64::total_cmp);

    let count = valid.len();
    let mean = valid.iter().sum::<f64>() / count as f64;
    let std = if count > 1 {
        (valid.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64).sqrt()
    } else {
        f64::NAN
    };

    Some(QualityMetrics {
        mean,
        std,
        min: valid[0],
        max: valid[count - 1],
        q1: percentile(&valid, 0.25),
        median: percentile(&valid, 0.5),
        q3: percentile(&valid, 0.75),
        count,
    })
}

/// Linear-interpolation percentile over an already sorted slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] * (1.0 - fraction) + sorted[upper] * fraction
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::config::GasRule;
    use indexmap::IndexMap;

    fn table_with(channel: &str, values: Vec<f64>) -> MeasurementTable {
        let mut table = MeasurementTable::new();
        table.insert_float(channel, values);
        table
    }

    fn config_with_range(channel: &str, min: f64, max: f64) -> ValidationConfig {
        let mut standard_ranges = IndexMap::new();
        standard_ranges.insert(channel.to_string(), (min, max));
        ValidationConfig {
            standard_ranges,
            gas_rules: IndexMap::new(),
            error_channel: schema::ERROR_STANDARD.to_string(),
        }
    }

    #[test]
    fn test_range_flags_out_of_range_and_missing() {
        let mut table = table_with("Depth (meter)", vec![1.0, -5.0, f64::NAN, 3.0]);
        let mut log = ProcessingLog::new();
        Validator::new(config_with_range("Depth (meter)", -2.0, 11000.0))
            .validate_ranges(&mut table, &mut log);

        let flags = table.float("Depth (meter)_FLAG").unwrap();
        assert_eq!(flags, &[0.0, 1.0, 1.0, 0.0]);
        // Values themselves are untouched.
        assert_eq!(table.float("Depth (meter)").unwrap()[1], -5.0);
    }

    #[test]
    fn test_flags_are_monotonic_across_passes() {
        let mut table = table_with("Depth (meter)", vec![-5.0, 1.0]);
        let mut log = ProcessingLog::new();

        let strict = Validator::new(config_with_range("Depth (meter)", -2.0, 11000.0));
        strict.validate_ranges(&mut table, &mut log);
        assert_eq!(table.float("Depth (meter)_FLAG").unwrap(), &[1.0, 0.0]);

        // A later, fully permissive pass must not clear the earlier flag.
        let permissive =
            Validator::new(config_with_range("Depth (meter)", f64::MIN, f64::MAX));
        permissive.validate_ranges(&mut table, &mut log);
        assert_eq!(table.float("Depth (meter)_FLAG").unwrap(), &[1.0, 0.0]);
    }

    #[test]
    fn test_absent_channel_is_skipped_with_warning() {
        let mut table = table_with("Depth (meter)", vec![1.0]);
        let mut log = ProcessingLog::new();
        Validator::new(config_with_range("Cavity Pressure (mbar)", 29.5, 30.5))
            .validate_ranges(&mut table, &mut log);

        assert!(!table.contains("Cavity Pressure (mbar)_FLAG"));
        assert!(log.warnings().any(|r| r.action == "skip range check"));
    }

    fn gas_config(threshold: f64) -> ValidationConfig {
        let mut gas_rules = IndexMap::new();
        gas_rules.insert(
            schema::CH4_DISSOLVED.to_string(),
            GasRule {
                range: (0.0, 100.0),
                rsd_threshold: threshold,
            },
        );
        ValidationConfig {
            standard_ranges: IndexMap::new(),
            gas_rules,
            error_channel: schema::ERROR_STANDARD.to_string(),
        }
    }

    #[test]
    fn test_rsd_end_to_end_vector() {
        // Six-sample scenario: all RSD values sit far below the threshold.
        let gas = vec![8.51, 11.15, 8.91, 10.12, 7.99, 8.55];
        let err = vec![0.012, 0.009, 0.006, 0.004, 0.012, 0.014];
        let expected = [1.69e-5, 7.27e-6, 4.04e-6, 1.58e-6, 1.80e-5, 2.29e-5];

        let mut table = MeasurementTable::new();
        table.insert_float(schema::CH4_DISSOLVED, gas);
        table.insert_float(schema::ERROR_STANDARD, err);
        let mut log = ProcessingLog::new();
        Validator::new(gas_config(0.001)).compute_rsd(&mut table, &mut log);

        let rsd = table
            .float("[CH4] dissolved with water vapour (ppm)_RSD")
            .unwrap();
        for (computed, want) in rsd.iter().zip(expected) {
            assert!((computed - want).abs() / want < 0.05, "{computed} vs {want}");
        }

        let flags = table
            .float("[CH4] dissolved with water vapour (ppm)_FLAG")
            .unwrap();
        assert!(flags.iter().all(|&f| f == 0.0));
    }

    #[test]
    fn test_rsd_zero_value_is_nan_and_flagged() {
        let mut table = MeasurementTable::new();
        table.insert_float(schema::CH4_DISSOLVED, vec![0.0, 10.0]);
        table.insert_float(schema::ERROR_STANDARD, vec![0.01, 0.01]);
        let mut log = ProcessingLog::new();
        Validator::new(gas_config(0.001)).compute_rsd(&mut table, &mut log);

        let rsd = table
            .float("[CH4] dissolved with water vapour (ppm)_RSD")
            .unwrap();
        assert!(rsd[0].is_nan());
        assert!(!rsd[1].is_nan());

        let flags = table
            .float("[CH4] dissolved with water vapour (ppm)_FLAG")
            .unwrap();
        assert_eq!(flags, &[1.0, 0.0]);
    }

    #[test]
    fn test_row_filter_blanks_only_flagged_channel() {
        let mut table = MeasurementTable::new();
        table.insert_float("A", vec![1.0, 2.0]);
        table.insert_float("A_FLAG", vec![1.0, 0.0]);
        table.insert_float("B", vec![5.0, 6.0]);
        let mut log = ProcessingLog::new();
        Validator::apply_row_filter(&mut table, &mut log);

        assert!(table.float("A").unwrap()[0].is_nan());
        assert_eq!(table.float("A").unwrap()[1], 2.0);
        // Unrelated channel in the same row survives.
        assert_eq!(table.float("B").unwrap(), &[5.0, 6.0]);
    }

    #[test]
    fn test_strong_filter_blanks_whole_row() {
        let mut table = MeasurementTable::new();
        table.insert_float(schema::ERROR_STANDARD, vec![0.2, 0.01]);
        table.insert_float("Error Standard_FLAG", vec![1.0, 0.0]);
        table.insert_float("B", vec![5.0, 6.0]);
        table.insert(
            "Date",
            Column::Text(vec!["2024-11-27".into(), "2024-11-27".into()]),
        );
        let mut log = ProcessingLog::new();
        Validator::apply_strong_filter(&mut table, &[schema::ERROR_STANDARD], &mut log);

        assert!(table.float(schema::ERROR_STANDARD).unwrap()[0].is_nan());
        assert!(table.float("B").unwrap()[0].is_nan());
        assert_eq!(table.text("Date").unwrap()[0], "");
        // Unflagged row is untouched.
        assert_eq!(table.float("B").unwrap()[1], 6.0);
        assert_eq!(table.float(schema::ERROR_STANDARD).unwrap()[1], 0.01);
        assert_eq!(table.text("Date").unwrap()[1], "2024-11-27");
    }

    #[test]
    fn test_error_outlier_flagging_zscore() {
        let mut values = vec![0.01; 20];
        values.push(0.09);
        let mut table = table_with(schema::ERROR_STANDARD, values);
        let mut log = ProcessingLog::new();

        let validator = Validator::new(ValidationConfig::default());
        validator.flag_error_outliers(&mut table, OutlierMethod::ZScore, 3.0, &mut log);

        let flags = table.float("Error Standard_FLAG").unwrap();
        assert_eq!(flags[20], 1.0);
        assert!(flags[..20].iter().all(|&f| f == 0.0));
    }

    #[test]
    fn test_quality_metrics_skip_nan() {
        let table = table_with("A", vec![1.0, f64::NAN, 3.0, 2.0]);
        let metrics = Validator::quality_metrics(&table, "A").unwrap();
        assert_eq!(metrics.count, 3);
        assert_eq!(metrics.mean, 2.0);
        assert_eq!(metrics.min, 1.0);
        assert_eq!(metrics.max, 3.0);
        assert_eq!(metrics.median, 2.0);
    }
}
