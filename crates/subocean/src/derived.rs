//! Derived parameters: time-delay alignment, smoothing, flow split and
//! cell-temperature corrections.

use crate::cast;
use crate::error::{Result, SuboceanError};
use crate::log::{ProcessingLog, Stage};
use crate::schema::{self, ChannelVariants};
use crate::table::MeasurementTable;

/// Empirical cell-temperature coefficient for the methane channel.
const CH4_TEMP_COEF: f64 = 0.925;
/// Empirical cell-temperature coefficient for the water-vapour channel.
const H2O_TEMP_COEF: f64 = 2.469;
/// Reference cell temperature in degrees Celsius.
const T_REF_CELSIUS: f64 = 40.0;

/// Time-delay correction parameters.
#[derive(Debug, Clone)]
pub struct TimeDelay {
    /// Gas channels to shift.
    pub channels: Vec<String>,
    /// Carrier-gas transit delay in seconds.
    pub seconds: f64,
}

/// Options for [`calculate_all`].
#[derive(Debug, Clone)]
pub struct CalculatorOptions {
    /// Channel driving cast segmentation.
    pub pressure_channel: String,
    /// Hysteresis threshold for segmentation.
    pub pressure_threshold: f64,
    /// Humidity channel smoothed before flow computation.
    pub humidity_channel: String,
    /// Moving-average window for the humidity channel.
    pub smoothing_window: usize,
    /// Optional transit-time alignment.
    pub time_delay: Option<TimeDelay>,
    /// Apply the cell-temperature gas corrections. Off until calibration
    /// sign-off confirms the analyzer output is not already corrected.
    pub apply_gas_corrections: bool,
}

impl Default for CalculatorOptions {
    fn default() -> Self {
        Self {
            pressure_channel: schema::HYDROSTATIC_PRESSURE.to_string(),
            pressure_threshold: 0.03,
            humidity_channel: schema::H2O_MEASURED.to_string(),
            smoothing_window: 10,
            time_delay: None,
            apply_gas_corrections: false,
        }
    }
}

/// Proof that [`compute_flows`] populated the flow fields.
///
/// [`compute_gas_corrections`] takes this by reference, so the corrected
/// total flow cannot be requested before the uncorrected split exists.
#[derive(Debug, Clone)]
pub struct FlowColumns {
    dry_gas: String,
    water_vapour: String,
}

impl FlowColumns {
    /// Name of the dry-gas flow channel.
    pub fn dry_gas(&self) -> &str {
        &self.dry_gas
    }

    /// Name of the water-vapour flow channel.
    pub fn water_vapour(&self) -> &str {
        &self.water_vapour
    }
}

/// Shift gas channels backward to compensate carrier-gas transit time.
///
/// The effective sampling frequency comes from the median inter-sample
/// interval of the `datetime` column; `delay_seconds` is converted to a
/// whole sample count and each channel is shifted by that many samples, the
/// vacated tail forward-filled. Without a `datetime` column this is a
/// logged no-op.
pub fn time_delay_correct<S: AsRef<str>>(
    table: &mut MeasurementTable,
    channels: &[S],
    delay_seconds: f64,
    log: &mut ProcessingLog,
) {
    let Some(datetimes) = table.datetimes(schema::DATETIME) else {
        log.warn(
            Stage::Derived,
            "skip time delay",
            "missing datetime column",
        );
        return;
    };

    let mut intervals: Vec<f64> = datetimes
        .windows(2)
        .map(|w| (w[1] - w[0]).num_milliseconds() as f64 / 1000.0)
        .collect();
    intervals.sort_by(f64::total_cmp);
    let median = match intervals.len() {
        0 => 0.0,
        n if n % 2 == 1 => intervals[n / 2],
        n => (intervals[n / 2 - 1] + intervals[n / 2]) / 2.0,
    };
    if !(median > 0.0) {
        log.warn(
            Stage::Derived,
            "skip time delay",
            "cannot derive sampling frequency from datetime column",
        );
        return;
    }

    let shift = (delay_seconds / median) as usize;
    for channel in channels {
        let name = channel.as_ref();
        let Some(values) = table.float_mut(name) else {
            log.warn(
                Stage::Derived,
                "skip time delay",
                format!("channel '{name}' absent or non-numeric"),
            );
            continue;
        };
        let n = values.len();
        if n > 0 && shift > 0 {
            let shifted: Vec<f64> = (0..n).map(|i| values[(i + shift).min(n - 1)]).collect();
            *values = shifted;
        }
        log.info(
            Stage::Derived,
            "time delay",
            format!("shifted '{name}' by {shift} samples ({delay_seconds:.1}s)"),
        );
    }
}

/// Overwrite a channel with its centered rolling mean.
///
/// Positions whose window is incomplete or contains NaN become NaN. The
/// original values are preserved in `<channel>_unsmoothed`.
pub fn moving_average(
    table: &mut MeasurementTable,
    channel: &str,
    window: usize,
    log: &mut ProcessingLog,
) {
    let variants = ChannelVariants::new(channel);
    let Some(values) = table.float(channel).map(<[f64]>::to_vec) else {
        log.warn(
            Stage::Derived,
            "skip moving average",
            format!("channel '{channel}' absent or non-numeric"),
        );
        return;
    };
    if window == 0 {
        log.warn(Stage::Derived, "skip moving average", "window is zero");
        return;
    }

    let n = values.len();
    let before = window / 2;
    let after = (window - 1) / 2;
    let smoothed: Vec<f64> = (0..n)
        .map(|i| {
            if i < before || i + after >= n {
                return f64::NAN;
            }
            let slice = &values[i - before..=i + after];
            slice.iter().sum::<f64>() / window as f64
        })
        .collect();

    table.insert_float(variants.unsmoothed(), values);
    table.insert_float(channel, smoothed);
    log.info(
        Stage::Derived,
        "moving average",
        format!("applied {window}-point centered mean to '{channel}'"),
    );
}

/// Split the total flow into dry-gas and water-vapour components.
///
/// Skipped with a warning when any required channel is missing; never an
/// error, since instrument variants without flow sensors still produce
/// usable profiles.
pub fn compute_flows(table: &mut MeasurementTable, log: &mut ProcessingLog) -> Option<FlowColumns> {
    let (Some(total), Some(carrier), Some(h2o)) = (
        table.float(schema::TOTAL_FLOW),
        table.float(schema::CARRIER_FLOW),
        table.float(schema::H2O_MEASURED),
    ) else {
        log.warn(
            Stage::Derived,
            "skip flows",
            "missing flow or humidity channels",
        );
        return None;
    };

    let water_vapour: Vec<f64> = total
        .iter()
        .zip(h2o)
        .map(|(&t, &w)| t * w / 100.0)
        .collect();
    let dry_gas: Vec<f64> = total
        .iter()
        .zip(carrier)
        .zip(&water_vapour)
        .map(|((&t, &c), &wv)| t - c - wv)
        .collect();

    table.insert_float(schema::DRY_GAS_FLOW, dry_gas);
    table.insert_float(schema::WATER_VAPOUR_FLOW, water_vapour);
    log.info(Stage::Derived, "flows", "computed dry-gas and vapour flows");

    Some(FlowColumns {
        dry_gas: schema::DRY_GAS_FLOW.to_string(),
        water_vapour: schema::WATER_VAPOUR_FLOW.to_string(),
    })
}

/// Apply the empirical cell-temperature corrections.
///
/// Must run after [`compute_flows`]; if the flow fields have been removed in
/// the meantime this fails loudly rather than emit a wrong corrected total.
pub fn compute_gas_corrections(
    table: &mut MeasurementTable,
    flows: &FlowColumns,
    log: &mut ProcessingLog,
) -> Result<()> {
    if !table.has_channels(&[flows.dry_gas(), flows.water_vapour()]) {
        return Err(SuboceanError::MissingFlows(
            "flow fields were removed before gas correction".to_string(),
        ));
    }

    let temperatures = table
        .float(schema::CELL_TEMPERATURE)
        .map(<[f64]>::to_vec);
    let Some(temperatures) = temperatures else {
        log.warn(
            Stage::Derived,
            "skip gas corrections",
            format!("channel '{}' absent", schema::CELL_TEMPERATURE),
        );
        return Ok(());
    };

    let correction = |coef: f64| {
        move |(&raw, &t): (&f64, &f64)| raw / (coef * (t - T_REF_CELSIUS) / 100.0 + 1.0)
    };

    if let Some(ch4) = table.float(schema::CH4_DISSOLVED) {
        let corrected: Vec<f64> = ch4
            .iter()
            .zip(&temperatures)
            .map(correction(CH4_TEMP_COEF))
            .collect();
        table.insert_float(ChannelVariants::new(schema::CH4_DISSOLVED).corrected(), corrected);
        log.info(Stage::Derived, "gas correction", "corrected CH4 for cell temperature");
    } else {
        log.warn(
            Stage::Derived,
            "skip gas corrections",
            format!("channel '{}' absent", schema::CH4_DISSOLVED),
        );
    }

    let h2o_corrected = table.float(schema::H2O_MEASURED).map(|h2o| {
        h2o.iter()
            .map(|&w| w / 100.0)
            .collect::<Vec<f64>>()
            .iter()
            .zip(&temperatures)
            .map(correction(H2O_TEMP_COEF))
            .collect::<Vec<f64>>()
    });

    match h2o_corrected {
        Some(h2o_corrected) => {
            // Corrected total flow re-assembles the split with the corrected
            // vapour term.
            let dry = table
                .float(flows.dry_gas())
                .map(<[f64]>::to_vec)
                .unwrap_or_default();
            let carrier = table
                .float(schema::CARRIER_FLOW)
                .map(<[f64]>::to_vec)
                .unwrap_or_default();
            if dry.len() == h2o_corrected.len() && carrier.len() == h2o_corrected.len() {
                let total_corrected: Vec<f64> = dry
                    .iter()
                    .zip(&h2o_corrected)
                    .zip(&carrier)
                    .map(|((&d, &w), &c)| d + w + c)
                    .collect();
                table.insert_float(
                    ChannelVariants::new(schema::TOTAL_FLOW).corrected(),
                    total_corrected,
                );
            }
            table.insert_float(
                ChannelVariants::new(schema::H2O_MEASURED).corrected(),
                h2o_corrected,
            );
            log.info(Stage::Derived, "gas correction", "corrected H2O and total flow");
        }
        None => {
            log.warn(
                Stage::Derived,
                "skip gas corrections",
                format!("channel '{}' absent", schema::H2O_MEASURED),
            );
        }
    }

    Ok(())
}

/// Run the full derived-parameter sequence in its required order:
/// cast segmentation, optional time-delay alignment, humidity smoothing,
/// flow split, then (only when opted in) the gas corrections.
pub fn calculate_all(
    table: &MeasurementTable,
    options: &CalculatorOptions,
    log: &mut ProcessingLog,
) -> Result<MeasurementTable> {
    let mut table = cast::segment(
        table,
        &options.pressure_channel,
        options.pressure_threshold,
        log,
    )?;

    if let Some(delay) = &options.time_delay {
        time_delay_correct(&mut table, &delay.channels, delay.seconds, log);
    }

    moving_average(
        &mut table,
        &options.humidity_channel,
        options.smoothing_window,
        log,
    );

    let flows = compute_flows(&mut table, log);

    if options.apply_gas_corrections {
        let flows = flows.ok_or_else(|| {
            SuboceanError::MissingFlows(
                "gas corrections requested but flow fields could not be computed".to_string(),
            )
        })?;
        compute_gas_corrections(&mut table, &flows, log)?;
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;
    use chrono::NaiveDate;

    fn seconds_datetimes(n: usize) -> Vec<chrono::NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2024, 11, 27)
            .unwrap()
            .and_hms_opt(12, 58, 45)
            .unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::seconds(i as i64))
            .collect()
    }

    #[test]
    fn test_time_delay_shifts_and_forward_fills() {
        let mut table = MeasurementTable::new();
        table.insert(
            schema::DATETIME,
            Column::DateTime(seconds_datetimes(6)),
        );
        table.insert_float("gas", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let mut log = ProcessingLog::new();

        // 1 Hz sampling, 2 s delay: shift 2 samples, tail filled from the
        // shifted-in final value.
        time_delay_correct(&mut table, &["gas"], 2.0, &mut log);
        assert_eq!(
            table.float("gas").unwrap(),
            &[3.0, 4.0, 5.0, 6.0, 6.0, 6.0]
        );
    }

    #[test]
    fn test_time_delay_without_datetime_is_noop() {
        let mut table = MeasurementTable::new();
        table.insert_float("gas", vec![1.0, 2.0, 3.0]);
        let mut log = ProcessingLog::new();
        time_delay_correct(&mut table, &["gas"], 2.0, &mut log);

        assert_eq!(table.float("gas").unwrap(), &[1.0, 2.0, 3.0]);
        assert!(log.warnings().any(|r| r.action == "skip time delay"));
    }

    #[test]
    fn test_moving_average_centered_and_recoverable() {
        let mut table = MeasurementTable::new();
        table.insert_float("h", vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let mut log = ProcessingLog::new();
        moving_average(&mut table, "h", 3, &mut log);

        let smoothed = table.float("h").unwrap();
        assert!(smoothed[0].is_nan());
        assert_eq!(smoothed[1], 2.0);
        assert_eq!(smoothed[2], 3.0);
        assert_eq!(smoothed[3], 4.0);
        assert!(smoothed[4].is_nan());

        assert_eq!(
            table.float("h_unsmoothed").unwrap(),
            &[1.0, 2.0, 3.0, 4.0, 5.0]
        );
    }

    #[test]
    fn test_moving_average_nan_poisons_window() {
        let mut table = MeasurementTable::new();
        table.insert_float("h", vec![1.0, f64::NAN, 3.0, 4.0, 5.0]);
        let mut log = ProcessingLog::new();
        moving_average(&mut table, "h", 3, &mut log);

        let smoothed = table.float("h").unwrap();
        assert!(smoothed[1].is_nan());
        assert!(smoothed[2].is_nan());
        assert_eq!(smoothed[3], 4.0);
    }

    fn flow_table() -> MeasurementTable {
        let mut table = MeasurementTable::new();
        table.insert_float(schema::TOTAL_FLOW, vec![20.0, 30.0]);
        table.insert_float(schema::CARRIER_FLOW, vec![5.0, 5.0]);
        table.insert_float(schema::H2O_MEASURED, vec![10.0, 20.0]);
        table
    }

    #[test]
    fn test_compute_flows_splits_total() {
        let mut table = flow_table();
        let mut log = ProcessingLog::new();
        let flows = compute_flows(&mut table, &mut log).unwrap();

        assert_eq!(
            table.float(flows.water_vapour()).unwrap(),
            &[2.0, 6.0]
        );
        assert_eq!(table.float(flows.dry_gas()).unwrap(), &[13.0, 19.0]);
    }

    #[test]
    fn test_compute_flows_missing_channel_skips() {
        let mut table = MeasurementTable::new();
        table.insert_float(schema::TOTAL_FLOW, vec![20.0]);
        let mut log = ProcessingLog::new();

        assert!(compute_flows(&mut table, &mut log).is_none());
        assert!(log.warnings().any(|r| r.action == "skip flows"));
    }

    #[test]
    fn test_gas_corrections_require_flow_fields() {
        let mut table = flow_table();
        table.insert_float(schema::CELL_TEMPERATURE, vec![39.7, 39.7]);
        table.insert_float(schema::CH4_DISSOLVED, vec![8.5, 9.0]);
        let mut log = ProcessingLog::new();
        let flows = compute_flows(&mut table, &mut log).unwrap();

        // Removing a flow field after the fact must fail loudly.
        let mut broken = table.filter_rows(&[true, true]);
        let trimmed: Vec<String> = broken
            .channel_names()
            .iter()
            .filter(|n| **n != schema::DRY_GAS_FLOW)
            .map(|n| n.to_string())
            .collect();
        let mut rebuilt = MeasurementTable::new();
        for name in trimmed {
            rebuilt.insert(name.clone(), broken.column(&name).unwrap().clone());
        }
        broken = rebuilt;

        assert!(matches!(
            compute_gas_corrections(&mut broken, &flows, &mut log),
            Err(SuboceanError::MissingFlows(_))
        ));
    }

    #[test]
    fn test_gas_corrections_at_reference_temperature_are_identity() {
        let mut table = flow_table();
        table.insert_float(schema::CELL_TEMPERATURE, vec![40.0, 40.0]);
        table.insert_float(schema::CH4_DISSOLVED, vec![8.5, 9.0]);
        let mut log = ProcessingLog::new();
        let flows = compute_flows(&mut table, &mut log).unwrap();
        compute_gas_corrections(&mut table, &flows, &mut log).unwrap();

        let corrected = table
            .float("[CH4] dissolved with water vapour (ppm) corrected Tcell")
            .unwrap();
        assert_eq!(corrected, &[8.5, 9.0]);

        let h2o = table
            .float("[H2O] measured (%) corrected Tcell")
            .unwrap();
        assert_eq!(h2o, &[0.1, 0.2]);
    }

    #[test]
    fn test_calculate_all_runs_in_order() {
        let mut table = flow_table();
        table.insert_float(
            schema::HYDROSTATIC_PRESSURE,
            vec![0.5, 1.0], // strictly descending leg only
        );
        let mut log = ProcessingLog::new();

        let options = CalculatorOptions {
            smoothing_window: 1,
            ..CalculatorOptions::default()
        };
        let result = calculate_all(&table, &options, &mut log).unwrap();

        assert!(result.contains(schema::IS_DOWNCAST));
        assert!(result.contains(schema::DRY_GAS_FLOW));
        assert!(result.contains("[H2O] measured (%)_unsmoothed"));
        // Gas correction is opt-in and was not requested.
        assert!(!result.contains("[CH4] dissolved with water vapour (ppm) corrected Tcell"));
    }
}
