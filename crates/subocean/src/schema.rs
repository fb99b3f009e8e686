//! Channel-name vocabulary and derived-column naming.
//!
//! Every derived column name (`_FLAG`, `_RSD`, smoothing/correction
//! siblings) is built and recognized here, so the processing stages compose
//! through [`ChannelVariants`] instead of scattering string-suffix checks.

use crate::table::MeasurementTable;

/// Raw date text field from the instrument.
pub const DATE: &str = "Date";
/// Raw time text field from the instrument.
pub const TIME: &str = "Time";
/// Synthesized timestamp column combining [`DATE`] and [`TIME`].
pub const DATETIME: &str = "datetime";
/// Per-row cast label attached by the segmenter.
pub const IS_DOWNCAST: &str = "is_downcast";

/// Hydrostatic pressure channel driving cast segmentation.
pub const HYDROSTATIC_PRESSURE: &str = "Hydrostatic pressure (bar)";
/// Depth channel driving the gridder.
pub const DEPTH: &str = "Depth (meter)";
/// Shared analyzer noise estimate.
pub const ERROR_STANDARD: &str = "Error Standard";
/// Methane concentration as reported by the analyzer.
pub const CH4_DISSOLVED: &str = "[CH4] dissolved with water vapour (ppm)";
/// Water vapour percentage as reported by the analyzer.
pub const H2O_MEASURED: &str = "[H2O] measured (%)";
/// Analyzer cell temperature.
pub const CELL_TEMPERATURE: &str = "Cellule Temperature (Degree Celsius)";
/// Total gas flow through the instrument.
pub const TOTAL_FLOW: &str = "Total Flow (sccm)";
/// Carrier gas flow.
pub const CARRIER_FLOW: &str = "Flow Carrier Gas (sccm)";
/// Derived dry-gas flow.
pub const DRY_GAS_FLOW: &str = "Dry gas Flow [sccm]";
/// Derived water-vapour flow.
pub const WATER_VAPOUR_FLOW: &str = "Water_vapour flow [sccm]";

const FLAG_SUFFIX: &str = "_FLAG";
const RSD_SUFFIX: &str = "_RSD";
const UNSMOOTHED_SUFFIX: &str = "_unsmoothed";
const CORRECTED_SUFFIX: &str = " corrected Tcell";

/// Naming view over one measured channel and its derived companions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelVariants {
    raw: String,
}

impl ChannelVariants {
    /// Build the variants view for a raw channel name.
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// The raw channel name as emitted by the instrument.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Quality flag column: 1 marks an invalid sample, 0 a valid one.
    pub fn flag(&self) -> String {
        format!("{}{}", self.raw, FLAG_SUFFIX)
    }

    /// Relative-standard-deviation proxy column.
    pub fn rsd(&self) -> String {
        format!("{}{}", self.raw, RSD_SUFFIX)
    }

    /// Pre-smoothing copy kept by the moving-average stage.
    pub fn unsmoothed(&self) -> String {
        format!("{}{}", self.raw, UNSMOOTHED_SUFFIX)
    }

    /// Cell-temperature-corrected companion.
    pub fn corrected(&self) -> String {
        format!("{}{}", self.raw, CORRECTED_SUFFIX)
    }
}

/// Channels in `table` that currently carry a flag column.
///
/// Returns `(raw, flag)` name pairs in column order. This is the one place
/// where flag columns are discovered by name.
pub fn flagged_channels(table: &MeasurementTable) -> Vec<(String, String)> {
    table
        .channel_names()
        .iter()
        .filter_map(|name| {
            let raw = name.strip_suffix(FLAG_SUFFIX)?;
            if table.contains(raw) {
                Some((raw.to_string(), name.to_string()))
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_names() {
        let ch = ChannelVariants::new(CH4_DISSOLVED);
        assert_eq!(
            ch.flag(),
            "[CH4] dissolved with water vapour (ppm)_FLAG"
        );
        assert_eq!(ch.rsd(), "[CH4] dissolved with water vapour (ppm)_RSD");
        assert_eq!(
            ch.corrected(),
            "[CH4] dissolved with water vapour (ppm) corrected Tcell"
        );
    }

    #[test]
    fn test_flagged_channels_requires_base_channel() {
        let mut table = MeasurementTable::new();
        table.insert_float("A", vec![1.0]);
        table.insert_float("A_FLAG", vec![0.0]);
        table.insert_float("B_FLAG", vec![0.0]);

        let pairs = flagged_channels(&table);
        assert_eq!(pairs, vec![("A".to_string(), "A_FLAG".to_string())]);
    }
}
