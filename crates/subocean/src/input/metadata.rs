//! Typed metadata record parsed from the instrument's JSON sidecar.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SuboceanError};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Calibration and deployment metadata for one profile.
///
/// All fields are required; the sidecar stores every value as a plain string
/// and each is coerced to its declared type here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileMetadata {
    pub concentration_cal1: f64,
    pub concentration_cal2: f64,
    pub title: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub hydrostatic_pressure_coef1: f64,
    pub hydrostatic_pressure_coef2: f64,
    pub latitude: f64,
    pub gas_type: bool,
}

impl ProfileMetadata {
    /// Parse metadata from the sidecar's JSON object.
    pub fn from_json(value: &Value) -> Result<Self> {
        let map = value.as_object().ok_or_else(|| SuboceanError::Metadata {
            key: "<root>".to_string(),
            message: "sidecar is not a JSON object".to_string(),
        })?;

        Ok(Self {
            concentration_cal1: require_f64(map, "Concentration coefficient calibration 1")?,
            concentration_cal2: require_f64(map, "Concentration coefficient calibration 2")?,
            title: require_str(map, "Title of the experiment")?,
            start_time: require_datetime(map, "Start time")?,
            end_time: require_datetime(map, "End time")?,
            hydrostatic_pressure_coef1: require_f64(map, "Hydrostatic Pressure coefficient 1")?,
            hydrostatic_pressure_coef2: require_f64(map, "Hydrostatic Pressure coefficient 2")?,
            latitude: require_f64(map, "Latitude")?,
            gas_type: require_bool(map, "Type of gas")?,
        })
    }
}

fn require_str(map: &serde_json::Map<String, Value>, key: &str) -> Result<String> {
    match map.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Ok(other.to_string()),
        None => Err(missing(key)),
    }
}

fn require_f64(map: &serde_json::Map<String, Value>, key: &str) -> Result<f64> {
    let raw = require_str(map, key)?;
    raw.trim().parse::<f64>().map_err(|_| SuboceanError::Metadata {
        key: key.to_string(),
        message: format!("'{raw}' is not a number"),
    })
}

fn require_datetime(map: &serde_json::Map<String, Value>, key: &str) -> Result<NaiveDateTime> {
    let raw = require_str(map, key)?;
    NaiveDateTime::parse_from_str(raw.trim(), TIME_FORMAT).map_err(|_| SuboceanError::Metadata {
        key: key.to_string(),
        message: format!("'{raw}' does not match {TIME_FORMAT}"),
    })
}

fn require_bool(map: &serde_json::Map<String, Value>, key: &str) -> Result<bool> {
    let raw = require_str(map, key)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(SuboceanError::Metadata {
            key: key.to_string(),
            message: format!("'{raw}' is not a boolean"),
        }),
    }
}

fn missing(key: &str) -> SuboceanError {
    SuboceanError::Metadata {
        key: key.to_string(),
        message: "required key is missing".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sidecar() -> Value {
        json!({
            "Concentration coefficient calibration 1": "1.25",
            "Concentration coefficient calibration 2": "0.98",
            "Title of the experiment": "Fjord transect 3",
            "Start time": "2024-11-27 12:58:45",
            "End time": "2024-11-27 14:02:10",
            "Hydrostatic Pressure coefficient 1": "0.0012",
            "Hydrostatic Pressure coefficient 2": "-0.4",
            "Latitude": "68.97",
            "Type of gas": "1"
        })
    }

    #[test]
    fn test_parse_sidecar() {
        let meta = ProfileMetadata::from_json(&sidecar()).unwrap();
        assert_eq!(meta.concentration_cal1, 1.25);
        assert_eq!(meta.title, "Fjord transect 3");
        assert_eq!(meta.latitude, 68.97);
        assert!(meta.gas_type);
        assert!(meta.start_time < meta.end_time);
    }

    #[test]
    fn test_missing_key_is_typed_error() {
        let mut value = sidecar();
        value.as_object_mut().unwrap().remove("Latitude");

        let err = ProfileMetadata::from_json(&value).unwrap_err();
        match err {
            SuboceanError::Metadata { key, .. } => assert_eq!(key, "Latitude"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_number_is_typed_error() {
        let mut value = sidecar();
        value.as_object_mut().unwrap()["Latitude"] = json!("north-ish");

        assert!(matches!(
            ProfileMetadata::from_json(&value),
            Err(SuboceanError::Metadata { .. })
        ));
    }
}
