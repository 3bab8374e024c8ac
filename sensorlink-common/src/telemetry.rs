use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A single named reading reported by the telemetry source.
///
/// Rebuilt on every poll cycle and never mutated after decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Sensor label (e.g., "Total CPU Usage").
    pub name: String,

    /// Sensor class, used to tell GPU instances apart (e.g., "GPU [#1]: RTX 4070").
    pub class: String,

    /// Numeric value; 0.0 when the source value was absent or not numeric.
    pub value: f64,
}

impl SensorReading {
    /// Create a new reading.
    pub fn new(name: impl Into<String>, class: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            class: class.into(),
            value,
        }
    }
}

/// Reason a `SensorValue` could not be turned into a number.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueParseError {
    #[error("value is missing")]
    Missing,
    #[error("value '{0}' is not a number")]
    NotNumeric(String),
    #[error("value is not finite")]
    NotFinite,
}

/// Wire shape of one entry in the source's JSON array.
///
/// Fields are kept as raw JSON so that an odd type in one entry does not
/// reject the whole response.
#[derive(Debug, Deserialize)]
struct RawReading {
    #[serde(rename = "SensorName", default)]
    name: Value,
    #[serde(rename = "SensorClass", default)]
    class: Value,
    #[serde(rename = "SensorValue", default)]
    value: Value,
}

impl From<RawReading> for SensorReading {
    fn from(raw: RawReading) -> Self {
        let value = match parse_sensor_value(&raw.value) {
            Ok(v) => v,
            Err(e) => {
                tracing::trace!(sensor = ?raw.name, error = %e, "Defaulting sensor value to 0");
                0.0
            }
        };

        Self {
            name: raw.name.as_str().unwrap_or_default().to_string(),
            class: raw.class.as_str().unwrap_or_default().to_string(),
            value,
        }
    }
}

/// Coerce a raw `SensorValue` into a finite `f64`.
///
/// Numbers are taken as is and strings are parsed after trimming.
pub fn parse_sensor_value(value: &Value) -> Result<f64, ValueParseError> {
    let parsed = match value {
        Value::Null => return Err(ValueParseError::Missing),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ValueParseError::NotNumeric(n.to_string()))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ValueParseError::NotNumeric(s.clone()))?,
        other => return Err(ValueParseError::NotNumeric(other.to_string())),
    };

    if parsed.is_finite() {
        Ok(parsed)
    } else {
        Err(ValueParseError::NotFinite)
    }
}

/// Decode a JSON array of source readings.
///
/// Entries that are not objects fail the whole decode.
pub fn decode_readings(body: &str) -> serde_json::Result<Vec<SensorReading>> {
    let raw: Vec<RawReading> = serde_json::from_str(body)?;
    Ok(raw.into_iter().map(SensorReading::from).collect())
}
