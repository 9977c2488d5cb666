// Sample domain model - One telemetry reading from a battery bench
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Operational mode of a bench at sample time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BenchState {
    #[default]
    Standby,
    Charge,
    Discharge,
}

impl BenchState {
    /// Decode the bench state byte reported by the firmware.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Standby),
            1 => Some(Self::Charge),
            2 => Some(Self::Discharge),
            _ => None,
        }
    }
}

/// Completion state of the bench run at sample time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompletionStatus {
    Success,
    Fail,
    #[default]
    InProgress,
}

impl CompletionStatus {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::Fail),
            2 => Some(Self::InProgress),
            _ => None,
        }
    }
}

/// A measurement dimension that can be charted as a series table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measurement {
    Voltage,
    Current,
    BatteryTemperature,
    BenchTemperature,
    LoadTemperature,
}

impl Measurement {
    pub const ALL: [Measurement; 5] = [
        Measurement::Voltage,
        Measurement::Current,
        Measurement::BatteryTemperature,
        Measurement::BenchTemperature,
        Measurement::LoadTemperature,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Measurement::Voltage => "voltage",
            Measurement::Current => "current",
            Measurement::BatteryTemperature => "battery_temperature",
            Measurement::BenchTemperature => "bench_temperature",
            Measurement::LoadTemperature => "load_temperature",
        }
    }

    /// Convert a stored hundredths value to the display unit.
    pub fn to_display(raw: i32) -> f64 {
        f64::from(raw) / 100.0
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown measurement: {0}")]
pub struct ParseMeasurementError(pub String);

impl FromStr for Measurement {
    type Err = ParseMeasurementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Measurement::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ParseMeasurementError(s.to_string()))
    }
}

/// Key of the row position in flat series tables, so no port may use it.
pub const RESERVED_PORT: &str = "index";

/// Reasons a transport payload cannot become a [`Sample`].
#[derive(Debug, Error, PartialEq)]
pub enum SampleError {
    #[error("sample has no port")]
    MissingPort,
    #[error("port name `{0}` is reserved")]
    ReservedPort(String),
    #[error("sample has no end_date")]
    MissingEndDate,
    #[error("sample is missing field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` is not a finite number")]
    NonFinite { field: &'static str },
    #[error("field `{field}` is out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Payload as delivered by the transport, before validation.
///
/// Numeric fields are hundredths of the display unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSample {
    pub id: Option<u32>,
    pub port: Option<String>,
    pub temperature: Option<f64>,
    pub battery_temperature: Option<f64>,
    pub electronic_load_temperature: Option<f64>,
    pub voltage: Option<f64>,
    pub current: Option<f64>,
    pub state: Option<BenchState>,
    pub status: Option<CompletionStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Validated bench reading. Never mutated once appended to a series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub id: Option<u32>,
    pub port: String,
    pub temperature: i32,
    pub battery_temperature: i32,
    pub electronic_load_temperature: i32,
    pub voltage: i32,
    pub current: i32,
    pub state: BenchState,
    pub status: CompletionStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: DateTime<Utc>,
}

impl Sample {
    /// Raw hundredths value of one measurement.
    pub fn measurement(&self, measurement: Measurement) -> i32 {
        match measurement {
            Measurement::Voltage => self.voltage,
            Measurement::Current => self.current,
            Measurement::BatteryTemperature => self.battery_temperature,
            Measurement::BenchTemperature => self.temperature,
            Measurement::LoadTemperature => self.electronic_load_temperature,
        }
    }
}

impl TryFrom<RawSample> for Sample {
    type Error = SampleError;

    fn try_from(raw: RawSample) -> Result<Self, Self::Error> {
        let port = raw
            .port
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .ok_or(SampleError::MissingPort)?;
        if port == RESERVED_PORT {
            return Err(SampleError::ReservedPort(port));
        }
        let end_date = raw.end_date.ok_or(SampleError::MissingEndDate)?;

        Ok(Sample {
            id: raw.id,
            port,
            temperature: hundredths("temperature", raw.temperature)?,
            battery_temperature: hundredths("battery_temperature", raw.battery_temperature)?,
            electronic_load_temperature: hundredths(
                "electronic_load_temperature",
                raw.electronic_load_temperature,
            )?,
            voltage: hundredths("voltage", raw.voltage)?,
            current: hundredths("current", raw.current)?,
            state: raw.state.unwrap_or_default(),
            status: raw.status.unwrap_or_default(),
            start_date: raw.start_date,
            end_date,
        })
    }
}

fn hundredths(field: &'static str, value: Option<f64>) -> Result<i32, SampleError> {
    let value = value.ok_or(SampleError::MissingField(field))?;
    if !value.is_finite() {
        return Err(SampleError::NonFinite { field });
    }

    let rounded = value.round();
    if rounded < f64::from(i32::MIN) || rounded > f64::from(i32::MAX) {
        return Err(SampleError::OutOfRange { field, value });
    }

    Ok(rounded as i32)
}
