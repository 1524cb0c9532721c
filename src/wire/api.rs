//! Presentation wire types
//!
//! These mirror the dashboard's `TelemetryData`, `TelemetryPoint` and `LapData`
//! interfaces field for field. Absent channels and durations serialize as
//! `null` so a sparse lap is never mistaken for a continuous reading.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::{LapRecord, NormalizedPoint, NormalizedTelemetry};

/// `{ data?: T, error?: string }`, exactly one side populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
pub struct ApiResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { data: Some(data), error: None }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self { data: None, error: Some(message.into()) }
    }

    pub fn into_result(self) -> Result<T, String> {
        match (self.data, self.error) {
            (Some(data), None) => Ok(data),
            (_, Some(error)) => Err(error),
            (None, None) => Err("empty response".to_string()),
        }
    }
}

impl<T> From<crate::Result<T>> for ApiResponse<T> {
    fn from(result: crate::Result<T>) -> Self {
        match result {
            Ok(data) => ApiResponse::ok(data),
            Err(e) => ApiResponse::err(e.to_string()),
        }
    }
}

/// Telemetry for one lap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
pub struct TelemetryData {
    pub year: u16,
    pub round: u8,
    pub session: String,
    pub driver: String,
    pub lap: u32,
    pub telemetry: Vec<TelemetryPoint>,
}

/// One point on the lap's distance axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
#[serde(rename_all = "PascalCase")]
pub struct TelemetryPoint {
    pub distance: f64,
    pub speed: Option<f64>,
    pub throttle: Option<f64>,
    pub brake: Option<f64>,
    pub gear: Option<i8>,
    #[serde(rename = "RPM")]
    pub rpm: Option<f64>,
    #[serde(rename = "DRS")]
    pub drs: Option<u8>,
}

/// Timing summary for one lap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
#[serde(rename_all = "PascalCase")]
pub struct LapData {
    pub lap_number: u32,
    pub time: String,
    pub driver: String,
    pub lap_time: Option<String>,
    pub sector1_time: Option<String>,
    pub sector2_time: Option<String>,
    pub sector3_time: Option<String>,
    #[serde(rename = "SpeedI1")]
    pub speed_i1: Option<f64>,
    #[serde(rename = "SpeedI2")]
    pub speed_i2: Option<f64>,
    #[serde(rename = "SpeedFL")]
    pub speed_fl: Option<f64>,
    #[serde(rename = "SpeedST")]
    pub speed_st: Option<f64>,
    pub compound: String,
    pub tyre_life: u32,
    pub is_personal_best: bool,
}

impl From<&NormalizedPoint> for TelemetryPoint {
    fn from(point: &NormalizedPoint) -> Self {
        Self {
            distance: point.distance,
            speed: point.speed,
            throttle: point.throttle,
            brake: point.brake.map(|b| b.as_f64()),
            gear: point.gear,
            rpm: point.rpm,
            drs: point.drs.map(|d| d.code()),
        }
    }
}

impl From<&NormalizedTelemetry> for TelemetryData {
    fn from(lap: &NormalizedTelemetry) -> Self {
        Self {
            year: lap.key.year,
            round: lap.key.round,
            session: lap.key.session.to_string(),
            driver: lap.driver.clone(),
            lap: lap.lap,
            telemetry: lap.points.iter().map(TelemetryPoint::from).collect(),
        }
    }
}

impl From<&LapRecord> for LapData {
    fn from(lap: &LapRecord) -> Self {
        let [s1, s2, s3] = lap.sectors;
        Self {
            lap_number: lap.lap_number,
            time: format_timedelta(lap.start_time),
            driver: lap.driver.clone(),
            lap_time: lap.lap_time.map(format_timedelta),
            sector1_time: s1.map(format_timedelta),
            sector2_time: s2.map(format_timedelta),
            sector3_time: s3.map(format_timedelta),
            speed_i1: lap.speed_traps.i1,
            speed_i2: lap.speed_traps.i2,
            speed_fl: lap.speed_traps.finish_line,
            speed_st: lap.speed_traps.straight,
            compound: lap.compound.to_string(),
            tyre_life: lap.tyre_life,
            is_personal_best: lap.is_personal_best,
        }
    }
}

/// Render a duration the way pandas prints a `Timedelta`.
///
/// `0 days 00:01:32.345000`; the fractional part is omitted when zero.
pub fn format_timedelta(duration: Duration) -> String {
    // Nearest microsecond, so float-derived durations print like their source
    let total_micros = (duration.as_nanos() + 500) / 1_000;
    let total_secs = (total_micros / 1_000_000) as u64;
    let micros = (total_micros % 1_000_000) as u32;
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;

    if micros == 0 {
        format!("{} days {:02}:{:02}:{:02}", days, hours, minutes, seconds)
    } else {
        format!("{} days {:02}:{:02}:{:02}.{:06}", days, hours, minutes, seconds, micros)
    }
}
