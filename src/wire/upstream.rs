//! Provider wire format
//!
//! Session documents are JSON with FastF1-style column names. Numeric columns
//! arrive as floats (pandas has no nullable integers), durations as seconds.
//! Translation into the domain model is tolerant: rows that cannot be placed
//! on a lap or on the distance axis are dropped, channel values that fall
//! outside their physical range become missing.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::types::{
    Brake, BrakeKind, Compound, DrsState, LapRecord, SampleOrigin, SessionBundle, SessionKey,
    SpeedTraps, TelemetrySample,
};
use crate::{Result, TelemetryError};

/// A full session as served by the provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionDocument {
    /// How the `Brake` column is encoded
    #[serde(default)]
    pub brake_kind: BrakeKind,
    pub laps: Vec<UpstreamLap>,
    #[serde(default)]
    pub samples: Vec<UpstreamSample>,
}

/// One row of the provider's lap table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpstreamLap {
    pub driver: String,
    pub lap_number: Option<f64>,
    pub lap_start_time: Option<f64>,
    pub lap_time: Option<f64>,
    pub sector1_time: Option<f64>,
    pub sector2_time: Option<f64>,
    pub sector3_time: Option<f64>,
    pub speed_i1: Option<f64>,
    pub speed_i2: Option<f64>,
    #[serde(rename = "SpeedFL")]
    pub speed_fl: Option<f64>,
    #[serde(rename = "SpeedST")]
    pub speed_st: Option<f64>,
    pub compound: Option<String>,
    pub tyre_life: Option<f64>,
}

/// One row of the provider's car telemetry table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpstreamSample {
    pub session_time: Option<f64>,
    pub driver: String,
    pub lap_number: Option<f64>,
    pub distance: Option<f64>,
    pub speed: Option<f64>,
    pub throttle: Option<f64>,
    pub brake: Option<serde_json::Value>,
    #[serde(rename = "nGear")]
    pub n_gear: Option<f64>,
    #[serde(rename = "RPM")]
    pub rpm: Option<f64>,
    #[serde(rename = "DRS")]
    pub drs: Option<f64>,
    /// `car`, `pos` or `interpolation`
    pub source: Option<String>,
}

/// Counters for rows and values rejected during translation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TranslationReport {
    pub dropped_laps: usize,
    pub dropped_samples: usize,
    pub invalid_values: usize,
}

impl SessionDocument {
    /// Parse a provider JSON body.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Translate into a [`SessionBundle`].
    ///
    /// A document without a single usable lap is an upstream failure, not an
    /// empty session.
    pub fn into_bundle(self, key: SessionKey) -> Result<SessionBundle> {
        let (bundle, report) = self.translate(key)?;
        if report != TranslationReport::default() {
            warn!(
                session = %key,
                dropped_laps = report.dropped_laps,
                dropped_samples = report.dropped_samples,
                invalid_values = report.invalid_values,
                "Upstream document contained unusable data"
            );
        }
        Ok(bundle)
    }

    /// Translate and report what was rejected.
    pub fn translate(self, key: SessionKey) -> Result<(SessionBundle, TranslationReport)> {
        let mut report = TranslationReport::default();
        let brake_kind = self.brake_kind;

        let laps: Vec<LapRecord> =
            self.laps.into_iter().filter_map(|row| row.into_record(&mut report)).collect();

        if laps.is_empty() {
            return Err(TelemetryError::parse(
                format!("session {}", key),
                "document contains no usable laps",
            ));
        }

        let samples: Vec<TelemetrySample> = self
            .samples
            .into_iter()
            .filter_map(|row| row.into_sample(brake_kind, &mut report))
            .collect();

        debug!(
            session = %key,
            laps = laps.len(),
            samples = samples.len(),
            "Translated session document"
        );

        Ok((SessionBundle::new(key, brake_kind, laps, samples), report))
    }
}

impl UpstreamLap {
    fn into_record(self, report: &mut TranslationReport) -> Option<LapRecord> {
        let lap_number = self.lap_number.and_then(positive_integer);
        let start_time = seconds(self.lap_start_time, report);
        let (Some(lap_number), Some(start_time)) = (lap_number, start_time) else {
            report.dropped_laps += 1;
            return None;
        };
        if self.driver.trim().is_empty() {
            report.dropped_laps += 1;
            return None;
        }

        Some(LapRecord {
            lap_number,
            driver: self.driver,
            start_time,
            lap_time: seconds(self.lap_time, report),
            sectors: [
                seconds(self.sector1_time, report),
                seconds(self.sector2_time, report),
                seconds(self.sector3_time, report),
            ],
            speed_traps: SpeedTraps {
                i1: non_negative(self.speed_i1, report),
                i2: non_negative(self.speed_i2, report),
                finish_line: non_negative(self.speed_fl, report),
                straight: non_negative(self.speed_st, report),
            },
            compound: self.compound.as_deref().map_or(Compound::Unknown, Compound::from_provider),
            tyre_life: self.tyre_life.and_then(non_negative_integer).unwrap_or(0),
            is_personal_best: false,
        })
    }
}

impl UpstreamSample {
    fn into_sample(
        self,
        brake_kind: BrakeKind,
        report: &mut TranslationReport,
    ) -> Option<TelemetrySample> {
        let time = seconds(self.session_time, report);
        let distance = self.distance.filter(|d| d.is_finite() && *d >= 0.0);
        let (Some(time), Some(distance)) = (time, distance) else {
            report.dropped_samples += 1;
            return None;
        };
        if self.driver.trim().is_empty() {
            report.dropped_samples += 1;
            return None;
        }

        let brake = self.brake.and_then(|raw| {
            let parsed = parse_brake(&raw, brake_kind);
            if parsed.is_none() && !raw.is_null() {
                report.invalid_values += 1;
            }
            parsed
        });

        let gear = self.n_gear.and_then(|g| {
            let gear = (g.fract() == 0.0 && (-1.0..=8.0).contains(&g)).then_some(g as i8);
            if gear.is_none() {
                report.invalid_values += 1;
            }
            gear
        });

        let drs = self.drs.and_then(|code| {
            let state =
                if code.fract() == 0.0 { DrsState::from_code(code as i64) } else { None };
            if state.is_none() {
                report.invalid_values += 1;
            }
            state
        });

        let origin = match self.source.as_deref() {
            Some("interpolation") => SampleOrigin::Interpolated,
            _ => SampleOrigin::Measured,
        };

        Some(TelemetrySample {
            time,
            driver: self.driver,
            lap_number: self.lap_number.and_then(positive_integer),
            distance,
            speed: non_negative(self.speed, report),
            throttle: in_range(self.throttle, 0.0, 100.0, report),
            brake,
            gear,
            rpm: non_negative(self.rpm, report),
            drs,
            origin,
        })
    }
}

fn parse_brake(raw: &serde_json::Value, kind: BrakeKind) -> Option<Brake> {
    match (kind, raw) {
        (BrakeKind::Boolean, serde_json::Value::Bool(b)) => Some(Brake::Pressed(*b)),
        (BrakeKind::Boolean, serde_json::Value::Number(n)) => {
            n.as_f64().filter(|v| v.is_finite()).map(|v| Brake::Pressed(v != 0.0))
        }
        (BrakeKind::Percent, serde_json::Value::Number(n)) => n
            .as_f64()
            .filter(|v| v.is_finite() && (0.0..=100.0).contains(v))
            .map(Brake::Percent),
        (BrakeKind::Percent, serde_json::Value::Bool(b)) => {
            Some(Brake::Percent(if *b { 100.0 } else { 0.0 }))
        }
        _ => None,
    }
}

fn seconds(value: Option<f64>, report: &mut TranslationReport) -> Option<Duration> {
    let value = value?;
    let duration = Duration::try_from_secs_f64(value).ok();
    if duration.is_none() {
        report.invalid_values += 1;
    }
    duration
}

fn non_negative(value: Option<f64>, report: &mut TranslationReport) -> Option<f64> {
    in_range(value, 0.0, f64::MAX, report)
}

fn in_range(value: Option<f64>, min: f64, max: f64, report: &mut TranslationReport) -> Option<f64> {
    let value = value?;
    if value.is_finite() && (min..=max).contains(&value) {
        Some(value)
    } else {
        report.invalid_values += 1;
        None
    }
}

fn positive_integer(value: f64) -> Option<u32> {
    (value.fract() == 0.0 && value >= 1.0 && value <= u32::MAX as f64).then_some(value as u32)
}

fn non_negative_integer(value: f64) -> Option<u32> {
    (value.fract() == 0.0 && value >= 0.0 && value <= u32::MAX as f64).then_some(value as u32)
}
