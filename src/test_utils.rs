//! Test utilities for fixture path resolution and synthetic sessions
//!
//! Stored provider documents live under `test-data/sessions/`, named by
//! [`SessionKey::file_stem`]. The synthetic builders produce bundles of any
//! size for unit tests and benchmarks without touching disk.

#![cfg(any(test, feature = "benchmark"))]

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::{
    Brake, BrakeKind, Compound, DrsState, LapRecord, SampleOrigin, SessionBundle, SessionKey,
    SpeedTraps, TelemetrySample,
};

/// Error returned when a required session fixture cannot be located.
#[derive(Debug, Clone)]
pub struct FixtureError {
    message: String,
}

impl std::fmt::Display for FixtureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for FixtureError {}

/// The crate's `test-data` directory.
pub fn test_data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("test-data")
}

/// Directory of stored session documents.
pub fn session_fixture_dir() -> PathBuf {
    test_data_dir().join("sessions")
}

/// Path of the stored document for a session, which must exist.
pub fn require_session_fixture(key: &SessionKey) -> Result<PathBuf, FixtureError> {
    let path = session_fixture_dir().join(format!("{}.json", key.file_stem()));
    if path.exists() {
        Ok(path)
    } else {
        Err(FixtureError { message: format!("Missing session fixture: {}", path.display()) })
    }
}

/// Synthetic lap trace sampled at `hz`, distance starting at zero.
///
/// Speed dips through three corners; every channel is populated.
pub fn synthetic_lap_samples(
    driver: &str,
    start: Duration,
    lap_time: Duration,
    hz: u32,
) -> Vec<TelemetrySample> {
    let dt = 1.0 / hz.max(1) as f64;
    let total = lap_time.as_secs_f64();
    let mut samples = Vec::with_capacity((total * hz as f64) as usize + 1);
    let mut distance = 0.0;
    let mut t = 0.0;

    while t < total {
        let phase = t / total;
        let speed = 300.0
            - [(0.1, 200.0), (0.4, 170.0), (0.75, 140.0)]
                .iter()
                .map(|&(corner, depth)| depth * (-((phase - corner).powi(2)) / 0.001).exp())
                .sum::<f64>();
        let braking = [0.1, 0.4, 0.75].iter().any(|&c| phase < c && c - phase < 0.02);

        samples.push(TelemetrySample {
            time: start + Duration::from_secs_f64(t),
            driver: driver.to_string(),
            lap_number: None,
            distance,
            speed: Some(speed),
            throttle: Some(if braking { 0.0 } else { 100.0 }),
            brake: Some(Brake::Pressed(braking)),
            gear: Some(((speed / 40.0) as i8 + 1).min(8)),
            rpm: Some(9_000.0 + speed * 8.0),
            drs: Some(if phase < 0.08 { DrsState::Open } else { DrsState::Closed }),
            origin: SampleOrigin::Measured,
        });

        distance += speed / 3.6 * dt;
        t += dt;
    }
    samples
}

/// Session with `laps` consecutive laps per driver, each with a trace at `hz`.
pub fn synthetic_bundle(key: SessionKey, drivers: &[&str], laps: u32, hz: u32) -> SessionBundle {
    let mut records = Vec::new();
    let mut samples = Vec::new();

    for (offset, driver) in drivers.iter().enumerate() {
        let mut start = Duration::from_secs(3_600) + Duration::from_millis(offset as u64 * 400);
        for lap_number in 1..=laps {
            let jitter = (lap_number as u64 * 137 + offset as u64 * 59) % 900;
            let lap_time = Duration::from_millis(92_000 + jitter);
            let third = lap_time / 3;
            records.push(LapRecord {
                lap_number,
                driver: driver.to_string(),
                start_time: start,
                lap_time: Some(lap_time),
                sectors: [Some(third), Some(third), Some(lap_time - third * 2)],
                speed_traps: SpeedTraps {
                    i1: Some(230.0),
                    i2: Some(262.0),
                    finish_line: Some(281.0),
                    straight: Some(315.0),
                },
                compound: Compound::Medium,
                tyre_life: lap_number,
                is_personal_best: false,
            });
            samples.extend(synthetic_lap_samples(driver, start, lap_time, hz));
            start += lap_time;
        }
    }

    SessionBundle::new(key, BrakeKind::Boolean, records, samples)
}
