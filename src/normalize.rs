//! Telemetry normalization onto a strictly increasing distance index
//!
//! The provider's own distance readings are the index; nothing is resampled
//! or interpolated. Two known feed artifacts are repaired:
//!
//! - repeated distance readings: the first in session-time order is kept
//! - a distance decrease: the lap boundary leaked into the window, so the
//!   series is clipped at that point
//!
//! Channel values pass through untouched. A point with any absent channel is
//! flagged [`Provenance::Missing`] rather than skipped.

use tracing::debug;

use crate::Result;
use crate::resolver::{lap_window, resolve_lap};
use crate::types::{NormalizedPoint, NormalizedTelemetry, SessionBundle, TelemetrySample};

/// Normalize one driver's lap.
pub fn normalize(
    bundle: &SessionBundle,
    driver: &str,
    lap_number: u32,
) -> Result<NormalizedTelemetry> {
    let lap = resolve_lap(bundle, driver, lap_number)?;
    let window = lap_window(bundle, lap);

    // Tagged samples are placed by their tag, untagged ones by time
    let raw: Vec<&TelemetrySample> = bundle
        .driver_samples(driver)
        .iter()
        .filter(|sample| match sample.lap_number {
            Some(tag) => tag == lap_number,
            None => window.contains(sample.time),
        })
        .collect();

    let points: Vec<NormalizedPoint> =
        raw.iter().map(|&sample| NormalizedPoint::from(sample)).collect();
    let raw_count = points.len();
    let points = normalize_points(points);

    debug!(
        session = %bundle.key(),
        driver,
        lap = lap_number,
        raw = raw_count,
        kept = points.len(),
        "Normalized lap telemetry"
    );

    Ok(NormalizedTelemetry {
        key: bundle.key(),
        driver: driver.to_string(),
        lap: lap_number,
        brake_kind: bundle.brake_kind(),
        points,
    })
}

/// Reapply normalization to an existing result.
///
/// Normalized output is a fixed point: the result equals the input.
pub fn normalize_samples(telemetry: NormalizedTelemetry) -> NormalizedTelemetry {
    NormalizedTelemetry { points: normalize_points(telemetry.points), ..telemetry }
}

/// Enforce strictly increasing distance on points in time order.
fn normalize_points(points: Vec<NormalizedPoint>) -> Vec<NormalizedPoint> {
    if points.len() < 2 {
        return points;
    }

    let mut kept: Vec<NormalizedPoint> = Vec::with_capacity(points.len());
    for point in points {
        match kept.last() {
            Some(last) if point.distance == last.distance => continue,
            Some(last) if point.distance < last.distance => break,
            _ => kept.push(point),
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TelemetryError;
    use crate::types::{
        Brake, BrakeKind, Compound, DrsState, LapRecord, Provenance, SampleOrigin, SessionKey,
        SessionType, SpeedTraps,
    };
    use proptest::prelude::*;
    use std::time::Duration;

    fn lap(driver: &str, number: u32, start_ms: u64, time_ms: Option<u64>) -> LapRecord {
        LapRecord {
            lap_number: number,
            driver: driver.to_string(),
            start_time: Duration::from_millis(start_ms),
            lap_time: time_ms.map(Duration::from_millis),
            sectors: [None; 3],
            speed_traps: SpeedTraps::default(),
            compound: Compound::Soft,
            tyre_life: 3,
            is_personal_best: false,
        }
    }

    fn sample(driver: &str, time_ms: u64, distance: f64) -> TelemetrySample {
        TelemetrySample {
            time: Duration::from_millis(time_ms),
            driver: driver.to_string(),
            lap_number: None,
            distance,
            speed: Some(250.0),
            throttle: Some(100.0),
            brake: Some(Brake::Pressed(false)),
            gear: Some(7),
            rpm: Some(11_500.0),
            drs: Some(DrsState::Closed),
            origin: SampleOrigin::Measured,
        }
    }

    fn bundle(laps: Vec<LapRecord>, samples: Vec<TelemetrySample>) -> SessionBundle {
        let key = SessionKey::new(2024, 1, SessionType::Race);
        SessionBundle::new(key, BrakeKind::Boolean, laps, samples)
    }

    fn distances(telemetry: &NormalizedTelemetry) -> Vec<f64> {
        telemetry.points.iter().map(|p| p.distance).collect()
    }

    #[test]
    fn duplicate_distance_keeps_first_by_time() {
        let mut later = sample("VER", 1_200, 150.2);
        later.speed = Some(180.0);
        let bundle = bundle(
            vec![lap("VER", 10, 1_000, Some(5_000))],
            vec![
                later,
                sample("VER", 1_100, 150.2),
                sample("VER", 1_000, 100.0),
                sample("VER", 1_300, 200.0),
            ],
        );

        let telemetry = normalize(&bundle, "VER", 10).unwrap();
        assert_eq!(distances(&telemetry), vec![100.0, 150.2, 200.0]);
        assert_eq!(telemetry.points[1].speed, Some(250.0));
        assert!(telemetry.is_strictly_increasing());
    }

    #[test]
    fn distance_decrease_clips_series() {
        let bundle = bundle(
            vec![lap("VER", 1, 0, Some(10_000))],
            vec![
                sample("VER", 100, 10.0),
                sample("VER", 200, 20.0),
                sample("VER", 300, 5.0),
                sample("VER", 400, 30.0),
            ],
        );
        let telemetry = normalize(&bundle, "VER", 1).unwrap();
        assert_eq!(distances(&telemetry), vec![10.0, 20.0]);
    }

    #[test]
    fn window_excludes_other_laps_and_drivers() {
        let bundle = bundle(
            vec![lap("VER", 1, 0, Some(1_000)), lap("VER", 2, 1_000, Some(1_000))],
            vec![
                sample("VER", 500, 10.0),
                sample("VER", 999, 20.0),
                sample("VER", 1_000, 0.5),
                sample("HAM", 600, 15.0),
            ],
        );
        let telemetry = normalize(&bundle, "VER", 1).unwrap();
        assert_eq!(distances(&telemetry), vec![10.0, 20.0]);
    }

    #[test]
    fn lap_tags_take_precedence_over_time() {
        let mut tagged = sample("VER", 5_000, 40.0);
        tagged.lap_number = Some(1);
        let mut foreign = sample("VER", 300, 35.0);
        foreign.lap_number = Some(2);
        let bundle = bundle(
            vec![lap("VER", 1, 0, Some(1_000)), lap("VER", 2, 1_000, Some(1_000))],
            vec![sample("VER", 100, 10.0), foreign, tagged],
        );
        let telemetry = normalize(&bundle, "VER", 1).unwrap();
        assert_eq!(distances(&telemetry), vec![10.0, 40.0]);
    }

    #[test]
    fn degenerate_lap_is_returned_as_is() {
        let bundle = bundle(vec![lap("VER", 1, 0, Some(1_000))], vec![sample("VER", 10, 3.0)]);
        let telemetry = normalize(&bundle, "VER", 1).unwrap();
        assert!(telemetry.is_degenerate());
        assert_eq!(telemetry.points.len(), 1);
        assert_eq!(telemetry.points[0].provenance, Provenance::Measured);

        let empty = self::bundle(vec![lap("VER", 1, 0, Some(1_000))], vec![]);
        assert!(normalize(&empty, "VER", 1).unwrap().points.is_empty());
    }

    #[test]
    fn gaps_are_flagged_not_skipped() {
        let mut gap = sample("VER", 200, 20.0);
        gap.throttle = None;
        let mut interpolated = sample("VER", 300, 30.0);
        interpolated.origin = SampleOrigin::Interpolated;
        let bundle = bundle(
            vec![lap("VER", 1, 0, Some(1_000))],
            vec![sample("VER", 100, 10.0), gap, interpolated],
        );

        let telemetry = normalize(&bundle, "VER", 1).unwrap();
        let provenance: Vec<_> = telemetry.points.iter().map(|p| p.provenance).collect();
        assert_eq!(
            provenance,
            vec![Provenance::Measured, Provenance::Missing, Provenance::Interpolated]
        );
        assert_eq!(telemetry.points[1].throttle, None);
        assert_eq!(telemetry.missing_points(), 1);
    }

    #[test]
    fn unknown_lap_is_an_error() {
        let bundle = bundle(vec![lap("VER", 1, 0, Some(1_000))], vec![]);
        assert!(matches!(
            normalize(&bundle, "VER", 2).unwrap_err(),
            TelemetryError::LapNotFound { .. }
        ));
    }

    proptest! {
        #[test]
        fn output_is_strictly_increasing_and_idempotent(
            distances in prop::collection::vec(0u32..50, 0..80)
        ) {
            let samples = distances
                .iter()
                .enumerate()
                .map(|(i, d)| sample("VER", i as u64 * 10, *d as f64 * 7.5))
                .collect();
            let bundle = bundle(vec![lap("VER", 1, 0, Some(100_000))], samples);

            let once = normalize(&bundle, "VER", 1).unwrap();
            prop_assert!(once.is_strictly_increasing());
            prop_assert!(once.points.len() <= distances.len());

            let twice = normalize_samples(once.clone());
            prop_assert_eq!(once, twice);
        }
    }
}
