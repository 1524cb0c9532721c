//! Normalized lap telemetry

use serde::{Deserialize, Serialize};

use super::{Brake, BrakeKind, DrsState, SampleOrigin, SessionKey, TelemetrySample};

/// Where the values of a normalized point came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
pub enum Provenance {
    /// Every channel was measured
    Measured,
    /// The provider declared the sample interpolated
    Interpolated,
    /// At least one channel has no value at this point
    Missing,
}

/// One point on a lap's distance index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub distance: f64,
    pub speed: Option<f64>,
    pub throttle: Option<f64>,
    pub brake: Option<Brake>,
    pub gear: Option<i8>,
    pub rpm: Option<f64>,
    pub drs: Option<DrsState>,
    pub provenance: Provenance,
}

impl From<&TelemetrySample> for NormalizedPoint {
    fn from(sample: &TelemetrySample) -> Self {
        let provenance = if !sample.is_complete() {
            Provenance::Missing
        } else if sample.origin == SampleOrigin::Interpolated {
            Provenance::Interpolated
        } else {
            Provenance::Measured
        };

        Self {
            distance: sample.distance,
            speed: sample.speed,
            throttle: sample.throttle,
            brake: sample.brake,
            gear: sample.gear,
            rpm: sample.rpm,
            drs: sample.drs,
            provenance,
        }
    }
}

/// A lap's samples on a strictly increasing distance index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTelemetry {
    pub key: SessionKey,
    pub driver: String,
    pub lap: u32,
    pub brake_kind: BrakeKind,
    pub points: Vec<NormalizedPoint>,
}

impl NormalizedTelemetry {
    /// Fewer than two points: nothing was clipped or deduplicated.
    pub fn is_degenerate(&self) -> bool {
        self.points.len() < 2
    }

    /// Number of points flagged with a missing channel.
    pub fn missing_points(&self) -> usize {
        self.points.iter().filter(|p| p.provenance == Provenance::Missing).count()
    }

    /// Whether distances are strictly increasing.
    pub fn is_strictly_increasing(&self) -> bool {
        self.points.windows(2).all(|w| w[0].distance < w[1].distance)
    }
}
