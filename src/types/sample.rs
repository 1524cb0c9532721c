//! Raw telemetry samples

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Drag Reduction System state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
pub enum DrsState {
    /// Flap closed, not eligible
    Closed,
    /// Eligible but not yet opened
    Available,
    /// Flap open
    Open,
}

impl DrsState {
    /// Decode the provider's raw DRS code.
    ///
    /// 0-1 closed, 8 eligible, 10/12/14 open. Other codes are unknown.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 | 1 => Some(DrsState::Closed),
            8 => Some(DrsState::Available),
            10 | 12 | 14 => Some(DrsState::Open),
            _ => None,
        }
    }

    /// Integer code emitted at the presentation boundary.
    pub const fn code(&self) -> u8 {
        match self {
            DrsState::Closed => 0,
            DrsState::Available => 8,
            DrsState::Open => 12,
        }
    }
}

/// How a provider reports the brake channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
#[serde(rename_all = "lowercase")]
pub enum BrakeKind {
    /// On/off brake switch
    #[default]
    Boolean,
    /// Brake pressure as 0-100
    Percent,
}

/// A single brake reading in the provider-declared representation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Brake {
    Pressed(bool),
    Percent(f64),
}

impl Brake {
    /// Numeric value for the presentation boundary: 0/1 or 0-100.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Brake::Pressed(true) => 1.0,
            Brake::Pressed(false) => 0.0,
            Brake::Percent(p) => p,
        }
    }
}

/// Whether a sample's channels were measured or synthesized by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SampleOrigin {
    #[default]
    Measured,
    /// The provider declared this row interpolated between real readings
    Interpolated,
}

/// One raw telemetry reading.
///
/// Channels other than distance are optional; a missing or out-of-range value
/// in the upstream feed is kept as `None` rather than defaulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Session time of the reading
    pub time: Duration,
    pub driver: String,
    /// Explicit lap tag, when the provider supplies one
    pub lap_number: Option<u32>,
    /// Distance along the lap in meters
    pub distance: f64,
    /// km/h
    pub speed: Option<f64>,
    /// 0-100
    pub throttle: Option<f64>,
    pub brake: Option<Brake>,
    /// -1 (reverse/neutral convention) to 8
    pub gear: Option<i8>,
    pub rpm: Option<f64>,
    pub drs: Option<DrsState>,
    pub origin: SampleOrigin,
}

impl TelemetrySample {
    /// Whether every channel carries a value.
    pub fn is_complete(&self) -> bool {
        self.speed.is_some()
            && self.throttle.is_some()
            && self.brake.is_some()
            && self.gear.is_some()
            && self.rpm.is_some()
            && self.drs.is_some()
    }
}
