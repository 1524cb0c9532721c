//! Per-lap timing records

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Tyre compound fitted for a lap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
#[serde(rename_all = "UPPERCASE")]
pub enum Compound {
    Soft,
    Medium,
    Hard,
    Intermediate,
    Wet,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Compound {
    /// Provider spelling, e.g. `SOFT`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Compound::Soft => "SOFT",
            Compound::Medium => "MEDIUM",
            Compound::Hard => "HARD",
            Compound::Intermediate => "INTERMEDIATE",
            Compound::Wet => "WET",
            Compound::Unknown => "UNKNOWN",
        }
    }

    /// Lenient parse; anything unrecognised (including test compounds) is `Unknown`.
    pub fn from_provider(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SOFT" => Compound::Soft,
            "MEDIUM" => Compound::Medium,
            "HARD" => Compound::Hard,
            "INTERMEDIATE" => Compound::Intermediate,
            "WET" => Compound::Wet,
            _ => Compound::Unknown,
        }
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Speed trap readings in km/h.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
pub struct SpeedTraps {
    /// Intermediate 1
    pub i1: Option<f64>,
    /// Intermediate 2
    pub i2: Option<f64>,
    /// Finish line
    pub finish_line: Option<f64>,
    /// Longest straight
    pub straight: Option<f64>,
}

/// Timing summary for one lap by one driver.
///
/// Durations are non-negative by construction. The lap time is not required to
/// equal the sum of the sector times since sectors may be partially missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapRecord {
    /// Lap number, starting at 1, unique per driver within a session
    pub lap_number: u32,
    /// Driver abbreviation (e.g. `VER`)
    pub driver: String,
    /// Session time at which the lap started
    pub start_time: Duration,
    /// Total lap time, absent for incomplete laps
    pub lap_time: Option<Duration>,
    /// Sector 1..3 times
    pub sectors: [Option<Duration>; 3],
    pub speed_traps: SpeedTraps,
    pub compound: Compound,
    /// Laps completed on the fitted set
    pub tyre_life: u32,
    /// Fastest completed lap of this driver in the session
    pub is_personal_best: bool,
}

impl LapRecord {
    /// Session time at which the lap finished, when the lap completed.
    ///
    /// `None` as well when the end is past the representable session time.
    pub fn end_time(&self) -> Option<Duration> {
        self.lap_time.and_then(|t| self.start_time.checked_add(t))
    }

    /// Sum of the sector times when all three are present.
    pub fn sector_sum(&self) -> Option<Duration> {
        let [s1, s2, s3] = self.sectors;
        s1?.checked_add(s2?)?.checked_add(s3?)
    }

    /// Whether the lap has a recorded lap time.
    pub fn is_complete(&self) -> bool {
        self.lap_time.is_some()
    }
}
