//! Lap lookup and lap time windows

use std::time::Duration;

use crate::types::{LapRecord, SessionBundle};
use crate::{Result, TelemetryError};

/// Session-time interval covered by a lap, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LapWindow {
    pub start: Duration,
    /// `None` when the lap has no time and the driver recorded no later lap
    pub end: Option<Duration>,
}

impl LapWindow {
    pub fn contains(&self, time: Duration) -> bool {
        time >= self.start && self.end.is_none_or(|end| time < end)
    }

    pub fn is_open_ended(&self) -> bool {
        self.end.is_none()
    }
}

/// Find a driver's lap. Driver matching is exact.
pub fn resolve_lap<'a>(
    bundle: &'a SessionBundle,
    driver: &str,
    lap_number: u32,
) -> Result<&'a LapRecord> {
    bundle.lap(driver, lap_number).ok_or_else(|| TelemetryError::LapNotFound {
        key: bundle.key(),
        driver: driver.to_string(),
        lap: lap_number,
    })
}

/// Laps ordered by lap number, then driver; optionally for one driver only.
///
/// An unknown driver yields an empty list.
pub fn list_laps<'a>(bundle: &'a SessionBundle, driver: Option<&str>) -> Vec<&'a LapRecord> {
    bundle.laps().iter().filter(|lap| driver.is_none_or(|d| lap.driver == d)).collect()
}

/// Time window a lap's samples fall in.
///
/// Without a usable lap end the window runs to the driver's next lap start.
pub fn lap_window(bundle: &SessionBundle, lap: &LapRecord) -> LapWindow {
    let end = match lap.end_time() {
        Some(end) => Some(end),
        None => bundle.next_lap_start(&lap.driver, lap.lap_number),
    };
    LapWindow { start: lap.start_time, end }
}
