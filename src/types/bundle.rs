//! Session bundle: the unit of caching

use std::collections::HashMap;
use std::ops::Range;
use std::time::Duration;
use tracing::warn;

use super::{BrakeKind, LapRecord, SessionKey, TelemetrySample};

/// All laps and raw samples for one session.
///
/// Built once from an upstream fetch and never mutated afterwards; the cache
/// shares it as `Arc<SessionBundle>` and a refetch replaces it wholesale.
#[derive(Debug, Clone)]
pub struct SessionBundle {
    key: SessionKey,
    brake_kind: BrakeKind,
    /// Sorted by (lap number, driver)
    laps: Vec<LapRecord>,
    /// Sorted by (driver, session time)
    samples: Vec<TelemetrySample>,
    lap_index: HashMap<(String, u32), usize>,
    sample_ranges: HashMap<String, Range<usize>>,
}

impl SessionBundle {
    /// Build a bundle, establishing its ordering and personal-best invariants.
    ///
    /// Duplicate (driver, lap) records keep the first occurrence. The
    /// personal-best flag is recomputed as the driver's fastest completed lap,
    /// ties going to the earlier lap.
    pub fn new(
        key: SessionKey,
        brake_kind: BrakeKind,
        mut laps: Vec<LapRecord>,
        mut samples: Vec<TelemetrySample>,
    ) -> Self {
        laps.sort_by(|a, b| {
            a.lap_number.cmp(&b.lap_number).then_with(|| a.driver.cmp(&b.driver))
        });
        let before = laps.len();
        laps.dedup_by(|b, a| a.lap_number == b.lap_number && a.driver == b.driver);
        if laps.len() != before {
            warn!(session = %key, dropped = before - laps.len(), "Dropped duplicate lap records");
        }

        mark_personal_bests(&mut laps);

        // Stable sort keeps provider order for equal timestamps
        samples.sort_by(|a, b| a.driver.cmp(&b.driver).then_with(|| a.time.cmp(&b.time)));

        let lap_index = laps
            .iter()
            .enumerate()
            .map(|(idx, lap)| ((lap.driver.clone(), lap.lap_number), idx))
            .collect();

        let mut sample_ranges: HashMap<String, Range<usize>> = HashMap::new();
        for (idx, sample) in samples.iter().enumerate() {
            sample_ranges
                .entry(sample.driver.clone())
                .and_modify(|range| range.end = idx + 1)
                .or_insert(idx..idx + 1);
        }

        Self { key, brake_kind, laps, samples, lap_index, sample_ranges }
    }

    pub fn key(&self) -> SessionKey {
        self.key
    }

    pub fn brake_kind(&self) -> BrakeKind {
        self.brake_kind
    }

    /// All laps ordered by lap number, then driver.
    pub fn laps(&self) -> &[LapRecord] {
        &self.laps
    }

    /// All samples ordered by driver, then session time.
    pub fn samples(&self) -> &[TelemetrySample] {
        &self.samples
    }

    /// Exact (driver, lap) lookup.
    pub fn lap(&self, driver: &str, lap_number: u32) -> Option<&LapRecord> {
        self.lap_index.get(&(driver.to_string(), lap_number)).map(|&idx| &self.laps[idx])
    }

    /// A driver's samples in session-time order.
    pub fn driver_samples(&self, driver: &str) -> &[TelemetrySample] {
        self.sample_ranges.get(driver).map_or(&[], |range| &self.samples[range.clone()])
    }

    /// Whether the driver has any lap in this session.
    pub fn has_driver(&self, driver: &str) -> bool {
        self.laps.iter().any(|lap| lap.driver == driver)
    }

    /// Start time of the driver's next recorded lap after `lap_number`.
    pub fn next_lap_start(&self, driver: &str, lap_number: u32) -> Option<Duration> {
        self.laps
            .iter()
            .filter(|lap| lap.driver == driver && lap.lap_number > lap_number)
            .map(|lap| lap.start_time)
            .min()
    }
}

fn mark_personal_bests(laps: &mut [LapRecord]) {
    let mut best: HashMap<&str, (Duration, u32)> = HashMap::new();
    for lap in laps.iter() {
        let Some(time) = lap.lap_time else { continue };
        best.entry(lap.driver.as_str())
            .and_modify(|current| {
                if (time, lap.lap_number) < *current {
                    *current = (time, lap.lap_number);
                }
            })
            .or_insert((time, lap.lap_number));
    }

    let best: HashMap<String, u32> =
        best.into_iter().map(|(driver, (_, lap))| (driver.to_string(), lap)).collect();

    for lap in laps.iter_mut() {
        lap.is_personal_best = lap.lap_time.is_some()
            && best.get(&lap.driver).is_some_and(|&pb| pb == lap.lap_number);
    }
}
