//! Query facade
//!
//! Validates caller coordinates, loads the session through the cache and
//! hands the bundle to the resolver or normalizer. Every query is a read; the
//! only side effect is populating the cache.

use std::sync::Arc;
use tracing::{debug, instrument};

use crate::cache::{CacheStats, SessionCache};
use crate::config::TelemetryConfig;
use crate::normalize::normalize;
use crate::resolver::list_laps;
use crate::source::SessionSource;
use crate::sources;
use crate::types::{LapRecord, NormalizedTelemetry, SessionBundle, SessionKey, SessionType};
use crate::{Result, TelemetryError};

/// Earliest season the provider serves.
pub const DEFAULT_FIRST_SEASON: u16 = 2018;

/// Entry point for telemetry queries.
///
/// Cloning shares the source and the cache.
#[derive(Clone)]
pub struct TelemetryService {
    source: Arc<dyn SessionSource>,
    cache: SessionCache,
    first_season: u16,
}

impl TelemetryService {
    pub fn new(source: Arc<dyn SessionSource>, cache: SessionCache) -> Self {
        Self { source, cache, first_season: DEFAULT_FIRST_SEASON }
    }

    /// Build the configured source and cache.
    pub fn from_config(config: &TelemetryConfig) -> Result<Self> {
        let source = sources::from_config(&config.upstream)?;
        let cache = SessionCache::from_config(&config.cache);
        Ok(Self::new(source, cache).with_first_season(config.upstream.first_season))
    }

    pub fn with_first_season(mut self, year: u16) -> Self {
        self.first_season = year;
        self
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Normalized telemetry for one driver's lap.
    #[instrument(skip(self), level = "debug")]
    pub async fn get_lap_telemetry(
        &self,
        year: u32,
        round: u32,
        session: &str,
        driver: &str,
        lap: u32,
    ) -> Result<NormalizedTelemetry> {
        let key = self.session_key(year, round, session)?;
        let driver = validate_driver(driver)?;
        if lap == 0 {
            return Err(TelemetryError::validation("lap", "lap number must be at least 1"));
        }

        let bundle = self.load(key).await?;
        normalize(&bundle, driver, lap)
    }

    /// A session's laps ordered by lap number then driver.
    ///
    /// With a driver filter, only that driver's laps; unknown drivers give an
    /// empty list.
    #[instrument(skip(self), level = "debug")]
    pub async fn get_session_laps(
        &self,
        year: u32,
        round: u32,
        session: &str,
        driver: Option<&str>,
    ) -> Result<Vec<LapRecord>> {
        let key = self.session_key(year, round, session)?;
        let driver = driver.map(validate_driver).transpose()?;

        let bundle = self.load(key).await?;
        let laps: Vec<LapRecord> = list_laps(&bundle, driver).into_iter().cloned().collect();
        debug!(session = %key, driver = ?driver, laps = laps.len(), "Listed session laps");
        Ok(laps)
    }

    /// Drop a session from the cache so the next query refetches it.
    pub fn invalidate(&self, key: &SessionKey) {
        self.cache.invalidate(key);
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Validate and build a session key.
    pub fn session_key(&self, year: u32, round: u32, session: &str) -> Result<SessionKey> {
        let year = u16::try_from(year)
            .ok()
            .filter(|&y| y >= self.first_season)
            .ok_or_else(|| {
                TelemetryError::validation(
                    "year",
                    format!(
                        "season {} is not supported (first season {})",
                        year, self.first_season
                    ),
                )
            })?;
        let round = u8::try_from(round)
            .ok()
            .filter(|&r| r >= 1)
            .ok_or_else(|| {
                TelemetryError::validation("round", format!("invalid round {}", round))
            })?;
        let session: SessionType = session.parse()?;
        Ok(SessionKey::new(year, round, session))
    }

    async fn load(&self, key: SessionKey) -> Result<Arc<SessionBundle>> {
        let source = Arc::clone(&self.source);
        self.cache.get_or_fetch(key, async move { source.fetch_session(&key).await }).await
    }
}

fn validate_driver(driver: &str) -> Result<&str> {
    let driver = driver.trim();
    if driver.is_empty() {
        return Err(TelemetryError::validation("driver", "driver must not be empty"));
    }
    Ok(driver)
}
