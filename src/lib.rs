//! Session telemetry retrieval, caching and normalization for F1 lap data.
//!
//! apexdata turns a provider's raw car telemetry and lap timing for a session
//! into per-lap traces on a strictly increasing distance index, ready for a
//! dashboard to plot.
//!
//! # Architecture
//!
//! ```text
//! TelemetryService ─► SessionCache ─(miss)─► SessionSource (HTTP / fixtures, with retry)
//!        │                 │
//!        ▼                 ▼
//!   resolver ◄──── Arc<SessionBundle> ────► normalize ─► NormalizedTelemetry
//! ```
//!
//! - **Sessions are fetched whole** and cached as immutable [`SessionBundle`]s
//!   in a bounded LRU; concurrent misses for one session share one fetch.
//! - **Nothing is fabricated**: absent channels stay `None` and the point is
//!   flagged, distance is deduplicated and clipped but never resampled.
//! - **Typed failures**: every query returns a [`TelemetryError`] whose kind
//!   maps onto the HTTP status of the optional `server` surface.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use apexdata::{SessionCache, TelemetryService, sources::FixtureSource};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> apexdata::Result<()> {
//!     let source = Arc::new(FixtureSource::from_dir("test-data/sessions"));
//!     let service = TelemetryService::new(source, SessionCache::new(4));
//!
//!     let lap = service.get_lap_telemetry(2024, 1, "Race", "VER", 10).await?;
//!     println!("{} points, {} with gaps", lap.points.len(), lap.missing_points());
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;
pub mod wire;

// Retrieval and caching
pub mod cache;
pub mod source;
pub mod sources;

// Lap resolution and normalization
pub mod normalize;
pub mod resolver;
pub mod service;

#[cfg(feature = "server")]
pub mod server;

// Core exports
pub use cache::{CacheStats, SessionCache};
pub use config::TelemetryConfig;
pub use error::*;
pub use normalize::{normalize, normalize_samples};
pub use resolver::{LapWindow, lap_window, list_laps, resolve_lap};
pub use service::TelemetryService;
pub use source::SessionSource;
pub use types::*;
