//! Core types for session telemetry.
//!
//! This module provides the domain model shared by the source adapters, the
//! session cache, the resolver and the normalizer:
//!
//! - [`SessionKey`] identifies one timing session (year, round, session type)
//! - [`LapRecord`] is a per-lap timing summary with optional sectors
//! - [`TelemetrySample`] is one raw high-frequency reading with optional channels
//! - [`SessionBundle`] owns every lap and sample of a session and is the unit of caching
//! - [`NormalizedTelemetry`] is a lap's samples on a strictly increasing distance index
//!
//! ## Usage Example
//!
//! ```rust
//! use apexdata::types::{SessionKey, SessionType};
//!
//! let key = SessionKey::new(2024, 1, "race".parse::<SessionType>().unwrap());
//! assert_eq!(key.to_string(), "2024/1/Race");
//! ```

mod bundle;
mod lap;
mod normalized;
mod sample;
mod session_key;

pub use bundle::SessionBundle;
pub use lap::{Compound, LapRecord, SpeedTraps};
pub use normalized::{NormalizedPoint, NormalizedTelemetry, Provenance};
pub use sample::{Brake, BrakeKind, DrsState, SampleOrigin, TelemetrySample};
pub use session_key::{SessionKey, SessionType};
