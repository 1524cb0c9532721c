//! Wire formats at both edges of the core
//!
//! - [`upstream`]: the provider's session document and its translation into the domain model
//! - [`api`]: the dashboard-facing JSON shapes and the `{data, error}` envelope

pub mod api;
pub mod upstream;

pub use api::{ApiResponse, LapData, TelemetryData, TelemetryPoint, format_timedelta};
pub use upstream::{SessionDocument, TranslationReport, UpstreamLap, UpstreamSample};
