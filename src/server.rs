//! HTTP surface for the dashboard
//!
//! Routes under the configured API prefix:
//!
//! ```text
//! GET {prefix}/telemetry/{year}/{round}/{session}/telemetry/{driver}/{lap}  -> TelemetryData
//! GET {prefix}/telemetry/{year}/{round}/{session}/laps?driver=             -> LapData[]
//! ```
//!
//! plus `GET /` and `GET /health`. Every API response uses the
//! [`ApiResponse`] envelope; the status code follows the error kind.
//! Browsers on the configured origins may call every route.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::service::TelemetryService;
use crate::wire::{ApiResponse, LapData, TelemetryData};
use crate::{Result, TelemetryError};

#[derive(Clone)]
struct AppState {
    service: TelemetryService,
}

/// HTTP status for a failed query.
pub fn status_for(error: &TelemetryError) -> StatusCode {
    match error {
        TelemetryError::Validation { .. } => StatusCode::BAD_REQUEST,
        TelemetryError::SessionNotFound { .. } | TelemetryError::LapNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        TelemetryError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        TelemetryError::Upstream { .. } | TelemetryError::Parse { .. } => StatusCode::BAD_GATEWAY,
        TelemetryError::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn respond<T: Serialize>(result: Result<T>) -> Response {
    match result {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::ok(data))).into_response(),
        Err(error) => {
            let status = status_for(&error);
            if status.is_server_error() {
                warn!(status = status.as_u16(), "Query failed: {}", error);
            }
            (status, Json(ApiResponse::<T>::err(error.to_string()))).into_response()
        }
    }
}

fn parse_segment<T: FromStr>(field: &'static str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| TelemetryError::validation(field, format!("'{}' is not a valid number", raw)))
}

#[derive(Debug, Deserialize)]
struct LapsQuery {
    driver: Option<String>,
}

async fn lap_telemetry(
    State(state): State<AppState>,
    Path((year, round, session, driver, lap)): Path<(String, String, String, String, String)>,
) -> Response {
    let result = async {
        let year = parse_segment("year", &year)?;
        let round = parse_segment("round", &round)?;
        let lap = parse_segment("lap", &lap)?;
        let telemetry =
            state.service.get_lap_telemetry(year, round, &session, &driver, lap).await?;
        Ok::<_, TelemetryError>(TelemetryData::from(&telemetry))
    }
    .await;
    respond(result)
}

async fn session_laps(
    State(state): State<AppState>,
    Path((year, round, session)): Path<(String, String, String)>,
    Query(query): Query<LapsQuery>,
) -> Response {
    let result = async {
        let year = parse_segment("year", &year)?;
        let round = parse_segment("round", &round)?;
        let driver = query.driver.as_deref().filter(|d| !d.is_empty());
        let laps = state.service.get_session_laps(year, round, &session, driver).await?;
        Ok::<_, TelemetryError>(laps.iter().map(LapData::from).collect::<Vec<_>>())
    }
    .await;
    respond(result)
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "ApexData API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// CORS policy for the configured browser origins.
///
/// Credentials are allowed, so methods and headers mirror the preflight
/// request instead of using wildcards.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Build the application router.
pub fn router(service: TelemetryService, config: &ServerConfig) -> Router {
    let api = Router::new()
        .route("/telemetry/:year/:round/:session/telemetry/:driver/:lap", get(lap_telemetry))
        .route("/telemetry/:year/:round/:session/laps", get(session_laps));

    let prefix = config.api_prefix.trim_end_matches('/');
    let app = Router::new().route("/", get(root)).route("/health", get(health));
    let app = if prefix.is_empty() { app.merge(api) } else { app.nest(prefix, api) };

    app.layer(cors_layer(&config.cors_origins)).with_state(AppState { service })
}

/// Serve until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    service: TelemetryService,
    config: &ServerConfig,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(
            addr = %addr,
            prefix = %config.api_prefix,
            origins = config.cors_origins.len(),
            source = service.source_name(),
            "Serving telemetry API"
        );
    }
    let app = router(service, config);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
