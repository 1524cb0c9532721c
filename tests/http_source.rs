//! HttpSource against a fake provider
#![cfg(feature = "server")]

use apexdata::config::UpstreamConfig;
use apexdata::sources::{HttpSource, RetryPolicy, RetryingSource};
use apexdata::{SessionKey, SessionSource, SessionType, TelemetryError};
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

#[derive(Clone, Default)]
struct Provider {
    calls: Arc<AtomicU32>,
    /// Requests answered with 503 before serving normally
    flaky: Arc<AtomicU32>,
}

async fn session(
    State(provider): State<Provider>,
    headers: HeaderMap,
    Path((year, round, session)): Path<(u16, u8, String)>,
) -> Response {
    provider.calls.fetch_add(1, Ordering::SeqCst);

    if provider.flaky.load(Ordering::SeqCst) > 0 {
        provider.flaky.fetch_sub(1, Ordering::SeqCst);
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer secret") {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    match (year, round, session.as_str()) {
        (2024, 1, "Race") => axum::Json(json!({
            "brake_kind": "percent",
            "laps": [
                {"Driver": "VER", "LapNumber": 1.0, "LapStartTime": 3600.0, "LapTime": 95.2,
                 "Sector1Time": null, "Sector2Time": 35.1, "Sector3Time": 30.0,
                 "Compound": "SOFT", "TyreLife": 1.0},
                {"Driver": "VER", "LapNumber": -1.0, "LapStartTime": 3500.0}
            ],
            "samples": [
                {"SessionTime": 3600.5, "Driver": "VER", "Distance": 10.0, "Speed": 280.0,
                 "Throttle": 100.0, "Brake": 0.0, "nGear": 7.0, "RPM": 11000.0, "DRS": 0.0},
                {"SessionTime": 3601.0, "Driver": "VER", "Distance": 50.0, "Speed": 250.0,
                 "Throttle": 0.0, "Brake": 87.5, "nGear": 6.0, "RPM": 10400.0, "DRS": 8.0}
            ]
        }))
        .into_response(),
        (2024, 2, "Race") => "{\"laps\": [".into_response(),
        (2024, 3, "Race") => axum::Json(json!({ "laps": [] })).into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn start(provider: Provider) -> String {
    let app = Router::new()
        .route("/upstream/sessions/:year/:round/:session", get(session))
        .with_state(provider);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve fake provider") });
    format!("http://{}/upstream", addr)
}

fn config(base_url: String) -> UpstreamConfig {
    UpstreamConfig { base_url, api_token: Some("secret".to_string()), ..UpstreamConfig::default() }
}

fn key(round: u8) -> SessionKey {
    SessionKey::new(2024, round, SessionType::Race)
}

#[tokio::test]
async fn fetches_and_translates_a_session() {
    let base = start(Provider::default()).await;
    let source = HttpSource::new(&config(base)).unwrap();

    let bundle = source.fetch_session(&key(1)).await.unwrap();
    assert_eq!(bundle.laps().len(), 1);
    let lap = bundle.lap("VER", 1).unwrap();
    assert_eq!(lap.sectors[0], None);
    assert!(lap.is_personal_best);

    let samples = bundle.driver_samples("VER");
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[1].brake.map(|b| b.as_f64()), Some(87.5));
}

#[tokio::test]
async fn maps_provider_failures() {
    let base = start(Provider::default()).await;
    let source = HttpSource::new(&config(base.clone())).unwrap();

    assert!(matches!(
        source.fetch_session(&key(9)).await.unwrap_err(),
        TelemetryError::SessionNotFound { .. }
    ));
    for round in [2, 3] {
        let err = source.fetch_session(&key(round)).await.unwrap_err();
        assert!(matches!(err, TelemetryError::Parse { .. }), "round {}", round);
    }

    let anonymous =
        HttpSource::new(&UpstreamConfig { base_url: base, ..UpstreamConfig::default() }).unwrap();
    let err = anonymous.fetch_session(&key(1)).await.unwrap_err();
    assert!(matches!(err, TelemetryError::Upstream { .. }));
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn retry_decorator_recovers_from_transient_errors() {
    let provider = Provider::default();
    provider.flaky.store(2, Ordering::SeqCst);
    let base = start(provider.clone()).await;

    let policy = RetryPolicy {
        max_attempts: 3,
        timeout: Duration::from_secs(5),
        backoff_base: Duration::from_millis(10),
    };
    let source = RetryingSource::new(HttpSource::new(&config(base)).unwrap(), policy);

    assert!(source.fetch_session(&key(1)).await.is_ok());
    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);

    // Not-found is terminal
    let before = provider.calls.load(Ordering::SeqCst);
    assert!(source.fetch_session(&key(9)).await.is_err());
    assert_eq!(provider.calls.load(Ordering::SeqCst), before + 1);
}
