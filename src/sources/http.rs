//! HTTP source for a live telemetry provider

use reqwest::StatusCode;
use tracing::{debug, info};

use crate::config::UpstreamConfig;
use crate::source::SessionSource;
use crate::types::{SessionBundle, SessionKey};
use crate::wire::SessionDocument;
use crate::{Result, TelemetryError};

/// Source that fetches session documents over HTTP
///
/// Requests `GET {base_url}/sessions/{year}/{round}/{session}`. A 404 means
/// the provider has no such session; every other failure is an upstream error.
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpSource {
    /// Create a source from explicit upstream configuration.
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| TelemetryError::upstream_with_source("Failed to create HTTP client", e))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    /// URL of a session document.
    pub fn session_url(&self, key: &SessionKey) -> String {
        format!("{}/sessions/{}/{}/{}", self.base_url, key.year, key.round, key.session)
    }
}

#[async_trait::async_trait]
impl SessionSource for HttpSource {
    async fn fetch_session(&self, key: &SessionKey) -> Result<SessionBundle> {
        let url = self.session_url(key);
        debug!(session = %key, url = %url, "Requesting session document");

        let mut request = self.client.get(&url);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(TelemetryError::SessionNotFound { key: *key });
        }
        if !status.is_success() {
            return Err(TelemetryError::upstream(format!("HTTP {} from {}", status, url)));
        }

        let body = response.bytes().await?;
        info!(session = %key, bytes = body.len(), "Fetched session document");

        SessionDocument::from_json(&body)?.into_bundle(*key)
    }

    fn name(&self) -> &str {
        "http"
    }
}
