//! Configuration
//!
//! Configuration is an explicit value built once at startup and handed to the
//! components that need it. It is read from YAML, then selectively overridden
//! from the environment:
//!
//! | Variable                   | Field                     |
//! |----------------------------|---------------------------|
//! | `APEXDATA_UPSTREAM_URL`    | `upstream.base_url`       |
//! | `APEXDATA_UPSTREAM_TOKEN`  | `upstream.api_token`      |
//! | `APEXDATA_FIXTURE_DIR`     | `upstream.fixture_dir`    |
//! | `APEXDATA_CACHE_SESSIONS`  | `cache.max_sessions`      |
//! | `APEXDATA_BIND`            | `server.bind`             |
//! | `APEXDATA_CORS_ORIGINS`    | `server.cors_origins`     |
//!
//! ```rust
//! use apexdata::TelemetryConfig;
//!
//! let config = TelemetryConfig::from_yaml_str("cache:\n  max_sessions: 8\n").unwrap();
//! assert_eq!(config.cache.max_sessions, 8);
//! assert_eq!(config.upstream.max_attempts, 3);
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::{Result, TelemetryError};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub upstream: UpstreamConfig,
    pub cache: CacheConfig,
    pub server: ServerConfig,
}

/// Upstream provider access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Provider base URL; sessions live under `{base_url}/sessions/...`
    pub base_url: String,
    /// Bearer token sent with every request
    pub api_token: Option<String>,
    /// Serve session documents from this directory instead of the provider
    pub fixture_dir: Option<PathBuf>,
    /// Per-attempt timeout
    pub timeout_secs: u64,
    /// Total attempts including the first
    pub max_attempts: u32,
    /// First retry delay; doubles per attempt
    pub backoff_base_ms: u64,
    /// Earliest season the provider has telemetry for
    pub first_season: u16,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/upstream".to_string(),
            api_token: None,
            fixture_dir: None,
            timeout_secs: 30,
            max_attempts: 3,
            backoff_base_ms: 250,
            first_season: 2018,
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

/// Session cache sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of session bundles held at once
    pub max_sessions: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_sessions: 4 }
    }
}

/// HTTP surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub api_prefix: String,
    /// Browser origins allowed to call the API, e.g. the dashboard dev server
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            api_prefix: "/api/v1".to_string(),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:3001".to_string(),
            ],
        }
    }
}

impl TelemetryConfig {
    /// Parse YAML; missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(yaml)
            .map_err(|e| TelemetryError::config(format!("YAML parsing failed: {}", e)))
    }

    /// Load a YAML file, apply environment overrides and validate.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            TelemetryError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_yaml_str(&yaml)?;
        config.apply_env();
        config.validate()?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Apply `APEXDATA_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("APEXDATA_UPSTREAM_URL") {
            self.upstream.base_url = url;
        }
        if let Some(token) = lookup("APEXDATA_UPSTREAM_TOKEN") {
            self.upstream.api_token = Some(token).filter(|t| !t.is_empty());
        }
        if let Some(dir) = lookup("APEXDATA_FIXTURE_DIR") {
            self.upstream.fixture_dir = Some(PathBuf::from(dir));
        }
        if let Some(sessions) = lookup("APEXDATA_CACHE_SESSIONS") {
            match sessions.parse() {
                Ok(n) => self.cache.max_sessions = n,
                Err(_) => {
                    tracing::warn!(value = %sessions, "Ignoring invalid APEXDATA_CACHE_SESSIONS")
                }
            }
        }
        if let Some(bind) = lookup("APEXDATA_BIND") {
            self.server.bind = bind;
        }
        if let Some(origins) = lookup("APEXDATA_CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect();
        }
    }

    /// Reject configurations the components cannot run with.
    pub fn validate(&self) -> Result<()> {
        let url = &self.upstream.base_url;
        if self.upstream.fixture_dir.is_none()
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(TelemetryError::config(format!(
                "upstream.base_url must be an http(s) URL, got '{}'",
                url
            )));
        }
        if self.upstream.timeout_secs == 0 {
            return Err(TelemetryError::config("upstream.timeout_secs must be positive"));
        }
        if self.upstream.max_attempts == 0 {
            return Err(TelemetryError::config("upstream.max_attempts must be at least 1"));
        }
        if self.cache.max_sessions == 0 {
            return Err(TelemetryError::config("cache.max_sessions must be at least 1"));
        }
        if !self.server.api_prefix.starts_with('/') {
            return Err(TelemetryError::config("server.api_prefix must start with '/'"));
        }
        if let Some(origin) = self.server.cors_origins.iter().find(|o| !is_valid_origin(o)) {
            return Err(TelemetryError::config(format!(
                "server.cors_origins entry '{}' is not an http(s) origin",
                origin
            )));
        }
        Ok(())
    }
}

fn is_valid_origin(origin: &str) -> bool {
    let rest = origin.strip_prefix("http://").or_else(|| origin.strip_prefix("https://"));
    rest.is_some_and(|host| {
        !host.is_empty() && !host.contains('/') && host.chars().all(|c| c.is_ascii_graphic())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let config = TelemetryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.upstream.timeout(), Duration::from_secs(30));
        assert_eq!(config.server.api_prefix, "/api/v1");
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = "upstream:\n  base_url: https://f1.example.com/api\n  max_attempts: 5\n";
        let config = TelemetryConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.upstream.base_url, "https://f1.example.com/api");
        assert_eq!(config.upstream.max_attempts, 5);
        assert_eq!(config.upstream.timeout_secs, 30);
        assert_eq!(config.cache.max_sessions, 4);
    }

    #[test]
    fn invalid_yaml_is_a_config_error() {
        let err = TelemetryConfig::from_yaml_str("upstream: [1, 2").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Config);
    }

    #[test]
    fn overrides_take_precedence() {
        let env: HashMap<&str, &str> = [
            ("APEXDATA_UPSTREAM_URL", "https://mirror.example.com"),
            ("APEXDATA_UPSTREAM_TOKEN", "secret"),
            ("APEXDATA_CACHE_SESSIONS", "12"),
            ("APEXDATA_BIND", "127.0.0.1:9000"),
            ("APEXDATA_CORS_ORIGINS", "https://dash.example.com, http://localhost:5173,"),
        ]
        .into_iter()
        .collect();

        let mut config = TelemetryConfig::default();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(config.upstream.base_url, "https://mirror.example.com");
        assert_eq!(config.upstream.api_token.as_deref(), Some("secret"));
        assert_eq!(config.cache.max_sessions, 12);
        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(
            config.server.cors_origins,
            vec!["https://dash.example.com".to_string(), "http://localhost:5173".to_string()]
        );
    }

    #[test]
    fn unparseable_override_is_ignored() {
        let mut config = TelemetryConfig::default();
        config.apply_overrides(|name| {
            (name == "APEXDATA_CACHE_SESSIONS").then(|| "many".to_string())
        });
        assert_eq!(config.cache.max_sessions, 4);
    }

    #[test]
    fn validation_rejects_unusable_values() {
        let mut config = TelemetryConfig::default();
        config.upstream.base_url = "ftp://example.com".into();
        assert!(config.validate().is_err());

        config.upstream.fixture_dir = Some(PathBuf::from("fixtures"));
        assert!(config.validate().is_ok());

        config.cache.max_sessions = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn cors_origins_must_be_bare_origins() {
        let mut config = TelemetryConfig::default();
        assert_eq!(config.server.cors_origins.len(), 2);

        config.server.cors_origins = vec!["https://dash.example.com:8443".into()];
        assert!(config.validate().is_ok());

        for bad in ["localhost:3000", "http://localhost:3000/", "https://", "http://a b"] {
            config.server.cors_origins = vec![bad.into()];
            assert_eq!(config.validate().unwrap_err().kind(), crate::ErrorKind::Config, "{}", bad);
        }

        config.server.cors_origins.clear();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apexdata.yaml");
        std::fs::write(&path, "server:\n  api_prefix: /v2\n").unwrap();
        let config = TelemetryConfig::load(&path).unwrap();
        assert_eq!(config.server.api_prefix, "/v2");

        assert!(TelemetryConfig::load(dir.path().join("missing.yaml")).is_err());
    }
}
