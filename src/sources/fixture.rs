//! Fixture source serving session documents from memory or disk

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::source::SessionSource;
use crate::types::{SessionBundle, SessionKey};
use crate::wire::SessionDocument;
use crate::{Result, TelemetryError};

enum Fixtures {
    Memory(HashMap<SessionKey, SessionDocument>),
    /// `{dir}/{year}_{round}_{session}.json`, read on demand
    Directory(PathBuf),
}

/// Source backed by stored provider documents
///
/// Used for offline operation and tests. A session without a document is
/// reported as not found, exactly like the live provider's 404.
pub struct FixtureSource {
    fixtures: Fixtures,
}

impl Default for FixtureSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureSource {
    /// Create an empty in-memory source.
    pub fn new() -> Self {
        Self { fixtures: Fixtures::Memory(HashMap::new()) }
    }

    /// Serve documents from a directory.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        info!(dir = %dir.display(), "Serving session fixtures from directory");
        Self { fixtures: Fixtures::Directory(dir) }
    }

    /// Add an in-memory session document.
    ///
    /// Has no effect on a directory-backed source.
    pub fn with_session(mut self, key: SessionKey, document: SessionDocument) -> Self {
        self.insert(key, document);
        self
    }

    /// Add or replace an in-memory session document.
    pub fn insert(&mut self, key: SessionKey, document: SessionDocument) {
        match &mut self.fixtures {
            Fixtures::Memory(map) => {
                map.insert(key, document);
            }
            Fixtures::Directory(dir) => {
                debug!(
                    dir = %dir.display(),
                    session = %key,
                    "Ignoring insert on directory fixtures"
                );
            }
        }
    }
}

#[async_trait::async_trait]
impl SessionSource for FixtureSource {
    async fn fetch_session(&self, key: &SessionKey) -> Result<SessionBundle> {
        let document = match &self.fixtures {
            Fixtures::Memory(map) => {
                map.get(key).cloned().ok_or(TelemetryError::SessionNotFound { key: *key })?
            }
            Fixtures::Directory(dir) => {
                let path = dir.join(format!("{}.json", key.file_stem()));
                let body = match tokio::fs::read(&path).await {
                    Ok(body) => body,
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        return Err(TelemetryError::SessionNotFound { key: *key });
                    }
                    Err(e) => {
                        return Err(TelemetryError::upstream_with_source(
                            format!("cannot read fixture {}", path.display()),
                            e,
                        ));
                    }
                };
                SessionDocument::from_json(&body)?
            }
        };

        debug!(session = %key, "Serving session from fixtures");
        document.into_bundle(*key)
    }

    fn name(&self) -> &str {
        "fixture"
    }
}
