//! Source trait for upstream session data

use crate::Result;
use crate::types::{SessionBundle, SessionKey};

/// Trait for upstream motorsport data sources
///
/// Sources abstract over where session data comes from (a live HTTP
/// provider, fixture documents on disk) and hold no state between calls.
/// They do not retry; wrap them in [`RetryingSource`](crate::sources::RetryingSource)
/// for bounded retry with per-attempt timeouts.
#[async_trait::async_trait]
pub trait SessionSource: Send + Sync + 'static {
    /// Fetch every lap and sample recorded for a session
    ///
    /// Returns:
    /// - `Ok(bundle)` - Fully populated session
    /// - `Err(SessionNotFound)` - The provider has no such session
    /// - `Err(Upstream | Timeout | Parse)` - Provider unreachable or data unusable
    async fn fetch_session(&self, key: &SessionKey) -> Result<SessionBundle>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

#[async_trait::async_trait]
impl<S: SessionSource + ?Sized> SessionSource for std::sync::Arc<S> {
    async fn fetch_session(&self, key: &SessionKey) -> Result<SessionBundle> {
        (**self).fetch_session(key).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
