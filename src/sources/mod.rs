//! Concrete session sources
//!
//! - [`HttpSource`]: live provider over HTTP/JSON
//! - [`FixtureSource`]: stored provider documents, in memory or on disk
//! - [`RetryingSource`]: timeout and bounded-retry decorator for either

mod fixture;
mod http;
mod retry;

pub use fixture::FixtureSource;
pub use http::HttpSource;
pub use retry::{RetryPolicy, RetryingSource};

use std::sync::Arc;

use crate::Result;
use crate::config::UpstreamConfig;
use crate::source::SessionSource;

/// Build the configured source, wrapped in the retry decorator.
///
/// A configured fixture directory takes precedence over the HTTP provider.
pub fn from_config(config: &UpstreamConfig) -> Result<Arc<dyn SessionSource>> {
    let policy = RetryPolicy::from_config(config);
    let source: Arc<dyn SessionSource> = match &config.fixture_dir {
        Some(dir) => Arc::new(RetryingSource::new(FixtureSource::from_dir(dir), policy)),
        None => Arc::new(RetryingSource::new(HttpSource::new(config)?, policy)),
    };
    Ok(source)
}
