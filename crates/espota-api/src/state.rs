//! Application state for the update API

use std::sync::Arc;

use espota_core::{Config, DigestCache};

use crate::request_log::RequestLog;

/// Application state shared across all handlers
///
/// Holds only read-only configuration plus the two pieces that serialize
/// internally: the request log writer and the optional digest cache.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    request_log: Arc<RequestLog>,
    digest_cache: Option<Arc<DigestCache>>,
}

impl AppState {
    /// Create state from a validated config
    pub fn new(config: Config) -> Self {
        let request_log = RequestLog::new(config.log.file_pattern.clone());
        let digest_cache = config
            .update
            .cache_digests
            .then(|| Arc::new(DigestCache::new()));

        Self {
            config: Arc::new(config),
            request_log: Arc::new(request_log),
            digest_cache,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn request_log(&self) -> &Arc<RequestLog> {
        &self.request_log
    }

    /// Digest cache, if `update.cache_digests` is enabled
    pub fn digest_cache(&self) -> Option<&DigestCache> {
        self.digest_cache.as_deref()
    }
}
