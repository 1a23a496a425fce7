//! Shared state of the HTTP front-end.

use crate::token_cache::AuthCache;
use std::sync::Arc;
use weft_common::StorageConfig;
use weft_directory::DirectoryClient;

#[derive(Clone)]
pub struct AppState {
    directory: DirectoryClient,
    token_cache: Arc<AuthCache>,
    storage: Arc<StorageConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(
        directory: DirectoryClient,
        token_cache: Arc<AuthCache>,
        storage: StorageConfig,
    ) -> Self {
        Self {
            directory,
            token_cache,
            storage: Arc::new(storage),
        }
    }

    #[must_use]
    pub fn directory(&self) -> &DirectoryClient {
        &self.directory
    }

    #[must_use]
    pub fn token_cache(&self) -> &AuthCache {
        &self.token_cache
    }

    #[must_use]
    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    /// Resolve a token, preferring the local cache and falling back to the
    /// directory. Returns `(userId, userName)` or `None` when the token is
    /// invalid.
    pub async fn resolve_token(&self, token: &str) -> Option<(i64, String)> {
        if token.is_empty() {
            return None;
        }

        if let Some(hit) = self.token_cache.get(token) {
            return Some(hit);
        }

        match self.directory.check_auth(token).await {
            Ok(reply) if reply.code == weft_core::CODE_OK => {
                self.token_cache
                    .set(token, reply.user_id, &reply.user_name);
                Some((reply.user_id, reply.user_name))
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "check auth rpc failed");
                None
            }
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("cached_tokens", &self.token_cache.len())
            .finish()
    }
}
