use super::{AccessToken, TokenCredential};
use crate::common::ClientResult;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Tokens are renewed this long before they expire.
pub const DEFAULT_REFRESH_WINDOW_SECS: i64 = 300;

/// Scope-keyed token cache shared by clones of one pipeline.
#[derive(Clone)]
pub struct TokenCache {
    cache: Arc<RwLock<HashMap<String, AccessToken>>>,
    refresh_window: Duration,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::with_refresh_window(Duration::seconds(DEFAULT_REFRESH_WINDOW_SECS))
    }

    pub fn with_refresh_window(refresh_window: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            refresh_window,
        }
    }

    /// Cached token for `scope` unless it is inside the refresh window.
    pub async fn get(&self, scope: &str) -> Option<AccessToken> {
        let cache = self.cache.read().await;
        cache
            .get(scope)
            .filter(|token| !token.needs_refresh(self.refresh_window))
            .cloned()
    }

    pub async fn set(&self, scope: impl Into<String>, token: AccessToken) {
        let mut cache = self.cache.write().await;
        cache.insert(scope.into(), token);
    }

    pub async fn invalidate(&self, scope: &str) {
        let mut cache = self.cache.write().await;
        cache.remove(scope);
    }

    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.clear();
    }

    /// Returns a fresh token for `scope`, asking `credential` only on a miss.
    pub async fn get_or_fetch(
        &self,
        credential: &dyn TokenCredential,
        scope: &str,
    ) -> ClientResult<AccessToken> {
        if let Some(token) = self.get(scope).await {
            return Ok(token);
        }

        log::debug!("Requesting token for scope {scope}");
        let token = credential.get_token(scope).await?;
        self.set(scope, token.clone()).await;
        Ok(token)
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}
