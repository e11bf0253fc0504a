use super::{BearerToken, TokenProvider};
use crate::errors::CredentialError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Reuses the last token from `inner` until it is within `refresh_margin` of expiry.
///
/// Concurrent callers wait on the same lock, so at most one refresh is in flight.
#[derive(Clone, Debug)]
pub struct CachedTokenProvider<P> {
    inner: P,
    refresh_margin: chrono::Duration,
    cached: Arc<Mutex<Option<BearerToken>>>,
}

impl<P: TokenProvider> CachedTokenProvider<P> {
    pub fn new(inner: P, refresh_margin: chrono::Duration) -> Self {
        Self {
            inner,
            refresh_margin,
            cached: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl<P: TokenProvider + Clone + 'static> TokenProvider for CachedTokenProvider<P> {
    async fn get_token(&self) -> Result<BearerToken, CredentialError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.is_fresh(self.refresh_margin) {
                debug!("Reusing cached access token.");
                return Ok(token.clone());
            }
        }

        // A failed refresh leaves the slot empty rather than holding a stale token.
        *cached = None;
        let token = self.inner.get_token().await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}
